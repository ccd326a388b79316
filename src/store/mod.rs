mod directory;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::courier::{Courier, GeoPoint, LocationFix};
use crate::models::order::{Order, OrderStatus};

const LOCATION_HISTORY_LIMIT: usize = 50;

/// Live workload of one courier, computed from the order store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Workload {
    /// Active-status orders where the courier is the confirmed assignee.
    pub confirmed_active: u32,
    /// Pending orders reserved to the courier and not yet confirmed by them.
    pub reserved_pending: u32,
}

impl Workload {
    pub fn total(&self) -> u32 {
        self.confirmed_active + self.reserved_pending
    }
}

#[derive(Default)]
pub struct Store {
    couriers: DashMap<Uuid, Courier>,
    orders: DashMap<Uuid, Order>,
    trashed_orders: DashMap<Uuid, Order>,
    location_history: DashMap<Uuid, VecDeque<LocationFix>>,
    live_locations: DashMap<Uuid, LocationFix>,
    reservation_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn courier_count(&self) -> usize {
        self.couriers.len()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn insert_courier(&self, courier: Courier) -> Courier {
        self.couriers.insert(courier.id, courier.clone());
        courier
    }

    pub fn courier(&self, id: Uuid) -> Option<Courier> {
        self.couriers.get(&id).map(|entry| entry.value().clone())
    }

    pub fn couriers(&self) -> Vec<Courier> {
        let mut couriers: Vec<Courier> = self
            .couriers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        couriers.sort_by_key(|courier| courier.id);
        couriers
    }

    /// `apply` runs while the courier entry is locked; it may read orders but
    /// must not touch other couriers.
    pub fn update_courier<F>(&self, id: Uuid, apply: F) -> Result<Courier, StoreError>
    where
        F: FnOnce(&mut Courier),
    {
        let mut courier = self
            .couriers
            .get_mut(&id)
            .ok_or(StoreError::CourierNotFound(id))?;

        apply(&mut *courier);
        courier.updated_at = Utc::now();

        Ok(courier.clone())
    }

    pub fn record_location(
        &self,
        id: Uuid,
        point: GeoPoint,
        recorded_at: DateTime<Utc>,
    ) -> Result<LocationFix, StoreError> {
        if !self.couriers.contains_key(&id) {
            return Err(StoreError::CourierNotFound(id));
        }

        let fix = LocationFix { point, recorded_at };
        let mut history = self.location_history.entry(id).or_default();
        history.push_back(fix);
        while history.len() > LOCATION_HISTORY_LIMIT {
            history.pop_front();
        }

        Ok(fix)
    }

    pub fn publish_live_location(&self, id: Uuid, fix: LocationFix) -> Result<(), StoreError> {
        if !self.couriers.contains_key(&id) {
            return Err(StoreError::CourierNotFound(id));
        }

        self.live_locations.insert(id, fix);
        Ok(())
    }

    pub fn last_fix(&self, id: Uuid) -> Option<LocationFix> {
        self.location_history
            .get(&id)
            .and_then(|history| history.back().copied())
    }

    pub fn live_fix(&self, id: Uuid) -> Option<LocationFix> {
        self.live_locations.get(&id).map(|entry| *entry.value())
    }

    pub fn insert_order(&self, order: Order) -> Result<Order, StoreError> {
        if self.orders.contains_key(&order.id) || self.trashed_orders.contains_key(&order.id) {
            return Err(StoreError::DuplicateOrder(order.id));
        }

        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    pub fn order(&self, id: Uuid) -> Option<Order> {
        self.orders.get(&id).map(|entry| entry.value().clone())
    }

    /// Applies `apply` to a live order, returning its state before and after.
    pub fn update_order<F>(&self, id: Uuid, apply: F) -> Result<(Order, Order), StoreError>
    where
        F: FnOnce(&mut Order),
    {
        let mut order = self
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;

        let before = order.clone();
        apply(&mut *order);
        order.id = before.id;
        order.updated_at = Utc::now();

        Ok((before, order.clone()))
    }

    /// Soft delete: the order leaves the live set but can be restored.
    pub fn trash_order(&self, id: Uuid) -> Result<Order, StoreError> {
        let (_, order) = self
            .orders
            .remove(&id)
            .ok_or(StoreError::OrderNotFound(id))?;

        self.trashed_orders.insert(id, order.clone());
        Ok(order)
    }

    pub fn restore_order(&self, id: Uuid) -> Result<Order, StoreError> {
        let (_, order) = self
            .trashed_orders
            .remove(&id)
            .ok_or(StoreError::OrderNotTrashed(id))?;

        self.orders.insert(id, order.clone());
        Ok(order)
    }

    /// Removes an order for good, whether live or trashed.
    pub fn purge_order(&self, id: Uuid) -> Result<Order, StoreError> {
        self.orders
            .remove(&id)
            .or_else(|| self.trashed_orders.remove(&id))
            .map(|(_, order)| order)
            .ok_or(StoreError::OrderNotFound(id))
    }

    /// The ground truth behind `Courier::current_orders`.
    pub fn active_order_count(&self, courier_id: Uuid) -> u32 {
        self.orders
            .iter()
            .filter(|entry| {
                let order = entry.value();
                order.status.is_active() && order.references(courier_id)
            })
            .count() as u32
    }

    /// Active order counts for every referenced courier, in one pass.
    pub fn active_order_counts(&self) -> HashMap<Uuid, u32> {
        let mut counts: HashMap<Uuid, u32> = HashMap::new();

        for entry in self.orders.iter() {
            let order = entry.value();
            if !order.status.is_active() {
                continue;
            }

            let mut assignees: Vec<Uuid> = order.assignee_ids().collect();
            assignees.dedup();
            for courier_id in assignees {
                *counts.entry(courier_id).or_default() += 1;
            }
        }

        counts
    }

    pub fn workload(&self, courier_id: Uuid) -> Workload {
        self.orders
            .iter()
            .fold(Workload::default(), |mut workload, entry| {
                accumulate_workload(&mut workload, entry.value(), courier_id);
                workload
            })
    }

    pub fn workloads(&self, courier_ids: &[Uuid]) -> HashMap<Uuid, Workload> {
        let mut workloads: HashMap<Uuid, Workload> = courier_ids
            .iter()
            .map(|id| (*id, Workload::default()))
            .collect();

        for entry in self.orders.iter() {
            let order = entry.value();
            for (courier_id, workload) in workloads.iter_mut() {
                accumulate_workload(workload, order, *courier_id);
            }
        }

        workloads
    }

    pub fn delivered_count(&self, courier_id: Uuid) -> u32 {
        self.orders
            .iter()
            .filter(|entry| {
                let order = entry.value();
                order.status == OrderStatus::Delivered && order.delivery_man_id == Some(courier_id)
            })
            .count() as u32
    }

    /// Reserves `order_id` for `courier_id` if, at this instant, the courier is
    /// still online and unblocked, still passes the busy and cash checks the
    /// coordinator applied to its snapshot, its live workload is below
    /// `max_total_orders`, and the order is still pending and unassigned.
    ///
    /// Check and write happen under the courier's reservation lock, so two
    /// concurrent reservations can never both pass against the same courier.
    pub fn try_reserve(
        &self,
        order_id: Uuid,
        courier_id: Uuid,
        max_total_orders: u32,
    ) -> Result<(Order, Order), StoreError> {
        let lock = self.reservation_lock(courier_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot = self.order(order_id).ok_or(StoreError::OrderNotFound(order_id))?;
        let courier = self
            .courier(courier_id)
            .ok_or(StoreError::CourierNotFound(courier_id))?;
        let unavailable = |reason: String| StoreError::CourierUnavailable { courier_id, reason };

        if courier.blocked || !courier.online {
            return Err(unavailable("courier went offline or was blocked".to_string()));
        }

        if snapshot.is_cash_on_delivery() {
            if !courier.can_accept_cash {
                return Err(unavailable("courier no longer accepts cash".to_string()));
            }
            match (courier.collected_cash(), courier.max_cash_balance) {
                (Some(collected), Some(limit)) if collected < limit => {}
                _ => return Err(unavailable("courier has no cash room left".to_string())),
            }
        }

        let active = self.active_order_count(courier_id);
        let handing_over = active == 1 && self.active_handover_order(courier_id).is_some();
        if active > 0 && !handing_over {
            return Err(unavailable(format!("courier already busy with {active} orders")));
        }

        let workload = self.workload(courier_id);
        if workload.total() >= max_total_orders {
            return Err(unavailable(format!(
                "workload {}+{} reached limit {max_total_orders}",
                workload.confirmed_active, workload.reserved_pending
            )));
        }

        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;

        if order.status != OrderStatus::Pending {
            return Err(StoreError::OrderUnavailable {
                order_id,
                reason: "order is no longer pending",
            });
        }
        if order.delivery_man_id.is_some() || order.reserved_delivery_man_id.is_some() {
            return Err(StoreError::OrderUnavailable {
                order_id,
                reason: "order already has a courier",
            });
        }

        let before = order.clone();
        order.reserved_delivery_man_id = Some(courier_id);
        order.updated_at = Utc::now();

        Ok((before, order.clone()))
    }

    fn reservation_lock(&self, courier_id: Uuid) -> Arc<Mutex<()>> {
        self.reservation_locks
            .entry(courier_id)
            .or_default()
            .value()
            .clone()
    }
}

fn accumulate_workload(workload: &mut Workload, order: &Order, courier_id: Uuid) {
    if order.delivery_man_id == Some(courier_id) {
        if order.status.is_active() {
            workload.confirmed_active += 1;
        }
    } else if order.reserved_delivery_man_id == Some(courier_id)
        && order.status == OrderStatus::Pending
    {
        workload.reserved_pending += 1;
    }
}
