use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::cash_policy::CashPolicy;
use crate::error::StoreError;
use crate::models::courier::Courier;
use crate::models::order::{Order, OrderStatus};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    Created,
    Updated,
    Deleted,
    Restored,
    ForceDeleted,
}

/// An order lifecycle change, carrying the order before and after it.
#[derive(Debug, Clone)]
pub struct OrderEvent {
    pub kind: OrderEventKind,
    pub before: Option<Order>,
    pub after: Option<Order>,
}

impl OrderEvent {
    pub fn created(order: Order) -> Self {
        Self {
            kind: OrderEventKind::Created,
            before: None,
            after: Some(order),
        }
    }

    pub fn updated(before: Order, after: Order) -> Self {
        Self {
            kind: OrderEventKind::Updated,
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(order: Order) -> Self {
        Self {
            kind: OrderEventKind::Deleted,
            before: Some(order),
            after: None,
        }
    }

    pub fn restored(order: Order) -> Self {
        Self {
            kind: OrderEventKind::Restored,
            before: None,
            after: Some(order),
        }
    }

    pub fn force_deleted(order: Order) -> Self {
        Self {
            kind: OrderEventKind::ForceDeleted,
            before: Some(order),
            after: None,
        }
    }

    fn order_id(&self) -> Option<Uuid> {
        self.after.as_ref().or(self.before.as_ref()).map(|order| order.id)
    }

    /// Every courier named by the old or the new assignee fields.
    fn affected_couriers(&self) -> BTreeSet<Uuid> {
        self.before
            .iter()
            .chain(self.after.iter())
            .flat_map(Order::assignee_ids)
            .collect()
    }

    fn delivered_courier(&self) -> Option<Uuid> {
        let was_delivered = self
            .before
            .as_ref()
            .is_some_and(|order| order.status == OrderStatus::Delivered);
        let after = self.after.as_ref()?;

        if self.kind == OrderEventKind::Updated
            && !was_delivered
            && after.status == OrderStatus::Delivered
        {
            after.delivery_man_id
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadMismatch {
    pub courier_id: Uuid,
    pub stored: u32,
    pub actual: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub checked_at: DateTime<Utc>,
    pub couriers_checked: usize,
    pub dry_run: bool,
    pub mismatches: Vec<WorkloadMismatch>,
    pub fixed: usize,
}

impl ReconciliationReport {
    pub fn has_mismatches(&self) -> bool {
        !self.mismatches.is_empty()
    }
}

pub struct LoadReconciler {
    store: Arc<Store>,
    cash_policy: CashPolicy,
}

impl LoadReconciler {
    pub fn new(store: Arc<Store>, cash_policy: CashPolicy) -> Self {
        Self { store, cash_policy }
    }

    /// Event path: recomputes the counter of every courier the change touched
    /// and, on a transition into `delivered`, the courier's cash capacity.
    pub fn handle(&self, event: &OrderEvent) {
        let order_id = event.order_id();

        for courier_id in event.affected_couriers() {
            if let Err(err) = self.recompute(courier_id) {
                error!(
                    order_id = ?order_id,
                    %courier_id,
                    error = %err,
                    "failed to sync courier workload"
                );
            }
        }

        if let Some(courier_id) = event.delivered_courier() {
            if let Err(err) = self.refresh_cash_capacity(courier_id) {
                error!(
                    order_id = ?order_id,
                    %courier_id,
                    error = %err,
                    "failed to refresh cash capacity"
                );
            }
        }
    }

    /// Sets the courier's counter from the order store and returns it.
    pub fn recompute(&self, courier_id: Uuid) -> Result<u32, StoreError> {
        // Counted under the courier's entry lock so the last writer saw the latest orders.
        let courier = self.store.update_courier(courier_id, |courier| {
            courier.current_orders = self.store.active_order_count(courier_id);
        })?;

        info!(%courier_id, current_orders = courier.current_orders, "courier workload synced");
        Ok(courier.current_orders)
    }

    pub fn refresh_cash_capacity(&self, courier_id: Uuid) -> Result<Courier, StoreError> {
        let mut delivered = 0;
        let mut granted = false;
        let courier = self.store.update_courier(courier_id, |courier| {
            delivered = self.store.delivered_count(courier_id);
            granted = self.cash_policy.refresh(courier, delivered);
        })?;

        info!(
            %courier_id,
            delivered,
            max_cash_balance = ?courier.max_cash_balance,
            can_accept_cash = courier.can_accept_cash,
            "cash capacity refreshed"
        );
        if granted {
            info!(%courier_id, delivered, "courier may now accept cash on delivery");
        }

        Ok(courier)
    }

    /// Couriers whose stored counter disagrees with the order store.
    pub fn audit(&self) -> Vec<WorkloadMismatch> {
        let actual_counts = self.store.active_order_counts();

        self.store
            .couriers()
            .into_iter()
            .filter_map(|courier| {
                let actual = actual_counts.get(&courier.id).copied().unwrap_or(0);
                (courier.current_orders != actual).then_some(WorkloadMismatch {
                    courier_id: courier.id,
                    stored: courier.current_orders,
                    actual,
                })
            })
            .collect()
    }

    pub fn drift_count(&self) -> usize {
        self.audit().len()
    }

    /// Batch path. With `dry_run` the store is left untouched.
    pub fn sweep(&self, dry_run: bool) -> ReconciliationReport {
        let couriers_checked = self.store.courier_count();
        let mismatches = self.audit();

        for mismatch in &mismatches {
            warn!(
                courier_id = %mismatch.courier_id,
                stored = mismatch.stored,
                actual = mismatch.actual,
                dry_run,
                "courier workload drift"
            );
        }

        let fixed = if dry_run {
            0
        } else {
            mismatches
                .iter()
                .filter(|mismatch| match self.recompute(mismatch.courier_id) {
                    Ok(_) => true,
                    Err(err) => {
                        error!(
                            courier_id = %mismatch.courier_id,
                            error = %err,
                            "failed to fix courier workload"
                        );
                        false
                    }
                })
                .count()
        };

        info!(
            couriers_checked,
            mismatches = mismatches.len(),
            fixed,
            dry_run,
            "workload reconciliation finished"
        );

        ReconciliationReport {
            checked_at: Utc::now(),
            couriers_checked,
            dry_run,
            mismatches,
            fixed,
        }
    }
}
