use std::collections::HashMap;

use uuid::Uuid;

use super::Store;
use crate::models::courier::Candidate;
use crate::models::order::{Order, OrderStatus};

impl Store {
    /// Every known courier, online or not, with wallet, active handover order
    /// and latest location fixes attached. No eligibility filtering happens here.
    pub fn load_candidate_pool(&self) -> Vec<Candidate> {
        let handovers = self.active_handover_orders();

        self.couriers()
            .into_iter()
            .map(|courier| {
                let id = courier.id;
                Candidate {
                    active_handover: handovers.get(&id).cloned(),
                    last_fix: self.last_fix(id),
                    live_fix: self.live_fix(id),
                    courier,
                }
            })
            .collect()
    }

    /// The most recently updated order the courier is carrying to its drop-off.
    pub fn active_handover_order(&self, courier_id: Uuid) -> Option<Order> {
        self.active_handover_orders().remove(&courier_id)
    }

    fn active_handover_orders(&self) -> HashMap<Uuid, Order> {
        let mut latest: HashMap<Uuid, Order> = HashMap::new();

        for entry in self.orders.iter() {
            let order = entry.value();
            let Some(courier_id) = order.delivery_man_id else {
                continue;
            };
            if order.status != OrderStatus::Handover {
                continue;
            }

            let newer = latest
                .get(&courier_id)
                .is_none_or(|current| order.updated_at > current.updated_at);
            if newer {
                latest.insert(courier_id, order.clone());
            }
        }

        latest
    }
}
