use super::{retain_eligible, EligibilityStage, StageContext};
use crate::models::courier::Candidate;
use crate::models::order::Order;

/// For cash-on-delivery orders, keeps couriers still below their cash cap.
/// Missing wallet or missing cap excludes the courier.
pub struct CashCapacity;

impl EligibilityStage for CashCapacity {
    fn name(&self) -> &'static str {
        "cash_capacity"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        order: &Order,
        _ctx: &StageContext,
    ) -> Vec<Candidate> {
        if !order.is_cash_on_delivery() {
            return candidates;
        }

        retain_eligible(self.name(), candidates, order, |candidate| {
            let courier = &candidate.courier;
            match (courier.collected_cash(), courier.max_cash_balance) {
                (Some(collected), Some(limit)) if collected < limit => Ok(()),
                (Some(collected), Some(limit)) => Err(format!(
                    "collected cash {collected:.2} reached limit {limit:.2}"
                )),
                _ => Err("missing collected cash or cash limit".to_string()),
            }
        })
    }
}
