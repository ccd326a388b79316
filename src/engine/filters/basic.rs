use super::{retain_eligible, EligibilityStage, StageContext};
use crate::models::courier::Candidate;
use crate::models::order::Order;

/// Drops blocked and offline couriers, and couriers without the cash
/// capability when the order is paid on delivery.
pub struct BasicEligibility;

impl EligibilityStage for BasicEligibility {
    fn name(&self) -> &'static str {
        "basic_eligibility"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        order: &Order,
        _ctx: &StageContext,
    ) -> Vec<Candidate> {
        let cash_order = order.is_cash_on_delivery();

        retain_eligible(self.name(), candidates, order, |candidate| {
            let courier = &candidate.courier;
            if courier.blocked {
                return Err("courier is blocked".to_string());
            }
            if !courier.online {
                return Err("courier is offline".to_string());
            }
            if cash_order && !courier.can_accept_cash {
                return Err("courier cannot accept cash on delivery".to_string());
            }
            Ok(())
        })
    }
}
