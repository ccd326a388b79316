use super::{retain_eligible, EligibilityStage, StageContext};
use crate::models::courier::Candidate;
use crate::models::order::Order;

pub struct HighValueOrderFilter {
    threshold: f64,
}

impl HighValueOrderFilter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl EligibilityStage for HighValueOrderFilter {
    fn name(&self) -> &'static str {
        "high_value_order"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        order: &Order,
        _ctx: &StageContext,
    ) -> Vec<Candidate> {
        if order.order_amount <= self.threshold {
            return candidates;
        }

        retain_eligible(self.name(), candidates, order, |candidate| {
            if candidate.courier.can_handle_high_value {
                Ok(())
            } else {
                Err(format!(
                    "order amount {:.2} above {:.2} needs a high-value courier",
                    order.order_amount, self.threshold
                ))
            }
        })
    }
}
