use super::{retain_eligible, EligibilityStage, StageContext};
use crate::models::courier::Candidate;
use crate::models::order::Order;

/// Zone and order-type experience. Applies only when the order carries both;
/// a courier with no recorded experience set for a dimension passes it.
pub struct ExperienceFilter;

impl EligibilityStage for ExperienceFilter {
    fn name(&self) -> &'static str {
        "experience"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        order: &Order,
        _ctx: &StageContext,
    ) -> Vec<Candidate> {
        let (Some(zone), Some(order_type)) = (order.zone.as_deref(), order.order_type.as_deref())
        else {
            return candidates;
        };

        retain_eligible(self.name(), candidates, order, |candidate| {
            let courier = &candidate.courier;
            if !knows(courier.zone_experience.as_deref(), zone) {
                return Err(format!("no experience in zone {zone}"));
            }
            if !knows(courier.type_experience.as_deref(), order_type) {
                return Err(format!("no experience with {order_type} orders"));
            }
            Ok(())
        })
    }
}

fn knows(experience: Option<&[String]>, value: &str) -> bool {
    experience.is_none_or(|known| known.iter().any(|item| item == value))
}
