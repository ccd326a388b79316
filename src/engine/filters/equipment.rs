use super::{retain_eligible, EligibilityStage, StageContext};
use crate::models::courier::Candidate;
use crate::models::order::Order;

pub struct EquipmentFilter;

impl EligibilityStage for EquipmentFilter {
    fn name(&self) -> &'static str {
        "equipment"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        order: &Order,
        _ctx: &StageContext,
    ) -> Vec<Candidate> {
        let Some(required) = order
            .required_equipment
            .as_deref()
            .filter(|required| !required.trim().is_empty())
        else {
            return candidates;
        };

        retain_eligible(self.name(), candidates, order, |candidate| {
            if candidate.courier.equipment.iter().any(|item| item == required) {
                Ok(())
            } else {
                Err(format!("missing required equipment {required}"))
            }
        })
    }
}
