use super::{retain_eligible, EligibilityStage, StageContext};
use crate::models::courier::Candidate;
use crate::models::order::Order;

/// Caps confirmed active orders plus pending reservations per courier.
pub struct WorkloadCapacity {
    max_total_orders: u32,
}

impl WorkloadCapacity {
    pub fn new(max_total_orders: u32) -> Self {
        Self { max_total_orders }
    }
}

impl EligibilityStage for WorkloadCapacity {
    fn name(&self) -> &'static str {
        "workload_capacity"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        order: &Order,
        ctx: &StageContext,
    ) -> Vec<Candidate> {
        retain_eligible(self.name(), candidates, order, |candidate| {
            let workload = ctx.workload(candidate.id());
            if workload.total() >= self.max_total_orders {
                return Err(format!(
                    "workload {}+{}={} reached limit {}",
                    workload.confirmed_active,
                    workload.reserved_pending,
                    workload.total(),
                    self.max_total_orders
                ));
            }
            Ok(())
        })
    }
}
