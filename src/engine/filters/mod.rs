mod basic;
mod cash;
mod equipment;
mod experience;
mod high_value;
mod quality;
mod workload;

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::AssignmentConfig;
use crate::models::courier::{candidate_ids, Candidate};
use crate::models::order::Order;
use crate::store::Workload;

pub use basic::BasicEligibility;
pub use cash::CashCapacity;
pub use equipment::EquipmentFilter;
pub use experience::ExperienceFilter;
pub use high_value::HighValueOrderFilter;
pub use quality::{CancellationFilter, RatingFilter, SuccessRateFilter};
pub use workload::WorkloadCapacity;

/// Read-only data gathered once per assignment run.
#[derive(Debug, Default)]
pub struct StageContext {
    pub workloads: HashMap<Uuid, Workload>,
}

impl StageContext {
    pub fn new(workloads: HashMap<Uuid, Workload>) -> Self {
        Self { workloads }
    }

    pub fn workload(&self, courier_id: Uuid) -> Workload {
        self.workloads.get(&courier_id).copied().unwrap_or_default()
    }
}

pub trait EligibilityStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the subset of `candidates` eligible for `order`.
    fn apply(
        &self,
        candidates: Vec<Candidate>,
        order: &Order,
        ctx: &StageContext,
    ) -> Vec<Candidate>;
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: &'static str,
    pub received: usize,
    pub retained: usize,
}

impl StageReport {
    pub fn rejected(&self) -> usize {
        self.received.saturating_sub(self.retained)
    }
}

#[derive(Debug)]
pub struct PipelineRun {
    pub survivors: Vec<Candidate>,
    pub stages: Vec<StageReport>,
}

pub struct EligibilityPipeline {
    stages: Vec<Box<dyn EligibilityStage>>,
}

impl EligibilityPipeline {
    pub fn new(stages: Vec<Box<dyn EligibilityStage>>) -> Self {
        Self { stages }
    }

    /// Cheap record checks first, order-store backed and threshold checks after.
    pub fn standard(config: &AssignmentConfig) -> Self {
        Self::new(vec![
            Box::new(BasicEligibility),
            Box::new(CashCapacity),
            Box::new(WorkloadCapacity::new(config.max_total_orders)),
            Box::new(RatingFilter::new(config.min_rating)),
            Box::new(SuccessRateFilter::new(config.min_success_rate)),
            Box::new(CancellationFilter::new(config.max_recent_cancellations)),
            Box::new(EquipmentFilter),
            Box::new(ExperienceFilter),
            Box::new(HighValueOrderFilter::new(config.high_value_threshold)),
        ])
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Runs every stage in order. Stops early once nothing survives, which
    /// cannot change the outcome since stages only ever remove candidates.
    pub fn run(
        &self,
        candidates: Vec<Candidate>,
        order: &Order,
        ctx: &StageContext,
    ) -> PipelineRun {
        let mut survivors = candidates;
        let mut stages = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            if survivors.is_empty() {
                break;
            }

            let received = survivors.len();
            survivors = stage.apply(survivors, order, ctx);

            info!(
                order_id = %order.id,
                stage = stage.name(),
                received,
                retained = survivors.len(),
                remaining = ?candidate_ids(&survivors),
                "eligibility stage applied"
            );

            stages.push(StageReport {
                stage: stage.name(),
                received,
                retained: survivors.len(),
            });
        }

        PipelineRun { survivors, stages }
    }
}

/// Keeps candidates for which `check` returns `Ok`, logging every rejection.
pub(crate) fn retain_eligible<F>(
    stage: &'static str,
    candidates: Vec<Candidate>,
    order: &Order,
    check: F,
) -> Vec<Candidate>
where
    F: Fn(&Candidate) -> Result<(), String>,
{
    candidates
        .into_iter()
        .filter(|candidate| match check(candidate) {
            Ok(()) => true,
            Err(reason) => {
                info!(
                    order_id = %order.id,
                    courier_id = %candidate.id(),
                    stage,
                    reason = %reason,
                    "candidate rejected"
                );
                false
            }
        })
        .collect()
}
