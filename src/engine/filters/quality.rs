use super::{retain_eligible, EligibilityStage, StageContext};
use crate::models::courier::Candidate;
use crate::models::order::Order;

pub struct RatingFilter {
    min_rating: f64,
}

impl RatingFilter {
    pub fn new(min_rating: f64) -> Self {
        Self { min_rating }
    }
}

impl EligibilityStage for RatingFilter {
    fn name(&self) -> &'static str {
        "rating"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        order: &Order,
        _ctx: &StageContext,
    ) -> Vec<Candidate> {
        retain_eligible(self.name(), candidates, order, |candidate| {
            match candidate.courier.rating {
                Some(rating) if rating < self.min_rating => Err(format!(
                    "rating {rating:.2} below minimum {:.2}",
                    self.min_rating
                )),
                _ => Ok(()),
            }
        })
    }
}

pub struct SuccessRateFilter {
    min_success_rate: f64,
}

impl SuccessRateFilter {
    pub fn new(min_success_rate: f64) -> Self {
        Self { min_success_rate }
    }
}

impl EligibilityStage for SuccessRateFilter {
    fn name(&self) -> &'static str {
        "success_rate"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        order: &Order,
        _ctx: &StageContext,
    ) -> Vec<Candidate> {
        retain_eligible(self.name(), candidates, order, |candidate| {
            match candidate.courier.success_rate {
                Some(rate) if rate < self.min_success_rate => Err(format!(
                    "success rate {rate:.2} below minimum {:.2}",
                    self.min_success_rate
                )),
                _ => Ok(()),
            }
        })
    }
}

pub struct CancellationFilter {
    max_recent_cancellations: u32,
}

impl CancellationFilter {
    pub fn new(max_recent_cancellations: u32) -> Self {
        Self {
            max_recent_cancellations,
        }
    }
}

impl EligibilityStage for CancellationFilter {
    fn name(&self) -> &'static str {
        "cancellations"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        order: &Order,
        _ctx: &StageContext,
    ) -> Vec<Candidate> {
        retain_eligible(self.name(), candidates, order, |candidate| {
            match candidate.courier.recent_cancellations {
                Some(count) if count > self.max_recent_cancellations => Err(format!(
                    "{count} recent cancellations exceed {}",
                    self.max_recent_cancellations
                )),
                _ => Ok(()),
            }
        })
    }
}
