use crate::config::AssignmentConfig;
use crate::models::courier::Courier;

const FIRST_TIER_LIMIT: f64 = 350.0;
const SECOND_TIER_LIMIT: f64 = 500.0;
const THIRD_TIER_LIMIT: f64 = 850.0;
const TOP_TIER_LIMIT: f64 = 1000.0;

const SECOND_TIER_MAX_DELIVERIES: u32 = 25;
const THIRD_TIER_MAX_DELIVERIES: u32 = 55;

/// How much cash a courier may carry, grown with their delivery record.
#[derive(Debug, Clone, Copy)]
pub struct CashPolicy {
    delivery_threshold: u32,
    global_max: f64,
}

impl CashPolicy {
    pub fn new(delivery_threshold: u32, global_max: f64) -> Self {
        Self {
            delivery_threshold,
            global_max,
        }
    }

    pub fn from_config(config: &AssignmentConfig) -> Self {
        Self::new(config.cash_delivery_threshold, config.max_cash_balance_global)
    }

    pub fn cash_limit(&self, successful_deliveries: u32) -> f64 {
        let tier = if successful_deliveries < self.delivery_threshold {
            0.0
        } else if successful_deliveries == self.delivery_threshold {
            FIRST_TIER_LIMIT
        } else if successful_deliveries <= SECOND_TIER_MAX_DELIVERIES {
            SECOND_TIER_LIMIT
        } else if successful_deliveries <= THIRD_TIER_MAX_DELIVERIES {
            THIRD_TIER_LIMIT
        } else {
            TOP_TIER_LIMIT
        };

        tier.min(self.global_max)
    }

    /// Recomputes the cash cap and grants the cash capability once the
    /// delivery threshold is first reached. Never revokes the capability.
    /// Returns true when the capability was granted by this call.
    pub fn refresh(&self, courier: &mut Courier, successful_deliveries: u32) -> bool {
        courier.max_cash_balance = Some(self.cash_limit(successful_deliveries));

        if !courier.can_accept_cash && successful_deliveries >= self.delivery_threshold {
            courier.can_accept_cash = true;
            return true;
        }

        false
    }
}
