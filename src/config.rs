use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub order_queue_size: usize,
    pub event_buffer_size: usize,
    pub assignment: AssignmentConfig,
    pub routing: RoutingConfig,
}

/// Thresholds consulted by the filter stages, the ranker and the cash policy.
#[derive(Debug, Clone)]
pub struct AssignmentConfig {
    pub max_total_orders: u32,
    pub min_rating: f64,
    pub min_success_rate: f64,
    pub max_recent_cancellations: u32,
    pub high_value_threshold: f64,
    pub cash_delivery_threshold: u32,
    pub max_cash_balance_global: f64,
    pub fallback_speed_kmh: f64,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            max_total_orders: 2,
            min_rating: 4.0,
            min_success_rate: 0.85,
            max_recent_cancellations: 3,
            high_value_threshold: 1000.0,
            cash_delivery_threshold: 10,
            max_cash_balance_global: 1000.0,
            fallback_speed_kmh: 30.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub base_url: String,
    pub profile: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mapbox.com".to_string(),
            profile: "mapbox/driving".to_string(),
            access_token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            order_queue_size: 1024,
            event_buffer_size: 1024,
            assignment: AssignmentConfig::default(),
            routing: RoutingConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let defaults = AssignmentConfig::default();
        let assignment = AssignmentConfig {
            max_total_orders: parse_or_default("MAX_TOTAL_ORDERS", defaults.max_total_orders)?,
            min_rating: parse_or_default("MIN_RATING", defaults.min_rating)?,
            min_success_rate: parse_or_default("MIN_SUCCESS_RATE", defaults.min_success_rate)?,
            max_recent_cancellations: parse_or_default(
                "MAX_RECENT_CANCELLATIONS",
                defaults.max_recent_cancellations,
            )?,
            high_value_threshold: parse_or_default(
                "HIGH_VALUE_ORDER_THRESHOLD",
                defaults.high_value_threshold,
            )?,
            cash_delivery_threshold: parse_or_default(
                "CASH_DELIVERY_THRESHOLD",
                defaults.cash_delivery_threshold,
            )?,
            max_cash_balance_global: parse_or_default(
                "MAX_CASH_BALANCE_GLOBAL",
                defaults.max_cash_balance_global,
            )?,
            fallback_speed_kmh: parse_or_default(
                "FALLBACK_SPEED_KMH",
                defaults.fallback_speed_kmh,
            )?,
        };

        if assignment.fallback_speed_kmh <= 0.0 {
            return Err(AppError::Config(
                "FALLBACK_SPEED_KMH must be positive".to_string(),
            ));
        }

        let routing_defaults = RoutingConfig::default();
        let routing = RoutingConfig {
            base_url: env::var("ROUTING_BASE_URL").unwrap_or(routing_defaults.base_url),
            profile: env::var("ROUTING_PROFILE").unwrap_or(routing_defaults.profile),
            access_token: env::var("ROUTING_ACCESS_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            timeout: Duration::from_secs(parse_or_default("ROUTING_TIMEOUT_SECS", 10u64)?),
        };

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") | Err(_) => LogFormat::Compact,
            Ok(other) => {
                return Err(AppError::Config(format!(
                    "invalid LOG_FORMAT: {other}, expected compact or json"
                )));
            }
        };

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format,
            order_queue_size: parse_or_default("ORDER_QUEUE_SIZE", 1024)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            assignment,
            routing,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Config(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
