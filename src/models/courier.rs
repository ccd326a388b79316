use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::Order;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Rejects missing-data sentinels: non-finite values and zeroed axes.
    pub fn is_usable(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && self.lat != 0.0 && self.lng != 0.0
    }
}

/// A timestamped position reported by a courier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub point: GeoPoint,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub collected_cash: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub blocked: bool,
    pub online: bool,
    pub can_accept_cash: bool,
    pub max_cash_balance: Option<f64>,
    pub wallet: Option<Wallet>,
    /// Denormalized count of active orders naming this courier as assignee or reservee.
    pub current_orders: u32,
    /// Static coordinates on the courier record, used when no fix exists.
    pub home_location: Option<GeoPoint>,
    pub rating: Option<f64>,
    pub success_rate: Option<f64>,
    pub recent_cancellations: Option<u32>,
    #[serde(default)]
    pub equipment: Vec<String>,
    pub zone_experience: Option<Vec<String>>,
    pub type_experience: Option<Vec<String>>,
    #[serde(default)]
    pub can_handle_high_value: bool,
    pub updated_at: DateTime<Utc>,
}

impl Courier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            blocked: false,
            online: false,
            can_accept_cash: false,
            max_cash_balance: None,
            wallet: None,
            current_orders: 0,
            home_location: None,
            rating: None,
            success_rate: None,
            recent_cancellations: None,
            equipment: Vec::new(),
            zone_experience: None,
            type_experience: None,
            can_handle_high_value: false,
            updated_at: Utc::now(),
        }
    }

    pub fn collected_cash(&self) -> Option<f64> {
        self.wallet.as_ref().map(|wallet| wallet.collected_cash)
    }
}

/// A courier as seen by one assignment run, with the associations the
/// filters and the ranker need already resolved.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub courier: Courier,
    pub active_handover: Option<Order>,
    pub last_fix: Option<LocationFix>,
    pub live_fix: Option<LocationFix>,
}

impl Candidate {
    pub fn id(&self) -> Uuid {
        self.courier.id
    }
}

pub fn candidate_ids(candidates: &[Candidate]) -> Vec<Uuid> {
    candidates.iter().map(Candidate::id).collect()
}
