use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    Directions,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteEstimate {
    pub duration_seconds: f64,
    pub distance_meters: f64,
}

#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub eta_seconds: f64,
    pub distance_meters: f64,
    pub source: RouteSource,
}

/// A tentative assignment awaiting courier confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub order_id: Uuid,
    pub courier_id: Uuid,
    pub eta_seconds: f64,
    pub distance_meters: f64,
    pub source: RouteSource,
    pub reserved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    OrderNotFound,
    OrderNotPending,
    AlreadyReserved,
    NoEligibleCouriers,
    NoRankedCouriers,
    ReservationConflict,
    PersistenceFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssignmentOutcome {
    Reserved(Reservation),
    Unassigned { reason: UnassignedReason },
}

impl AssignmentOutcome {
    pub fn unassigned(reason: UnassignedReason) -> Self {
        Self::Unassigned { reason }
    }

    pub fn reservation(&self) -> Option<&Reservation> {
        match self {
            AssignmentOutcome::Reserved(reservation) => Some(reservation),
            AssignmentOutcome::Unassigned { .. } => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssignmentOutcome::Reserved(_) => "reserved",
            AssignmentOutcome::Unassigned { .. } => "unassigned",
        }
    }
}
