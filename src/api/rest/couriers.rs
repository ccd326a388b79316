use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::courier::{Courier, GeoPoint, LocationFix, Wallet};
use crate::state::AppState;
use crate::store::Workload;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(create_courier).get(list_couriers))
        .route("/couriers/:id", get(get_courier))
        .route("/couriers/:id/status", patch(update_courier_status))
        .route("/couriers/:id/location", patch(update_courier_location))
        .route("/couriers/:id/wallet", patch(update_courier_wallet))
}

#[derive(Deserialize)]
pub struct CreateCourierRequest {
    pub name: String,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub can_accept_cash: bool,
    pub max_cash_balance: Option<f64>,
    pub collected_cash: Option<f64>,
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
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub online: Option<bool>,
    pub blocked: Option<bool>,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
    pub recorded_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct UpdateWalletRequest {
    pub collected_cash: f64,
}

#[derive(Serialize)]
pub struct CourierDetail {
    #[serde(flatten)]
    pub courier: Courier,
    pub workload: Workload,
    pub last_fix: Option<LocationFix>,
    pub active_handover_order_id: Option<Uuid>,
}

async fn create_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if let Some(cash) = payload.collected_cash {
        validate_cash(cash)?;
    }

    let mut courier = Courier::new(payload.name);
    courier.online = payload.online;
    courier.can_accept_cash = payload.can_accept_cash;
    courier.max_cash_balance = payload.max_cash_balance;
    courier.wallet = payload
        .collected_cash
        .map(|collected_cash| Wallet { collected_cash });
    courier.home_location = payload.home_location;
    courier.rating = payload.rating.map(|rating| rating.clamp(0.0, 5.0));
    courier.success_rate = payload.success_rate.map(|rate| rate.clamp(0.0, 1.0));
    courier.recent_cancellations = payload.recent_cancellations;
    courier.equipment = payload.equipment;
    courier.zone_experience = payload.zone_experience;
    courier.type_experience = payload.type_experience;
    courier.can_handle_high_value = payload.can_handle_high_value;

    Ok(Json(state.store.insert_courier(courier)))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<Courier>> {
    Json(state.store.couriers())
}

async fn get_courier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CourierDetail>, AppError> {
    let courier = state
        .store
        .courier(id)
        .ok_or_else(|| AppError::NotFound(format!("courier {} not found", id)))?;

    Ok(Json(CourierDetail {
        workload: state.store.workload(id),
        last_fix: state.store.last_fix(id),
        active_handover_order_id: state.store.active_handover_order(id).map(|order| order.id),
        courier,
    }))
}

async fn update_courier_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Courier>, AppError> {
    if payload.online.is_none() && payload.blocked.is_none() {
        return Err(AppError::BadRequest(
            "expected at least one of online, blocked".to_string(),
        ));
    }

    let courier = state.store.update_courier(id, |courier| {
        if let Some(online) = payload.online {
            courier.online = online;
        }
        if let Some(blocked) = payload.blocked {
            courier.blocked = blocked;
        }
    })?;

    Ok(Json(courier))
}

async fn update_courier_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<LocationFix>, AppError> {
    if !payload.location.is_usable() {
        return Err(AppError::BadRequest(
            "location must have finite, non-zero coordinates".to_string(),
        ));
    }

    let recorded_at = payload.recorded_at.unwrap_or_else(Utc::now);
    let fix = state.store.record_location(id, payload.location, recorded_at)?;
    state.store.publish_live_location(id, fix)?;

    Ok(Json(fix))
}

async fn update_courier_wallet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWalletRequest>,
) -> Result<Json<Courier>, AppError> {
    validate_cash(payload.collected_cash)?;

    let courier = state.store.update_courier(id, |courier| {
        courier.wallet = Some(Wallet {
            collected_cash: payload.collected_cash,
        });
    })?;

    Ok(Json(courier))
}

fn validate_cash(amount: f64) -> Result<(), AppError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "collected_cash must be a non-negative number".to_string(),
        ))
    }
}
