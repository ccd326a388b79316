use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::engine::assignment::process_order;
use crate::engine::queue::enqueue_order;
use crate::error::AppError;
use crate::models::assignment::{AssignmentOutcome, Reservation};
use crate::models::order::{Order, OrderPatch, OrderStatus, PaymentMethod};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route(
            "/orders/:id",
            get(get_order).patch(update_order).delete(trash_order),
        )
        .route("/orders/:id/restore", post(restore_order))
        .route("/orders/:id/permanent", delete(purge_order))
        .route("/orders/:id/assign", post(assign_order))
        .route("/assignments", get(list_assignments))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub payment_method: PaymentMethod,
    pub order_amount: f64,
    pub status: Option<OrderStatus>,
    pub required_equipment: Option<String>,
    pub zone: Option<String>,
    #[serde(rename = "type")]
    pub order_type: Option<String>,
    pub delivery_address: Option<Value>,
    pub delivery_man_id: Option<Uuid>,
    pub reserved_delivery_man_id: Option<Uuid>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if !payload.order_amount.is_finite() || payload.order_amount < 0.0 {
        return Err(AppError::BadRequest(
            "order_amount must be a non-negative number".to_string(),
        ));
    }

    let mut order = Order::new(payload.payment_method, payload.order_amount);
    order.status = payload.status.unwrap_or(OrderStatus::Pending);
    order.required_equipment = payload.required_equipment;
    order.zone = payload.zone;
    order.order_type = payload.order_type;
    order.delivery_address = payload.delivery_address;
    order.delivery_man_id = payload.delivery_man_id;
    order.reserved_delivery_man_id = payload.reserved_delivery_man_id;

    let order = state.lifecycle.create(order)?;

    let awaiting_courier = order.status == OrderStatus::Pending
        && order.delivery_man_id.is_none()
        && order.reserved_delivery_man_id.is_none();
    if awaiting_courier {
        enqueue_order(&state, order.id).await?;
    }

    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .store
        .order(id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;

    Ok(Json(order))
}

async fn update_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<Order>, AppError> {
    if patch.is_empty() {
        return Err(AppError::BadRequest("nothing to update".to_string()));
    }

    Ok(Json(state.lifecycle.update(id, &patch)?))
}

async fn trash_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.lifecycle.trash(id)?))
}

async fn restore_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.lifecycle.restore(id)?))
}

async fn purge_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.lifecycle.purge(id)?))
}

async fn assign_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssignmentOutcome>, AppError> {
    if state.store.order(id).is_none() {
        return Err(AppError::NotFound(format!("order {} not found", id)));
    }

    Ok(Json(process_order(&state, id).await))
}

async fn list_assignments(State(state): State<Arc<AppState>>) -> Json<Vec<Reservation>> {
    let mut reservations: Vec<Reservation> = state
        .reservations
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    reservations.sort_by_key(|reservation| reservation.reserved_at);

    Json(reservations)
}
