use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Config(msg) | AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("courier {0} not found")]
    CourierNotFound(Uuid),

    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    #[error("order {0} is not in the trash")]
    OrderNotTrashed(Uuid),

    #[error("order {0} already exists")]
    DuplicateOrder(Uuid),

    #[error("order {order_id} cannot be reserved: {reason}")]
    OrderUnavailable { order_id: Uuid, reason: &'static str },

    #[error("courier {courier_id} cannot take order: {reason}")]
    CourierUnavailable { courier_id: Uuid, reason: String },
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CourierNotFound(_)
            | StoreError::OrderNotFound(_)
            | StoreError::OrderNotTrashed(_) => AppError::NotFound(err.to_string()),
            StoreError::DuplicateOrder(_)
            | StoreError::OrderUnavailable { .. }
            | StoreError::CourierUnavailable { .. } => AppError::Conflict(err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing service is not configured")]
    NotConfigured,

    #[error("at least two waypoints are required, got {0}")]
    TooFewWaypoints(usize),

    #[error("routing request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("routing service responded with status {0}")]
    Status(reqwest::StatusCode),

    #[error("routing response contained no route")]
    NoRoute,

    #[error("routing response contained an invalid value: {0}")]
    InvalidRoute(String),
}
