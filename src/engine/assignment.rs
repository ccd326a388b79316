use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::assignment::AssignmentOutcome;
use crate::state::AppState;

/// Drains the order queue, running one assignment per order id. Orders left
/// unassigned are not requeued; they stay pending for a later trigger.
pub async fn run_assignment_engine(state: Arc<AppState>, mut order_rx: mpsc::Receiver<Uuid>) {
    info!("assignment engine started");

    while let Some(order_id) = order_rx.recv().await {
        state.metrics.orders_in_queue.dec();
        process_order(&state, order_id).await;
    }

    warn!("assignment engine stopped: queue channel closed");
}

/// Runs the coordinator for one order, then records and publishes the
/// reservation if one was made.
pub async fn process_order(state: &AppState, order_id: Uuid) -> AssignmentOutcome {
    let start = Instant::now();
    let outcome = state.coordinator.assign(order_id).await;

    state
        .metrics
        .observe_assignment(outcome.label(), start.elapsed().as_secs_f64());

    match &outcome {
        AssignmentOutcome::Reserved(reservation) => {
            state
                .reservations
                .insert(reservation.id, reservation.clone());
            let _ = state.assignment_events_tx.send(reservation.clone());
        }
        AssignmentOutcome::Unassigned { reason } => {
            info!(%order_id, ?reason, "order left unassigned");
        }
    }

    outcome
}
