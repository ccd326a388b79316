use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::cash_policy::CashPolicy;
use crate::engine::coordinator::AssignmentCoordinator;
use crate::engine::filters::EligibilityPipeline;
use crate::engine::lifecycle::OrderLifecycle;
use crate::engine::ranking::EtaRanker;
use crate::engine::reconciler::LoadReconciler;
use crate::models::assignment::Reservation;
use crate::observability::metrics::Metrics;
use crate::routing::RouteProvider;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<Store>,
    pub reconciler: Arc<LoadReconciler>,
    pub lifecycle: OrderLifecycle,
    pub coordinator: AssignmentCoordinator,
    pub reservations: DashMap<Uuid, Reservation>,
    pub order_tx: mpsc::Sender<Uuid>,
    pub assignment_events_tx: broadcast::Sender<Reservation>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config, routes: Arc<dyn RouteProvider>) -> (Self, mpsc::Receiver<Uuid>) {
        let (order_tx, order_rx) = mpsc::channel(config.order_queue_size);
        let (assignment_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        let metrics = Metrics::new();
        let store = Arc::new(Store::new());
        let reconciler = Arc::new(LoadReconciler::new(
            store.clone(),
            CashPolicy::from_config(&config.assignment),
        ));
        let ranker = EtaRanker::new(
            routes,
            config.routing.timeout,
            config.assignment.fallback_speed_kmh,
        );
        let coordinator = AssignmentCoordinator::new(
            store.clone(),
            reconciler.clone(),
            EligibilityPipeline::standard(&config.assignment),
            ranker,
            config.assignment.clone(),
            metrics.clone(),
        );

        (
            Self {
                lifecycle: OrderLifecycle::new(store.clone(), reconciler.clone()),
                store,
                reconciler,
                coordinator,
                reservations: DashMap::new(),
                order_tx,
                assignment_events_tx,
                metrics,
            },
            order_rx,
        )
    }
}
