use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AssignmentConfig;
use crate::engine::filters::{EligibilityPipeline, StageContext};
use crate::engine::ranking::EtaRanker;
use crate::engine::reconciler::{LoadReconciler, OrderEvent};
use crate::error::StoreError;
use crate::models::assignment::{
    AssignmentOutcome, RankedCandidate, Reservation, RouteSource, UnassignedReason,
};
use crate::models::courier::{candidate_ids, Candidate};
use crate::models::order::{Order, OrderStatus};
use crate::observability::metrics::Metrics;
use crate::store::Store;

pub struct AssignmentCoordinator {
    store: Arc<Store>,
    reconciler: Arc<LoadReconciler>,
    pipeline: EligibilityPipeline,
    ranker: EtaRanker,
    config: AssignmentConfig,
    metrics: Metrics,
}

impl AssignmentCoordinator {
    pub fn new(
        store: Arc<Store>,
        reconciler: Arc<LoadReconciler>,
        pipeline: EligibilityPipeline,
        ranker: EtaRanker,
        config: AssignmentConfig,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            reconciler,
            pipeline,
            ranker,
            config,
            metrics,
        }
    }

    /// Tries to reserve the best available courier for `order_id`. An empty
    /// pool at any step is an ordinary `Unassigned` outcome.
    pub async fn assign(&self, order_id: Uuid) -> AssignmentOutcome {
        let Some(order) = self.store.order(order_id) else {
            warn!(%order_id, "order not found; nothing to assign");
            return AssignmentOutcome::unassigned(UnassignedReason::OrderNotFound);
        };
        if order.status != OrderStatus::Pending {
            info!(%order_id, status = ?order.status, "order is not pending; skipped");
            return AssignmentOutcome::unassigned(UnassignedReason::OrderNotPending);
        }
        if order.delivery_man_id.is_some() || order.reserved_delivery_man_id.is_some() {
            info!(%order_id, "order already has a courier; skipped");
            return AssignmentOutcome::unassigned(UnassignedReason::AlreadyReserved);
        }

        self.check_integrity(order_id);

        let pool = self.prefilter(self.store.load_candidate_pool(), order_id);
        info!(%order_id, candidates = pool.len(), "candidate pool loaded");

        let ctx = StageContext::new(self.store.workloads(&candidate_ids(&pool)));
        let run = self.pipeline.run(pool, &order, &ctx);
        for report in &run.stages {
            self.metrics
                .stage_rejections_total
                .with_label_values(&[report.stage])
                .inc_by(report.rejected() as u64);
        }

        if run.survivors.is_empty() {
            info!(%order_id, "no eligible couriers");
            return AssignmentOutcome::unassigned(UnassignedReason::NoEligibleCouriers);
        }

        let ranked = self.ranker.rank(run.survivors, &order).await;
        let fallbacks = ranked
            .iter()
            .filter(|entry| entry.source == RouteSource::Fallback)
            .count();
        self.metrics.routing_fallbacks_total.inc_by(fallbacks as u64);

        if ranked.is_empty() {
            info!(%order_id, "no couriers could be ranked");
            return AssignmentOutcome::unassigned(UnassignedReason::NoRankedCouriers);
        }

        self.reserve_best(&order, ranked)
    }

    /// Drift is reported, never corrected here.
    fn check_integrity(&self, order_id: Uuid) {
        let drifted = self.reconciler.drift_count();
        self.metrics.workload_drift_couriers.set(drifted as i64);

        if drifted > 0 {
            warn!(
                %order_id,
                drifted_couriers = drifted,
                "stored courier workloads disagree with active orders"
            );
        }
    }

    /// Couriers with no active orders, or exactly one while they are handing
    /// over another order.
    fn prefilter(&self, pool: Vec<Candidate>, order_id: Uuid) -> Vec<Candidate> {
        pool.into_iter()
            .filter(|candidate| {
                let current = candidate.courier.current_orders;
                let keep = current == 0 || (current == 1 && candidate.active_handover.is_some());
                if !keep {
                    info!(
                        %order_id,
                        courier_id = %candidate.id(),
                        current_orders = current,
                        "candidate busy; skipped before filtering"
                    );
                }
                keep
            })
            .collect()
    }

    /// Walks the ranking until one courier can be reserved atomically.
    fn reserve_best(&self, order: &Order, ranked: Vec<RankedCandidate>) -> AssignmentOutcome {
        let order_id = order.id;

        for entry in ranked {
            let courier_id = entry.candidate.id();

            match self
                .store
                .try_reserve(order_id, courier_id, self.config.max_total_orders)
            {
                Ok((before, after)) => {
                    self.reconciler.handle(&OrderEvent::updated(before, after));

                    let reservation = Reservation {
                        id: Uuid::new_v4(),
                        order_id,
                        courier_id,
                        eta_seconds: entry.eta_seconds,
                        distance_meters: entry.distance_meters,
                        source: entry.source,
                        reserved_at: Utc::now(),
                    };

                    info!(
                        %order_id,
                        %courier_id,
                        eta_seconds = entry.eta_seconds,
                        distance_meters = entry.distance_meters,
                        source = ?entry.source,
                        "order reserved"
                    );
                    return AssignmentOutcome::Reserved(reservation);
                }
                Err(
                    err @ (StoreError::CourierUnavailable { .. } | StoreError::CourierNotFound(_)),
                ) => {
                    warn!(
                        %order_id,
                        %courier_id,
                        error = %err,
                        "reservation conflict; trying next courier"
                    );
                }
                Err(err @ StoreError::OrderUnavailable { .. }) => {
                    info!(%order_id, error = %err, "order taken while assigning");
                    return AssignmentOutcome::unassigned(UnassignedReason::AlreadyReserved);
                }
                Err(StoreError::OrderNotFound(_)) => {
                    info!(%order_id, "order removed while assigning");
                    return AssignmentOutcome::unassigned(UnassignedReason::OrderNotFound);
                }
                Err(err) => {
                    error!(%order_id, %courier_id, error = %err, "failed to persist reservation");
                    return AssignmentOutcome::unassigned(UnassignedReason::PersistenceFailed);
                }
            }
        }

        warn!(%order_id, "every ranked courier was taken before reservation");
        AssignmentOutcome::unassigned(UnassignedReason::ReservationConflict)
    }
}
