use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use crate::geo::fallback_estimate;
use crate::models::assignment::{RankedCandidate, RouteSource};
use crate::models::courier::{Candidate, GeoPoint};
use crate::models::order::Order;
use crate::routing::RouteProvider;

/// Orders candidates by estimated arrival at the order's delivery point.
pub struct EtaRanker {
    routes: Arc<dyn RouteProvider>,
    route_timeout: Duration,
    fallback_speed_kmh: f64,
}

impl EtaRanker {
    pub fn new(
        routes: Arc<dyn RouteProvider>,
        route_timeout: Duration,
        fallback_speed_kmh: f64,
    ) -> Self {
        Self {
            routes,
            route_timeout,
            fallback_speed_kmh,
        }
    }

    /// Returns candidates sorted by ascending ETA, then distance. Candidates
    /// without any usable location are dropped. An order whose delivery point
    /// cannot be resolved yields an empty ranking.
    pub async fn rank(&self, candidates: Vec<Candidate>, order: &Order) -> Vec<RankedCandidate> {
        let Some(target) = order.delivery_point() else {
            warn!(
                order_id = %order.id,
                "order has no usable delivery coordinates; ranking skipped"
            );
            return Vec::new();
        };

        info!(
            order_id = %order.id,
            candidates = candidates.len(),
            target_lat = target.lat,
            target_lng = target.lng,
            "ranking candidates"
        );

        let estimates = join_all(
            candidates
                .into_iter()
                .map(|candidate| self.estimate(candidate, target, order.id)),
        )
        .await;

        let mut ranked: Vec<RankedCandidate> = estimates.into_iter().flatten().collect();
        ranked.sort_by(|a, b| {
            a.eta_seconds
                .total_cmp(&b.eta_seconds)
                .then_with(|| a.distance_meters.total_cmp(&b.distance_meters))
                .then_with(|| a.candidate.id().cmp(&b.candidate.id()))
        });

        for (position, entry) in ranked.iter().enumerate() {
            info!(
                order_id = %order.id,
                position,
                courier_id = %entry.candidate.id(),
                eta_seconds = entry.eta_seconds,
                distance_meters = entry.distance_meters,
                source = ?entry.source,
                "ranked candidate"
            );
        }

        ranked
    }

    async fn estimate(
        &self,
        candidate: Candidate,
        target: GeoPoint,
        order_id: Uuid,
    ) -> Option<RankedCandidate> {
        let courier_id = candidate.id();
        let Some(origin) = current_location(&candidate) else {
            info!(%order_id, %courier_id, "candidate has no usable location; dropped");
            return None;
        };

        let mut waypoints = vec![origin];
        if let Some(dropoff) = candidate
            .active_handover
            .as_ref()
            .and_then(Order::delivery_point)
        {
            waypoints.push(dropoff);
        }
        waypoints.push(target);

        let routed = tokio::time::timeout(self.route_timeout, self.routes.route(&waypoints)).await;

        let (estimate, source) = match routed {
            Ok(Ok(estimate)) => (estimate, RouteSource::Directions),
            Ok(Err(err)) => {
                warn!(
                    %order_id,
                    %courier_id,
                    error = %err,
                    "routing failed; using straight-line estimate"
                );
                (
                    fallback_estimate(&origin, &target, self.fallback_speed_kmh),
                    RouteSource::Fallback,
                )
            }
            Err(_) => {
                warn!(
                    %order_id,
                    %courier_id,
                    timeout_ms = self.route_timeout.as_millis() as u64,
                    "routing timed out; using straight-line estimate"
                );
                (
                    fallback_estimate(&origin, &target, self.fallback_speed_kmh),
                    RouteSource::Fallback,
                )
            }
        };

        Some(RankedCandidate {
            candidate,
            eta_seconds: estimate.duration_seconds,
            distance_meters: estimate.distance_meters,
            source,
        })
    }
}

/// Live feed while the courier is carrying orders, otherwise the latest stored
/// fix, otherwise the static coordinates on the courier record.
fn current_location(candidate: &Candidate) -> Option<GeoPoint> {
    let live = (candidate.courier.current_orders > 0)
        .then_some(candidate.live_fix)
        .flatten()
        .map(|fix| fix.point);

    live.into_iter()
        .chain(candidate.last_fix.map(|fix| fix.point))
        .chain(candidate.courier.home_location)
        .find(GeoPoint::is_usable)
}
