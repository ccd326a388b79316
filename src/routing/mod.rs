use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::RoutingConfig;
use crate::error::RoutingError;
use crate::models::assignment::RouteEstimate;
use crate::models::courier::GeoPoint;

#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Duration and distance of a route visiting `waypoints` in order.
    async fn route(&self, waypoints: &[GeoPoint]) -> Result<RouteEstimate, RoutingError>;
}

/// Used when no access token is configured; every request falls back locally.
pub struct DisabledRouting;

#[async_trait]
impl RouteProvider for DisabledRouting {
    async fn route(&self, _waypoints: &[GeoPoint]) -> Result<RouteEstimate, RoutingError> {
        Err(RoutingError::NotConfigured)
    }
}

/// Client for a Mapbox-compatible Directions API.
#[derive(Clone)]
pub struct DirectionsClient {
    base_url: String,
    profile: String,
    access_token: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Deserialize)]
struct DirectionsRoute {
    duration: f64,
    distance: f64,
}

impl DirectionsClient {
    pub fn new(
        config: &RoutingConfig,
        access_token: impl Into<String>,
    ) -> Result<Self, RoutingError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            profile: config.profile.trim_matches('/').to_string(),
            access_token: access_token.into(),
            client,
        })
    }

    fn route_url(&self, waypoints: &[GeoPoint]) -> String {
        let coordinates = waypoints
            .iter()
            .map(|point| format!("{},{}", point.lng, point.lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/directions/v5/{}/{}",
            self.base_url, self.profile, coordinates
        )
    }
}

#[async_trait]
impl RouteProvider for DirectionsClient {
    async fn route(&self, waypoints: &[GeoPoint]) -> Result<RouteEstimate, RoutingError> {
        if waypoints.len() < 2 {
            return Err(RoutingError::TooFewWaypoints(waypoints.len()));
        }

        let url = self.route_url(waypoints);
        debug!(url = %url, waypoints = waypoints.len(), "requesting route");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("overview", "simplified"),
                ("geometries", "geojson"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoutingError::Status(status));
        }

        let body: DirectionsResponse = response.json().await?;
        let route = body.routes.into_iter().next().ok_or(RoutingError::NoRoute)?;

        if !route.duration.is_finite() || route.duration < 0.0 {
            return Err(RoutingError::InvalidRoute(format!("duration {}", route.duration)));
        }
        if !route.distance.is_finite() || route.distance < 0.0 {
            return Err(RoutingError::InvalidRoute(format!("distance {}", route.distance)));
        }

        Ok(RouteEstimate {
            duration_seconds: route.duration,
            distance_meters: route.distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::{DirectionsClient, DisabledRouting, RouteProvider};
    use crate::config::RoutingConfig;
    use crate::error::RoutingError;
    use crate::models::courier::GeoPoint;

    async fn spawn_directions_server(status: StatusCode, body: Value) -> String {
        let app = Router::new().route(
            "/directions/v5/mapbox/driving/:coordinates",
            get(
                move |Path(coordinates): Path<String>,
                      Query(params): Query<std::collections::HashMap<String, String>>| {
                    let body = body.clone();
                    async move {
                        if params.get("access_token").map(String::as_str) != Some("test-token") {
                            let body = json!({ "message": "bad token" });
                            return (StatusCode::UNAUTHORIZED, Json(body));
                        }
                        if coordinates.split(';').count() < 2 {
                            return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({})));
                        }
                        (status, Json(body))
                    }
                },
            ),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        format!("http://{addr}")
    }

    fn client(base_url: String, token: &str) -> DirectionsClient {
        let config = RoutingConfig {
            base_url,
            timeout: Duration::from_secs(2),
            ..RoutingConfig::default()
        };
        DirectionsClient::new(&config, token).unwrap()
    }

    fn waypoints() -> Vec<GeoPoint> {
        vec![GeoPoint::new(19.40, -99.10), GeoPoint::new(19.43, -99.13)]
    }

    #[tokio::test]
    async fn reads_first_route() {
        let base = spawn_directions_server(
            StatusCode::OK,
            json!({ "routes": [
                { "duration": 312.5, "distance": 2400.0 },
                { "duration": 900.0, "distance": 9000.0 }
            ] }),
        )
        .await;

        let estimate = client(base, "test-token").route(&waypoints()).await.unwrap();

        assert_eq!(estimate.duration_seconds, 312.5);
        assert_eq!(estimate.distance_meters, 2400.0);
    }

    #[tokio::test]
    async fn empty_routes_is_a_failure() {
        let base = spawn_directions_server(StatusCode::OK, json!({ "routes": [] })).await;

        let err = client(base, "test-token").route(&waypoints()).await.unwrap_err();

        assert!(matches!(err, RoutingError::NoRoute));
    }

    #[tokio::test]
    async fn non_success_status_is_a_failure() {
        let base = spawn_directions_server(StatusCode::OK, json!({ "routes": [] })).await;

        let err = client(base, "wrong-token").route(&waypoints()).await.unwrap_err();

        assert!(matches!(err, RoutingError::Status(status) if status == StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn malformed_body_is_a_failure() {
        let body = json!({ "routes": [{ "duration": "soon" }] });
        let base = spawn_directions_server(StatusCode::OK, body).await;

        let err = client(base, "test-token").route(&waypoints()).await.unwrap_err();

        assert!(matches!(err, RoutingError::Transport(_)));
    }

    #[tokio::test]
    async fn single_waypoint_is_rejected_locally() {
        let client = client("http://127.0.0.1:9".to_string(), "test-token");

        let err = client.route(&waypoints()[..1]).await.unwrap_err();

        assert!(matches!(err, RoutingError::TooFewWaypoints(1)));
    }

    #[tokio::test]
    async fn disabled_routing_always_fails() {
        let err = DisabledRouting.route(&waypoints()).await.unwrap_err();
        assert!(matches!(err, RoutingError::NotConfigured));
    }

    #[test]
    fn url_lists_waypoints_as_lng_lat() {
        let client = client("http://routing.local/".to_string(), "t");
        let url = client.route_url(&waypoints());
        assert_eq!(
            url,
            "http://routing.local/directions/v5/mapbox/driving/-99.1,19.4;-99.13,19.43"
        );
    }
}
