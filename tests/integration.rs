use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use courier_dispatch::api::rest::router;
use courier_dispatch::config::Config;
use courier_dispatch::engine::assignment::run_assignment_engine;
use courier_dispatch::routing::DisabledRouting;
use courier_dispatch::state::AppState;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

fn new_state() -> (Arc<AppState>, mpsc::Receiver<Uuid>) {
    let (state, rx) = AppState::new(&Config::default(), Arc::new(DisabledRouting));
    (Arc::new(state), rx)
}

fn setup() -> (axum::Router, mpsc::Receiver<Uuid>) {
    let (state, rx) = new_state();
    (router(state), rx)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    empty_request("GET", uri)
}

fn patch_request(uri: &str, body: Value) -> Request<Body> {
    json_request("PATCH", uri, body)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_courier(app: &axum::Router, body: Value) -> Value {
    let res = app
        .clone()
        .oneshot(json_request("POST", "/couriers", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

async fn create_order(app: &axum::Router, body: Value) -> Value {
    let res = app
        .clone()
        .oneshot(json_request("POST", "/orders", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

fn online_rider(name: &str, lat: f64, lng: f64) -> Value {
    json!({
        "name": name,
        "online": true,
        "home_location": { "lat": lat, "lng": lng },
        "rating": 4.7
    })
}

fn card_order() -> Value {
    json!({
        "payment_method": "digital_payment",
        "order_amount": 180.0,
        "delivery_address": { "latitude": 19.4326, "longitude": -99.1332 }
    })
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _rx) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["couriers"], 0);
    assert_eq!(body["orders"], 0);
    assert_eq!(body["reservations"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _rx) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("orders_in_queue"));
    assert!(body.contains("routing_fallbacks_total"));
    assert!(body.contains("workload_drift_couriers"));
}

#[tokio::test]
async fn create_courier_returns_courier() {
    let (app, _rx) = setup();
    let body = create_courier(
        &app,
        json!({
            "name": "Alicia",
            "online": true,
            "can_accept_cash": true,
            "max_cash_balance": 500.0,
            "collected_cash": 120.0,
            "equipment": ["thermal_bag"],
            "rating": 4.5
        }),
    )
    .await;

    assert_eq!(body["name"], "Alicia");
    assert_eq!(body["online"], true);
    assert_eq!(body["blocked"], false);
    assert_eq!(body["current_orders"], 0);
    assert_eq!(body["wallet"]["collected_cash"], 120.0);
    assert_eq!(body["equipment"][0], "thermal_bag");
    assert_eq!(body["rating"], 4.5);
    assert!(!body["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn create_courier_empty_name_returns_400() {
    let (app, _rx) = setup();
    let response = app
        .oneshot(json_request("POST", "/couriers", json!({ "name": "  " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "name cannot be empty");
}

#[tokio::test]
async fn create_courier_rating_clamped_to_5() {
    let (app, _rx) = setup();
    let body = create_courier(&app, json!({ "name": "Max", "rating": 9.9 })).await;

    assert_eq!(body["rating"], 5.0);
}

#[tokio::test]
async fn list_couriers_initially_empty() {
    let (app, _rx) = setup();
    let response = app.oneshot(get_request("/couriers")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn update_courier_status() {
    let (app, _rx) = setup();
    let courier = create_courier(&app, json!({ "name": "Eve" })).await;
    let id = courier["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(patch_request(
            &format!("/couriers/{id}/status"),
            json!({ "online": true, "blocked": true }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["online"], true);
    assert_eq!(body["blocked"], true);

    let res = app
        .oneshot(patch_request(&format!("/couriers/{id}/status"), json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_courier_location_records_fix() {
    let (app, _rx) = setup();
    let courier = create_courier(&app, json!({ "name": "Frank" })).await;
    let id = courier["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(patch_request(
            &format!("/couriers/{id}/location"),
            json!({ "location": { "lat": 19.41, "lng": -99.16 } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fix = body_json(res).await;
    assert_eq!(fix["point"]["lat"], 19.41);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/couriers/{id}")))
        .await
        .unwrap();
    let detail = body_json(res).await;
    assert_eq!(detail["name"], "Frank");
    assert_eq!(detail["last_fix"]["point"]["lng"], -99.16);
    assert_eq!(detail["workload"]["confirmed_active"], 0);
    assert!(detail["active_handover_order_id"].is_null());

    let res = app
        .oneshot(patch_request(
            &format!("/couriers/{id}/location"),
            json!({ "location": { "lat": 0.0, "lng": 0.0 } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_courier_wallet() {
    let (app, _rx) = setup();
    let courier = create_courier(&app, json!({ "name": "Gina" })).await;
    let id = courier["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(patch_request(
            &format!("/couriers/{id}/wallet"),
            json!({ "collected_cash": 75.5 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["wallet"]["collected_cash"], 75.5);

    let res = app
        .oneshot(patch_request(
            &format!("/couriers/{id}/wallet"),
            json!({ "collected_cash": -1.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_courier_returns_404() {
    let (app, _rx) = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(patch_request(
            &format!("/couriers/{fake_id}/status"),
            json!({ "online": true }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_nonexistent_order_returns_404() {
    let (app, _rx) = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/orders/{fake_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_order_returns_pending_and_enqueues() {
    let (app, mut rx) = setup();
    let order = create_order(&app, card_order()).await;

    assert_eq!(order["status"], "pending");
    assert!(order["delivery_man_id"].is_null());
    assert!(order["reserved_delivery_man_id"].is_null());

    let queued = rx.try_recv().unwrap();
    assert_eq!(queued.to_string(), order["id"].as_str().unwrap());
}

#[tokio::test]
async fn order_with_courier_is_not_enqueued() {
    let (app, mut rx) = setup();
    let courier = create_courier(&app, json!({ "name": "Hugo" })).await;

    let mut body = card_order();
    body["status"] = json!("confirmed");
    body["delivery_man_id"] = courier["id"].clone();
    create_order(&app, body).await;

    assert!(rx.try_recv().is_err());

    let res = app
        .oneshot(get_request(&format!(
            "/couriers/{}",
            courier["id"].as_str().unwrap()
        )))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["current_orders"], 1);
}

#[tokio::test]
async fn negative_amount_returns_400() {
    let (app, _rx) = setup();
    let mut body = card_order();
    body["order_amount"] = json!(-5.0);

    let response = app
        .oneshot(json_request("POST", "/orders", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_updates_keep_courier_workload_in_sync() {
    let (app, _rx) = setup();
    let first = create_courier(&app, json!({ "name": "Ines" })).await;
    let second = create_courier(&app, json!({ "name": "Joel" })).await;
    let second_id = second["id"].as_str().unwrap();

    let mut body = card_order();
    body["reserved_delivery_man_id"] = first["id"].clone();
    let order = create_order(&app, body).await;
    let order_id = order["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(patch_request(
            &format!("/orders/{order_id}"),
            json!({
                "status": "confirmed",
                "delivery_man_id": second_id,
                "reserved_delivery_man_id": null
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated = body_json(res).await;
    assert_eq!(updated["status"], "confirmed");
    assert!(updated["reserved_delivery_man_id"].is_null());

    let res = app
        .clone()
        .oneshot(get_request("/couriers"))
        .await
        .unwrap();
    let couriers = body_json(res).await;
    for courier in couriers.as_array().unwrap() {
        let expected = if courier["id"] == second_id { 1 } else { 0 };
        assert_eq!(courier["current_orders"], expected);
    }

    let res = app
        .oneshot(patch_request(&format!("/orders/{order_id}"), json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn trash_restore_and_purge_order() {
    let (app, _rx) = setup();
    let courier = create_courier(&app, json!({ "name": "Karla" })).await;
    let courier_uri = format!("/couriers/{}", courier["id"].as_str().unwrap());

    let mut body = card_order();
    body["status"] = json!("processing");
    body["delivery_man_id"] = courier["id"].clone();
    let order = create_order(&app, body).await;
    let order_uri = format!("/orders/{}", order["id"].as_str().unwrap());

    let current_orders = |app: axum::Router, uri: String| async move {
        let res = app.oneshot(get_request(&uri)).await.unwrap();
        body_json(res).await["current_orders"].clone()
    };

    let res = app
        .clone()
        .oneshot(empty_request("DELETE", &order_uri))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(current_orders(app.clone(), courier_uri.clone()).await, 0);

    let res = app.clone().oneshot(get_request(&order_uri)).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .clone()
        .oneshot(empty_request("POST", &format!("{order_uri}/restore")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(current_orders(app.clone(), courier_uri.clone()).await, 1);

    let res = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("{order_uri}/permanent")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(current_orders(app.clone(), courier_uri).await, 0);

    let res = app
        .oneshot(empty_request("POST", &format!("{order_uri}/restore")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assign_endpoint_reserves_synchronously() {
    let (app, _rx) = setup();
    let near = create_courier(&app, online_rider("Lupe", 19.4340, -99.1340)).await;
    create_courier(&app, online_rider("Mateo", 19.5000, -99.2000)).await;
    let order = create_order(&app, card_order()).await;
    let order_id = order["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(empty_request("POST", &format!("/orders/{order_id}/assign")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome = body_json(res).await;
    assert_eq!(outcome["outcome"], "reserved");
    assert_eq!(outcome["courier_id"], near["id"]);
    assert_eq!(outcome["source"], "fallback");

    let res = app
        .clone()
        .oneshot(empty_request("POST", &format!("/orders/{order_id}/assign")))
        .await
        .unwrap();
    let again = body_json(res).await;
    assert_eq!(again["outcome"], "unassigned");
    assert_eq!(again["reason"], "already_reserved");

    let res = app
        .oneshot(empty_request(
            "POST",
            "/orders/00000000-0000-0000-0000-000000000000/assign",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cash_order_without_cash_couriers_stays_unassigned() {
    let (app, _rx) = setup();
    create_courier(&app, online_rider("Nora", 19.4340, -99.1340)).await;

    let mut body = card_order();
    body["payment_method"] = json!("cash_on_delivery");
    let order = create_order(&app, body).await;
    let order_id = order["id"].as_str().unwrap();

    let res = app
        .oneshot(empty_request("POST", &format!("/orders/{order_id}/assign")))
        .await
        .unwrap();
    let outcome = body_json(res).await;
    assert_eq!(outcome["outcome"], "unassigned");
    assert_eq!(outcome["reason"], "no_eligible_couriers");
}

#[tokio::test]
async fn reconcile_previews_then_fixes_drift() {
    let (state, _rx) = new_state();
    let app = router(state.clone());
    let courier = create_courier(&app, json!({ "name": "Oscar" })).await;
    let id: Uuid = courier["id"].as_str().unwrap().parse().unwrap();
    state
        .store
        .update_courier(id, |courier| courier.current_orders = 4)
        .unwrap();

    let res = app
        .clone()
        .oneshot(empty_request("POST", "/reconcile?dry_run=true"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let preview = body_json(res).await;
    assert_eq!(preview["dry_run"], true);
    assert_eq!(preview["couriers_checked"], 1);
    assert_eq!(preview["mismatches"][0]["stored"], 4);
    assert_eq!(preview["mismatches"][0]["actual"], 0);
    assert_eq!(preview["fixed"], 0);
    assert_eq!(state.store.courier(id).unwrap().current_orders, 4);

    let res = app
        .oneshot(empty_request("POST", "/reconcile"))
        .await
        .unwrap();
    let applied = body_json(res).await;
    assert_eq!(applied["fixed"], 1);
    assert_eq!(state.store.courier(id).unwrap().current_orders, 0);
}

#[tokio::test]
async fn full_assignment_flow() {
    let (state, rx) = new_state();
    tokio::spawn(run_assignment_engine(state.clone(), rx));
    let app = router(state.clone());

    let courier = create_courier(&app, online_rider("Dispatch Dan", 19.4300, -99.1300)).await;
    let courier_id = courier["id"].as_str().unwrap().to_string();

    let order = create_order(&app, card_order()).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let res = app
        .clone()
        .oneshot(get_request("/assignments"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let assignments = body_json(res).await;
    let list = assignments.as_array().unwrap();
    assert_eq!(list.len(), 1);

    let reservation = &list[0];
    assert_eq!(reservation["courier_id"], courier_id);
    assert_eq!(reservation["order_id"], order_id);
    assert!(reservation["eta_seconds"].as_f64().unwrap() > 0.0);
    assert!(reservation["distance_meters"].as_f64().unwrap() > 0.0);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let updated_order = body_json(res).await;
    assert_eq!(updated_order["status"], "pending");
    assert_eq!(updated_order["reserved_delivery_man_id"], courier_id);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/couriers/{courier_id}")))
        .await
        .unwrap();
    let updated_courier = body_json(res).await;
    assert_eq!(updated_courier["current_orders"], 1);
    assert_eq!(updated_courier["workload"]["reserved_pending"], 1);

    let res = app.oneshot(get_request("/metrics")).await.unwrap();
    let metrics = body_string(res).await;
    assert!(metrics.contains("assignments_total{outcome=\"reserved\"} 1"));
}
