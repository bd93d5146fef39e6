use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use shortlist::{
    shortlist_router, InMemoryQueueCache, InMemoryStore, NoTravelTimes, ShortlistService,
};
use tower::ServiceExt;

fn app() -> Router {
    let service = ShortlistService::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryQueueCache::new()),
        Arc::new(NoTravelTimes),
    );
    service
        .register_household(&["ben".to_string(), "melissa".to_string()])
        .expect("household registers");
    service.sync_catalog().expect("catalog syncs");
    shortlist_router(Arc::new(service))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request builds");
    app.clone().oneshot(request).await.expect("router responds")
}

async fn read_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn listing() -> Value {
    json!({
        "kind": "house",
        "address": "Kerkstraat 1, 3020 Herent",
        "price": 170000,
        "total_area": 600,
        "inhabitable_area": 140,
        "source_url": "https://www.realo.be/nl/kerkstraat-1",
        "information": { "Kadastraal Inkomen": "€1.200", "Bouwjaar": "2004" }
    })
}

#[tokio::test]
async fn property_report_shows_dealbreakers() {
    let app = app();
    let created = send(&app, Method::POST, "/api/v1/properties", Some(listing())).await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let property = read_json(created).await;
    let id = property["id"].as_u64().expect("numeric id");

    let report = send(&app, Method::GET, &format!("/api/v1/properties/{id}"), None).await;
    assert_eq!(report.status(), StatusCode::OK);
    let report = read_json(report).await;
    assert_eq!(report["assessment"]["score"], 0);
    assert_eq!(report["consensus"], "pending");
    assert_eq!(
        report["dealbreaker_warning"],
        "Cadastral income under limit (€1.200)"
    );
    assert_eq!(report["property"]["information"]["year"], "2004");
}

#[tokio::test]
async fn duplicate_listings_conflict() {
    let app = app();
    let first = send(&app, Method::POST, "/api/v1/properties", Some(listing())).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = send(&app, Method::POST, "/api/v1/properties", Some(listing())).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let payload = read_json(second).await;
    assert!(payload["error"]
        .as_str()
        .expect("error text")
        .contains("already exists"));
}

#[tokio::test]
async fn reviews_validate_status_and_user() {
    let app = app();
    let property = read_json(send(&app, Method::POST, "/api/v1/properties", Some(listing())).await).await;
    let id = property["id"].as_u64().expect("numeric id");

    let invalid = send(
        &app,
        Method::PUT,
        &format!("/api/v1/users/ben/reviews/{id}"),
        Some(json!({ "status": "maybe" })),
    )
    .await;
    assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let stranger = send(
        &app,
        Method::PUT,
        &format!("/api/v1/users/ann/reviews/{id}"),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(stranger.status(), StatusCode::NOT_FOUND);

    let accepted = send(
        &app,
        Method::PUT,
        &format!("/api/v1/users/ben/reviews/{id}"),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(accepted.status(), StatusCode::OK);
    assert_eq!(read_json(accepted).await["status"], "accepted");

    let undone = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/users/ben/reviews/{id}"),
        None,
    )
    .await;
    assert_eq!(undone.status(), StatusCode::OK);
    let again = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/users/ben/reviews/{id}"),
        None,
    )
    .await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn queue_rebuild_and_navigation() {
    let app = app();
    let property = read_json(send(&app, Method::POST, "/api/v1/properties", Some(listing())).await).await;
    let id = property["id"].as_u64().expect("numeric id");

    let rebuilt = send(&app, Method::POST, "/api/v1/users/melissa/queue/rebuild", None).await;
    assert_eq!(rebuilt.status(), StatusCode::OK);
    assert_eq!(read_json(rebuilt).await, json!([id]));

    let queue = read_json(send(&app, Method::GET, "/api/v1/users/melissa/queue", None).await).await;
    assert_eq!(queue["queue"], json!([id]));
    assert_eq!(queue["next"]["remaining"], 0);
    assert_eq!(queue["next"]["property"]["id"], id);

    let sold = send(&app, Method::POST, &format!("/api/v1/properties/{id}/sold"), None).await;
    assert_eq!(sold.status(), StatusCode::OK);
    let queue = read_json(send(&app, Method::GET, "/api/v1/users/melissa/queue", None).await).await;
    assert_eq!(queue["queue"], json!([]));
    assert_eq!(queue["next"], Value::Null);
}

#[tokio::test]
async fn criteria_routes_guard_builtins_and_scores() {
    let app = app();
    let criteria = read_json(send(&app, Method::GET, "/api/v1/criteria", None).await).await;
    let builtin_id = criteria[0]["id"].as_u64().expect("criterion id");
    assert_eq!(criteria[0]["dealbreaker"], true);

    let refused = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/criteria/{builtin_id}"),
        None,
    )
    .await;
    assert_eq!(refused.status(), StatusCode::CONFLICT);

    let created = send(
        &app,
        Method::POST,
        "/api/v1/criteria",
        Some(json!({
            "name": "Privacy",
            "importance": 6,
            "applies_to_house": true,
            "applies_to_land": false
        })),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let privacy = read_json(created).await;
    let privacy_id = privacy["id"].as_u64().expect("criterion id");

    let property = read_json(send(&app, Method::POST, "/api/v1/properties", Some(listing())).await).await;
    let id = property["id"].as_u64().expect("numeric id");

    let too_high = send(
        &app,
        Method::PUT,
        &format!("/api/v1/properties/{id}/scores/{privacy_id}"),
        Some(json!({ "score": 12 })),
    )
    .await;
    assert_eq!(too_high.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let scored = send(
        &app,
        Method::PUT,
        &format!("/api/v1/properties/{id}/scores/{privacy_id}"),
        Some(json!({ "score": 0, "comment": "overlooked by flats" })),
    )
    .await;
    assert_eq!(scored.status(), StatusCode::OK);
    assert_eq!(read_json(scored).await["score"], 0);

    let fields = read_json(
        send(&app, Method::GET, &format!("/api/v1/properties/{id}/fields"), None).await,
    )
    .await;
    assert_eq!(fields[0]["label"], "Privacy");
    assert_eq!(fields[0]["value"], "0");
    assert_eq!(fields[0]["kind"]["type"], "score");
}

#[tokio::test]
async fn shortlist_filters_by_kind() {
    let app = app();
    let property = read_json(send(&app, Method::POST, "/api/v1/properties", Some(listing())).await).await;
    let id = property["id"].as_u64().expect("numeric id");
    send(
        &app,
        Method::PUT,
        &format!("/api/v1/users/melissa/reviews/{id}"),
        Some(json!({ "status": "unsure" })),
    )
    .await;

    let houses = read_json(send(&app, Method::GET, "/api/v1/shortlist?kind=house", None).await).await;
    assert_eq!(houses.as_array().map(Vec::len), Some(1));
    let land = read_json(send(&app, Method::GET, "/api/v1/shortlist?kind=land", None).await).await;
    assert_eq!(land, json!([]));

    let invalid = send(&app, Method::GET, "/api/v1/shortlist?kind=castle", None).await;
    assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
