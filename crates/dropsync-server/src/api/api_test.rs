use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use dropsync_adapters::{AdapterRegistry, AdapterSettings};
use dropsync_core::{CatalogStore, Feed, NormalizedProduct, Stores};
use dropsync_engine::{MemoryStore, SyncSettings};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::middleware::{AuthState, USER_ID_HEADER};

fn adapter_settings() -> AdapterSettings {
    AdapterSettings {
        request_timeout_secs: 5,
        user_agent: "dropsync-test/0.1".to_owned(),
        inter_page_delay_ms: 0,
        max_retries: 0,
        retry_backoff_base_secs: 0,
    }
}

fn app_with_auth(store: Arc<MemoryStore>, auth: AuthState) -> Router {
    let stores = Stores::from_backend(store);
    let adapters = AdapterRegistry::with_defaults(&adapter_settings()).expect("registry");
    let orchestrator = SyncOrchestrator::new(
        adapters,
        stores.clone(),
        SyncSettings {
            timeout: None,
            ..SyncSettings::default()
        },
    );
    let feeds = FeedGenerator::new(stores.catalog.clone(), stores.feeds.clone());
    build_app(
        AppState {
            orchestrator,
            feeds,
            pool: None,
        },
        auth,
        default_rate_limit_state(),
    )
}

fn app(store: Arc<MemoryStore>) -> Router {
    app_with_auth(store, AuthState::from_keys("", true).expect("auth"))
}

fn get(uri: &str, user: Uuid) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(USER_ID_HEADER, user.to_string())
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, user: Uuid, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(USER_ID_HEADER, user.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

async fn feed_server(records: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records))
        .mount(&server)
        .await;
    server
}

fn sync_body(server: &MockServer) -> Value {
    json!({
        "supplierId": "acme-feed",
        "connectorType": "generic_json",
        "supplierName": "Acme",
        "credentials": {"endpoint": format!("{}/feed", server.uri())}
    })
}

// -------------------------------------------------------------------------
// Health, connectors, middleware
// -------------------------------------------------------------------------

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None), 50);
    assert_eq!(normalize_limit(Some(0)), 1);
    assert_eq!(normalize_limit(Some(1_000)), 200);
    assert_eq!(normalize_limit(Some(25)), 25);
}

#[test]
fn api_error_codes_map_to_statuses() {
    let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(status_for_code("upstream_error"), StatusCode::BAD_GATEWAY);
    assert_eq!(status_for_code("timeout"), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(
        status_for_code("internal_error"),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn health_reports_missing_database() {
    let response = app(Arc::new(MemoryStore::new()))
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let json = json_body(response).await;
    assert_eq!(json["data"]["database"], "not_configured");
}

#[tokio::test]
async fn connectors_are_listed() {
    let response = app(Arc::new(MemoryStore::new()))
        .oneshot(
            Request::builder()
                .uri("/api/v1/connectors")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let data = json["data"].as_array().expect("data array");
    assert_eq!(data.len(), 5);
    assert!(data
        .iter()
        .any(|c| c["connector"] == "cjdropshipping" && c["supportsOrders"] == true));
}

#[tokio::test]
async fn user_routes_require_user_header() {
    let response = app(Arc::new(MemoryStore::new()))
        .oneshot(
            Request::builder()
                .uri("/api/v1/sync-jobs")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn bearer_auth_rejects_missing_token() {
    let auth = AuthState::from_keys("secret", false).expect("auth");
    let response = app_with_auth(Arc::new(MemoryStore::new()), auth)
        .oneshot(get("/api/v1/sync-jobs", Uuid::new_v4()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// -------------------------------------------------------------------------
// Sync trigger
// -------------------------------------------------------------------------

#[tokio::test]
async fn sync_reports_counts_and_job_is_queryable() {
    let server = feed_server(json!([
        {"id": "A1", "title": "Widget", "price": 10},
        {"id": "B1", "title": "Gadget", "price": "4.50"},
        {"title": "missing id"}
    ]))
    .await;
    let store = Arc::new(MemoryStore::new());
    let user = Uuid::new_v4();

    let response = app(store.clone())
        .oneshot(post_json("/api/v1/sync", user, &sync_body(&server)))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["results"]["total"], 3);
    assert_eq!(json["results"]["imported"], 2);
    assert_eq!(json["results"]["failed"], 1);
    assert_eq!(json["results"]["errors"].as_array().map(Vec::len), Some(1));
    assert_eq!(store.list_for_user(user).await.expect("catalog").len(), 2);

    let job_id = json["syncJobId"].as_str().expect("job id").to_owned();
    let response = app(store.clone())
        .oneshot(get(&format!("/api/v1/sync-jobs/{job_id}"), user))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let job = json_body(response).await;
    assert_eq!(job["data"]["status"], "completed");
    assert_eq!(job["data"]["processedRecords"], 3);

    let response = app(store)
        .oneshot(get(
            &format!("/api/v1/sync-jobs/{job_id}"),
            Uuid::new_v4(),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sync_without_supplier_id_is_a_bad_request() {
    let response = app(Arc::new(MemoryStore::new()))
        .oneshot(post_json(
            "/api/v1/sync",
            Uuid::new_v4(),
            &json!({"connectorType": "generic_json"}),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().expect("error").contains("supplierId"));
    assert!(json.get("syncJobId").is_none());
}

#[tokio::test]
async fn rejected_credentials_fail_the_job_with_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let store = Arc::new(MemoryStore::new());
    let user = Uuid::new_v4();

    let response = app(store.clone())
        .oneshot(post_json("/api/v1/sync", user, &sync_body(&server)))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert!(json["syncJobId"].is_string());
    assert!(store.list_for_user(user).await.expect("catalog").is_empty());

    let response = app(store)
        .oneshot(get("/api/v1/sync-jobs", user))
        .await
        .expect("response");
    let jobs = json_body(response).await;
    assert_eq!(jobs["data"][0]["status"], "failed");
}

// -------------------------------------------------------------------------
// Feeds
// -------------------------------------------------------------------------

fn product(external_id: &str, price: i64) -> NormalizedProduct {
    NormalizedProduct {
        external_id: external_id.to_string(),
        sku: format!("SKU-{external_id}"),
        title: format!("Phone case {external_id}"),
        description: "Shock-absorbing case.".to_string(),
        price: rust_decimal::Decimal::new(price, 0),
        cost_price: None,
        currency: "USD".to_string(),
        stock_quantity: 4,
        category: "Cases".to_string(),
        brand: None,
        image_urls: vec!["https://cdn.example.com/1.jpg".to_string()],
        attributes: BTreeMap::new(),
        supplier_name: "Acme".to_string(),
    }
}

async fn seed_feed(store: &MemoryStore, user: Uuid) -> Feed {
    store.insert(user, &product("1", 15)).await.expect("insert");
    store.insert(user, &product("2", 0)).await.expect("insert");
    store
        .add_feed(Feed {
            id: Uuid::new_v4(),
            user_id: user,
            name: "Google".to_string(),
            platform: "google_shopping".to_string(),
            title_template: "{{title}}".to_string(),
            description_template: "{{description}}".to_string(),
            max_title_length: 150,
            max_description_length: 5000,
        })
        .await
}

#[tokio::test]
async fn feed_generation_items_and_export() {
    let store = Arc::new(MemoryStore::new());
    let user = Uuid::new_v4();
    let feed = seed_feed(&store, user).await;

    let response = app(store.clone())
        .oneshot(post_json(
            &format!("/api/v1/feeds/{}/generate", feed.id),
            user,
            &json!({}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let run = json_body(response).await;
    assert_eq!(run["data"]["generatedItems"], 1);
    assert_eq!(run["data"]["failedItems"], 1);

    let response = app(store.clone())
        .oneshot(get(&format!("/api/v1/feeds/{}/items", feed.id), user))
        .await
        .expect("response");
    let items = json_body(response).await;
    assert_eq!(items["data"][0]["sku"], "SKU-1");

    let response = app(store)
        .oneshot(get(&format!("/api/v1/feeds/{}/export", feed.id), user))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .expect("content type")
        .starts_with("application/rss+xml"));
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let xml = String::from_utf8(body.to_vec()).expect("utf8");
    assert!(xml.contains("<g:id>SKU-1</g:id>"));
}

#[tokio::test]
async fn unknown_feed_is_not_found() {
    let response = app(Arc::new(MemoryStore::new()))
        .oneshot(post_json(
            &format!("/api/v1/feeds/{}/generate", Uuid::new_v4()),
            Uuid::new_v4(),
            &json!({}),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
