//! Integration tests for the supplier HTTP adapters.
//!
//! Each test stands up a `wiremock` server and points the adapter at it
//! through the `endpoint` credential, so no real network traffic is made.

use dropsync_adapters::{
    AdapterError, AdapterSettings, BigBuyAdapter, CjAdapter, GenericJsonAdapter,
    MatterhornAdapter, RawSupplierRecord, ShopifyAdapter, SupplierAdapter,
};
use dropsync_core::{FetchOptions, SupplierCredentials};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// No inter-page delay, no retries.
fn test_settings() -> AdapterSettings {
    AdapterSettings {
        request_timeout_secs: 5,
        user_agent: "dropsync-test/0.1".to_owned(),
        inter_page_delay_ms: 0,
        max_retries: 0,
        retry_backoff_base_secs: 0,
    }
}

fn settings_with_retries(max_retries: u32) -> AdapterSettings {
    AdapterSettings {
        max_retries,
        ..test_settings()
    }
}

fn cj_credentials(server: &MockServer) -> SupplierCredentials {
    SupplierCredentials::new()
        .with("accessToken", "cj-token")
        .with("endpoint", &server.uri())
}

fn cj_envelope(data: Value) -> Value {
    json!({"code": 200, "result": true, "message": "Success", "data": data})
}

fn ids(records: &[RawSupplierRecord]) -> Vec<Option<String>> {
    records.iter().map(RawSupplierRecord::id_hint).collect()
}

// ---------------------------------------------------------------------------
// Shopify – Link header cursors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shopify_follows_link_header_cursor() {
    let server = MockServer::start().await;
    let next = format!(
        "<{}/products.json?limit=250&page_info=CURSOR2>; rel=\"next\"",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .and(query_param("page_info", "CURSOR2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"products": [{"id": 2, "title": "Second"}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", next.as_str())
                .set_body_json(json!({"products": [{"id": 1, "title": "First"}]})),
        )
        .mount(&server)
        .await;

    let adapter = ShopifyAdapter::new(&test_settings()).unwrap();
    let creds = SupplierCredentials::new().with("shopUrl", &server.uri());
    let records = adapter
        .fetch_products(&creds, &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(ids(&records), vec![Some("1".to_owned()), Some("2".to_owned())]);
}

#[tokio::test]
async fn shopify_without_shop_url_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let adapter = ShopifyAdapter::new(&test_settings()).unwrap();
    let err = adapter
        .fetch_products(&SupplierCredentials::new(), &FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AdapterError::MissingCredential { .. }), "got {err:?}");
}

// ---------------------------------------------------------------------------
// BigBuy – page numbers, bearer auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bigbuy_sends_bearer_token_and_stops_on_short_page() {
    let server = MockServer::start().await;
    let full_page: Vec<Value> = (1..=100).map(|i| json!({"id": i, "name": "P"})).collect();

    Mock::given(method("GET"))
        .and(path("/rest/catalog/products.json"))
        .and(header("authorization", "Bearer bb-key"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&full_page))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/catalog/products.json"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 101}])))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = BigBuyAdapter::new(&test_settings()).unwrap();
    let creds = SupplierCredentials::new()
        .with("apiKey", "bb-key")
        .with("endpoint", &server.uri());
    let records = adapter
        .fetch_products(&creds, &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(records.len(), 101);
}

#[tokio::test]
async fn bigbuy_object_body_is_an_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/catalog/products.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "maintenance"})))
        .mount(&server)
        .await;

    let adapter = BigBuyAdapter::new(&test_settings()).unwrap();
    let creds = SupplierCredentials::new()
        .with("apiKey", "bb-key")
        .with("endpoint", &server.uri());
    let err = adapter
        .fetch_products(&creds, &FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AdapterError::Upstream { ref code, .. } if code == "unexpected_body"));
}

// ---------------------------------------------------------------------------
// CJ Dropshipping – envelopes, totalPages, orders
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cj_walks_pages_until_total_pages() {
    let server = MockServer::start().await;
    for page in 1..=2 {
        Mock::given(method("GET"))
            .and(path("/product/listV2"))
            .and(header("CJ-Access-Token", "cj-token"))
            .and(query_param("page", page.to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(cj_envelope(json!({
                "totalPages": 2,
                "content": [{"productList": [{"id": format!("P{page}"), "nameEn": "Case"}]}]
            }))))
            .expect(1)
            .mount(&server)
            .await;
    }

    let adapter = CjAdapter::new(&test_settings()).unwrap();
    let records = adapter
        .fetch_products(&cj_credentials(&server), &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(ids(&records), vec![Some("P1".to_owned()), Some("P2".to_owned())]);
}

#[tokio::test]
async fn cj_envelope_error_code_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product/listV2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 1_600_001,
            "result": false,
            "message": "Invalid access token",
            "data": null
        })))
        .mount(&server)
        .await;

    let adapter = CjAdapter::new(&test_settings()).unwrap();
    let err = adapter
        .fetch_products(&cj_credentials(&server), &FetchOptions::default())
        .await
        .unwrap_err();

    match err {
        AdapterError::Upstream { code, message, .. } => {
            assert_eq!(code, "1600001");
            assert_eq!(message, "Invalid access token");
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn cj_malformed_record_comes_back_unparseable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product/listV2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cj_envelope(json!({
            "totalPages": 1,
            "content": [{"productList": [{"id": "OK1"}, "garbage"]}]
        }))))
        .mount(&server)
        .await;

    let adapter = CjAdapter::new(&test_settings()).unwrap();
    let records = adapter
        .fetch_products(&cj_credentials(&server), &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert!(matches!(records[0], RawSupplierRecord::Cj(_)));
    assert!(matches!(records[1], RawSupplierRecord::Unparseable { .. }));
}

#[tokio::test]
async fn cj_fetches_orders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shopping/order/list"))
        .and(query_param("pageNum", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cj_envelope(json!({
            "total": 1,
            "list": [{"orderId": "O-1", "orderStatus": "SHIPPED"}]
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = CjAdapter::new(&test_settings()).unwrap();
    let records = adapter
        .fetch_orders(&cj_credentials(&server), &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert!(matches!(records[0], RawSupplierRecord::CjOrder(_)));
}

// ---------------------------------------------------------------------------
// Matterhorn and generic JSON
// ---------------------------------------------------------------------------

#[tokio::test]
async fn matterhorn_sends_raw_api_key_and_stops_on_empty_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/B2BAPI/ITEMS/"))
        .and(header("authorization", "mh-key"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 77, "name": "Dress"}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/B2BAPI/ITEMS/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let adapter = MatterhornAdapter::new(&test_settings()).unwrap();
    let creds = SupplierCredentials::new()
        .with("apiKey", "mh-key")
        .with("endpoint", &server.uri());
    let records = adapter
        .fetch_products(&creds, &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(ids(&records), vec![Some("77".to_owned())]);
}

#[tokio::test]
async fn generic_reads_wrapped_array_and_honours_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [{"id": "A"}, {"id": "B"}],
            "total": 10
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = GenericJsonAdapter::new(&test_settings()).unwrap();
    let creds = SupplierCredentials::new().with("endpoint", &format!("{}/feed", server.uri()));
    let options = FetchOptions {
        limit: Some(2),
        ..FetchOptions::default()
    };
    let records = adapter.fetch_products(&creds, &options).await.unwrap();

    assert_eq!(ids(&records), vec![Some("A".to_owned()), Some("B".to_owned())]);
}

#[tokio::test]
async fn generic_does_not_support_orders() {
    let adapter = GenericJsonAdapter::new(&test_settings()).unwrap();
    let err = adapter
        .fetch_orders(&SupplierCredentials::new(), &FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Unsupported { .. }));
}

// ---------------------------------------------------------------------------
// Status mapping and retries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/B2BAPI/ITEMS/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = MatterhornAdapter::new(&settings_with_retries(3)).unwrap();
    let creds = SupplierCredentials::new()
        .with("apiKey", "wrong")
        .with("endpoint", &server.uri());
    let err = adapter
        .fetch_products(&creds, &FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AdapterError::Unauthorized { status: 401, .. }), "got {err:?}");
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn rate_limited_request_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "A"}])))
        .mount(&server)
        .await;

    let adapter = GenericJsonAdapter::new(&settings_with_retries(2)).unwrap();
    let creds = SupplierCredentials::new().with("endpoint", &format!("{}/feed", server.uri()));
    let records = adapter
        .fetch_products(&creds, &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn server_errors_exhaust_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .expect(3)
        .mount(&server)
        .await;

    let adapter = GenericJsonAdapter::new(&settings_with_retries(2)).unwrap();
    let creds = SupplierCredentials::new().with("endpoint", &format!("{}/feed", server.uri()));
    let err = adapter
        .fetch_products(&creds, &FetchOptions::default())
        .await
        .unwrap_err();

    match err {
        AdapterError::UnexpectedStatus {
            status, message, ..
        } => {
            assert_eq!(status, 503);
            assert_eq!(message, "upstream down");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn not_found_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let adapter = BigBuyAdapter::new(&test_settings()).unwrap();
    let creds = SupplierCredentials::new()
        .with("api_key", "k")
        .with("endpoint", &server.uri());
    let err = adapter
        .fetch_products(&creds, &FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AdapterError::NotFound { .. }), "got {err:?}");
}
