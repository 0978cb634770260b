/// Integration tests for the `/api/bbps` proxy and the directory endpoint
/// Drives the router in-process against a mocked aggregator
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use fastag_bbps::config::Config;
use fastag_bbps::handlers::AppState;
use fastag_bbps::models::{FormData, PreEnquiryRequest};
use fastag_bbps::routes;
use fastag_bbps::services::BbpsService;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to build the app against a mock aggregator
fn create_test_app(config: Config) -> Router {
    let bbps = BbpsService::from_config(&config).expect("client builds");
    routes::app(Arc::new(AppState::new(config, bbps)))
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_billers_proxy_forwards_request_and_body() {
    let mock_server = MockServer::start().await;

    let upstream = json!({
        "data": {
            "records": [{"billerId": "B1", "billerName": "Acme", "billerStatus": "ACTIVE"}],
            "meta": {"totalPages": 2, "currentPage": 1, "totalRecords": 10, "recordsOnCurrentPage": 9}
        }
    });

    Mock::given(method("POST"))
        .and(path("/billers"))
        .and(body_json(json!({
            "pagination": {"pageNumber": 1, "recordsPerPage": 9},
            "filters": {"categoryKey": "C10"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&upstream))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(Config::with_base_url(mock_server.uri()));
    let (status, body) = post(
        app,
        "/api/bbps/billers",
        json!({"pagination": {"pageNumber": 1, "recordsPerPage": 9}, "filters": {"categoryKey": "C10"}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, upstream);
}

#[tokio::test]
async fn test_billers_proxy_fills_defaults_for_empty_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/billers"))
        .and(body_json(json!({
            "pagination": {"pageNumber": 1, "recordsPerPage": 9},
            "filters": {"categoryKey": "C10"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"records": []}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(Config::with_base_url(mock_server.uri()));
    let (status, _) = post(app, "/api/bbps/billers", json!({})).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_api_key_is_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/billers"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"records": []}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = Config::with_base_url(mock_server.uri());
    config.bbps_api_key = Some("secret".to_string());
    let app = create_test_app(config);
    let (status, _) = post(app, "/api/bbps/billers", json!({})).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_biller_details_requires_biller_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/biller-details"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = create_test_app(Config::with_base_url(mock_server.uri()));
    let (status, body) = post(app, "/api/bbps/biller-details", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "billerId is required");
}

#[tokio::test]
async fn test_biller_details_forwards_biller_id() {
    let mock_server = MockServer::start().await;
    let upstream = json!({"data": {"parameters": [{"name": "vehicleNumber"}]}});

    Mock::given(method("POST"))
        .and(path("/biller-details"))
        .and(body_json(json!({"billerId": "B1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(&upstream))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(Config::with_base_url(mock_server.uri()));
    let (status, body) = post(app, "/api/bbps/biller-details", json!({"billerId": "B1"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, upstream);
}

#[tokio::test]
async fn test_pre_enquiry_business_error_becomes_400() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pre-enquiry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"statuscode": "NA"})))
        .mount(&mock_server)
        .await;

    let app = create_test_app(Config::with_base_url(mock_server.uri()));
    let (status, body) = post(
        app,
        "/api/bbps/pre-enquiry",
        json!({
            "billerId": "B1",
            "inputParameters": {"vehicleNumber": "MH12AB1234"},
            "externalRef": "SABPE_1700000000000"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(!message.is_empty());
}

#[tokio::test]
async fn test_pre_enquiry_message_is_extracted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pre-enquiry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statuscode": "ERR",
            "status": "Vehicle not found"
        })))
        .mount(&mock_server)
        .await;

    let app = create_test_app(Config::with_base_url(mock_server.uri()));
    let (status, body) = post(
        app,
        "/api/bbps/pre-enquiry",
        json!({
            "billerId": "B1",
            "inputParameters": {"vehicleNumber": "MH12AB1234"},
            "externalRef": "SABPE_1700000000000"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Vehicle not found");
}

#[tokio::test]
async fn test_pre_enquiry_success_passes_through() {
    let mock_server = MockServer::start().await;
    let upstream = json!({
        "statuscode": "TXN",
        "data": {"enquiryReferenceId": "ENQ1", "BillAmount": "1500.00"}
    });

    Mock::given(method("POST"))
        .and(path("/pre-enquiry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&upstream))
        .mount(&mock_server)
        .await;

    let app = create_test_app(Config::with_base_url(mock_server.uri()));
    let (status, body) = post(
        app,
        "/api/bbps/pre-enquiry",
        json!({
            "billerId": "B1",
            "inputParameters": {"vehicleNumber": "MH12AB1234"},
            "externalRef": "SABPE_1700000000000"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, upstream);
}

#[tokio::test]
async fn test_pre_enquiry_rejects_missing_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pre-enquiry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = create_test_app(Config::with_base_url(mock_server.uri()));
    let (status, body) = post(
        app,
        "/api/bbps/pre-enquiry",
        json!({"billerId": "B1", "inputParameters": {}}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("inputParameters"));
    assert!(message.contains("externalRef"));
}

#[tokio::test]
async fn test_pre_enquiry_forwards_empty_parameters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pre-enquiry"))
        .and(body_partial_json(json!({"billerId": "B1", "inputParameters": {}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"enquiryReferenceId": "ENQ7", "BillAmount": "0"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(Config::with_base_url(mock_server.uri()));
    let request = serde_json::to_value(PreEnquiryRequest::new("B1", FormData::new())).unwrap();
    let (status, body) = post(app, "/api/bbps/pre-enquiry", request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["enquiryReferenceId"], "ENQ7");
}

#[tokio::test]
async fn test_pre_enquiry_empty_upstream_body_is_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pre-enquiry"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let app = create_test_app(Config::with_base_url(mock_server.uri()));
    let (status, body) = post(
        app,
        "/api/bbps/pre-enquiry",
        json!({
            "billerId": "B1",
            "inputParameters": {"vehicleNumber": "MH12AB1234"},
            "externalRef": "SABPE_1700000000000"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unreachable_upstream_is_500() {
    // Nothing listens on the discard port
    let app = create_test_app(Config::with_base_url("http://127.0.0.1:9"));
    let (status, body) = post(app, "/api/bbps/biller-details", json!({"billerId": "B1"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert!(!message.is_empty());
}

#[tokio::test]
async fn test_upstream_status_is_preserved() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/billers"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "maintenance"})))
        .mount(&mock_server)
        .await;

    let app = create_test_app(Config::with_base_url(mock_server.uri()));
    let (status, body) = post(app, "/api/bbps/billers", json!({})).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"error": {"message": "maintenance"}}));
}

#[tokio::test]
async fn test_directory_endpoint_normalizes_and_filters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/billers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "records": [
                    {"billerId": "B1", "billerName": "Zeta Bank FASTag", "billerStatus": "ACTIVE"},
                    {"billerId": "B2", "billerName": "Alpha FASTag", "billerStatus": "ACTIVE", "city": "Pune"},
                    {"billerId": "B3", "billerName": "Beta FASTag", "isAvailable": false, "state": "Kerala"}
                ],
                "meta": {"totalPages": 2, "currentPage": 1, "totalRecords": 12, "recordsOnCurrentPage": 3}
            }
        })))
        .mount(&mock_server)
        .await;

    let app = create_test_app(Config::with_base_url(mock_server.uri()));
    let request = Request::builder()
        .uri("/api/billers?onlyAvailable=true&sort=asc")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    let billers = body["billers"].as_array().unwrap();
    assert_eq!(billers.len(), 2);
    assert_eq!(billers[0]["billerName"], "Alpha FASTag");
    assert_eq!(billers[0]["coverage"], "Pune");
    assert_eq!(billers[1]["coverage"], "PAN India");
    assert_eq!(body["meta"]["totalPages"], 2);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(Config::with_base_url("http://127.0.0.1:9"));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
