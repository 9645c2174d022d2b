use axum::http::StatusCode;
use http_body_util::BodyExt;
use mockito::Matcher;
use serde_json::{json, Value};
use stepnote_server::config::ProxyConfig;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const TABLE_PATH: &str = "/v0/appBase/Tasks";

fn config(upstream: &str) -> ProxyConfig {
    ProxyConfig {
        base_id: "appBase".into(),
        table_name: "Tasks".into(),
        ..ProxyConfig::default()
    }
    .with_api_key("pat-test")
    .with_api_url(format!("{upstream}/v0"))
}

/// Send a request via `oneshot` and return (status, parsed JSON body).
async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let mut req = axum::http::Request::builder().method(method).uri(uri);
    if body.is_some() {
        req = req.header("content-type", "application/json");
    }
    let req = req
        .body(match body {
            Some(b) => axum::body::Body::from(b.to_string()),
            None => axum::body::Body::empty(),
        })
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn records_by_unique_id_returns_array() {
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("GET", TABLE_PATH)
        .match_header("authorization", "Bearer pat-test")
        .match_query(Matcher::UrlEncoded(
            "filterByFormula".into(),
            "{Unique ID}='alice'".into(),
        ))
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"records":[
                {"id":"rec1","createdTime":"2024-01-01T00:00:00.000Z","fields":{"Task Number":"1","Unique ID":"alice"}},
                {"id":"rec2","fields":{"Task Number":"2","Unique ID":"alice"}}
            ]}"#,
        )
        .create_async()
        .await;

    let app = stepnote_server::build_router(config(&upstream.url()));
    let (status, body) = get(app, "/api/records-by-unique-id?uniqueId=alice").await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().expect("array body");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], "rec1");
    assert_eq!(records[0]["fields"]["Task Number"], "1");
    assert!(records[0].get("createdTime").is_none());
}

#[tokio::test]
async fn no_match_is_empty_array() {
    let mut upstream = mockito::Server::new_async().await;
    upstream
        .mock("GET", TABLE_PATH)
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(r#"{"records":[]}"#)
        .create_async()
        .await;

    let app = stepnote_server::build_router(config(&upstream.url()));
    let (status, body) = get(app, "/api/records-by-unique-id?uniqueId=nobody").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn record_by_task_number_returns_first_match() {
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("GET", TABLE_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("filterByFormula".into(), "{Task Number}='42'".into()),
            Matcher::UrlEncoded("maxRecords".into(), "1".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(r#"{"records":[{"id":"rec42","fields":{"Task Number":"42"}}]}"#)
        .create_async()
        .await;

    let app = stepnote_server::build_router(config(&upstream.url()));
    let (status, body) = get(app, "/api/record-by-task-number?taskNumber=42").await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "rec42");
}

#[tokio::test]
async fn unknown_task_number_is_null_with_200() {
    let mut upstream = mockito::Server::new_async().await;
    upstream
        .mock("GET", TABLE_PATH)
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(r#"{"records":[]}"#)
        .create_async()
        .await;

    let app = stepnote_server::build_router(config(&upstream.url()));
    let (status, body) = get(app, "/api?taskNumber=999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn missing_lookup_parameters_are_400() {
    let app = stepnote_server::build_router(config("http://127.0.0.1:9"));
    let (status, body) = get(app.clone(), "/api/records-by-unique-id").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("uniqueId"));

    let (status, _) = get(app, "/api/record-by-task-number?taskNumber=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn patch_forwards_fields_and_returns_upstream_body() {
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("PATCH", "/v0/appBase/Tasks/rec42")
        .match_body(Matcher::Json(json!({ "fields": { "Status": "Reviewed" } })))
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"rec42","fields":{"Status":"Reviewed"}}"#)
        .create_async()
        .await;

    let app = stepnote_server::build_router(config(&upstream.url()));
    let (status, body) = send(
        app,
        "PATCH",
        "/api/record",
        Some(r#"{"recordId":"rec42","fields":{"Status":"Reviewed"}}"#),
    )
    .await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fields"]["Status"], "Reviewed");
}

#[tokio::test]
async fn patch_accepts_record_id_in_path_or_query() {
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("PATCH", "/v0/appBase/Tasks/rec7")
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"rec7","fields":{}}"#)
        .expect(2)
        .create_async()
        .await;

    let app = stepnote_server::build_router(config(&upstream.url()));
    let body = Some(r#"{"fields":{"Status":"Done"}}"#);
    let (status, _) = send(app.clone(), "PATCH", "/api/record/rec7", body).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(app, "PATCH", "/api?recordId=rec7", body).await;
    assert_eq!(status, StatusCode::OK);

    mock.assert_async().await;
}

#[tokio::test]
async fn patch_without_record_id_or_fields_is_400() {
    let app = stepnote_server::build_router(config("http://127.0.0.1:9"));

    let (status, body) = send(
        app.clone(),
        "PATCH",
        "/api/record",
        Some(r#"{"fields":{"Status":"Done"}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("recordId"));

    let (status, body) = send(app.clone(), "PATCH", "/api/record/rec1", Some(r#"{}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("fields"));

    // A body that is not JSON counts as no body at all.
    let (status, _) = send(app, "PATCH", "/api/record", Some("not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Errors and edges
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upstream_failure_passes_status_and_body_through() {
    let mut upstream = mockito::Server::new_async().await;
    upstream
        .mock("GET", TABLE_PATH)
        .match_query(Matcher::Any)
        .with_status(422)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"type":"INVALID_FILTER_BY_FORMULA"}}"#)
        .create_async()
        .await;

    let app = stepnote_server::build_router(config(&upstream.url()));
    let (status, body) = get(app, "/api/records-by-unique-id?uniqueId=x").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Upstream service error");
    assert_eq!(body["details"]["error"]["type"], "INVALID_FILTER_BY_FORMULA");
}

#[tokio::test]
async fn missing_api_key_is_500_for_every_operation() {
    let app = stepnote_server::build_router(ProxyConfig::default());
    let (status, body) = get(app.clone(), "/api/records-by-unique-id?uniqueId=a").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server configuration error");

    let (status, _) = send(
        app,
        "PATCH",
        "/api/record",
        Some(r#"{"recordId":"r","fields":{"a":1}}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn options_is_200_even_without_key() {
    let app = stepnote_server::build_router(ProxyConfig::default());
    let (status, _) = send(app, "OPTIONS", "/api/record", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_cors_header() {
    let app = stepnote_server::build_router(config("http://127.0.0.1:9"));
    let req = axum::http::Request::builder()
        .uri("/api")
        .header("origin", "http://viewer.example")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn unrecognized_request_gets_descriptor() {
    let app = stepnote_server::build_router(config("http://127.0.0.1:9"));

    let (status, body) = get(app.clone(), "/api").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"].is_array());

    let (status, body) = send(app.clone(), "DELETE", "/api/record", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    let (status, body) = get(app, "/api/something-else").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"].is_array());
}

#[tokio::test]
async fn body_naming_a_record_updates_regardless_of_method() {
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("PATCH", "/v0/appBase/Tasks/rec1")
        .match_body(Matcher::Json(json!({ "fields": { "Status": "x" } })))
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"rec1","fields":{"Status":"x"}}"#)
        .expect(2)
        .create_async()
        .await;

    let app = stepnote_server::build_router(config(&upstream.url()));
    let body = Some(r#"{"recordId":"rec1","fields":{"Status":"x"}}"#);

    let (status, reply) = send(app.clone(), "POST", "/api", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["fields"]["Status"], "x");

    let (status, _) = send(app, "POST", "/api/record", body).await;
    assert_eq!(status, StatusCode::OK);

    mock.assert_async().await;
}

#[tokio::test]
async fn post_without_record_id_still_gets_descriptor() {
    let app = stepnote_server::build_router(config("http://127.0.0.1:9"));
    let (status, body) = send(app, "POST", "/api", Some(r#"{"fields":{"a":1}}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"].is_array());
}

#[tokio::test]
async fn unreadable_query_string_uses_json_envelope() {
    let app = stepnote_server::build_router(config("http://127.0.0.1:9"));
    let req = axum::http::Request::builder()
        .uri("/api/records-by-unique-id?uniqueId=a&uniqueId=b")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let ct = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(ct.contains("application/json"), "{ct}");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Invalid request parameters");
    assert!(json["details"].as_str().unwrap().contains("uniqueId"));

    let app = stepnote_server::build_router(config("http://127.0.0.1:9"));
    let (status, json) = get(app, "/api?taskNumber=1&taskNumber=2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid request parameters");
}
