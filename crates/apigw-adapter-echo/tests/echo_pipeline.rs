use std::path::PathBuf;

use apigw_adapter::test_utils::EventBuilder;
use apigw_adapter::{AdapterConfig, HttpResponse, Pipeline, RawEvent};
use apigw_adapter_echo::build_pipeline;
use lambda_runtime::{Context, LambdaEvent};
use serde_json::{json, Value};

fn static_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static")
}

fn pipeline() -> Pipeline {
    build_pipeline(AdapterConfig::default().with_static_root(static_root()))
}

async fn invoke_payload(pipeline: &Pipeline, payload: Value, context: Context) -> HttpResponse {
    let event = LambdaEvent::new(payload, context);
    pipeline
        .handle(event)
        .await
        .expect("handler should succeed")
}

async fn invoke(pipeline: &Pipeline, event: RawEvent) -> HttpResponse {
    let payload = serde_json::to_value(event).expect("serializable payload");
    invoke_payload(pipeline, payload, Context::default()).await
}

fn json_body(response: &HttpResponse) -> Value {
    serde_json::from_str(&response.body).expect("JSON body")
}

#[tokio::test]
async fn echoes_form_body_with_middleware_headers() {
    let event = EventBuilder::post("/echo")
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body("name=Alice&age=30")
        .request_id("gw-form")
        .build();

    let response = invoke(&pipeline(), event).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.header("x-request-id"), Some("gw-form"));
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));

    let echo = json_body(&response);
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["path"], "/echo");
    assert_eq!(echo["body"], json!({"name": "Alice", "age": "30"}));
    assert_eq!(echo["custom"]["requestId"], "gw-form");
}

#[tokio::test]
async fn lambda_context_request_id_takes_precedence() {
    let mut context = Context::default();
    context.request_id = "lambda-req-1".to_string();
    let event = EventBuilder::get("/echo").request_id("gw-ignored").build();
    let payload = serde_json::to_value(event).expect("serializable payload");

    let response = invoke_payload(&pipeline(), payload, context).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.header("X-Request-Id"), Some("lambda-req-1"));
}

#[tokio::test]
async fn passes_unknown_content_type_through() {
    let event = EventBuilder::post("/echo")
        .header("Content-Type", "text/plain")
        .body("hello")
        .build();

    let response = invoke(&pipeline(), event).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(json_body(&response)["body"], "hello");
}

#[tokio::test]
async fn decodes_base64_json_body() {
    let event = EventBuilder::post("/echo")
        .header("Content-Type", "application/json; charset=utf-8")
        .base64_body(br#"{"a":2}"#)
        .build();

    let response = invoke(&pipeline(), event).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(json_body(&response)["body"], json!({"a": 2}));
}

#[tokio::test]
async fn echoes_multipart_upload() {
    let event = EventBuilder::post("/echo")
        .multipart(
            &[("title", "Notes")],
            &[("doc", "notes.txt", "text/plain", "hello")],
        )
        .build();

    let response = invoke(&pipeline(), event).await;

    assert_eq!(response.status_code, 200);
    let echo = json_body(&response);
    assert_eq!(echo["body"]["title"], "Notes");
    assert_eq!(echo["body"]["doc"]["filename"], "notes.txt");
    assert_eq!(echo["body"]["doc"]["contentType"], "text/plain");
    assert_eq!(echo["files"][0]["fieldName"], "doc");
    assert_eq!(echo["files"][0]["size"], 5);
}

#[tokio::test]
async fn rejects_malformed_json_before_middleware() {
    let event = EventBuilder::post("/echo")
        .header("Content-Type", "application/json")
        .body("{not json")
        .build();

    let response = invoke(&pipeline(), event).await;

    assert_eq!(response.status_code, 400);
    assert_eq!(response.header("x-request-id"), None);
    let payload = json_body(&response);
    assert_eq!(payload["statusCode"], 400);
    assert_eq!(payload["error"], "Bad Request");
    assert!(payload["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));
}

#[tokio::test]
async fn rejects_body_with_password() {
    let event = EventBuilder::post("/echo")
        .header("Content-Type", "application/json")
        .body(r#"{"user":"alice","password":"hunter2"}"#)
        .build();

    let response = invoke(&pipeline(), event).await;

    assert_eq!(response.status_code, 400);
    assert_eq!(
        json_body(&response),
        json!({
            "statusCode": 400,
            "error": "Bad Request",
            "message": "\"password\" is not allowed"
        })
    );
}

#[tokio::test]
async fn rejects_unknown_query_parameter() {
    let event = EventBuilder::get("/echo").query("debug", "1").build();

    let response = invoke(&pipeline(), event).await;

    assert_eq!(response.status_code, 400);
    let message = json_body(&response)["message"].as_str().unwrap().to_string();
    assert!(message.contains("unknown field"), "unexpected message: {message}");
}

#[tokio::test]
async fn query_is_validated_before_body() {
    let event = EventBuilder::post("/echo")
        .query("debug", "1")
        .header("Content-Type", "application/json")
        .body(r#"{"password":"hunter2"}"#)
        .build();

    let response = invoke(&pipeline(), event).await;

    assert_eq!(response.status_code, 400);
    let message = json_body(&response)["message"].as_str().unwrap().to_string();
    assert!(message.contains("debug"), "unexpected message: {message}");
}

#[tokio::test]
async fn redirects_when_requested() {
    let event = EventBuilder::get("/echo")
        .query("redirect", "https://example.com/next")
        .build();

    let response = invoke(&pipeline(), event).await;

    assert_eq!(response.status_code, 302);
    assert_eq!(response.header("location"), Some("https://example.com/next"));
    assert_eq!(response.body, "");
}

#[tokio::test]
async fn serves_bundled_static_file() {
    let event = EventBuilder::get("/static/about.txt")
        .param("file", "about.txt")
        .build();

    let response = invoke(&pipeline(), event).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(
        response.header("content-type"),
        Some("text/plain; charset=utf-8")
    );
    assert_eq!(response.body, "apigw-adapter echo function\n");
}

#[tokio::test]
async fn serves_file_from_configured_root() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").expect("write file");
    let pipeline = build_pipeline(AdapterConfig::default().with_static_root(dir.path()));

    let event = EventBuilder::get("/static/index.html")
        .param("file", "index.html")
        .build();
    let response = invoke(&pipeline, event).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(
        response.header("Content-Type"),
        Some("text/html; charset=utf-8")
    );
    assert_eq!(response.body, "<h1>home</h1>");
}

#[tokio::test]
async fn missing_file_is_not_found_and_keeps_headers() {
    let event = EventBuilder::get("/static/missing.txt")
        .param("file", "missing.txt")
        .request_id("gw-missing")
        .build();

    let response = invoke(&pipeline(), event).await;

    assert_eq!(response.status_code, 404);
    assert_eq!(response.header("x-request-id"), Some("gw-missing"));
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(
        json_body(&response),
        json!({
            "statusCode": 404,
            "error": "Not Found",
            "message": "resource 'missing.txt' not found"
        })
    );
}

#[tokio::test]
async fn rejects_path_traversal_in_file_param() {
    let event = EventBuilder::get("/static/x")
        .param("file", "../Cargo.toml")
        .build();

    let response = invoke(&pipeline(), event).await;

    assert_eq!(response.status_code, 400);
    assert!(!response.body.contains("[package]"));
}

#[tokio::test]
async fn non_proxy_payload_is_internal_error() {
    let response = invoke_payload(&pipeline(), json!(42), Context::default()).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(
        json_body(&response),
        json!({
            "statusCode": 500,
            "error": "Internal Server Error",
            "message": "An internal server error occurred"
        })
    );
}

#[tokio::test]
async fn invocations_do_not_share_state() {
    let pipeline = pipeline();

    let first = EventBuilder::get("/echo")
        .header("Origin", "https://app.example.com")
        .build();
    let first = json_body(&invoke(&pipeline, first).await);
    assert_eq!(first["custom"]["origin"], "https://app.example.com");

    let second = json_body(&invoke(&pipeline, EventBuilder::get("/echo").build()).await);
    assert!(second["custom"].get("origin").is_none());
}

#[tokio::test]
async fn accepts_raw_api_gateway_event() {
    let payload = json!({
        "resource": "/echo",
        "path": "/echo",
        "httpMethod": "PUT",
        "headers": {"Content-Type": "application/json", "Host": "api.example.com"},
        "multiValueHeaders": {},
        "queryStringParameters": {"greeting": "hi"},
        "pathParameters": null,
        "stageVariables": null,
        "requestContext": {"requestId": "gw-raw", "stage": "prod"},
        "body": "{\"count\":3}",
        "isBase64Encoded": false
    });

    let response = invoke_payload(&pipeline(), payload, Context::default()).await;

    assert_eq!(response.status_code, 200);
    let echo = json_body(&response);
    assert_eq!(echo["method"], "PUT");
    assert_eq!(echo["query"]["greeting"], "hi");
    assert_eq!(echo["params"], json!({}));
    assert_eq!(echo["body"], json!({"count": 3}));
    assert_eq!(echo["custom"]["requestId"], "gw-raw");
}
