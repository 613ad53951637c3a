use crate::server::{
    app::build_app, config::ServerConfig, service::actions::THROWN_ERROR_MESSAGE,
    service::state::AppState,
};
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use core::time::Duration;
use http_body_util::BodyExt;
use tickstream_wire::{
    ErrorBody, ErrorCode, HEALTH_PATH, INCREMENT_PATH, IncrementResponse, SERVER_DATE_PATH,
    STREAM_CONTENT_TYPE, STREAM_PATH, SUBMIT_FORM_PATH, ServerDateResponse, SubmitFormResponse,
    THROW_ERROR_PATH,
};
use tokio::time::Instant;
use tower::ServiceExt;

const TICK: Duration = Duration::from_millis(1000);

fn test_config() -> ServerConfig {
    ServerConfig {
        server_addr: "127.0.0.1:0".parse().unwrap(),
        tick_interval: TICK,
        date_delay: Duration::from_millis(1000),
        submit_delay: Duration::from_millis(3000),
        max_streams: None,
        shutdown_timeout: Duration::from_secs(5),
    }
}

fn build_test_app(config: ServerConfig) -> (Router, AppState) {
    let state = AppState::new(config);
    (build_app(state.clone()), state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

async fn next_chunk(body: &mut Body) -> Option<String> {
    let frame = body.frame().await?.unwrap();
    let data = frame.into_data().unwrap();
    Some(String::from_utf8(data.to_vec()).unwrap())
}

async fn json<T: serde::de::DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test(start_paused = true)]
async fn stream_sends_paced_lines_with_octet_stream_type() {
    let (app, state) = build_test_app(test_config());

    let response = app.oneshot(get(STREAM_PATH)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        STREAM_CONTENT_TYPE
    );

    let mut body = response.into_body();
    let start = Instant::now();
    assert_eq!(next_chunk(&mut body).await.as_deref(), Some("1\n"));
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(next_chunk(&mut body).await.as_deref(), Some("2\n"));
    assert_eq!(next_chunk(&mut body).await.as_deref(), Some("3\n"));
    assert!(start.elapsed() >= TICK * 2);
    assert_eq!(state.service.streams_inflight(), 1);

    // Client disconnect.
    drop(body);
    assert_eq!(state.service.streams_inflight(), 0);
}

#[tokio::test(start_paused = true)]
async fn every_connection_starts_at_one() {
    let (app, _) = build_test_app(test_config());

    let mut first = app.clone().oneshot(get(STREAM_PATH)).await.unwrap().into_body();
    for n in 1..=4 {
        assert_eq!(next_chunk(&mut first).await, Some(format!("{n}\n")));
    }

    let mut second = app.oneshot(get(STREAM_PATH)).await.unwrap().into_body();
    let (a, b) = tokio::join!(next_chunk(&mut first), next_chunk(&mut second));
    assert_eq!(a.as_deref(), Some("5\n"));
    assert_eq!(b.as_deref(), Some("1\n"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_completes_open_streams_and_refuses_new_ones() {
    let (app, state) = build_test_app(test_config());

    let mut body = app.clone().oneshot(get(STREAM_PATH)).await.unwrap().into_body();
    assert_eq!(next_chunk(&mut body).await.as_deref(), Some("1\n"));

    let reader = tokio::spawn(async move {
        let mut rest = String::new();
        while let Some(chunk) = next_chunk(&mut body).await {
            rest.push_str(&chunk);
        }
        rest
    });

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let remaining = state.service.shutdown(Duration::from_secs(5)).await;
    assert_eq!(remaining, 0);
    assert_eq!(reader.await.unwrap(), "2\n");

    let response = app.clone().oneshot(get(STREAM_PATH)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: ErrorBody = json(response).await;
    assert_eq!(body.code, ErrorCode::ServiceShutdown);

    let response = app.oneshot(get(HEALTH_PATH)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test(start_paused = true)]
async fn max_streams_refuses_extra_connections() {
    let config = ServerConfig {
        max_streams: Some(1),
        ..test_config()
    };
    let (app, _) = build_test_app(config);

    let open = app.clone().oneshot(get(STREAM_PATH)).await.unwrap();
    assert_eq!(open.status(), StatusCode::OK);

    let refused = app.clone().oneshot(get(STREAM_PATH)).await.unwrap();
    assert_eq!(refused.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: ErrorBody = json(refused).await;
    assert_eq!(body.code, ErrorCode::ServiceOverloaded);

    drop(open);
    let reopened = app.oneshot(get(STREAM_PATH)).await.unwrap();
    assert_eq!(reopened.status(), StatusCode::OK);
}

#[tokio::test]
async fn increment_returns_next_number() {
    let (app, _) = build_test_app(test_config());

    let response = app
        .oneshot(post_json(INCREMENT_PATH, r#"{"number":7}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: IncrementResponse = json(response).await;
    assert_eq!(body.number, 8);
}

#[tokio::test]
async fn increment_rejects_bad_input() {
    let (app, _) = build_test_app(test_config());

    let malformed = app
        .clone()
        .oneshot(post_json(INCREMENT_PATH, r#"{"number":"seven"}"#))
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = json(malformed).await;
    assert_eq!(body.code, ErrorCode::InvalidRequest);

    let overflow = app
        .oneshot(post_json(INCREMENT_PATH, &format!(r#"{{"number":{}}}"#, i64::MAX)))
        .await
        .unwrap();
    assert_eq!(overflow.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn throw_error_fails_with_its_message() {
    let (app, _) = build_test_app(test_config());

    let request = Request::builder()
        .method("POST")
        .uri(THROW_ERROR_PATH)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = json(response).await;
    assert_eq!(body.error, THROWN_ERROR_MESSAGE);
    assert_eq!(body.code, ErrorCode::ActionFailed);
}

#[tokio::test(start_paused = true)]
async fn server_date_is_delayed_utc_with_millis() {
    let (app, _) = build_test_app(test_config());

    let start = Instant::now();
    let response = app.oneshot(get(SERVER_DATE_PATH)).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(1000));
    assert_eq!(response.status(), StatusCode::OK);

    let body: ServerDateResponse = json(response).await;
    assert!(body.date.ends_with('Z'), "{}", body.date);
    let parsed = chrono::DateTime::parse_from_rfc3339(&body.date).unwrap();
    assert_eq!(parsed.timestamp_subsec_nanos() % 1_000_000, 0);
}

#[tokio::test(start_paused = true)]
async fn submit_form_accepts_any_fields_after_delay() {
    let (app, _) = build_test_app(test_config());

    let request = Request::builder()
        .method("POST")
        .uri(SUBMIT_FORM_PATH)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("name=Ada&email=ada%40example.com&name=again"))
        .unwrap();

    let start = Instant::now();
    let response = app.oneshot(request).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(3000));
    assert_eq!(response.status(), StatusCode::OK);

    let body: SubmitFormResponse = json(response).await;
    assert!(body.success);
}

#[tokio::test]
async fn healthz_reports_ok_while_serving() {
    let (app, _) = build_test_app(test_config());

    let response = app.oneshot(get(HEALTH_PATH)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}
