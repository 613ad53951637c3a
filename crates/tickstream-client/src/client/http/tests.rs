use super::*;
use axum::{
    Json, Router,
    body::Body,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::{get, post},
};
use core::time::Duration;
use tickstream::{ConsumerState, SequenceProducer, StreamConsumer};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_millis(20);

async fn sequence() -> impl IntoResponse {
    let producer = SequenceProducer::new(TICK, CancellationToken::new());
    (
        [(CONTENT_TYPE, STREAM_CONTENT_TYPE)],
        Body::from_stream(producer.into_stream()),
    )
}

/// Serves `router` on an ephemeral local port and returns its base URL.
async fn serve(router: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("http://{addr}")).unwrap()
}

#[test]
fn endpoint_replaces_the_base_path() {
    let base = Url::parse("http://localhost:3000/ignored").unwrap();
    assert_eq!(
        endpoint(&base, STREAM_PATH).unwrap().as_str(),
        "http://localhost:3000/streaming/api"
    );
}

#[tokio::test]
async fn reads_the_stream_until_aborted() {
    let base = serve(Router::new().route(STREAM_PATH, get(sequence))).await;
    let connector = HttpConnector::new(Client::new(), &base).unwrap();
    let mut consumer = StreamConsumer::new(connector);
    let abort = consumer.abort_handle();

    let mut lines = 0;
    let report = consumer
        .start(|text| {
            lines += text.matches('\n').count();
            if lines >= 3 {
                abort.abort();
            }
        })
        .await
        .unwrap();

    assert_eq!(report.state, ConsumerState::Aborted);
    assert!(consumer.output().starts_with("1\n2\n3\n"));
}

#[tokio::test]
async fn wrong_content_type_is_not_a_stream() {
    let router = Router::new().route(STREAM_PATH, get(|| async { "1\n2\n" }));
    let base = serve(router).await;
    let mut consumer = StreamConsumer::new(HttpConnector::new(Client::new(), &base).unwrap());

    let err = consumer.start(|_| {}).await.unwrap_err();
    assert!(matches!(err, tickstream::Error::UnexpectedResponse(_)));
    assert_eq!(consumer.state(), ConsumerState::Closed);
}

#[tokio::test]
async fn refused_stream_reports_the_server_error() {
    let router = Router::new().route(
        STREAM_PATH,
        get(|| async { tickstream_wire::Error::ServiceShutdown }),
    );
    let base = serve(router).await;
    let mut consumer = StreamConsumer::new(HttpConnector::new(Client::new(), &base).unwrap());

    let err = consumer.start(|_| {}).await.unwrap_err();
    let tickstream::Error::UnexpectedResponse(message) = err else {
        panic!("unexpected error: {err}");
    };
    assert!(message.contains("503"), "{message}");
    assert!(message.contains("Service is shutting down"), "{message}");
}

#[tokio::test]
async fn actions_decode_success_and_error_bodies() {
    let router = Router::new()
        .route(
            INCREMENT_PATH,
            post(|Json(request): Json<IncrementRequest>| async move {
                Json(IncrementResponse {
                    number: request.number + 1,
                })
            }),
        )
        .route(
            THROW_ERROR_PATH,
            post(|| async {
                tickstream_wire::Error::ActionFailed {
                    message: "Error thrown from action".to_string(),
                }
            }),
        );
    let actions = ActionClient::new(Client::new(), serve(router).await);

    assert_eq!(actions.increment(41).await.unwrap(), 42);

    let err = actions.throw_error().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Server(tickstream_wire::Error::ActionFailed { .. })
    ));
    assert_eq!(err.to_string(), "Error thrown from action");
}

#[tokio::test]
async fn unreachable_server_is_a_connect_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = Url::parse(&format!("http://{addr}")).unwrap();
    let mut consumer = StreamConsumer::new(HttpConnector::new(Client::new(), &base).unwrap());

    let err = consumer.start(|_| {}).await.unwrap_err();
    assert!(matches!(err, tickstream::Error::Connect(_)));
}
