use reqchain::error::Error;
use reqchain::{ApiRequest, ClientConfig, Executor, Method, RequestDeclaration};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize)]
struct Report {
    ready: bool,
    rows: Vec<u64>,
}

/// Polling endpoint: validation demands a retry until the report is ready.
#[derive(Debug, Serialize)]
struct FetchReport {
    id: u64,
}

static FETCH_REPORT: LazyLock<RequestDeclaration> = LazyLock::new(|| {
    RequestDeclaration::new("FetchReport", Method::Get, "/reports/{id}")
        .attempts(3)
        .attempt_delay(Duration::ZERO)
});

impl ApiRequest for FetchReport {
    type Output = Report;

    fn declaration() -> &'static RequestDeclaration {
        &FETCH_REPORT
    }

    fn validate(&self, value: &Value) -> Result<(), Error> {
        if value["ready"].as_bool() == Some(true) {
            Ok(())
        } else {
            Err(Error::RetryRequested {
                message: "report not ready".into(),
            })
        }
    }
}

async fn executor_for(server: &MockServer) -> Executor {
    let executor = Executor::builder(ClientConfig::new(server.uri()).unwrap())
        .build()
        .unwrap();
    executor.register::<FetchReport>(Vec::new()).await;
    executor
}

#[tokio::test]
async fn test_validation_retry_succeeds_within_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reports/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"ready": false, "rows": []})),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reports/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"ready": true, "rows": [1, 2]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(&server).await;
    let response = executor.execute(FetchReport { id: 7 }).await.unwrap();
    assert!(!response.is_error());
    assert_eq!(response.result().unwrap().rows, vec![1, 2]);
}

#[tokio::test]
async fn test_exhaustion_returns_the_last_response_with_natural_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reports/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"ready": false, "rows": []})),
        )
        .expect(3)
        .mount(&server)
        .await;

    let executor = executor_for(&server).await;
    let response = executor.execute(FetchReport { id: 7 }).await.unwrap();
    // Not escalated: the last response keeps its own status, the retry
    // message explains the exhaustion, and the wire body stays available.
    assert!(response.is_error());
    assert_eq!(response.status(), 200);
    assert_eq!(response.message(), "report not ready");
    assert!(response.raw().unwrap().contains("\"ready\":false"));
}

#[tokio::test]
async fn test_http_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reports/7"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": "no such report"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_for(&server).await;
    let response = executor.execute(FetchReport { id: 7 }).await.unwrap();
    assert!(response.is_error());
    assert_eq!(response.status(), 404);
    assert_eq!(
        response.message(),
        "Bad request, please contact the service administrator"
    );
}

#[tokio::test]
async fn test_connection_refused_maps_to_bad_gateway() {
    // Nothing listens on this port.
    let executor = Executor::builder(ClientConfig::new("http://127.0.0.1:9").unwrap())
        .build()
        .unwrap();
    executor.register::<FetchReport>(Vec::new()).await;

    let response = executor.execute(FetchReport { id: 1 }).await.unwrap();
    assert!(response.is_error());
    assert_eq!(response.status(), 502);
    assert_eq!(response.message(), "The data server is not responding");
}

#[tokio::test]
async fn test_debug_mode_exposes_remote_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reports/7"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": "database exploded"
        })))
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri()).unwrap().debug(true);
    let executor = Executor::builder(config).build().unwrap();
    executor.register::<FetchReport>(Vec::new()).await;

    let response = executor.execute(FetchReport { id: 7 }).await.unwrap();
    assert!(response.is_error());
    assert_eq!(response.status(), 500);
    let details = response.details().unwrap();
    assert_eq!(details["body"]["error"], "database exploded");
}
