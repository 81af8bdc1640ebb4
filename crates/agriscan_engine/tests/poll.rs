use std::sync::{Arc, Mutex};
use std::time::Duration;

use agriscan_core::{AnalysisResult, JobId, JobStatus};
use agriscan_engine::{
    ClientSettings, EngineEvent, FailureKind, JobOutcome, JobPoller, MemoryStore, PollProgress,
    PollSettings, ProgressSink, ReqwestBackend,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STATUS_PATH: &str = "/predict/multispectral/status/job-1";

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn statuses(&self) -> Vec<JobStatus> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Progress(PollProgress { status, .. }) => Some(status.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn backend(server: &MockServer) -> ReqwestBackend {
    agriscan_logging::initialize_for_tests();
    let settings = ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    };
    ReqwestBackend::new(&settings, Arc::new(MemoryStore::with_token("tok"))).expect("backend")
}

fn fast(max_iterations: u32) -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(5),
        max_iterations,
        retries: 2,
        retry_delay: Duration::from_millis(5),
    }
}

fn status(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

#[tokio::test]
async fn stops_after_exactly_the_iteration_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(status(json!({"status": "processing"})))
        .expect(4)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let sink = TestSink::default();
    let outcome = JobPoller::new(&backend, fast(4))
        .poll(&JobId::new("job-1"), &sink, &CancellationToken::new())
        .await;

    assert_eq!(outcome, JobOutcome::TimedOut { iterations: 4 });
    assert_eq!(sink.statuses(), vec![JobStatus::Processing; 4]);
    server.verify().await;
}

#[tokio::test]
async fn failed_job_stops_after_one_check_with_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(status(json!({"status": "failed", "error": "Band B5 is corrupt"})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let outcome = JobPoller::new(&backend, fast(10))
        .poll(&JobId::new("job-1"), &TestSink::default(), &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        JobOutcome::Failed {
            message: "Band B5 is corrupt".to_string()
        }
    );
    server.verify().await;
}

#[tokio::test]
async fn failed_job_without_message_uses_generic_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(status(json!({"status": "failed", "error": null})))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let outcome = JobPoller::new(&backend, fast(10))
        .poll(&JobId::new("job-1"), &TestSink::default(), &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        JobOutcome::Failed {
            message: "Analysis failed".to_string()
        }
    );
}

#[tokio::test]
async fn completed_job_is_adapted_after_pending_checks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(status(json!({"status": "pending"})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(status(json!({
            "status": "completed",
            "result": {
                "status": "success",
                "filename": "LC09.zip",
                "results": {
                    "best_crop": "Maize",
                    "prediction": "Maize fits best.",
                    "analysis_summary": {"total_pixels": 10, "valid_pixels": 9, "bands_processed": ["B4"]}
                }
            }
        })))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let sink = TestSink::default();
    let outcome = JobPoller::new(&backend, fast(10))
        .poll(&JobId::new("job-1"), &sink, &CancellationToken::new())
        .await;

    match outcome {
        JobOutcome::Completed {
            result: AnalysisResult::Full(full),
            filename,
        } => {
            assert_eq!(full.best_crop, "Maize");
            assert_eq!(full.summary.valid_pixels, 9);
            assert_eq!(filename.as_deref(), Some("LC09.zip"));
        }
        other => panic!("expected full result, got {other:?}"),
    }
    assert_eq!(
        sink.statuses(),
        vec![JobStatus::Pending, JobStatus::Pending, JobStatus::Completed]
    );
}

#[tokio::test]
async fn completed_job_with_wrong_shape_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(status(json!({
            "status": "completed",
            "result": {"results": {"analysis_summary": {}, "environmental_statistics": 7}}
        })))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let outcome = JobPoller::new(&backend, fast(3))
        .poll(&JobId::new("job-1"), &TestSink::default(), &CancellationToken::new())
        .await;

    assert!(matches!(outcome, JobOutcome::Malformed { .. }), "{outcome:?}");
}

#[tokio::test]
async fn transient_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(status(json!({"status": "failed", "error": "boom"})))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let sink = TestSink::default();
    let outcome = JobPoller::new(&backend, fast(1))
        .poll(&JobId::new("job-1"), &sink, &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        JobOutcome::Failed {
            message: "boom".to_string()
        }
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    // Retries belong to one iteration.
    assert_eq!(sink.statuses(), vec![JobStatus::Failed]);
}

#[tokio::test]
async fn client_errors_end_polling_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Job not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let outcome = JobPoller::new(&backend, fast(10))
        .poll(&JobId::new("job-1"), &TestSink::default(), &CancellationToken::new())
        .await;

    match outcome {
        JobOutcome::TransportFailed(err) => {
            assert_eq!(err.kind, FailureKind::HttpStatus(404));
            assert_eq!(err.message, "Job not found");
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
    server.verify().await;
}

#[tokio::test]
async fn cancellation_stops_the_loop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(status(json!({"status": "processing"})))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let settings = PollSettings {
        interval: Duration::from_millis(20),
        ..fast(1_000)
    };
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(70)).await;
        trigger.cancel();
    });

    let outcome = JobPoller::new(&backend, settings)
        .poll(&JobId::new("job-1"), &TestSink::default(), &cancel)
        .await;

    assert_eq!(outcome, JobOutcome::Cancelled);
    assert!(server.received_requests().await.unwrap().len() < 10);
}

#[tokio::test]
async fn cancelled_before_start_makes_no_request() {
    let server = MockServer::start().await;
    let backend = backend(&server);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = JobPoller::new(&backend, fast(5))
        .poll(&JobId::new("job-1"), &TestSink::default(), &cancel)
        .await;

    assert_eq!(outcome, JobOutcome::Cancelled);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn job_id_is_sent_as_one_encoded_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/predict/multispectral/status/a%2Fb%3Fc%23d"))
        .respond_with(status(json!({"status": "failed", "error": "boom"})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let outcome = JobPoller::new(&backend, fast(3))
        .poll(&JobId::new("a/b?c#d"), &TestSink::default(), &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        JobOutcome::Failed {
            message: "boom".to_string()
        }
    );
    server.verify().await;
}

#[tokio::test]
async fn dot_segment_job_id_is_refused_locally() {
    let server = MockServer::start().await;
    let backend = backend(&server);

    let outcome = JobPoller::new(&backend, fast(3))
        .poll(&JobId::new(".."), &TestSink::default(), &CancellationToken::new())
        .await;

    match outcome {
        JobOutcome::TransportFailed(err) => assert_eq!(err.kind, FailureKind::InvalidUrl),
        other => panic!("expected local failure, got {other:?}"),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}
