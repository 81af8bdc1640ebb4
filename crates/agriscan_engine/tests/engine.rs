use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agriscan_core::{JobId, JobStatus, PredictionItem, PredictionResponse, Severity};
use agriscan_engine::{
    AnalysisBackend, ApiError, ClientSettings, EngineEvent, EngineHandle, FailureKind,
    JobOutcome, JobStatusReport, SubmittedJob, UploadFile,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const WAIT: Duration = Duration::from_secs(5);

/// Backend that accepts every upload and reports `processing` a fixed number
/// of times before completing.
struct ScriptedBackend {
    processing_checks: u32,
    checks: AtomicU32,
    submits: AtomicU32,
}

impl ScriptedBackend {
    fn new(processing_checks: u32) -> Self {
        Self {
            processing_checks,
            checks: AtomicU32::new(0),
            submits: AtomicU32::new(0),
        }
    }
}

#[async_trait::async_trait]
impl AnalysisBackend for ScriptedBackend {
    async fn submit_multispectral(&self, _files: &[UploadFile]) -> Result<SubmittedJob, ApiError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        Ok(SubmittedJob {
            job_id: JobId::new("job-1"),
            status: JobStatus::Pending,
        })
    }

    async fn job_status(&self, _job_id: &JobId) -> Result<JobStatusReport, ApiError> {
        let seen = self.checks.fetch_add(1, Ordering::SeqCst);
        if seen < self.processing_checks {
            return Ok(JobStatusReport {
                status: JobStatus::Processing,
                result: None,
                error: None,
            });
        }
        Ok(JobStatusReport {
            status: JobStatus::Completed,
            result: Some(json!({"status": "limited", "results": {}})),
            error: None,
        })
    }

    async fn predict(&self, _file: &UploadFile, top_k: u32) -> Result<PredictionResponse, ApiError> {
        assert_eq!(top_k, 3);
        Ok(PredictionResponse {
            status: "success".to_string(),
            filename: Some("leaf.jpg".to_string()),
            predictions: vec![PredictionItem {
                class_name: "Tomato_Leaf_Blight".to_string(),
                confidence: 0.8712,
                confidence_percentage: "87.12%".to_string(),
            }],
            total_classes: 1,
            recommendations: None,
            llm_available: false,
        })
    }
}

fn settings() -> ClientSettings {
    agriscan_logging::initialize_for_tests();
    ClientSettings {
        poll_interval: Duration::from_millis(5),
        max_file_bytes: 64,
        ..ClientSettings::default()
    }
}

fn next(engine: &EngineHandle) -> EngineEvent {
    engine.recv_timeout(WAIT).expect("engine event")
}

fn finished(engine: &EngineHandle) -> (JobId, JobOutcome) {
    loop {
        match next(engine) {
            EngineEvent::JobFinished { job_id, outcome } => return (job_id, outcome),
            EngineEvent::Progress(_) => continue,
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[test]
fn submit_then_poll_to_completion() {
    let backend = Arc::new(ScriptedBackend::new(2));
    let engine = EngineHandle::with_backend(backend.clone(), settings()).unwrap();

    engine.submit(vec![UploadFile::new("MTL.txt", b"meta".to_vec())]);
    let job = match next(&engine) {
        EngineEvent::Submitted(job) => job,
        other => panic!("expected submission, got {other:?}"),
    };
    assert_eq!(job.job_id, JobId::new("job-1"));

    // Issued straight after the submission event; must not be refused as busy.
    engine.poll(job.job_id.clone());
    let mut iterations = Vec::new();
    let outcome = loop {
        match next(&engine) {
            EngineEvent::Progress(progress) => iterations.push(progress.iteration),
            EngineEvent::JobFinished { outcome, .. } => break outcome,
            other => panic!("unexpected event {other:?}"),
        }
    };

    assert_eq!(iterations, vec![1, 2, 3]);
    assert!(matches!(outcome, JobOutcome::Completed { .. }), "{outcome:?}");
    assert_eq!(backend.submits.load(Ordering::SeqCst), 1);
}

#[test]
fn second_operation_while_polling_is_refused() {
    let engine = EngineHandle::with_backend(
        Arc::new(ScriptedBackend::new(u32::MAX)),
        ClientSettings {
            poll_interval: Duration::from_millis(20),
            ..settings()
        },
    )
    .unwrap();

    engine.poll(JobId::new("job-1"));
    assert!(matches!(next(&engine), EngineEvent::Progress(_)));

    engine.submit(vec![UploadFile::new("MTL.txt", b"meta".to_vec())]);
    loop {
        match next(&engine) {
            EngineEvent::Busy => break,
            EngineEvent::Progress(_) => continue,
            other => panic!("unexpected event {other:?}"),
        }
    }

    engine.cancel();
    let (job_id, outcome) = finished(&engine);
    assert_eq!(job_id, JobId::new("job-1"));
    assert_eq!(outcome, JobOutcome::Cancelled);
}

#[test]
fn oversize_submission_fails_locally() {
    let backend = Arc::new(ScriptedBackend::new(0));
    let engine = EngineHandle::with_backend(backend.clone(), settings()).unwrap();

    engine.submit(vec![UploadFile::new("bands.zip", vec![0u8; 65])]);
    match next(&engine) {
        EngineEvent::SubmissionFailed(err) => {
            assert!(matches!(err.kind, FailureKind::FileTooLarge { .. }));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(backend.submits.load(Ordering::SeqCst), 0);
}

#[test]
fn prediction_is_adapted_to_a_detection() {
    let engine =
        EngineHandle::with_backend(Arc::new(ScriptedBackend::new(0)), settings()).unwrap();

    engine.predict(UploadFile::new("leaf.jpg", vec![1u8; 8]), "/tmp/leaf.jpg", 3);
    match next(&engine) {
        EngineEvent::PredictionFinished(Ok(detection)) => {
            assert_eq!(detection.disease, "Tomato_Leaf_Blight");
            assert_eq!(detection.crop_type, "Tomato");
            assert_eq!(detection.severity, Severity::Severe);
            assert_eq!(detection.image_path, "/tmp/leaf.jpg");
            assert!((detection.confidence - 87.1).abs() < 1e-9);
        }
        other => panic!("expected detection, got {other:?}"),
    }
}
