use std::fs;
use std::path::Path;
use std::time::Duration;

use agriscan_core::{Effect, Msg, SelectedFile};
use agriscan_engine::{EngineEvent, EngineHandle, JobOutcome, ResumptionGuard, UploadFile};
use agriscan_logging::{scan_error, scan_info, scan_warn};

/// Executes effects against the engine and the resumption store, and turns
/// engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    guard: ResumptionGuard,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, guard: ResumptionGuard) -> Self {
        Self { engine, guard }
    }

    pub fn guard(&self) -> &ResumptionGuard {
        &self.guard
    }

    pub fn watch_interrupts(&self) {
        self.engine.watch_interrupts();
    }

    /// Runs effects in order. Failures that never reach the engine come back
    /// as messages to dispatch.
    pub fn run(&self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut follow_up = Vec::new();
        for effect in effects {
            match effect {
                Effect::SubmitJob { files } => match read_all(&files) {
                    Ok(uploads) => {
                        scan_info!("SubmitJob files={}", uploads.len());
                        self.engine.submit(uploads);
                    }
                    Err(message) => follow_up.push(Msg::SubmissionFailed { message }),
                },
                Effect::PredictImage { file, top_k } => match read_one(&file) {
                    Ok(upload) => {
                        scan_info!("PredictImage file={} top_k={}", file.name, top_k);
                        self.engine
                            .predict(upload, file.path.display().to_string(), top_k);
                    }
                    Err(message) => follow_up.push(Msg::PredictionFailed { message }),
                },
                Effect::PersistJobId { job_id } => {
                    if let Err(err) = self.guard.persist(&job_id) {
                        scan_error!("Could not record job {} for resumption: {}", job_id, err);
                        follow_up.push(Msg::JobNotRecorded {
                            job_id,
                            message: err.to_string(),
                        });
                    }
                }
                Effect::StartPolling { job_id } => {
                    scan_info!("StartPolling job_id={}", job_id);
                    self.engine.poll(job_id);
                }
                Effect::ClearPersistedJob => {
                    if let Err(err) = self.guard.clear() {
                        scan_error!("Could not clear the tracked job: {}", err);
                    }
                }
                Effect::CancelAnalysis => self.engine.cancel(),
            }
        }
        follow_up
    }

    pub fn next_message(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(map_event)
    }
}

fn read_one(file: &SelectedFile) -> Result<UploadFile, String> {
    read_upload(&file.path, &file.name)
}

fn read_all(files: &[SelectedFile]) -> Result<Vec<UploadFile>, String> {
    files.iter().map(read_one).collect()
}

fn read_upload(path: &Path, name: &str) -> Result<UploadFile, String> {
    fs::read(path)
        .map(|contents| UploadFile::new(name, contents))
        .map_err(|err| format!("Could not read {}: {}", path.display(), err))
}

pub fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Submitted(job) => Msg::JobSubmitted {
            job_id: job.job_id,
            status: job.status,
        },
        EngineEvent::SubmissionFailed(err) => Msg::SubmissionFailed {
            message: err.message,
        },
        EngineEvent::Progress(progress) => Msg::PollProgressed {
            job_id: progress.job_id,
            iteration: progress.iteration,
            status: progress.status,
        },
        EngineEvent::JobFinished { job_id, outcome } => match outcome {
            JobOutcome::Completed { result, filename } => Msg::JobCompleted {
                job_id,
                result,
                filename,
            },
            JobOutcome::Failed { message } => Msg::JobFailed { job_id, message },
            JobOutcome::TimedOut { iterations } => Msg::JobTimedOut { job_id, iterations },
            JobOutcome::Cancelled => Msg::JobCancelled { job_id },
            JobOutcome::TransportFailed(err) => Msg::PollTransportFailed {
                job_id,
                message: err.message,
            },
            JobOutcome::Malformed { message } => Msg::ResultRejected { job_id, message },
        },
        EngineEvent::PredictionFinished(Ok(detection)) => Msg::PredictionCompleted(detection),
        EngineEvent::PredictionFinished(Err(err)) => Msg::PredictionFailed {
            message: err.message,
        },
        EngineEvent::Busy => {
            scan_warn!("Engine refused work while another analysis was active");
            Msg::NoOp
        }
        EngineEvent::Interrupted => Msg::CancelClicked,
    }
}
