use std::sync::mpsc;
use std::time::Duration;

use agriscan_core::{adapt_analysis, payload_filename, JobId, JobStatus};
use agriscan_logging::{scan_debug, scan_info, scan_warn};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::client::AnalysisBackend;
use crate::settings::ClientSettings;
use crate::{ApiError, EngineEvent, JobOutcome, JobStatusReport, PollProgress};

const FAILED_FALLBACK: &str = "Analysis failed";

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_iterations: u32,
    pub retries: u32,
    pub retry_delay: Duration,
}

impl From<&ClientSettings> for PollSettings {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            interval: settings.poll_interval,
            max_iterations: settings.max_poll_iterations,
            retries: settings.poll_retries,
            retry_delay: settings.poll_retry_delay,
        }
    }
}

enum CheckError {
    Cancelled,
    Failed(ApiError),
}

/// Fixed-interval status poller for one job.
pub struct JobPoller<'a> {
    backend: &'a dyn AnalysisBackend,
    settings: PollSettings,
}

impl<'a> JobPoller<'a> {
    pub fn new(backend: &'a dyn AnalysisBackend, settings: PollSettings) -> Self {
        Self { backend, settings }
    }

    /// Poll until `completed`/`failed`, the iteration ceiling, or cancellation.
    ///
    /// Each iteration waits one interval, performs one status check (retried
    /// only on transient failures) and reports its status to `sink`.
    pub async fn poll(
        &self,
        job_id: &JobId,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> JobOutcome {
        for iteration in 1..=self.settings.max_iterations {
            if sleep_or_cancel(self.settings.interval, cancel).await {
                scan_info!("Polling of job {} cancelled", job_id);
                return JobOutcome::Cancelled;
            }

            let report = match self.check(job_id, cancel).await {
                Ok(report) => report,
                Err(CheckError::Cancelled) => {
                    scan_info!("Polling of job {} cancelled", job_id);
                    return JobOutcome::Cancelled;
                }
                Err(CheckError::Failed(err)) => {
                    scan_warn!("Status check {} for job {} failed: {}", iteration, job_id, err);
                    return JobOutcome::TransportFailed(err);
                }
            };

            scan_debug!("Job {} poll {}: {}", job_id, iteration, report.status);
            sink.emit(EngineEvent::Progress(PollProgress {
                job_id: job_id.clone(),
                iteration,
                status: report.status.clone(),
            }));

            match report.status {
                JobStatus::Completed => return completed(report.result),
                JobStatus::Failed => {
                    let message = report
                        .error
                        .filter(|message| !message.trim().is_empty())
                        .unwrap_or_else(|| FAILED_FALLBACK.to_string());
                    return JobOutcome::Failed { message };
                }
                _ => {}
            }
        }

        JobOutcome::TimedOut {
            iterations: self.settings.max_iterations,
        }
    }

    async fn check(
        &self,
        job_id: &JobId,
        cancel: &CancellationToken,
    ) -> Result<JobStatusReport, CheckError> {
        let mut attempt = 0;
        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CheckError::Cancelled),
                result = self.backend.job_status(job_id) => result,
            };

            match result {
                Ok(report) => return Ok(report),
                Err(err) if err.is_transient() && attempt < self.settings.retries => {
                    attempt += 1;
                    scan_warn!(
                        "Transient status failure for job {} (attempt {}): {}",
                        job_id,
                        attempt,
                        err
                    );
                    if sleep_or_cancel(self.settings.retry_delay, cancel).await {
                        return Err(CheckError::Cancelled);
                    }
                }
                Err(err) => return Err(CheckError::Failed(err)),
            }
        }
    }
}

fn completed(payload: Option<Value>) -> JobOutcome {
    let payload = payload.unwrap_or(Value::Null);
    match adapt_analysis(&payload) {
        Ok(result) => JobOutcome::Completed {
            result,
            filename: payload_filename(&payload),
        },
        Err(err) => JobOutcome::Malformed {
            message: err.to_string(),
        },
    }
}

/// Returns true when the token fired before the delay elapsed.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
