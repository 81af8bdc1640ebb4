use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use agriscan_core::{adapt_prediction, JobId};
use agriscan_logging::{scan_debug, scan_warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::client::{AnalysisBackend, ReqwestBackend};
use crate::poll::{ChannelProgressSink, JobPoller, PollSettings};
use crate::settings::ClientSettings;
use crate::store::KeyValueStore;
use crate::submit::JobSubmitter;
use crate::{ApiError, EngineEvent, FailureKind, UploadFile};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("{0}")]
    Client(#[from] ApiError),
}

enum EngineCommand {
    Submit { files: Vec<UploadFile> },
    Poll { job_id: JobId },
    Predict {
        file: UploadFile,
        image_path: String,
        top_k: u32,
    },
    Cancel,
    WatchInterrupts,
}

/// The single operation allowed to run at a time, with its cancellation token.
#[derive(Clone, Default)]
struct ActiveSlot {
    token: Arc<Mutex<Option<CancellationToken>>>,
}

impl ActiveSlot {
    /// Claims the slot, or returns `None` when something is already running.
    fn claim(&self) -> Option<CancellationToken> {
        let mut slot = self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            return None;
        }
        let token = CancellationToken::new();
        *slot = Some(token.clone());
        Some(token)
    }

    fn release(&self) {
        let mut slot = self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }

    fn cancel(&self) -> bool {
        let slot = self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match slot.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Owns the async runtime on its own thread; the caller talks to it through channels.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: ClientSettings, store: Arc<dyn KeyValueStore>) -> Result<Self, EngineError> {
        let backend = ReqwestBackend::new(&settings, store)?;
        Self::with_backend(Arc::new(backend), settings)
    }

    pub fn with_backend(
        backend: Arc<dyn AnalysisBackend>,
        settings: ClientSettings,
    ) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;
        let active = ActiveSlot::default();

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Cancel => {
                        if !active.cancel() {
                            scan_debug!("Cancel requested with nothing running");
                        }
                    }
                    EngineCommand::WatchInterrupts => {
                        let active = active.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(watch_interrupts(active, event_tx));
                    }
                    command => {
                        let Some(token) = active.claim() else {
                            scan_warn!("Engine busy; refusing new work");
                            let _ = event_tx.send(EngineEvent::Busy);
                            continue;
                        };
                        let backend = backend.clone();
                        let settings = settings.clone();
                        let event_tx = event_tx.clone();
                        let active = active.clone();
                        runtime.spawn(async move {
                            let finished =
                                run_command(backend.as_ref(), &settings, command, token, &event_tx)
                                    .await;
                            // The slot is free before the final event is observable.
                            active.release();
                            if let Some(event) = finished {
                                let _ = event_tx.send(event);
                            }
                        });
                    }
                }
            }
            scan_debug!("Engine command channel closed");
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn submit(&self, files: Vec<UploadFile>) {
        let _ = self.cmd_tx.send(EngineCommand::Submit { files });
    }

    pub fn poll(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::Poll { job_id });
    }

    pub fn predict(&self, file: UploadFile, image_path: impl Into<String>, top_k: u32) {
        let _ = self.cmd_tx.send(EngineCommand::Predict {
            file,
            image_path: image_path.into(),
            top_k,
        });
    }

    pub fn cancel(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel);
    }

    /// Turn Ctrl-C into a cancellation of the running operation plus an
    /// `Interrupted` event.
    pub fn watch_interrupts(&self) {
        let _ = self.cmd_tx.send(EngineCommand::WatchInterrupts);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

/// Runs one command to completion and returns the event that reports its end.
async fn run_command(
    backend: &dyn AnalysisBackend,
    settings: &ClientSettings,
    command: EngineCommand,
    token: CancellationToken,
    event_tx: &mpsc::Sender<EngineEvent>,
) -> Option<EngineEvent> {
    match command {
        EngineCommand::Submit { files } => {
            let submitter = JobSubmitter::new(backend, settings.max_file_bytes);
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => EngineEvent::SubmissionFailed(ApiError::new(
                    FailureKind::Cancelled,
                    "Submission cancelled.",
                )),
                result = submitter.submit(&files) => match result {
                    Ok(job) => EngineEvent::Submitted(job),
                    Err(err) => EngineEvent::SubmissionFailed(err),
                },
            };
            Some(event)
        }
        EngineCommand::Poll { job_id } => {
            let sink = ChannelProgressSink::new(event_tx.clone());
            let poller = JobPoller::new(backend, PollSettings::from(settings));
            let outcome = poller.poll(&job_id, &sink, &token).await;
            scan_debug!("Job {} finished polling: {:?}", job_id, outcome);
            Some(EngineEvent::JobFinished { job_id, outcome })
        }
        EngineCommand::Predict {
            file,
            image_path,
            top_k,
        } => {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => Err(ApiError::new(
                    FailureKind::Cancelled,
                    "Prediction cancelled.",
                )),
                result = predict(backend, settings, &file, &image_path, top_k) => result,
            };
            Some(EngineEvent::PredictionFinished(result))
        }
        EngineCommand::Cancel | EngineCommand::WatchInterrupts => None,
    }
}

async fn predict(
    backend: &dyn AnalysisBackend,
    settings: &ClientSettings,
    file: &UploadFile,
    image_path: &str,
    top_k: u32,
) -> Result<agriscan_core::DetectionResult, ApiError> {
    crate::submit::check_sizes(std::slice::from_ref(file), settings.max_file_bytes)?;
    let response = backend.predict(file, top_k).await?;
    adapt_prediction(&response, image_path)
        .map_err(|err| ApiError::new(FailureKind::InvalidResponse, err.to_string()))
}

async fn watch_interrupts(active: ActiveSlot, event_tx: mpsc::Sender<EngineEvent>) {
    loop {
        if let Err(err) = tokio::signal::ctrl_c().await {
            scan_warn!("Cannot listen for Ctrl-C: {}", err);
            return;
        }
        active.cancel();
        if event_tx.send(EngineEvent::Interrupted).is_err() {
            return;
        }
    }
}
