use agriscan_logging::{scan_debug, scan_info, scan_warn};

use crate::history::SPECTRAL_PREVIEW_PLACEHOLDER;
use crate::{
    plan_upload, AnalysisPhase, AnalysisResult, AppState, ChatHistoryEntry, DetectionResult,
    Effect, EntryResult, FailureCategory, FileKind, JobId, Msg, UploadRoute,
};

const BUSY_MESSAGE: &str = "Analysis already in progress";
const TIMEOUT_MESSAGE: &str = "Analysis timed out. Please try again later.";
const COMPLETE_NOTICE: &str =
    "Analysis complete! Your results are now available in the chat history.";
const RESUMED_FILE_NAME: &str = "multispectral.zip";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FilesSelected(files) => {
            if state.is_busy() {
                state.set_error(BUSY_MESSAGE);
                return (state, Vec::new());
            }
            // Fail fast on size and type before anything is uploaded.
            match plan_upload(&files, state.multispectral(), state.max_file_bytes()) {
                Ok(_) => state.set_selection(files),
                Err(err) => {
                    scan_warn!("Rejected selection: {}", err);
                    state.clear_selection();
                    state.set_error(err.to_string());
                }
            }
            Vec::new()
        }
        Msg::MultispectralModeSet(on) => {
            state.set_multispectral(on);
            Vec::new()
        }
        Msg::SubmitClicked => submit(&mut state),
        Msg::Started { pending_job } => match pending_job {
            Some(job_id) if !state.is_busy() => {
                scan_info!("Resuming pending job {}", job_id);
                state.begin(
                    AnalysisPhase::Polling {
                        job_id: job_id.clone(),
                        iteration: 0,
                    },
                    10.0,
                );
                state.push_log("Resuming multispectral analysis...");
                vec![Effect::StartPolling { job_id }]
            }
            _ => Vec::new(),
        },
        Msg::JobSubmitted { job_id, status } => {
            if state.phase() != &AnalysisPhase::Submitting {
                scan_debug!("Ignoring submission of {} outside submitting phase", job_id);
                return (state, Vec::new());
            }
            scan_info!("Job {} accepted with status {}", job_id, status);
            state.enter(AnalysisPhase::Polling {
                job_id: job_id.clone(),
                iteration: 0,
            });
            state.push_log(format!("Job submitted! Tracking job ID: {job_id}"));
            state.push_log("Waiting for analysis to complete...");
            state.bump_progress(10.0);
            // Persist before the first poll so a crash mid-poll stays resumable.
            vec![
                Effect::PersistJobId {
                    job_id: job_id.clone(),
                },
                Effect::StartPolling { job_id },
            ]
        }
        Msg::JobNotRecorded { job_id, message } => {
            if is_current(&state, &job_id) {
                scan_warn!("Job {} was not recorded: {}", job_id, message);
                let warning = format!(
                    "Warning: job {job_id} could not be saved ({message}); it cannot be resumed if this session ends."
                );
                state.push_log(warning.clone());
                state.set_notice(warning);
            }
            Vec::new()
        }
        Msg::SubmissionFailed { message } => {
            if state.phase() == &AnalysisPhase::Submitting {
                state.push_log(format!("Error: {message}"));
                state.fail(FailureCategory::Submission, message);
            }
            Vec::new()
        }
        Msg::PollProgressed {
            job_id,
            iteration,
            status,
        } => {
            if is_current(&state, &job_id) {
                state.set_poll_iteration(iteration);
                if !status.is_terminal() {
                    state.push_log(format!("Job status: {status}..."));
                }
            }
            Vec::new()
        }
        Msg::JobCompleted {
            job_id,
            result,
            filename,
        } => {
            if !is_current(&state, &job_id) {
                return (state, Vec::new());
            }
            complete_job(&mut state, result, filename);
            vec![Effect::ClearPersistedJob]
        }
        Msg::JobFailed { job_id, message } => {
            if !is_current(&state, &job_id) {
                return (state, Vec::new());
            }
            state.push_log(format!("Analysis failed: {message}"));
            state.fail(FailureCategory::Job, message);
            vec![Effect::ClearPersistedJob]
        }
        Msg::JobTimedOut { job_id, iterations } => {
            if !is_current(&state, &job_id) {
                return (state, Vec::new());
            }
            scan_warn!("Job {} timed out after {} polls", job_id, iterations);
            state.push_log(TIMEOUT_MESSAGE);
            state.enter(AnalysisPhase::TimedOut);
            state.set_error(TIMEOUT_MESSAGE);
            vec![Effect::ClearPersistedJob]
        }
        Msg::PollTransportFailed { job_id, message } => {
            if !is_current(&state, &job_id) {
                return (state, Vec::new());
            }
            // The job may still be running server-side; keep its id so a restart resumes it.
            state.push_log(format!("Error: {message}"));
            state.fail(FailureCategory::Transport, message);
            Vec::new()
        }
        Msg::ResultRejected { job_id, message } => {
            if !is_current(&state, &job_id) {
                return (state, Vec::new());
            }
            state.push_log(format!("Error: {message}"));
            state.fail(FailureCategory::MalformedResult, message);
            vec![Effect::ClearPersistedJob]
        }
        Msg::PredictionCompleted(result) => {
            if state.phase() == &AnalysisPhase::Predicting {
                complete_prediction(&mut state, result);
            }
            Vec::new()
        }
        Msg::PredictionFailed { message } => {
            if state.phase() == &AnalysisPhase::Predicting {
                state.push_log(format!("Error: {message}"));
                state.fail(FailureCategory::Prediction, message);
            }
            Vec::new()
        }
        Msg::CancelClicked => {
            if state.is_busy() {
                state.push_log("Analysis cancelled.");
                state.enter(AnalysisPhase::Cancelled);
                vec![Effect::CancelAnalysis, Effect::ClearPersistedJob]
            } else {
                Vec::new()
            }
        }
        Msg::JobCancelled { job_id } => {
            if is_current(&state, &job_id) {
                state.push_log("Analysis cancelled.");
                state.enter(AnalysisPhase::Cancelled);
                vec![Effect::ClearPersistedJob]
            } else {
                Vec::new()
            }
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn submit(state: &mut AppState) -> Vec<Effect> {
    if state.is_busy() {
        state.set_error(BUSY_MESSAGE);
        return Vec::new();
    }
    if state.selected().is_empty() {
        return Vec::new();
    }

    let route = match plan_upload(state.selected(), state.multispectral(), state.max_file_bytes()) {
        Ok(route) => route,
        Err(err) => {
            state.begin(AnalysisPhase::Idle, 0.0);
            state.fail(FailureCategory::Validation, err.to_string());
            return Vec::new();
        }
    };

    match route {
        UploadRoute::Multispectral(files) => {
            state.begin(AnalysisPhase::Submitting, 0.0);
            state.push_log("Preparing files for upload...");
            state.push_log("Uploading files to server and submitting analysis job...");
            vec![Effect::SubmitJob { files }]
        }
        UploadRoute::Image(file) => {
            state.begin(AnalysisPhase::Predicting, 10.0);
            state.push_log("Preparing files for upload...");
            state.push_log("Uploading image to server...");
            state.push_log("Running AI model analysis...");
            vec![Effect::PredictImage {
                file,
                top_k: state.top_k(),
            }]
        }
    }
}

fn is_current(state: &AppState, job_id: &JobId) -> bool {
    let current = state.polling_job() == Some(job_id);
    if !current {
        scan_debug!("Ignoring event for job {} that is not being polled", job_id);
    }
    current
}

/// Records the history entry in the same step that asks for the persisted id to be cleared.
fn complete_job(state: &mut AppState, result: AnalysisResult, filename: Option<String>) {
    let first = state.selected().first().cloned();
    let file_name = first
        .as_ref()
        .map(|file| file.name.clone())
        .or(filename)
        .unwrap_or_else(|| RESUMED_FILE_NAME.to_string());
    let preview = first.map(|file| match file.kind {
        FileKind::Image => file.path.display().to_string(),
        _ => SPECTRAL_PREVIEW_PLACEHOLDER.to_string(),
    });

    state.push_log("Analysis complete! Preparing results...");
    state.bump_progress(100.0);
    state.record(ChatHistoryEntry {
        file_name,
        preview,
        result: EntryResult::Multispectral(result),
    });
    state.clear_selection();
    state.enter(AnalysisPhase::Completed);
    state.set_notice(COMPLETE_NOTICE);
}

fn complete_prediction(state: &mut AppState, result: DetectionResult) {
    let file_name = state
        .selected()
        .first()
        .map(|file| file.name.clone())
        .unwrap_or_else(|| result.image_path.clone());

    state.push_log("Model analysis complete!");
    state.push_log("Analysis complete! Preparing results...");
    state.bump_progress(100.0);
    state.record(ChatHistoryEntry {
        file_name,
        preview: Some(result.image_path.clone()),
        result: EntryResult::Detection(result),
    });
    state.clear_selection();
    state.enter(AnalysisPhase::Completed);
    state.set_notice(COMPLETE_NOTICE);
}
