use crate::{AnalysisResult, DetectionResult, JobId, JobStatus, SelectedFile};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User picked files to analyse.
    FilesSelected(Vec<SelectedFile>),
    /// User toggled multispectral mode for image uploads.
    MultispectralModeSet(bool),
    /// User asked to analyse the current selection.
    SubmitClicked,
    /// Session start, carrying the job id a previous session left behind.
    Started { pending_job: Option<JobId> },
    /// Backend accepted the upload and assigned a job id.
    JobSubmitted { job_id: JobId, status: JobStatus },
    /// The accepted job id could not be saved; the job cannot be resumed after a restart.
    JobNotRecorded { job_id: JobId, message: String },
    /// Backend (or local checks) refused the upload.
    SubmissionFailed { message: String },
    /// One status check finished without reaching a terminal status yet.
    PollProgressed {
        job_id: JobId,
        iteration: u32,
        status: JobStatus,
    },
    /// Job finished and its payload was adapted.
    JobCompleted {
        job_id: JobId,
        result: AnalysisResult,
        filename: Option<String>,
    },
    /// Backend reported the job as failed.
    JobFailed { job_id: JobId, message: String },
    /// Iteration ceiling reached without a terminal status.
    JobTimedOut { job_id: JobId, iterations: u32 },
    /// A status check could not be completed.
    PollTransportFailed { job_id: JobId, message: String },
    /// Job completed but its payload could not be adapted.
    ResultRejected { job_id: JobId, message: String },
    /// Single-image prediction finished.
    PredictionCompleted(DetectionResult),
    /// Single-image prediction failed.
    PredictionFailed { message: String },
    /// User asked to stop the running analysis.
    CancelClicked,
    /// Engine confirmed the poll loop stopped on cancellation.
    JobCancelled { job_id: JobId },
    /// Fallback for placeholder wiring.
    NoOp,
}
