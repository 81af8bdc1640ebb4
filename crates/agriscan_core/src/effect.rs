use crate::{JobId, SelectedFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SubmitJob { files: Vec<SelectedFile> },
    PredictImage { file: SelectedFile, top_k: u32 },
    /// Record the job id in durable storage so a later session can resume it.
    PersistJobId { job_id: JobId },
    StartPolling { job_id: JobId },
    ClearPersistedJob,
    /// Stop whatever submit, poll or prediction is in flight.
    CancelAnalysis,
}
