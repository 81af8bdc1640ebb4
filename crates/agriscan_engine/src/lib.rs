//! Agriscan engine: backend client, job submission, polling and durable resume state.
mod client;
mod engine;
mod persist;
mod poll;
mod resume;
mod settings;
mod store;
mod submit;
mod types;

pub use client::{AnalysisBackend, ReqwestBackend};
pub use engine::{EngineError, EngineHandle};
pub use persist::{ensure_data_dir, AtomicFileWriter, PersistError};
pub use poll::{ChannelProgressSink, JobPoller, PollSettings, ProgressSink};
pub use resume::ResumptionGuard;
pub use settings::ClientSettings;
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError, AUTH_TOKEN_KEY, PENDING_JOB_KEY};
pub use submit::JobSubmitter;
pub use types::{
    ApiError, EngineEvent, FailureKind, JobOutcome, JobStatusReport, PollProgress, SubmittedJob,
    UploadFile,
};
