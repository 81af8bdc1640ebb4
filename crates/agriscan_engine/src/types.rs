use std::fmt;

use agriscan_core::{AnalysisResult, DetectionResult, JobId, JobStatus};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;

/// File contents ready to be packed into a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    /// Shared with the multipart body, so building a request does not copy the file.
    pub contents: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.contents.len() as u64
    }

    pub(crate) fn mime_type(&self) -> &'static str {
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => "image/png",
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            Some("bmp") => "image/bmp",
            Some("tif" | "tiff") => "image/tiff",
            Some("txt") => "text/plain",
            Some("zip") => "application/zip",
            _ => "application/octet-stream",
        }
    }
}

/// Body of `POST /predict/multispectral/async`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmittedJob {
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Body of `GET /predict/multispectral/status/{job_id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobStatusReport {
    pub status: JobStatus,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollProgress {
    pub job_id: JobId,
    pub iteration: u32,
    pub status: JobStatus,
}

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed {
        result: AnalysisResult,
        filename: Option<String>,
    },
    /// Backend reported `failed`; the message is shown verbatim.
    Failed { message: String },
    TimedOut { iterations: u32 },
    Cancelled,
    TransportFailed(ApiError),
    /// Completed, but the payload could not be adapted.
    Malformed { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Submitted(SubmittedJob),
    SubmissionFailed(ApiError),
    Progress(PollProgress),
    JobFinished { job_id: JobId, outcome: JobOutcome },
    PredictionFinished(Result<DetectionResult, ApiError>),
    /// Engine refused a command because a job or prediction is already active.
    Busy,
    /// Ctrl-C was pressed while the engine was running.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failures worth another attempt: the request may succeed if simply repeated.
    pub fn is_transient(&self) -> bool {
        match self.kind {
            FailureKind::Network | FailureKind::Timeout => true,
            FailureKind::HttpStatus(code) => code >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    EmptyUpload,
    FileTooLarge { max_bytes: u64, actual: u64 },
    MissingToken,
    HttpStatus(u16),
    Timeout,
    Network,
    InvalidResponse,
    Storage,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::EmptyUpload => write!(f, "no files to upload"),
            FailureKind::FileTooLarge { max_bytes, actual } => {
                write!(f, "file too large (max {max_bytes}, actual {actual})")
            }
            FailureKind::MissingToken => write!(f, "not signed in"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::InvalidResponse => write!(f, "invalid response"),
            FailureKind::Storage => write!(f, "storage error"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
