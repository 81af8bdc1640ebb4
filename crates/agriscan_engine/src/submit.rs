use agriscan_core::{check_size, ValidationError};
use agriscan_logging::{scan_info, scan_warn};

use crate::client::AnalysisBackend;
use crate::{ApiError, FailureKind, SubmittedJob, UploadFile};

/// Uploads a multispectral bundle and hands back the backend's job id.
///
/// Oversized input is refused before anything goes over the wire. Failed
/// submissions are not retried; the caller decides whether to resubmit.
pub struct JobSubmitter<'a> {
    backend: &'a dyn AnalysisBackend,
    max_file_bytes: u64,
}

impl<'a> JobSubmitter<'a> {
    pub fn new(backend: &'a dyn AnalysisBackend, max_file_bytes: u64) -> Self {
        Self {
            backend,
            max_file_bytes,
        }
    }

    pub async fn submit(&self, files: &[UploadFile]) -> Result<SubmittedJob, ApiError> {
        check_sizes(files, self.max_file_bytes)?;

        let job = self.backend.submit_multispectral(files).await.map_err(|err| {
            scan_warn!("Job submission failed: {} ({})", err, err.kind);
            err
        })?;
        scan_info!("Submitted {} file(s) as job {}", files.len(), job.job_id);
        Ok(job)
    }
}

pub(crate) fn check_sizes(files: &[UploadFile], max_file_bytes: u64) -> Result<(), ApiError> {
    if files.is_empty() {
        return Err(ApiError::new(
            FailureKind::EmptyUpload,
            ValidationError::Empty.to_string(),
        ));
    }
    for file in files {
        check_size(&file.file_name, file.size(), max_file_bytes).map_err(|err| {
            ApiError::new(
                FailureKind::FileTooLarge {
                    max_bytes: max_file_bytes,
                    actual: file.size(),
                },
                err.to_string(),
            )
        })?;
    }
    Ok(())
}
