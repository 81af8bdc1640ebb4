use std::sync::Arc;

use agriscan_core::JobId;
use agriscan_logging::scan_info;

use crate::store::{KeyValueStore, StoreError, PENDING_JOB_KEY};

/// Tracks at most one in-flight multispectral job across restarts.
#[derive(Clone)]
pub struct ResumptionGuard {
    store: Arc<dyn KeyValueStore>,
}

impl ResumptionGuard {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Overwrites any previously tracked id.
    pub fn persist(&self, job_id: &JobId) -> Result<(), StoreError> {
        if let Some(previous) = self.pending()? {
            if &previous != job_id {
                scan_info!("Replacing tracked job {} with {}", previous, job_id);
            }
        }
        self.store.set(PENDING_JOB_KEY, job_id.as_str())
    }

    pub fn pending(&self) -> Result<Option<JobId>, StoreError> {
        Ok(self
            .store
            .get(PENDING_JOB_KEY)?
            .filter(|id| !id.trim().is_empty())
            .map(JobId::new))
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(PENDING_JOB_KEY)
    }
}
