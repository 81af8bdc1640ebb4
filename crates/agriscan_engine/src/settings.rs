use std::time::Duration;

use agriscan_core::MAX_FILE_BYTES;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Backend root, e.g. `http://localhost:8000`.
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Whole-request timeout; generous because uploads can approach 1 GiB.
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub max_poll_iterations: u32,
    pub max_file_bytes: u64,
    /// Extra attempts for a status check that hit a transient failure.
    pub poll_retries: u32,
    pub poll_retry_delay: Duration,
    pub top_k: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(2),
            max_poll_iterations: 120,
            max_file_bytes: MAX_FILE_BYTES,
            poll_retries: 2,
            poll_retry_delay: Duration::from_millis(500),
            top_k: 3,
        }
    }
}
