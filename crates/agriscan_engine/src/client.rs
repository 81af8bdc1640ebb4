use std::sync::Arc;

use agriscan_core::{JobId, PredictionResponse};
use agriscan_logging::{scan_debug, scan_trace};
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::settings::ClientSettings;
use crate::store::{KeyValueStore, AUTH_TOKEN_KEY};
use crate::{ApiError, FailureKind, JobStatusReport, SubmittedJob, UploadFile};

/// The three backend endpoints the analysis flow needs.
#[async_trait::async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn submit_multispectral(&self, files: &[UploadFile]) -> Result<SubmittedJob, ApiError>;

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport, ApiError>;

    async fn predict(&self, file: &UploadFile, top_k: u32) -> Result<PredictionResponse, ApiError>;
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
    message: Option<String>,
}

pub struct ReqwestBackend {
    client: reqwest::Client,
    base_url: Url,
    store: Arc<dyn KeyValueStore>,
}

impl ReqwestBackend {
    pub fn new(settings: &ClientSettings, store: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        // A trailing slash keeps `join` from dropping the last path segment.
        let mut base = settings.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url =
            Url::parse(&base).map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            store,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    /// The job id is opaque, so it goes in as a single percent-encoded segment.
    fn status_endpoint(&self, job_id: &JobId) -> Result<Url, ApiError> {
        let id = job_id.as_str();
        if matches!(id.trim(), "" | "." | "..") {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("invalid job id {id:?}"),
            ));
        }
        let mut url = self.endpoint("predict/multispectral/status/")?;
        url.path_segments_mut()
            .map_err(|()| ApiError::new(FailureKind::InvalidUrl, "base URL cannot hold a path"))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// Reads the bearer token; absence fails locally without touching the network.
    fn token(&self) -> Result<String, ApiError> {
        match self.store.get(AUTH_TOKEN_KEY) {
            Ok(Some(token)) if !token.trim().is_empty() => Ok(token),
            Ok(_) => Err(ApiError::new(
                FailureKind::MissingToken,
                "Not signed in. Run `agriscan login --token <token>` first.",
            )),
            Err(err) => Err(ApiError::new(FailureKind::Storage, err.to_string())),
        }
    }
}

fn file_part(file: &UploadFile) -> Result<Part, ApiError> {
    Part::stream_with_length(file.contents.clone(), file.size())
        .file_name(file.file_name.clone())
        .mime_str(file.mime_type())
        .map_err(|err| ApiError::new(FailureKind::InvalidResponse, err.to_string()))
}

#[async_trait::async_trait]
impl AnalysisBackend for ReqwestBackend {
    async fn submit_multispectral(&self, files: &[UploadFile]) -> Result<SubmittedJob, ApiError> {
        let token = self.token()?;
        let url = self.endpoint("predict/multispectral/async")?;

        let mut form = Form::new();
        for file in files {
            form = form.part("files", file_part(file)?);
        }

        scan_debug!("POST {} with {} file(s)", url, files.len());
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response, "Failed to submit analysis job").await
    }

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatusReport, ApiError> {
        let token = self.token()?;
        let url = self.status_endpoint(job_id)?;

        scan_trace!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response, "Failed to get job status").await
    }

    async fn predict(&self, file: &UploadFile, top_k: u32) -> Result<PredictionResponse, ApiError> {
        let token = self.token()?;
        let mut url = self.endpoint("predict/")?;
        url.query_pairs_mut()
            .append_pair("top_k", &top_k.to_string());

        let form = Form::new().part("file", file_part(file)?);
        scan_debug!("POST {} for {}", url, file.file_name);
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response, "Prediction failed. Please try again.").await
    }
}

/// Decode a 2xx body, or turn a non-2xx into an error carrying the backend's message.
async fn read_json<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = backend_message(&body).unwrap_or_else(|| fallback.to_string());
        return Err(ApiError::new(FailureKind::HttpStatus(status.as_u16()), message));
    }

    let body = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&body)
        .map_err(|err| ApiError::new(FailureKind::InvalidResponse, err.to_string()))
}

fn backend_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let detail = parsed.detail.and_then(|detail| match detail {
        serde_json::Value::String(text) => Some(text),
        serde_json::Value::Null => None,
        // FastAPI validation errors arrive as a list of objects.
        other => Some(other.to_string()),
    });
    detail
        .or(parsed.message)
        .filter(|message| !message.trim().is_empty())
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::InvalidResponse, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
