//! HTTP backend: PDF uploads and assistant services.
//!
//! Stateless request/response calls. Results are fed back into the client
//! (uploads) or straight into the UI (assistant services); the room channel
//! is unaffected by any failure here.

use std::time::Duration;

use studyroom_proto::http::{
    PDF_MIME, ServiceKind, ServiceRequest, ServiceResponse, UPLOAD_FIELD, UPLOAD_PDF_PATH,
    UploadResponse,
};
use thiserror::Error;
use url::Url;

use crate::dispatcher::LocalFile;

/// Upper bound for any backend call. Audio generation is the slow one.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Backend call failures.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Endpoint URL could not be built.
    #[error("invalid backend url: {0}")]
    Url(String),

    /// Network or decoding failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The backend answered with `status: error`.
    #[error("{0}")]
    Rejected(String),
}

/// Client for the HTTP backend.
#[derive(Debug, Clone)]
pub struct Backend {
    http: reqwest::Client,
    base: Url,
}

impl Backend {
    /// Create a client for the backend at `base`.
    pub fn new(base: Url) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, base })
    }

    /// Backend base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Upload a PDF. Returns the server path to share as the resource url.
    pub async fn upload_pdf(&self, file: &LocalFile) -> Result<String, BackendError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(PDF_MIME)?;
        let form = reqwest::multipart::Form::new().part(UPLOAD_FIELD, part);

        let url = self.endpoint(UPLOAD_PDF_PATH)?;
        tracing::debug!(%url, name = %file.name, size = file.bytes.len(), "uploading pdf");

        let response = self.http.post(url).multipart(form).send().await?;
        let response = check_status(response).await?;

        match response.json::<UploadResponse>().await? {
            UploadResponse::Success { file_path } => Ok(file_path),
            UploadResponse::Error { error } => Err(BackendError::Rejected(error)),
        }
    }

    /// Call an assistant service and return its textual result.
    pub async fn call(
        &self,
        kind: ServiceKind,
        request: &ServiceRequest,
    ) -> Result<String, BackendError> {
        let url = self.endpoint(kind.path())?;
        tracing::debug!(%url, service = kind.label(), "calling assistant");

        let response = self.http.post(url).json(request).send().await?;
        let response = check_status(response).await?;

        response.json::<ServiceResponse>().await?.into_result(kind).map_err(BackendError::Rejected)
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        let joined = format!("{}{path}", self.base.as_str().trim_end_matches('/'));
        Url::parse(&joined).map_err(|e| BackendError::Url(format!("{joined}: {e}")))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status { status: status.as_u16(), body })
}
