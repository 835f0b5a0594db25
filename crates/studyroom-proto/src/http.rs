//! HTTP collaborator shapes.
//!
//! The backend exposes a PDF upload endpoint and four assistant services
//! (chat, summary, questions, audio). All assistant services take the room's
//! sources split into YouTube URLs and PDF paths.

use serde::{Deserialize, Serialize};

use crate::types::{Resource, ResourceKind};

/// Upload endpoint path.
pub const UPLOAD_PDF_PATH: &str = "/api/upload-pdf";

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// MIME type accepted by the upload endpoint.
pub const PDF_MIME: &str = "application/pdf";

/// `status` value of a successful response.
pub const STATUS_SUCCESS: &str = "success";

/// Response of the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadResponse {
    /// File stored; `file_path` is what gets shared as the resource url.
    Success {
        /// Server-side path of the stored file.
        file_path: String,
    },
    /// Upload rejected.
    Error {
        /// Server-provided reason.
        error: String,
    },
}

/// Sources an assistant request is grounded on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceList {
    /// YouTube video URLs.
    pub youtube_urls: Vec<String>,
    /// PDF paths or URLs.
    pub pdf_paths: Vec<String>,
}

impl SourceList {
    /// Split resources by kind, preserving order.
    pub fn from_resources<'a>(resources: impl IntoIterator<Item = &'a Resource>) -> Self {
        let mut sources = Self::default();
        for resource in resources {
            match resource.kind {
                ResourceKind::Youtube => sources.youtube_urls.push(resource.url.clone()),
                ResourceKind::Pdf => sources.pdf_paths.push(resource.url.clone()),
            }
        }
        sources
    }

    /// Whether there are no sources at all.
    pub fn is_empty(&self) -> bool {
        self.youtube_urls.is_empty() && self.pdf_paths.is_empty()
    }
}

/// Body of an assistant service request.
///
/// `message` is only sent to the chat service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// User question for the chat service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Sources to ground the answer on.
    #[serde(flatten)]
    pub sources: SourceList,
}

/// Assistant services offered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Free-form question answering.
    Chat,
    /// Summary of all sources.
    Summary,
    /// Study questions over the sources.
    Questions,
    /// Audio overview; the result is a server path to the audio file.
    Audio,
}

impl ServiceKind {
    /// Endpoint path.
    pub fn path(self) -> &'static str {
        match self {
            Self::Chat => "/api/chat",
            Self::Summary => "/api/generate-summary",
            Self::Questions => "/api/generate-questions",
            Self::Audio => "/api/generate-audio",
        }
    }

    /// Response field carrying the result.
    pub fn result_field(self) -> &'static str {
        match self {
            Self::Chat => "response",
            Self::Summary => "summary",
            Self::Questions => "questions",
            Self::Audio => "audio_path",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Summary => "summary",
            Self::Questions => "questions",
            Self::Audio => "audio",
        }
    }
}

/// Raw assistant service response.
///
/// The result lives under a service-specific key, so the body is kept as a
/// JSON object and interpreted by [`ServiceResponse::into_result`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceResponse {
    /// `success` or `error`.
    pub status: String,
    /// Error reason, when present.
    #[serde(default)]
    pub error: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ServiceResponse {
    /// Extract the result for `kind`, or the reason the call failed.
    ///
    /// A non-string result (for example a list of questions) is rendered as
    /// one entry per line.
    pub fn into_result(self, kind: ServiceKind) -> Result<String, String> {
        if self.status != STATUS_SUCCESS {
            return Err(self.error.unwrap_or_else(|| format!("status {}", self.status)));
        }

        match self.fields.get(kind.result_field()) {
            Some(serde_json::Value::String(text)) => Ok(text.clone()),
            Some(serde_json::Value::Array(items)) => Ok(items
                .iter()
                .map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_owned))
                .collect::<Vec<_>>()
                .join("\n")),
            Some(other) => Ok(other.to_string()),
            None => Err(format!("missing `{}` in {} response", kind.result_field(), kind.label())),
        }
    }
}
