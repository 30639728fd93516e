//! Error types for dxflow.
//!
//! [`ClientError`] describes what went wrong talking to a remote stage.
//! [`PipelineError`] is what an execution surfaces to its caller: one kind
//! per stage, each wrapping the remote error's message verbatim.

use crate::core::PipelineStage;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Failure of a single remote stage call.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The request never produced a response (connect, timeout, TLS, ...).
    #[error("{0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Any other failure reported by a stage implementation.
    #[error("{0}")]
    Remote(String),
}

impl ClientError {
    /// Creates a generic remote failure.
    #[must_use]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    /// Creates a non-success status failure.
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// The HTTP status, if the service answered.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::status(status.as_u16(), err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Which precondition of an execution was not met.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    /// No document was selected.
    File,
    /// No configuration was confirmed.
    Configuration,
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "Please select a file first"),
            Self::Configuration => write!(f, "Please configure API settings first"),
        }
    }
}

/// Terminal failure of a pipeline execution.
///
/// Stage variants display exactly the wrapped message, so a remote
/// "service timeout" reaches the caller as "service timeout".
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// A precondition was not met; no remote call was attempted.
    #[error("{0}")]
    MissingInput(MissingInput),

    /// The remote side could not allocate a run.
    #[error("{0}")]
    RunInitializationFailed(String),

    /// Upload or retrieval of the uploaded document failed.
    #[error("{0}")]
    UploadFailed(String),

    /// OCR failed.
    #[error("{0}")]
    OcrFailed(String),

    /// PII redaction failed.
    #[error("{0}")]
    RedactionFailed(String),

    /// Disease extraction failed.
    #[error("{0}")]
    ExtractionFailed(String),

    /// ICD code mapping failed.
    #[error("{0}")]
    MappingFailed(String),

    /// ICD code completion failed.
    #[error("{0}")]
    FillFailed(String),

    /// HCC risk category mapping failed.
    #[error("{0}")]
    RiskMappingFailed(String),

    /// Medical note assembly failed.
    #[error("{0}")]
    PaginationFailed(String),

    /// The state machine refused a transition.
    #[error("Invalid pipeline transition: {0}")]
    InvalidTransition(String),
}

impl PipelineError {
    /// Wraps a failure message in the error kind belonging to `stage`.
    #[must_use]
    pub fn for_stage(stage: PipelineStage, message: impl Into<String>) -> Self {
        let message = message.into();
        match stage {
            PipelineStage::Initialize => Self::RunInitializationFailed(message),
            PipelineStage::Upload => Self::UploadFailed(message),
            PipelineStage::Ocr => Self::OcrFailed(message),
            PipelineStage::Redact => Self::RedactionFailed(message),
            PipelineStage::Extract => Self::ExtractionFailed(message),
            PipelineStage::MapCodes => Self::MappingFailed(message),
            PipelineStage::FillCodes => Self::FillFailed(message),
            PipelineStage::MapRisk => Self::RiskMappingFailed(message),
            PipelineStage::Paginate => Self::PaginationFailed(message),
        }
    }

    /// The stage whose failure this is, if any.
    #[must_use]
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::RunInitializationFailed(_) => Some(PipelineStage::Initialize),
            Self::UploadFailed(_) => Some(PipelineStage::Upload),
            Self::OcrFailed(_) => Some(PipelineStage::Ocr),
            Self::RedactionFailed(_) => Some(PipelineStage::Redact),
            Self::ExtractionFailed(_) => Some(PipelineStage::Extract),
            Self::MappingFailed(_) => Some(PipelineStage::MapCodes),
            Self::FillFailed(_) => Some(PipelineStage::FillCodes),
            Self::RiskMappingFailed(_) => Some(PipelineStage::MapRisk),
            Self::PaginationFailed(_) => Some(PipelineStage::Paginate),
            Self::MissingInput(_) | Self::InvalidTransition(_) => None,
        }
    }

    /// Stable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingInput(_) => "MissingInput",
            Self::RunInitializationFailed(_) => "RunInitializationFailed",
            Self::UploadFailed(_) => "UploadFailed",
            Self::OcrFailed(_) => "OCRFailed",
            Self::RedactionFailed(_) => "RedactionFailed",
            Self::ExtractionFailed(_) => "ExtractionFailed",
            Self::MappingFailed(_) => "MappingFailed",
            Self::FillFailed(_) => "FillFailed",
            Self::RiskMappingFailed(_) => "RiskMappingFailed",
            Self::PaginationFailed(_) => "PaginationFailed",
            Self::InvalidTransition(_) => "InvalidTransition",
        }
    }

    /// The user-facing message.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        if let Some(stage) = self.stage() {
            map.insert("stage".to_string(), serde_json::json!(stage.as_str()));
        }
        map
    }
}
