//! # dxflow
//!
//! Sequential orchestration of the medical document coding pipeline.
//!
//! A document is driven through a fixed chain of remote stages, all scoped
//! to one run:
//!
//! - **Run initialization**: allocate a run identifier
//! - **Upload**: store the document and fetch it back
//! - **OCR**: extract page text with the configured backend
//! - **Redaction**: remove personally identifiable information
//! - **Coding**: extract diseases, map and complete ICD codes, map HCC categories
//! - **Notes**: assemble paginated medical notes
//!
//! Progress is published through a state machine observable via a `watch`
//! channel and [`EventSink`](events::EventSink) implementations.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dxflow::prelude::*;
//! use std::sync::Arc;
//!
//! let client = HttpStageClient::new(ClientConfig::from_env()?)?;
//! let orchestrator = PipelineOrchestrator::new(Arc::new(client))
//!     .with_event_sink(Arc::new(LoggingEventSink::info()));
//!
//! let file = DocumentFile::from_path("discharge-summary.pdf").await?;
//! let outcome = orchestrator
//!     .execute(Some(file), Some(ApiConfiguration::new(OcrModel::Azure)))
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod client;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "http")]
    pub use crate::client::HttpStageClient;
    pub use crate::client::StageClient;
    pub use crate::config::{
        ApiConfiguration, ClientConfig, ConfigError, ConfigurationGate, OcrModel,
    };
    pub use crate::context::{RunContext, RunId};
    pub use crate::core::{
        DocumentFile, DocumentHandle, MedicalNotes, OcrPage, OcrResult, PipelineEvent,
        PipelinePhase, PipelineStage,
    };
    pub use crate::errors::{ClientError, MissingInput, PipelineError};
    pub use crate::events::{
        BroadcastEventSink, EventSink, FanoutEventSink, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::pipeline::{PipelineOrchestrator, PipelineOutcome, PipelineState};
    pub use crate::stages::{catalogue, descriptor_for, Stage, StageDescriptor};
    pub use crate::utils::iso_timestamp;
}
