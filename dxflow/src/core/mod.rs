//! Core domain model types for dxflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - The fixed stage catalogue and the pipeline phase state machine
//! - The artifacts that flow from one stage to the next
//! - Pipeline transition events

mod artifact;
mod event;
mod status;

pub use artifact::{
    DiseaseList, DocumentFile, DocumentHandle, FilledIcdMapping, HccMapping, IcdMapping,
    MedicalNotes, OcrPage, OcrResult, PaginateInput, RedactedText, PDF_CONTENT_TYPE,
};
pub use event::PipelineEvent;
pub use status::{PipelinePhase, PipelineStage};
