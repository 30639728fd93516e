//! Pipeline execution.
//!
//! This module provides:
//! - The state machine behind the progress marker
//! - A generic step runner scoped to one run
//! - The orchestrator wiring the fixed stage chain together

mod integration_tests;
mod orchestrator;
mod runner;
mod state;

pub use orchestrator::{PipelineOrchestrator, PipelineOutcome};
pub use runner::StepRunner;
pub use state::{PipelineState, StateTracker};
