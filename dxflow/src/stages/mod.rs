//! Stage trait and the fixed stage catalogue.
//!
//! Each stage is a typed descriptor: what it consumes, which remote
//! operation it performs, and what it produces. The generic
//! [`StepRunner`](crate::pipeline::StepRunner) drives any of them, so the
//! orchestrator only wires outputs to inputs.

mod remote;

pub use remote::{
    ExtractDiseasesStage, FillCodesStage, MapCodesStage, MapRiskStage, OcrStage, PaginateStage,
    RedactStage, UploadStage,
};

use crate::client::StageClient;
use crate::context::RunContext;
use crate::core::PipelineStage;
use crate::errors::{ClientError, PipelineError};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Debug;

/// A remote transformation step scoped to a run.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// What the stage consumes.
    type Input: Send + 'static;
    /// What the stage produces.
    type Output: Send + 'static;

    /// Position of the stage in the pipeline.
    const STAGE: PipelineStage;

    /// Performs the remote call.
    async fn run(
        &self,
        client: &dyn StageClient,
        run: &RunContext,
        input: Self::Input,
    ) -> Result<Self::Output, ClientError>;

    /// Describes the stage for introspection.
    fn describe(&self) -> StageDescriptor {
        StageDescriptor::of::<Self>()
    }
}

/// Static description of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageDescriptor {
    /// Which step this is.
    pub stage: PipelineStage,
    /// Progress marker published on completion.
    pub progress: u8,
    /// Error kind raised when the stage fails.
    pub failure: &'static str,
    /// Rust type consumed.
    pub input: &'static str,
    /// Rust type produced.
    pub output: &'static str,
}

impl StageDescriptor {
    /// Builds the descriptor of stage type `S`.
    #[must_use]
    pub fn of<S: Stage + ?Sized>() -> Self {
        Self {
            stage: S::STAGE,
            progress: S::STAGE.progress_index(),
            failure: PipelineError::for_stage(S::STAGE, String::new()).kind(),
            input: short_type_name(std::any::type_name::<S::Input>()),
            output: short_type_name(std::any::type_name::<S::Output>()),
        }
    }
}

/// Descriptors of every remote stage, in execution order.
#[must_use]
pub fn catalogue() -> [StageDescriptor; 8] {
    [
        StageDescriptor::of::<UploadStage>(),
        StageDescriptor::of::<OcrStage>(),
        StageDescriptor::of::<RedactStage>(),
        StageDescriptor::of::<ExtractDiseasesStage>(),
        StageDescriptor::of::<MapCodesStage>(),
        StageDescriptor::of::<FillCodesStage>(),
        StageDescriptor::of::<MapRiskStage>(),
        StageDescriptor::of::<PaginateStage>(),
    ]
}

/// Looks up a remote stage by its wire name (`"ocr"`, `"hcc_mapping"`, ...).
#[must_use]
pub fn descriptor_for(name: &str) -> Option<StageDescriptor> {
    catalogue().into_iter().find(|d| d.stage.as_str() == name)
}

fn short_type_name(full: &'static str) -> &'static str {
    full.rsplit("::").next().unwrap_or(full)
}
