//! Generic step runner.

use std::time::Instant;
use tracing::{debug, info, warn};

use super::state::StateTracker;
use crate::client::StageClient;
use crate::context::{begin_run, RunContext, RunId};
use crate::core::PipelineStage;
use crate::errors::PipelineError;
use crate::stages::Stage;
use crate::utils::elapsed_ms;

/// Drives stages of a single run through the state tracker.
///
/// Created by [`start`](Self::start), which allocates the run. Every
/// [`step`](Self::step) performs one remote call scoped to that run.
pub struct StepRunner<'a> {
    client: &'a dyn StageClient,
    tracker: &'a StateTracker,
    run: RunContext,
}

impl std::fmt::Debug for StepRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRunner")
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}

impl<'a> StepRunner<'a> {
    /// Initializes a run and marks the first stage complete.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::RunInitializationFailed`] if the remote side
    /// could not allocate a run. The tracker is left in `Failed`.
    pub async fn start(
        client: &'a dyn StageClient,
        tracker: &'a StateTracker,
    ) -> Result<Self, PipelineError> {
        let stage = PipelineStage::Initialize;
        tracker.begin(stage).await?;

        let start = Instant::now();
        let run = match begin_run(client).await {
            Ok(run) => run,
            Err(err) => {
                warn!(stage = stage.as_str(), error = %err, "Stage failed");
                tracker.fail(Some(stage), &err).await;
                return Err(err);
            }
        };

        tracker.set_run(run.run_id());
        let duration_ms = elapsed_ms(start);
        tracker.complete(stage, duration_ms).await?;
        info!(stage = stage.as_str(), run_id = %run.run_id(), duration_ms, "Stage completed");

        Ok(Self {
            client,
            tracker,
            run,
        })
    }

    /// The run this runner is scoped to.
    #[must_use]
    pub fn run(&self) -> &RunContext {
        &self.run
    }

    /// Runs one stage.
    ///
    /// # Errors
    ///
    /// Returns the stage's error kind wrapping the remote message. The
    /// tracker is left in `Failed` with progress unchanged.
    pub async fn step<S: Stage>(&self, stage: &S, input: S::Input) -> Result<S::Output, PipelineError> {
        self.tracker.begin(S::STAGE).await?;
        let descriptor = stage.describe();
        debug!(
            stage = S::STAGE.as_str(),
            input = descriptor.input,
            output = descriptor.output,
            "Stage started"
        );

        let start = Instant::now();
        match stage.run(self.client, &self.run, input).await {
            Ok(output) => {
                let duration_ms = elapsed_ms(start);
                self.tracker.complete(S::STAGE, duration_ms).await?;
                info!(
                    stage = S::STAGE.as_str(),
                    run_id = %self.run.run_id(),
                    duration_ms,
                    "Stage completed"
                );
                Ok(output)
            }
            Err(e) => {
                let err = PipelineError::for_stage(S::STAGE, e.to_string());
                warn!(
                    stage = S::STAGE.as_str(),
                    kind = descriptor.failure,
                    run_id = %self.run.run_id(),
                    status = e.status_code(),
                    error = %err,
                    "Stage failed"
                );
                self.tracker.fail(Some(S::STAGE), &err).await;
                Err(err)
            }
        }
    }

    /// Consumes the runner, returning the run identifier.
    #[must_use]
    pub fn into_run_id(self) -> RunId {
        self.run.into_run_id()
    }
}
