//! Pipeline state machine.
//!
//! [`StateTracker`] is the only writer of [`PipelineState`]. Every accepted
//! transition is published on a `watch` channel and emitted to the
//! configured [`EventSink`] as a [`PipelineEvent`]. Once the state is
//! terminal, further transitions are rejected.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::OcrModel;
use crate::context::RunId;
use crate::core::{PipelineEvent, PipelinePhase, PipelineStage};
use crate::errors::PipelineError;
use crate::events::{EventSink, NoOpEventSink};

/// Observable state of the current (or last) execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Current phase.
    pub phase: PipelinePhase,
    /// Progress marker, `0..=PipelineStage::MAX_PROGRESS`.
    pub progress: u8,
    /// Run identifier, once allocated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    /// Message of the failure that ended the execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_error: Option<String>,
}

impl PipelineState {
    /// Returns true once the execution is over.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Progress as a fraction in `0.0..=1.0`.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        f64::from(self.progress) / f64::from(PipelineStage::MAX_PROGRESS)
    }
}

/// Single writer of [`PipelineState`].
pub struct StateTracker {
    state: watch::Sender<PipelineState>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for StateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTracker")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new(Arc::new(NoOpEventSink))
    }
}

impl StateTracker {
    /// Creates an idle tracker emitting to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        let (state, _) = watch::channel(PipelineState::default());
        Self { state, sink }
    }

    /// Replaces the event sink.
    pub fn set_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sink = sink;
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    /// Returns a receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Returns to `Idle` with no progress, run, or error.
    pub fn reset(&self) {
        self.state.send_replace(PipelineState::default());
    }

    /// Announces the start of an execution.
    pub async fn started(&self, ocr_model: OcrModel) {
        self.emit(PipelineEvent::pipeline_started(ocr_model.as_str()))
            .await;
    }

    /// Records the run identifier.
    pub fn set_run(&self, run_id: &RunId) {
        self.state.send_modify(|state| state.run_id = Some(run_id.clone()));
    }

    /// Moves into `Running(stage)`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidTransition`] if `stage` does not
    /// directly follow the current phase.
    pub async fn begin(&self, stage: PipelineStage) -> Result<(), PipelineError> {
        self.transition(PipelinePhase::Running(stage))?;
        self.emit(PipelineEvent::stage_started(stage)).await;
        Ok(())
    }

    /// Marks `stage` as completed and advances the progress marker.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidTransition`] if `stage` is not the
    /// one currently running.
    pub async fn complete(&self, stage: PipelineStage, duration_ms: f64) -> Result<(), PipelineError> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| {
            if state.phase != PipelinePhase::Running(stage) {
                result = Err(PipelineError::InvalidTransition(format!(
                    "cannot complete {stage} while {}",
                    state.phase
                )));
                return false;
            }
            state.progress = state.progress.max(stage.progress_index());
            true
        });
        result?;

        self.emit(PipelineEvent::stage_completed(stage, duration_ms)).await;
        Ok(())
    }

    /// Moves into `Done`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidTransition`] unless the last stage
    /// is the one running.
    pub async fn finish(&self, duration_ms: f64) -> Result<(), PipelineError> {
        self.transition(PipelinePhase::Done)?;
        self.emit(PipelineEvent::pipeline_completed(duration_ms)).await;
        Ok(())
    }

    /// Moves into `Failed`, freezing progress and recording the error.
    ///
    /// A tracker that is already terminal keeps its first error.
    pub async fn fail(&self, stage: Option<PipelineStage>, error: &PipelineError) {
        let message = error.to_string();
        let mut progress = None;
        self.state.send_if_modified(|state| {
            if !state.phase.can_transition_to(PipelinePhase::Failed) {
                return false;
            }
            state.phase = PipelinePhase::Failed;
            state.terminal_error = Some(message.clone());
            progress = Some(state.progress);
            true
        });

        let Some(progress) = progress else {
            return;
        };
        if let Some(stage) = stage {
            self.emit(PipelineEvent::stage_failed(stage, &message)).await;
        }
        self.emit(PipelineEvent::pipeline_failed(progress, &message))
            .await;
    }

    fn transition(&self, next: PipelinePhase) -> Result<(), PipelineError> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| {
            if state.phase.can_transition_to(next) {
                state.phase = next;
                true
            } else {
                result = Err(PipelineError::InvalidTransition(format!(
                    "{} -> {next}",
                    state.phase
                )));
                false
            }
        });
        result
    }

    async fn emit(&self, event: PipelineEvent) {
        let run_id = self.state.borrow().run_id.clone();
        let event = event.with_run_id(run_id.as_ref().map(RunId::as_str));
        self.sink.emit(&event).await;
    }
}
