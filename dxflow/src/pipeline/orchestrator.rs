//! The pipeline orchestrator.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{field, info, info_span, Instrument, Span};

use super::runner::StepRunner;
use super::state::{PipelineState, StateTracker};
use crate::client::StageClient;
use crate::config::{ApiConfiguration, ConfigurationGate};
use crate::context::RunId;
use crate::core::{
    DocumentFile, DocumentHandle, MedicalNotes, OcrResult, PaginateInput, PipelinePhase,
};
use crate::errors::{MissingInput, PipelineError};
use crate::events::EventSink;
use crate::stages::{
    ExtractDiseasesStage, FillCodesStage, MapCodesStage, MapRiskStage, OcrStage, PaginateStage,
    RedactStage, UploadStage,
};
use crate::utils::elapsed_ms;

/// Artifacts of a successful execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    /// Local copy of the uploaded document.
    #[serde(skip)]
    pub document: DocumentHandle,
    /// OCR output of the original document.
    pub ocr: OcrResult,
    /// Paginated medical notes.
    pub notes: MedicalNotes,
    /// Run every stage was scoped to.
    pub run_id: RunId,
}

impl PipelineOutcome {
    /// Splits the outcome into `(document, ocr, notes, run_id)`.
    #[must_use]
    pub fn into_parts(self) -> (DocumentHandle, OcrResult, MedicalNotes, RunId) {
        (self.document, self.ocr, self.notes, self.run_id)
    }
}

/// Drives one document through the fixed stage chain.
///
/// ```rust,ignore
/// let orchestrator = PipelineOrchestrator::new(Arc::new(HttpStageClient::new(config)?));
/// let outcome = orchestrator
///     .execute(Some(file), Some(ApiConfiguration::new(OcrModel::Azure)))
///     .await?;
/// ```
pub struct PipelineOrchestrator {
    client: Arc<dyn StageClient>,
    tracker: StateTracker,
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    /// Creates an orchestrator calling `client`, with no event sink.
    #[must_use]
    pub fn new(client: Arc<dyn StageClient>) -> Self {
        Self {
            client,
            tracker: StateTracker::default(),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.tracker.set_sink(sink);
        self
    }

    /// Returns a receiver of state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.tracker.subscribe()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.tracker.snapshot()
    }

    /// Returns the current progress marker.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.tracker.snapshot().progress
    }

    /// Clears progress and the last error.
    ///
    /// Does nothing while an execution is running; returns whether the
    /// state was reset.
    pub fn reset(&self) -> bool {
        if matches!(self.tracker.snapshot().phase, PipelinePhase::Running(_)) {
            return false;
        }
        self.tracker.reset();
        true
    }

    /// Runs the whole chain for `file` with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingInput`] without any remote call when
    /// either argument is absent. Otherwise returns the error of the first
    /// failing stage; no later stage is called.
    pub async fn execute(
        &self,
        file: Option<DocumentFile>,
        config: Option<ApiConfiguration>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let file = file.ok_or(PipelineError::MissingInput(MissingInput::File))?;
        let config = config.ok_or(PipelineError::MissingInput(MissingInput::Configuration))?;

        let span = info_span!(
            "pipeline.execute",
            file = file.name(),
            ocr_model = config.ocr_model.as_str(),
            run_id = field::Empty,
        );

        async move {
            self.tracker.reset();
            self.tracker.started(config.ocr_model).await;

            let result = self.run_chain(file, config).await;
            if let Err(err) = &result {
                // Stage failures already moved the tracker to Failed.
                self.tracker.fail(err.stage(), err).await;
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Runs the chain with the configuration confirmed on `gate`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn execute_with_gate(
        &self,
        file: Option<DocumentFile>,
        gate: &ConfigurationGate,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.execute(file, gate.confirmed()).await
    }

    async fn run_chain(
        &self,
        file: DocumentFile,
        config: ApiConfiguration,
    ) -> Result<PipelineOutcome, PipelineError> {
        let start = Instant::now();
        let runner = StepRunner::start(self.client.as_ref(), &self.tracker).await?;
        Span::current().record("run_id", field::display(runner.run().run_id()));

        let document = runner.step(&UploadStage, file.clone()).await?;
        let ocr = runner.step(&OcrStage::new(config.ocr_model), file).await?;
        let redacted = runner
            .step(&RedactStage, ocr.file_content.clone())
            .await?;
        let diseases = runner.step(&ExtractDiseasesStage, redacted).await?;
        let codes = runner.step(&MapCodesStage, diseases).await?;
        let filled = runner.step(&FillCodesStage, codes).await?;
        let risk = runner.step(&MapRiskStage, filled).await?;
        let notes = runner
            .step(
                &PaginateStage,
                PaginateInput {
                    pages: ocr.pages.clone(),
                    risk_mapping: risk,
                },
            )
            .await?;

        let duration_ms = elapsed_ms(start);
        self.tracker.finish(duration_ms).await?;
        info!(duration_ms, pages = ocr.pages.len(), "Pipeline completed");

        Ok(PipelineOutcome {
            document,
            ocr,
            notes,
            run_id: runner.into_run_id(),
        })
    }
}
