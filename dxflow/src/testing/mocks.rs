//! Stub stage client for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use uuid::Uuid;

use super::fixtures;
use crate::client::StageClient;
use crate::config::OcrModel;
use crate::context::RunId;
use crate::core::{
    DiseaseList, DocumentFile, FilledIcdMapping, HccMapping, IcdMapping, MedicalNotes, OcrPage,
    OcrResult, RedactedText,
};
use crate::errors::ClientError;

/// The operations of [`StageClient`], for call tracking and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StubCall {
    /// `initialize_run`
    InitializeRun,
    /// `upload_file`
    UploadFile,
    /// `fetch_document`
    FetchDocument,
    /// `process_ocr`
    Ocr,
    /// `process_pii_redaction`
    PiiRedaction,
    /// `process_disease_extraction`
    DiseaseExtraction,
    /// `process_icd_mapping`
    IcdMapping,
    /// `process_fill_icd_codes`
    FillIcdCodes,
    /// `process_hcc_mapping`
    HccMapping,
    /// `process_paginated_medical_notes`
    PaginatedMedicalNotes,
}

impl StubCall {
    /// Every operation, in pipeline order.
    pub const ALL: [Self; 10] = [
        Self::InitializeRun,
        Self::UploadFile,
        Self::FetchDocument,
        Self::Ocr,
        Self::PiiRedaction,
        Self::DiseaseExtraction,
        Self::IcdMapping,
        Self::FillIcdCodes,
        Self::HccMapping,
        Self::PaginatedMedicalNotes,
    ];

    /// Operations that come after `self` in pipeline order.
    #[must_use]
    pub fn later(self) -> &'static [Self] {
        let index = Self::ALL.iter().position(|c| *c == self).unwrap_or(Self::ALL.len());
        &Self::ALL[(index + 1).min(Self::ALL.len())..]
    }
}

#[derive(Debug, Default)]
struct Recorded {
    calls: Vec<StubCall>,
    run_ids: Vec<RunId>,
    ocr_model: Option<OcrModel>,
    paginated_pages: Option<Vec<OcrPage>>,
}

/// A [`StageClient`] returning fixed fixtures.
///
/// Every call is recorded. Any operation can be made to fail, and each
/// `initialize_run` hands out a new identifier unless a sequence was queued
/// with [`with_run_ids`](Self::with_run_ids).
#[derive(Debug, Default)]
pub struct StubStageClient {
    failures: HashMap<StubCall, ClientError>,
    run_ids: Mutex<VecDeque<RunId>>,
    delay: Option<Duration>,
    ocr_result: Option<OcrResult>,
    recorded: Mutex<Recorded>,
}

impl StubStageClient {
    /// Creates a stub where every operation succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `call` fail with `message` every time.
    #[must_use]
    pub fn fail_on(self, call: StubCall, message: impl Into<String>) -> Self {
        self.fail_with(call, ClientError::remote(message))
    }

    /// Makes `call` fail with `error` every time.
    #[must_use]
    pub fn fail_with(mut self, call: StubCall, error: ClientError) -> Self {
        self.failures.insert(call, error);
        self
    }

    /// Queues the identifiers returned by successive `initialize_run` calls.
    #[must_use]
    pub fn with_run_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_ids
            .lock()
            .extend(ids.into_iter().map(RunId::new));
        self
    }

    /// Answers OCR calls with `result` instead of the default fixture.
    #[must_use]
    pub fn with_ocr_result(mut self, result: OcrResult) -> Self {
        self.ocr_result = Some(result);
        self
    }

    /// Sleeps before answering each call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the number of times `call` was invoked.
    #[must_use]
    pub fn call_count(&self, call: StubCall) -> usize {
        self.recorded
            .lock()
            .calls
            .iter()
            .filter(|c| **c == call)
            .count()
    }

    /// Returns every invocation, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<StubCall> {
        self.recorded.lock().calls.clone()
    }

    /// Returns the total number of invocations.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.recorded.lock().calls.len()
    }

    /// Run identifiers received by run-scoped operations, in order.
    #[must_use]
    pub fn seen_run_ids(&self) -> Vec<RunId> {
        self.recorded.lock().run_ids.clone()
    }

    /// OCR backend requested by the last OCR call.
    #[must_use]
    pub fn last_ocr_model(&self) -> Option<OcrModel> {
        self.recorded.lock().ocr_model
    }

    /// Pages sent to the last note assembly call.
    #[must_use]
    pub fn last_paginated_pages(&self) -> Option<Vec<OcrPage>> {
        self.recorded.lock().paginated_pages.clone()
    }

    /// Returns how many pages the last note assembly call received.
    #[must_use]
    pub fn last_paginated_page_count(&self) -> Option<usize> {
        self.recorded.lock().paginated_pages.as_ref().map(Vec::len)
    }

    /// Resets call tracking.
    pub fn reset(&self) {
        *self.recorded.lock() = Recorded::default();
    }

    async fn enter(&self, call: StubCall, run_id: Option<&RunId>) -> Result<(), ClientError> {
        {
            let mut recorded = self.recorded.lock();
            recorded.calls.push(call);
            if let Some(id) = run_id {
                recorded.run_ids.push(id.clone());
            }
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.failures.get(&call) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StageClient for StubStageClient {
    async fn initialize_run(&self) -> Result<RunId, ClientError> {
        self.enter(StubCall::InitializeRun, None).await?;
        let queued = self.run_ids.lock().pop_front();
        Ok(queued.unwrap_or_else(|| RunId::new(format!("run-{}", Uuid::new_v4()))))
    }

    async fn upload_file(&self, _file: &DocumentFile, run_id: &RunId) -> Result<String, ClientError> {
        self.enter(StubCall::UploadFile, Some(run_id)).await?;
        Ok(fixtures::DOWNLOAD_URL.to_string())
    }

    async fn fetch_document(&self, _locator: &str) -> Result<Vec<u8>, ClientError> {
        self.enter(StubCall::FetchDocument, None).await?;
        Ok(fixtures::sample_document().bytes().to_vec())
    }

    async fn process_ocr(
        &self,
        _file: &DocumentFile,
        run_id: &RunId,
        model: OcrModel,
    ) -> Result<OcrResult, ClientError> {
        self.recorded.lock().ocr_model = Some(model);
        self.enter(StubCall::Ocr, Some(run_id)).await?;
        Ok(self.ocr_result.clone().unwrap_or_else(fixtures::ocr_result))
    }

    async fn process_pii_redaction(
        &self,
        _file_content: &str,
        run_id: &RunId,
    ) -> Result<RedactedText, ClientError> {
        self.enter(StubCall::PiiRedaction, Some(run_id)).await?;
        Ok(fixtures::redacted_text())
    }

    async fn process_disease_extraction(
        &self,
        _file_content: &str,
        run_id: &RunId,
    ) -> Result<DiseaseList, ClientError> {
        self.enter(StubCall::DiseaseExtraction, Some(run_id)).await?;
        Ok(fixtures::disease_list())
    }

    async fn process_icd_mapping(
        &self,
        _diseases: &DiseaseList,
        run_id: &RunId,
    ) -> Result<IcdMapping, ClientError> {
        self.enter(StubCall::IcdMapping, Some(run_id)).await?;
        Ok(fixtures::icd_mapping())
    }

    async fn process_fill_icd_codes(
        &self,
        _codes: &IcdMapping,
        run_id: &RunId,
    ) -> Result<FilledIcdMapping, ClientError> {
        self.enter(StubCall::FillIcdCodes, Some(run_id)).await?;
        Ok(fixtures::filled_icd_mapping())
    }

    async fn process_hcc_mapping(
        &self,
        _codes: &FilledIcdMapping,
        run_id: &RunId,
    ) -> Result<HccMapping, ClientError> {
        self.enter(StubCall::HccMapping, Some(run_id)).await?;
        Ok(fixtures::hcc_mapping())
    }

    async fn process_paginated_medical_notes(
        &self,
        pages: &[OcrPage],
        run_id: &RunId,
        _risk_mapping: &HccMapping,
    ) -> Result<MedicalNotes, ClientError> {
        self.recorded.lock().paginated_pages = Some(pages.to_vec());
        self.enter(StubCall::PaginatedMedicalNotes, Some(run_id)).await?;
        Ok(fixtures::medical_notes())
    }
}
