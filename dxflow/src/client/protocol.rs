//! The stage client trait.

use async_trait::async_trait;

use crate::config::OcrModel;
use crate::context::RunId;
use crate::core::{
    DiseaseList, DocumentFile, FilledIcdMapping, HccMapping, IcdMapping, MedicalNotes, OcrPage,
    OcrResult, RedactedText,
};
use crate::errors::ClientError;

/// Operations exposed by the remote processing services.
///
/// Every operation after [`initialize_run`](Self::initialize_run) takes the
/// run identifier and must forward it unchanged.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageClient: Send + Sync {
    /// Allocates a new run.
    async fn initialize_run(&self) -> Result<RunId, ClientError>;

    /// Uploads the document and returns a locator it can be fetched back from.
    async fn upload_file(&self, file: &DocumentFile, run_id: &RunId) -> Result<String, ClientError>;

    /// Fetches the bytes behind a locator returned by
    /// [`upload_file`](Self::upload_file).
    async fn fetch_document(&self, locator: &str) -> Result<Vec<u8>, ClientError>;

    /// Runs OCR on the original document.
    async fn process_ocr(
        &self,
        file: &DocumentFile,
        run_id: &RunId,
        model: OcrModel,
    ) -> Result<OcrResult, ClientError>;

    /// Removes personally identifiable information from OCR text.
    async fn process_pii_redaction(
        &self,
        file_content: &str,
        run_id: &RunId,
    ) -> Result<RedactedText, ClientError>;

    /// Extracts diseases from redacted text.
    async fn process_disease_extraction(
        &self,
        file_content: &str,
        run_id: &RunId,
    ) -> Result<DiseaseList, ClientError>;

    /// Maps diseases to ICD codes.
    async fn process_icd_mapping(
        &self,
        diseases: &DiseaseList,
        run_id: &RunId,
    ) -> Result<IcdMapping, ClientError>;

    /// Completes partial ICD codes.
    async fn process_fill_icd_codes(
        &self,
        codes: &IcdMapping,
        run_id: &RunId,
    ) -> Result<FilledIcdMapping, ClientError>;

    /// Maps ICD codes to HCC risk categories.
    async fn process_hcc_mapping(
        &self,
        codes: &FilledIcdMapping,
        run_id: &RunId,
    ) -> Result<HccMapping, ClientError>;

    /// Assembles paginated medical notes.
    async fn process_paginated_medical_notes(
        &self,
        pages: &[OcrPage],
        run_id: &RunId,
        risk_mapping: &HccMapping,
    ) -> Result<MedicalNotes, ClientError>;
}
