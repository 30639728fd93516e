//! The stages backed by remote services.

use async_trait::async_trait;

use super::Stage;
use crate::client::StageClient;
use crate::config::OcrModel;
use crate::context::RunContext;
use crate::core::{
    DiseaseList, DocumentFile, DocumentHandle, FilledIcdMapping, HccMapping, IcdMapping,
    MedicalNotes, OcrResult, PaginateInput, PipelineStage, RedactedText,
};
use crate::errors::ClientError;

/// Uploads the document, then fetches it back to prove it was accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadStage;

#[async_trait]
impl Stage for UploadStage {
    type Input = DocumentFile;
    type Output = DocumentHandle;

    const STAGE: PipelineStage = PipelineStage::Upload;

    async fn run(
        &self,
        client: &dyn StageClient,
        run: &RunContext,
        file: DocumentFile,
    ) -> Result<DocumentHandle, ClientError> {
        let locator = client.upload_file(&file, run.run_id()).await?;
        let bytes = client.fetch_document(&locator).await?;
        Ok(DocumentHandle::new(locator, bytes))
    }
}

/// OCR of the original document with the configured backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct OcrStage {
    /// Backend to use.
    pub model: OcrModel,
}

impl OcrStage {
    /// Creates an OCR stage for `model`.
    #[must_use]
    pub fn new(model: OcrModel) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Stage for OcrStage {
    type Input = DocumentFile;
    type Output = OcrResult;

    const STAGE: PipelineStage = PipelineStage::Ocr;

    async fn run(
        &self,
        client: &dyn StageClient,
        run: &RunContext,
        file: DocumentFile,
    ) -> Result<OcrResult, ClientError> {
        client.process_ocr(&file, run.run_id(), self.model).await
    }
}

/// PII redaction of the OCR text.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedactStage;

#[async_trait]
impl Stage for RedactStage {
    type Input = String;
    type Output = RedactedText;

    const STAGE: PipelineStage = PipelineStage::Redact;

    async fn run(
        &self,
        client: &dyn StageClient,
        run: &RunContext,
        file_content: String,
    ) -> Result<RedactedText, ClientError> {
        client.process_pii_redaction(&file_content, run.run_id()).await
    }
}

/// Disease extraction from redacted text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractDiseasesStage;

#[async_trait]
impl Stage for ExtractDiseasesStage {
    type Input = RedactedText;
    type Output = DiseaseList;

    const STAGE: PipelineStage = PipelineStage::Extract;

    async fn run(
        &self,
        client: &dyn StageClient,
        run: &RunContext,
        redacted: RedactedText,
    ) -> Result<DiseaseList, ClientError> {
        client
            .process_disease_extraction(&redacted.file_content, run.run_id())
            .await
    }
}

/// Disease to ICD code mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapCodesStage;

#[async_trait]
impl Stage for MapCodesStage {
    type Input = DiseaseList;
    type Output = IcdMapping;

    const STAGE: PipelineStage = PipelineStage::MapCodes;

    async fn run(
        &self,
        client: &dyn StageClient,
        run: &RunContext,
        diseases: DiseaseList,
    ) -> Result<IcdMapping, ClientError> {
        client.process_icd_mapping(&diseases, run.run_id()).await
    }
}

/// Completion of partial ICD codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FillCodesStage;

#[async_trait]
impl Stage for FillCodesStage {
    type Input = IcdMapping;
    type Output = FilledIcdMapping;

    const STAGE: PipelineStage = PipelineStage::FillCodes;

    async fn run(
        &self,
        client: &dyn StageClient,
        run: &RunContext,
        codes: IcdMapping,
    ) -> Result<FilledIcdMapping, ClientError> {
        client.process_fill_icd_codes(&codes, run.run_id()).await
    }
}

/// ICD to HCC risk category mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapRiskStage;

#[async_trait]
impl Stage for MapRiskStage {
    type Input = FilledIcdMapping;
    type Output = HccMapping;

    const STAGE: PipelineStage = PipelineStage::MapRisk;

    async fn run(
        &self,
        client: &dyn StageClient,
        run: &RunContext,
        codes: FilledIcdMapping,
    ) -> Result<HccMapping, ClientError> {
        client.process_hcc_mapping(&codes, run.run_id()).await
    }
}

/// Paginated note assembly from the OCR pages and the risk mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaginateStage;

#[async_trait]
impl Stage for PaginateStage {
    type Input = PaginateInput;
    type Output = MedicalNotes;

    const STAGE: PipelineStage = PipelineStage::Paginate;

    async fn run(
        &self,
        client: &dyn StageClient,
        run: &RunContext,
        input: PaginateInput,
    ) -> Result<MedicalNotes, ClientError> {
        client
            .process_paginated_medical_notes(&input.pages, run.run_id(), &input.risk_mapping)
            .await
    }
}
