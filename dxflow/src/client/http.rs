//! HTTP implementation of the stage client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use super::StageClient;
use crate::config::{ClientConfig, ConfigError, OcrModel};
use crate::context::RunId;
use crate::core::{
    DiseaseList, DocumentFile, FilledIcdMapping, HccMapping, IcdMapping, MedicalNotes, OcrPage,
    OcrResult, RedactedText,
};
use crate::errors::ClientError;
use crate::utils::elapsed_ms;

#[derive(Debug, Deserialize)]
struct NewRunResponse {
    run_id: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(alias = "url", alias = "presigned_url")]
    download_url: String,
}

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    file_content: &'a str,
    run_id: &'a str,
}

#[derive(Debug, Serialize)]
struct DiseasesRequest<'a> {
    diseases: &'a serde_json::Value,
    run_id: &'a str,
}

#[derive(Debug, Serialize)]
struct CodesRequest<'a> {
    icd_codes: &'a serde_json::Value,
    run_id: &'a str,
}

#[derive(Debug, Serialize)]
struct NotesRequest<'a> {
    pages: &'a [OcrPage],
    run_id: &'a str,
    hcc_data: &'a serde_json::Value,
}

/// Stage client talking to the processing services over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStageClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpStageClient {
    /// Creates a client from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a header cannot
    /// be encoded.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| ConfigError::InvalidHeader(key.clone()))?;
            let value =
                HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader(key.clone()))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::ClientBuild(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        let start = Instant::now();
        debug!(url = %url, "POST");

        let response = self.http.post(&url).json(body).send().await?;
        let response = ensure_success(response).await?;
        let parsed = response.json::<T>().await?;

        debug!(url = %url, duration_ms = elapsed_ms(start), "POST completed");
        Ok(parsed)
    }

    async fn post_multipart<T>(&self, path: &str, form: Form) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        let start = Instant::now();
        debug!(url = %url, "POST multipart");

        let response = self.http.post(&url).multipart(form).send().await?;
        let response = ensure_success(response).await?;
        let parsed = response.json::<T>().await?;

        debug!(url = %url, duration_ms = elapsed_ms(start), "POST multipart completed");
        Ok(parsed)
    }
}

fn file_part(file: &DocumentFile) -> Result<Part, ClientError> {
    Part::bytes(file.bytes().to_vec())
        .file_name(file.name().to_string())
        .mime_str(file.content_type())
        .map_err(ClientError::from)
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    warn!(status = status.as_u16(), error = %message, "Stage service returned an error");
    Err(ClientError::status(status.as_u16(), message))
}

/// Picks the most useful message out of an error response.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "error", "message"] {
            match json.get(key) {
                Some(serde_json::Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(serde_json::Value::Null) | None => {}
                Some(other) => return other.to_string(),
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("Request failed with status {status}")
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl StageClient for HttpStageClient {
    async fn initialize_run(&self) -> Result<RunId, ClientError> {
        let response: NewRunResponse = self.post_json("new_run", &serde_json::json!({})).await?;
        Ok(RunId::new(response.run_id))
    }

    async fn upload_file(&self, file: &DocumentFile, run_id: &RunId) -> Result<String, ClientError> {
        let form = Form::new()
            .part("file", file_part(file)?)
            .text("run_id", run_id.as_str().to_string());

        let response: UploadResponse = self.post_multipart("upload", form).await?;
        Ok(response.download_url)
    }

    async fn fetch_document(&self, locator: &str) -> Result<Vec<u8>, ClientError> {
        let response = self.http.get(locator).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::status(status.as_u16(), "Failed to download file"));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn process_ocr(
        &self,
        file: &DocumentFile,
        run_id: &RunId,
        model: OcrModel,
    ) -> Result<OcrResult, ClientError> {
        let form = Form::new()
            .part("file", file_part(file)?)
            .text("run_id", run_id.as_str().to_string())
            .text("ocr_model", model.as_str());

        self.post_multipart("ocr", form).await
    }

    async fn process_pii_redaction(
        &self,
        file_content: &str,
        run_id: &RunId,
    ) -> Result<RedactedText, ClientError> {
        let body = TextRequest {
            file_content,
            run_id: run_id.as_str(),
        };
        self.post_json("pii_redaction", &body).await
    }

    async fn process_disease_extraction(
        &self,
        file_content: &str,
        run_id: &RunId,
    ) -> Result<DiseaseList, ClientError> {
        let body = TextRequest {
            file_content,
            run_id: run_id.as_str(),
        };
        self.post_json("disease_extraction", &body).await
    }

    async fn process_icd_mapping(
        &self,
        diseases: &DiseaseList,
        run_id: &RunId,
    ) -> Result<IcdMapping, ClientError> {
        let body = DiseasesRequest {
            diseases: diseases.as_json(),
            run_id: run_id.as_str(),
        };
        self.post_json("icd_mapping", &body).await
    }

    async fn process_fill_icd_codes(
        &self,
        codes: &IcdMapping,
        run_id: &RunId,
    ) -> Result<FilledIcdMapping, ClientError> {
        let body = CodesRequest {
            icd_codes: codes.as_json(),
            run_id: run_id.as_str(),
        };
        self.post_json("fill_icd_codes", &body).await
    }

    async fn process_hcc_mapping(
        &self,
        codes: &FilledIcdMapping,
        run_id: &RunId,
    ) -> Result<HccMapping, ClientError> {
        let body = CodesRequest {
            icd_codes: codes.as_json(),
            run_id: run_id.as_str(),
        };
        self.post_json("hcc_mapping", &body).await
    }

    async fn process_paginated_medical_notes(
        &self,
        pages: &[OcrPage],
        run_id: &RunId,
        risk_mapping: &HccMapping,
    ) -> Result<MedicalNotes, ClientError> {
        let body = NotesRequest {
            pages,
            run_id: run_id.as_str(),
            hcc_data: risk_mapping.as_json(),
        };
        self.post_json("paginated_medical_notes", &body).await
    }
}
