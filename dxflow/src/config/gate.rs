//! OCR backend selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The OCR backend the pipeline should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OcrModel {
    /// Azure document intelligence.
    #[default]
    #[serde(rename = "azure")]
    Azure,
    /// Self-hosted vision language model.
    #[serde(rename = "custom-vlm")]
    CustomVlm,
}

impl OcrModel {
    /// Every selectable backend.
    pub const ALL: [Self; 2] = [Self::Azure, Self::CustomVlm];

    /// Wire name sent to the OCR service.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Azure => "azure",
            Self::CustomVlm => "custom-vlm",
        }
    }

    /// Human label for selection lists.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Azure => "Azure OCR",
            Self::CustomVlm => "Custom VLM",
        }
    }
}

impl fmt::Display for OcrModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown OCR model name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown OCR model '{0}' (expected 'azure' or 'custom-vlm')")]
pub struct ParseOcrModelError(String);

impl FromStr for OcrModel {
    type Err = ParseOcrModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            "custom-vlm" => Ok(Self::CustomVlm),
            _ => Err(ParseOcrModelError(s.to_string())),
        }
    }
}

/// A confirmed API configuration.
///
/// Only [`ConfigurationGate::confirm`] hands these out in the interactive
/// flow, but non-interactive callers may build one directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfiguration {
    /// Selected OCR backend.
    pub ocr_model: OcrModel,
}

impl ApiConfiguration {
    /// Creates a configuration for the given backend.
    #[must_use]
    pub fn new(ocr_model: OcrModel) -> Self {
        Self { ocr_model }
    }
}

/// Captures the OCR backend choice before an execution may start.
///
/// Holds an editable draft and the last confirmed snapshot. Confirming
/// publishes the draft; cancelling throws it away.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationGate {
    draft: ApiConfiguration,
    confirmed: Option<ApiConfiguration>,
}

impl ConfigurationGate {
    /// Creates a gate with the default draft and nothing confirmed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restarts editing from the last confirmed value, or the default.
    pub fn open(&mut self) {
        self.draft = self.confirmed.unwrap_or_default();
    }

    /// Changes the draft selection.
    pub fn select(&mut self, model: OcrModel) {
        self.draft.ocr_model = model;
    }

    /// The currently selected (not yet confirmed) backend.
    #[must_use]
    pub fn selection(&self) -> OcrModel {
        self.draft.ocr_model
    }

    /// Publishes the draft and returns the snapshot.
    pub fn confirm(&mut self) -> ApiConfiguration {
        let snapshot = self.draft;
        self.confirmed = Some(snapshot);
        snapshot
    }

    /// Discards the draft, keeping whatever was confirmed before.
    pub fn cancel(&mut self) {
        self.draft = self.confirmed.unwrap_or_default();
    }

    /// The last confirmed configuration.
    #[must_use]
    pub fn confirmed(&self) -> Option<ApiConfiguration> {
        self.confirmed
    }

    /// Returns true once a configuration has been confirmed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.confirmed.is_some()
    }
}
