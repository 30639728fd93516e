//! Pipeline transition events.

use super::PipelineStage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An event emitted by the orchestrator on every state transition.
///
/// Events are consumed by event sinks for progress display, logging, or
/// analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// The event type (e.g., "stage.started", "stage.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// The run this event belongs to, once one has been allocated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// The event payload data.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl PipelineEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: crate::utils::iso_timestamp(),
            run_id: None,
            data: HashMap::new(),
        }
    }

    /// Adds a data field to the event.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Tags the event with a run identifier.
    #[must_use]
    pub fn with_run_id(mut self, run_id: Option<&str>) -> Self {
        self.run_id = run_id.map(str::to_string);
        self
    }

    /// The stage this event refers to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        self.data.get("stage").and_then(serde_json::Value::as_str)
    }

    /// The progress marker carried by the event, if any.
    #[must_use]
    pub fn progress(&self) -> Option<u8> {
        self.data
            .get("progress")
            .and_then(serde_json::Value::as_u64)
            .and_then(|p| u8::try_from(p).ok())
    }

    /// Converts the event to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.event_type));
        map.insert("timestamp".to_string(), serde_json::json!(self.timestamp));

        if let Some(ref run_id) = self.run_id {
            map.insert("run_id".to_string(), serde_json::json!(run_id));
        }
        if !self.data.is_empty() {
            let data_map: serde_json::Map<String, serde_json::Value> =
                self.data.clone().into_iter().collect();
            map.insert("data".to_string(), serde_json::Value::Object(data_map));
        }

        map
    }

    /// Creates a "pipeline.started" event.
    #[must_use]
    pub fn pipeline_started(ocr_model: &str) -> Self {
        Self::new("pipeline.started").add_data("ocr_model", serde_json::json!(ocr_model))
    }

    /// Creates a "stage.started" event.
    #[must_use]
    pub fn stage_started(stage: PipelineStage) -> Self {
        Self::new("stage.started").add_data("stage", serde_json::json!(stage.as_str()))
    }

    /// Creates a "stage.completed" event.
    #[must_use]
    pub fn stage_completed(stage: PipelineStage, duration_ms: f64) -> Self {
        Self::new("stage.completed")
            .add_data("stage", serde_json::json!(stage.as_str()))
            .add_data("progress", serde_json::json!(stage.progress_index()))
            .add_data("duration_ms", serde_json::json!(duration_ms))
    }

    /// Creates a "stage.failed" event.
    #[must_use]
    pub fn stage_failed(stage: PipelineStage, error: &str) -> Self {
        Self::new("stage.failed")
            .add_data("stage", serde_json::json!(stage.as_str()))
            .add_data("error", serde_json::json!(error))
    }

    /// Creates a "pipeline.completed" event.
    #[must_use]
    pub fn pipeline_completed(duration_ms: f64) -> Self {
        Self::new("pipeline.completed")
            .add_data("progress", serde_json::json!(PipelineStage::MAX_PROGRESS))
            .add_data("duration_ms", serde_json::json!(duration_ms))
    }

    /// Creates a "pipeline.failed" event.
    #[must_use]
    pub fn pipeline_failed(progress: u8, error: &str) -> Self {
        Self::new("pipeline.failed")
            .add_data("progress", serde_json::json!(progress))
            .add_data("error", serde_json::json!(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = PipelineEvent::new("test.event");
        assert_eq!(event.event_type, "test.event");
        assert!(event.data.is_empty());
        assert!(event.run_id.is_none());
    }

    #[test]
    fn test_stage_completed_carries_progress() {
        let event = PipelineEvent::stage_completed(PipelineStage::Ocr, 12.5);
        assert_eq!(event.event_type, "stage.completed");
        assert_eq!(event.stage(), Some("ocr"));
        assert_eq!(event.progress(), Some(2));
        assert_eq!(event.data.get("duration_ms"), Some(&serde_json::json!(12.5)));
    }

    #[test]
    fn test_stage_failed() {
        let event = PipelineEvent::stage_failed(PipelineStage::Redact, "service timeout")
            .with_run_id(Some("run-1"));
        assert_eq!(event.stage(), Some("pii_redaction"));
        assert_eq!(event.data.get("error"), Some(&serde_json::json!("service timeout")));
        assert_eq!(event.run_id.as_deref(), Some("run-1"));
    }

    #[test]
    fn test_to_dict_omits_missing_run_id() {
        let dict = PipelineEvent::pipeline_started("azure").to_dict();
        assert!(!dict.contains_key("run_id"));
        assert_eq!(dict["type"], "pipeline.started");
    }

    #[test]
    fn test_event_serialization() {
        let event = PipelineEvent::stage_started(PipelineStage::Upload).with_run_id(Some("r"));
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: PipelineEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(event, deserialized);
    }
}
