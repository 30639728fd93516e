//! Run identity for tracking pipeline executions.

use crate::client::StageClient;
use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Opaque run identifier issued by the remote service.
///
/// Never parsed or interpreted locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Wraps a server-issued identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RunId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RunId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifies one pipeline execution.
///
/// Created once per execution and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    run_id: RunId,
}

impl RunContext {
    /// Creates a context for an already allocated run.
    #[must_use]
    pub fn new(run_id: RunId) -> Self {
        Self { run_id }
    }

    /// The run identifier.
    #[must_use]
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Consumes the context, returning the identifier.
    #[must_use]
    pub fn into_run_id(self) -> RunId {
        self.run_id
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("run_id".to_string(), serde_json::json!(self.run_id.as_str()));
        map
    }
}

/// Asks the remote service for a fresh run.
///
/// # Errors
///
/// Returns [`PipelineError::RunInitializationFailed`] if no identifier could
/// be allocated.
pub async fn begin_run(client: &dyn StageClient) -> Result<RunContext, PipelineError> {
    let run_id = client
        .initialize_run()
        .await
        .map_err(|e| PipelineError::RunInitializationFailed(e.to_string()))?;

    debug!(run_id = %run_id, "Allocated run");
    Ok(RunContext::new(run_id))
}
