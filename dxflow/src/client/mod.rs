//! Remote stage client.
//!
//! [`StageClient`] is the contract the orchestrator needs from the remote
//! services: one asynchronous operation per pipeline stage, every one of them
//! scoped to a run. [`HttpStageClient`] implements it over HTTP.

#[cfg(feature = "http")]
mod http;
mod protocol;

#[cfg(feature = "http")]
pub use http::HttpStageClient;
#[cfg(test)]
pub use protocol::MockStageClient;
pub use protocol::StageClient;
