//! Testing utilities for dxflow pipelines.
//!
//! This module provides:
//! - A stub stage client with fixed fixtures, failure injection and call
//!   tracking
//! - Fixture values for every pipeline artifact

pub mod fixtures;
mod mocks;

pub use mocks::{StubCall, StubStageClient};
