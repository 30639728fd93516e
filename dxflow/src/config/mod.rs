//! Configuration types.
//!
//! - [`ClientConfig`]: how to reach the remote stage services
//! - [`ApiConfiguration`] and [`ConfigurationGate`]: the user's OCR backend
//!   choice, confirmed before an execution may start

mod client;
mod gate;

pub use client::{ClientConfig, ConfigError, API_URL_ENV, TIMEOUT_ENV};
pub use gate::{ApiConfiguration, ConfigurationGate, OcrModel, ParseOcrModelError};
