//! Timestamp helpers shared by events and stage timings.

pub mod timestamps;

pub use timestamps::{elapsed_ms, iso_timestamp};
