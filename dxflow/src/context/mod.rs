//! Run identification.
//!
//! A run is one end-to-end execution of the pipeline. Its identifier is
//! allocated by the remote service and forwarded unchanged to every stage
//! call so server-side state can be correlated.

mod identity;

pub use identity::{begin_run, RunContext, RunId};
