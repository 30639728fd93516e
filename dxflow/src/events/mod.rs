//! Event sinks for pipeline observability.
//!
//! The orchestrator publishes a [`PipelineEvent`](crate::core::PipelineEvent)
//! on every transition. Consumers subscribe by handing the orchestrator a
//! sink instead of the orchestrator reaching into their state.

mod sink;

pub use sink::{
    BroadcastEventSink, CollectingEventSink, EventSink, FanoutEventSink, LoggingEventSink,
    NoOpEventSink,
};
