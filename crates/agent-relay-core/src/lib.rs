//! Core abstractions for the agent relay.
//!
//! This crate provides the fundamental building blocks:
//! - `StreamSession` - Buffered, rate-limited streaming relay to a delivery sink
//! - `OutputSink` / `CaptureSink` - Producer-facing text sinks
//! - `DeliverySink` / `SinkResolver` - Destination-facing delivery traits

pub mod sink;
pub mod stream;

pub use sink::{CaptureSink, DeliveryOutcome, DeliverySink, OutputSink, SinkError, SinkResolver};
pub use stream::{StreamOptions, StreamSession};
