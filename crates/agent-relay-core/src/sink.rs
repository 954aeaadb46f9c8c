//! Sink traits for producer output and destination delivery.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

/// Producer-facing text sink.
///
/// An agent invocation writes its incremental output here. Implementations
/// must accept writes from the producer while any background delivery runs
/// concurrently, and must never block on network I/O.
pub trait OutputSink: Send + Sync {
    /// Append a text fragment.
    ///
    /// Returns the number of characters accepted, which is always the full
    /// character count of `text`.
    fn write(&self, text: &str) -> usize;
}

/// Plain accumulating sink for when streaming is disabled.
#[derive(Default)]
pub struct CaptureSink {
    buf: Mutex<String>,
}

impl CaptureSink {
    /// Create an empty capture sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        self.buf.lock().unwrap().clone()
    }
}

impl OutputSink for CaptureSink {
    fn write(&self, text: &str) -> usize {
        self.buf.lock().unwrap().push_str(text);
        text.chars().count()
    }
}

/// Sink error.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("response read error: {0}")]
    ResponseRead(String),
}

/// Status code + response body returned by the destination for one delivery.
///
/// Only logged, never persisted.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    /// HTTP status code.
    pub status: u16,
    /// Response body text (empty on success).
    pub body: String,
}

impl DeliveryOutcome {
    /// Whether the destination accepted the delivery.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Destination-facing delivery sink.
///
/// One sink is bound to one destination conversation. Implementations apply
/// their own display formatting and size caps; a delivery is never rejected
/// outright for size.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Deliver one streamed chunk, with display formatting applied.
    async fn deliver_chunk(&self, content: &str) -> Result<DeliveryOutcome, SinkError>;

    /// Deliver a plain message (final response, error report).
    async fn deliver_message(&self, content: &str) -> Result<DeliveryOutcome, SinkError>;
}

/// Resolves a delivery token to a destination sink.
pub trait SinkResolver: Send + Sync {
    /// Build the sink scoped to one destination conversation.
    fn resolve(&self, token: &str) -> Arc<dyn DeliverySink>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_sink_accumulates() {
        let sink = CaptureSink::new();
        assert_eq!(sink.write("hello "), 6);
        assert_eq!(sink.write("world"), 5);
        assert_eq!(sink.contents(), "hello world");
    }

    #[test]
    fn write_counts_characters_not_bytes() {
        let sink = CaptureSink::new();
        assert_eq!(sink.write("héllo"), 5);
    }

    #[test]
    fn outcome_success_range() {
        let ok = DeliveryOutcome {
            status: 204,
            body: String::new(),
        };
        let rejected = DeliveryOutcome {
            status: 429,
            body: "rate limited".into(),
        };
        assert!(ok.is_success());
        assert!(!rejected.is_success());
    }
}
