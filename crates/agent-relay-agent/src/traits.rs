//! The agent trait.

use async_trait::async_trait;
use thiserror::Error;

use agent_relay_core::OutputSink;

/// Agent error.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid agent command: {0}")]
    InvalidCommand(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("agent invocation failed: {0}")]
    Invocation(String),
}

/// An opaque generative agent.
///
/// While an invocation runs, the agent writes incremental text fragments to
/// the installed output sink; the return value is the complete response. The
/// sink is passed explicitly rather than installed as ambient process state,
/// so concurrent invocations cannot observe each other's output.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Run one prompt to completion, streaming fragments into `output`.
    ///
    /// # Errors
    /// Returns error if the backend cannot be reached or fails mid-run.
    async fn invoke(&self, prompt: &str, output: &dyn OutputSink) -> Result<String, AgentError>;

    /// Identifier of the underlying model, when the backend exposes one.
    fn model_id(&self) -> Option<&str> {
        None
    }
}
