//! Callable tools handed to the agent backend.
//!
//! The registry assembles the static tool list once per request; which tools
//! participate is configuration-driven. Invoking them is the backend's
//! business, so each tool is a plain name + description + JSON-in/JSON-out
//! call.

pub mod builtin;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use builtin::{CurrentTime, GenerateHash, HttpRequest, JsonFormatter, TextAnalyzer};

/// Tool error.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("tool execution failed: {0}")]
    Execution(String),
}

/// A callable tool exposed to the agent.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable tool name the backend refers to.
    fn name(&self) -> &'static str;

    /// Human-readable description for the backend's tool listing.
    fn description(&self) -> &'static str;

    /// Execute with JSON arguments.
    ///
    /// # Errors
    /// Returns error on malformed arguments or execution failure.
    async fn call(&self, args: Value) -> Result<Value, ToolError>;
}

/// Which built-in tools participate.
#[derive(Debug, Clone, Copy)]
pub struct ToolFlags {
    pub hash_generator: bool,
    pub json_formatter: bool,
    pub text_analyzer: bool,
    pub current_time: bool,
    pub http_request: bool,
}

impl Default for ToolFlags {
    fn default() -> Self {
        Self {
            hash_generator: true,
            json_formatter: true,
            text_analyzer: true,
            current_time: true,
            http_request: true,
        }
    }
}

/// Static list of tools for one agent invocation.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Assemble the built-in tools enabled by `flags`.
    #[must_use]
    pub fn builtin(flags: ToolFlags) -> Self {
        let mut registry = Self::default();
        if flags.current_time {
            registry.register(Arc::new(CurrentTime));
        }
        if flags.http_request {
            registry.register(Arc::new(HttpRequest::new()));
        }
        if flags.hash_generator {
            registry.register(Arc::new(GenerateHash));
        }
        if flags.json_formatter {
            registry.register(Arc::new(JsonFormatter));
        }
        if flags.text_analyzer {
            registry.register(Arc::new(TextAnalyzer));
        }
        tracing::info!(tools = ?registry.names(), "tool registry assembled");
        registry
    }

    /// Add a tool.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Look a tool up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Registered tool names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_enable_everything() {
        let registry = ToolRegistry::builtin(ToolFlags::default());
        assert_eq!(registry.len(), 5);
        assert!(registry.get("generate_hash").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn flags_remove_tools() {
        let registry = ToolRegistry::builtin(ToolFlags {
            hash_generator: false,
            json_formatter: false,
            text_analyzer: false,
            current_time: true,
            http_request: false,
        });
        assert_eq!(registry.names(), vec!["current_time"]);
    }
}
