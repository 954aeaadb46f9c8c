//! Agent seam for the relay.
//!
//! The generative backend itself is an external collaborator; this crate
//! owns the boundary around it:
//! - `Agent` - Trait with explicit output-sink injection
//! - `ProcessAgent` - Reference implementation spawning an agent command line
//! - Prompt validation and credential redaction
//! - Model-id selection for diagnostics
//! - Built-in `Tool` implementations and the registry handed to backends

pub mod model;
pub mod process;
pub mod tools;
pub mod traits;
pub mod validate;

pub use model::ModelSpec;
pub use process::{AgentCommand, ProcessAgent};
pub use tools::{Tool, ToolError, ToolFlags, ToolRegistry};
pub use traits::{Agent, AgentError};
pub use validate::{ValidationError, sanitize_error, validate_prompt};
