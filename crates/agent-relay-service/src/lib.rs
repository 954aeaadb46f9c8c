//! Relay service: envelope parsing, configuration and the request flow.
//!
//! A pub/sub push delivers an interaction envelope; the handler validates
//! the prompt, runs the agent with a streaming session installed as its
//! output sink, and makes sure the destination conversation always receives
//! a final message.

pub mod config;
pub mod envelope;
pub mod handler;
pub mod routes;

pub use config::{ConfigError, RelayConfig};
pub use envelope::{EnvelopeError, RelayRequest, SnsEvent};
pub use handler::{HandlerResponse, RelayService};
pub use routes::router;
