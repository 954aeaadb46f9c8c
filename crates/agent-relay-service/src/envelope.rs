//! Inbound pub/sub envelope.
//!
//! The notification arrives as an SNS-style event whose record carries a
//! JSON-encoded interaction message: a delivery token plus the user's prompt
//! nested in the command options. The wire shape is consumed as-is.

use serde::Deserialize;
use thiserror::Error;

/// Envelope error. Absence of either the token or the prompt is a hard
/// input error.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("event contains no records")]
    NoRecords,
    #[error("invalid message JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no delivery token was found")]
    MissingToken,
    #[error("no prompt was provided")]
    MissingPrompt {
        /// Token extracted before the prompt turned out to be absent; lets
        /// the caller report the failure to the destination directly.
        token: String,
    },
}

impl EnvelopeError {
    /// Delivery token recovered despite the failure, when any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::MissingPrompt { token } => Some(token),
            _ => None,
        }
    }
}

/// Pub/sub push event.
#[derive(Debug, Clone, Deserialize)]
pub struct SnsEvent {
    #[serde(rename = "Records")]
    pub records: Vec<SnsRecord>,
}

/// One record of the push event.
#[derive(Debug, Clone, Deserialize)]
pub struct SnsRecord {
    #[serde(rename = "Sns")]
    pub sns: SnsEnvelope,
}

/// The notification payload: a JSON string to be parsed again.
#[derive(Debug, Clone, Deserialize)]
pub struct SnsEnvelope {
    #[serde(rename = "Message")]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct InteractionMessage {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    data: InteractionData,
}

#[derive(Debug, Default, Deserialize)]
struct InteractionData {
    #[serde(default)]
    options: Vec<InteractionOption>,
}

#[derive(Debug, Deserialize)]
struct InteractionOption {
    #[serde(default)]
    value: Option<String>,
}

/// Extracted relay request: one delivery token, one prompt.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub token: String,
    pub prompt: String,
}

impl RelayRequest {
    /// Extract token and prompt from the nested notification payload.
    ///
    /// # Errors
    /// Returns error if the event has no records, the inner message is not
    /// valid JSON, or token/prompt are absent or empty.
    pub fn from_event(event: &SnsEvent) -> Result<Self, EnvelopeError> {
        let record = event.records.first().ok_or(EnvelopeError::NoRecords)?;
        let message: InteractionMessage = serde_json::from_str(&record.sns.message)?;

        let token = message
            .token
            .filter(|t| !t.is_empty())
            .ok_or(EnvelopeError::MissingToken)?;

        let prompt = message
            .data
            .options
            .into_iter()
            .next()
            .and_then(|option| option.value)
            .filter(|v| !v.is_empty())
            .ok_or(EnvelopeError::MissingPrompt {
                token: token.clone(),
            })?;

        Ok(Self { token, prompt })
    }
}
