//! Discord-compatible webhook delivery sink.
//!
//! One [`WebhookSink`] is scoped to a single interaction: it POSTs chunked
//! text to `{api_base}/api/v10/webhooks/{application_id}/{token}` with a bot
//! authorization header. The destination accepts at most
//! [`MESSAGE_CHAR_CAP`] characters per message and answers `204 No Content`
//! on success; everything else is a soft failure that callers log and move
//! past.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use agent_relay_core::{DeliveryOutcome, DeliverySink, SinkError, SinkResolver};

/// Destination hard cap on one message, in characters.
pub const MESSAGE_CHAR_CAP: usize = 2000;

/// Default destination API base.
pub const DEFAULT_API_BASE: &str = "https://discord.com";

/// Streamed chunks leave room for the code fence and marker under the cap.
const CHUNK_CONTENT_CAP: usize = 1900;

const TRUNCATION_MARKER: &str = "...";

/// Per-request timeout, bounding how long one failed call can delay the
/// chunks queued behind it.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Truncate to at most `cap` characters, appending the marker when cut.
fn truncate_chars(content: &str, cap: usize) -> String {
    if content.chars().count() <= cap {
        return content.to_string();
    }
    let mut truncated: String = content.chars().take(cap).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Wrap a streamed chunk for display as a preformatted block.
///
/// Oversized content is truncated with a marker rather than rejected, so the
/// wrapped payload always fits under [`MESSAGE_CHAR_CAP`].
#[must_use]
pub fn format_chunk(content: &str) -> String {
    format!("```\n{}\n```", truncate_chars(content, CHUNK_CONTENT_CAP))
}

/// Cap a plain message at the destination limit, marker included.
#[must_use]
pub fn cap_message(content: &str) -> String {
    truncate_chars(content, MESSAGE_CHAR_CAP - TRUNCATION_MARKER.len())
}

/// Webhook sink bound to one destination interaction.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    bot_token: String,
}

impl WebhookSink {
    /// Create a sink for one interaction token.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        api_base: &str,
        application_id: &str,
        token: &str,
        bot_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url: format!("{api_base}/api/v10/webhooks/{application_id}/{token}"),
            bot_token: bot_token.into(),
        }
    }

    /// POST one content payload to the webhook.
    ///
    /// # Errors
    /// Returns an error if the request cannot be sent or the response body
    /// cannot be read. Non-204 statuses are reported in the outcome, not as
    /// errors.
    pub async fn post(&self, content: &str) -> Result<DeliveryOutcome, SinkError> {
        let body = serde_json::json!({ "content": content });
        let response = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bot {}", self.bot_token))
            .json(&body)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| SinkError::ResponseRead(e.to_string()))?;

        if status != 204 {
            tracing::warn!(status, body = %text, "webhook response");
        }

        Ok(DeliveryOutcome { status, body: text })
    }
}

#[async_trait]
impl DeliverySink for WebhookSink {
    async fn deliver_chunk(&self, content: &str) -> Result<DeliveryOutcome, SinkError> {
        self.post(&format_chunk(content)).await
    }

    async fn deliver_message(&self, content: &str) -> Result<DeliveryOutcome, SinkError> {
        self.post(&cap_message(content)).await
    }
}

/// Resolves interaction tokens to webhook sinks sharing one HTTP client.
pub struct WebhookResolver {
    client: reqwest::Client,
    api_base: String,
    application_id: String,
    bot_token: String,
}

impl WebhookResolver {
    /// Create a resolver with its own pooled HTTP client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        api_base: impl Into<String>,
        application_id: impl Into<String>,
        bot_token: impl Into<String>,
    ) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.into(),
            application_id: application_id.into(),
            bot_token: bot_token.into(),
        })
    }
}

impl SinkResolver for WebhookResolver {
    fn resolve(&self, token: &str) -> Arc<dyn DeliverySink> {
        Arc::new(WebhookSink::new(
            self.client.clone(),
            &self.api_base,
            &self.application_id,
            token,
            self.bot_token.clone(),
        ))
    }
}
