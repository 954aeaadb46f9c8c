//! The relay request flow.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::Instrument;
use uuid::Uuid;

use agent_relay_agent::{Agent, model, sanitize_error, validate_prompt};
use agent_relay_core::{
    CaptureSink, DeliveryOutcome, SinkError, SinkResolver, StreamOptions, StreamSession,
};

use crate::config::RelayConfig;
use crate::envelope::{EnvelopeError, RelayRequest, SnsEvent};

/// Response returned to the pub/sub push caller.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: Value,
}

impl HandlerResponse {
    /// Mirror a destination delivery outcome back to the push caller.
    fn from_delivery(result: Result<DeliveryOutcome, SinkError>) -> Self {
        match result {
            Ok(outcome) => Self {
                status: outcome.status,
                body: Value::String(outcome.body),
            },
            Err(e) => Self {
                status: 502,
                body: json!({
                    "error": "delivery failed",
                    "message": e.to_string(),
                }),
            },
        }
    }

    fn bad_request(error: &EnvelopeError) -> Self {
        Self {
            status: 400,
            body: json!({
                "error": "malformed request",
                "message": error.to_string(),
            }),
        }
    }
}

/// Orchestrates one relay request: envelope → validation → agent invocation
/// with a streaming session installed → final delivery.
pub struct RelayService {
    config: Arc<RelayConfig>,
    agent: Arc<dyn Agent>,
    sinks: Arc<dyn SinkResolver>,
}

impl RelayService {
    /// Create a service over an agent and a sink resolver.
    #[must_use]
    pub fn new(
        config: Arc<RelayConfig>,
        agent: Arc<dyn Agent>,
        sinks: Arc<dyn SinkResolver>,
    ) -> Self {
        Self {
            config,
            agent,
            sinks,
        }
    }

    /// Handle one inbound event.
    ///
    /// Whenever a delivery token could be extracted, the destination receives
    /// some final message: the answer, a validation error, or a generic
    /// failure notice. Only envelope failures without a token surface as a
    /// plain error response.
    pub async fn handle_event(&self, event: SnsEvent) -> HandlerResponse {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("relay_request", %request_id);
        self.handle_inner(event).instrument(span).await
    }

    async fn handle_inner(&self, event: SnsEvent) -> HandlerResponse {
        let request = match RelayRequest::from_event(&event) {
            Ok(request) => request,
            Err(e) => return self.envelope_failure(&e).await,
        };

        tracing::info!(
            prompt_chars = request.prompt.chars().count(),
            "relay request received"
        );

        let sink = self.sinks.resolve(&request.token);

        if let Err(e) = validate_prompt(&request.prompt, self.config.max_prompt_length) {
            tracing::warn!(error = %e, "prompt rejected");
            return HandlerResponse::from_delivery(sink.deliver_message(&e.to_string()).await);
        }

        let model = model::ModelSpec::for_model(model::select_model_id(
            &request.prompt,
            &self.config.model_keywords,
            &self.config.default_model_id,
        ));
        tracing::info!(
            model = %model.model_id,
            temperature = f64::from(model.temperature),
            max_tokens = model.max_tokens,
            streaming = self.config.enable_streaming,
            "invoking agent"
        );

        let (invoke_result, captured) = if self.config.enable_streaming {
            let session = StreamSession::open(
                Arc::clone(&sink),
                StreamOptions {
                    min_lines: self.config.stream_min_lines,
                    max_buffer_chars: self.config.stream_max_buffer,
                },
            );
            // The session is drained and closed on every path out of the
            // invocation, including agent failure.
            let result = self.agent.invoke(&request.prompt, &session).await;
            session.flush_remaining().await;
            let captured = session.full_content();
            session.close().await;
            (result, captured)
        } else {
            let capture = CaptureSink::new();
            let result = self.agent.invoke(&request.prompt, &capture).await;
            (result, capture.contents())
        };

        if !captured.is_empty() {
            tracing::debug!(
                captured_chars = captured.chars().count(),
                "agent output captured"
            );
        }

        match invoke_result {
            Ok(response) => {
                let response = response.trim();
                tracing::info!(response_chars = response.chars().count(), "agent completed");

                let content = if self.config.enable_streaming {
                    // Completion marker plus the full response, even though
                    // the chunks already streamed it.
                    format!("**Processing complete**\nFinal response: {response}")
                } else {
                    response.to_string()
                };
                HandlerResponse::from_delivery(sink.deliver_message(&content).await)
            }
            Err(e) => {
                let sanitized = sanitize_error(&e.to_string());
                tracing::error!(error = %sanitized, "agent invocation failed");
                HandlerResponse::from_delivery(
                    sink.deliver_message("Internal Server Error").await,
                )
            }
        }
    }

    async fn envelope_failure(&self, error: &EnvelopeError) -> HandlerResponse {
        tracing::error!(error = %error, "envelope rejected");
        if let Some(token) = error.token() {
            let sink = self.sinks.resolve(token);
            return HandlerResponse::from_delivery(
                sink.deliver_message("The request was malformed").await,
            );
        }
        HandlerResponse::bad_request(error)
    }
}
