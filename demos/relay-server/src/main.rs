//! Relay server demo.
//!
//! Run with: cargo run -p relay-server-demo
//!
//! Requires `RELAY_APPLICATION_ID`, `RELAY_BOT_TOKEN` and
//! `RELAY_AGENT_COMMAND` (the agent command line to spawn per request),
//! then accepts pub/sub pushes on POST /notify.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_relay_agent::{Agent, AgentCommand, ProcessAgent, ToolRegistry};
use agent_relay_core::SinkResolver;
use agent_relay_service::{RelayConfig, RelayService, router};
use agent_relay_webhook::WebhookResolver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = RelayConfig::from_env().context("loading relay configuration")?;

    let command_line = std::env::var("RELAY_AGENT_COMMAND")
        .context("RELAY_AGENT_COMMAND must name the agent command line")?;
    let agent = ProcessAgent::new(AgentCommand::parse(&command_line)?)
        .with_model_id(config.default_model_id.clone())
        .with_system_prompt(config.system_prompt.clone())
        .with_tools(ToolRegistry::builtin(config.tools));

    let sinks = WebhookResolver::new(
        config.api_base.clone(),
        config.application_id.clone(),
        config.bot_token.clone(),
    )?;

    let service = Arc::new(RelayService::new(
        Arc::new(config),
        Arc::new(agent) as Arc<dyn Agent>,
        Arc::new(sinks) as Arc<dyn SinkResolver>,
    ));

    let port: u16 = std::env::var("RELAY_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let app = router(service);
    tracing::info!("relay listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
