//! Process-spawning agent implementation.
//!
//! Runs a configured agent command line as a child process: the prompt goes
//! in on stdin, stdout is forwarded line-by-line into the installed output
//! sink as it arrives, and the collected output is the response.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use agent_relay_core::OutputSink;

use crate::tools::ToolRegistry;
use crate::traits::{Agent, AgentError};

/// Parsed agent command line (program + args).
#[derive(Debug, Clone)]
pub struct AgentCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl AgentCommand {
    /// Parse a shell-style command line.
    ///
    /// # Errors
    /// Returns error if the command line cannot be split or is empty.
    pub fn parse(command_line: &str) -> Result<Self, AgentError> {
        let mut parts = shlex::split(command_line)
            .ok_or_else(|| AgentError::InvalidCommand(command_line.to_string()))?;
        if parts.is_empty() {
            return Err(AgentError::InvalidCommand(
                "empty agent command".to_string(),
            ));
        }
        let program = parts.remove(0);
        Ok(Self {
            program,
            args: parts,
        })
    }
}

/// Agent backed by an external command-line program.
pub struct ProcessAgent {
    command: AgentCommand,
    model_id: Option<String>,
    system_prompt: Option<String>,
    tools: ToolRegistry,
}

impl ProcessAgent {
    /// Name of the variable announcing the available tools to the child.
    const TOOLS_ENV: &'static str = "RELAY_AGENT_TOOLS";

    /// Create an agent from a parsed command.
    #[must_use]
    pub fn new(command: AgentCommand) -> Self {
        Self {
            command,
            model_id: None,
            system_prompt: None,
            tools: ToolRegistry::default(),
        }
    }

    /// Attach a model identifier for diagnostics.
    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Prepend a system prompt to every invocation.
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Announce a tool registry to the child process. Calling the tools is
    /// the backend's business; the child learns their names via
    /// `RELAY_AGENT_TOOLS`.
    #[must_use]
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }
}

#[async_trait]
impl Agent for ProcessAgent {
    async fn invoke(&self, prompt: &str, output: &dyn OutputSink) -> Result<String, AgentError> {
        tracing::info!(program = %self.command.program, "spawning agent process");

        let mut command = Command::new(&self.command.program);
        command
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if !self.tools.is_empty() {
            command.env(Self::TOOLS_ENV, self.tools.names().join(","));
        }

        let mut child = command
            .spawn()
            .map_err(|e| AgentError::SpawnFailed(e.to_string()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentError::SpawnFailed("stdin unavailable".to_string()))?;
        let payload = match &self.system_prompt {
            Some(system_prompt) => format!("{system_prompt}\n\n{prompt}"),
            None => prompt.to_string(),
        };
        // Feed stdin concurrently with the stdout loop below; writing first
        // can deadlock once both pipes fill up. Dropping the handle at task
        // end is the EOF telling the agent the prompt is complete.
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                tracing::debug!(error = %e, "agent closed stdin early");
            }
        });

        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf).await;
            }
            buf
        });

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::SpawnFailed("stdout unavailable".to_string()))?;
        let mut reader = BufReader::new(stdout);
        let mut response = String::new();
        let mut line = String::new();

        loop {
            line.clear();
            let n = reader.read_line(&mut line).await?;
            if n == 0 {
                break; // EOF
            }
            output.write(&line);
            response.push_str(&line);
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(AgentError::Invocation(format!(
                "agent exited with {status}: {}",
                stderr.trim()
            )));
        }

        if !stderr.trim().is_empty() {
            tracing::debug!(stderr = %stderr.trim(), "agent stderr");
        }

        Ok(response)
    }

    fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }
}
