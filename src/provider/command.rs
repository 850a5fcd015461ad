// src/provider/command.rs — Producer backed by an external command
//
// The command receives one JSON request on stdin and must print a JSON
// candidate on stdout, either bare or wrapped as {"candidate": ..., "cost_units": N}.
// Anything else (spawn error, non-zero exit, unparsable output) is a producer failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::prompt::{PromptBuilder, SYSTEM_PROMPT};
use super::{CandidateProducer, ProducerOutput};
use crate::core::types::CandidateArtifact;
use crate::infra::config::ProducerSection;
use crate::infra::errors::WorkflowError;

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    task: &'a str,
    retry_directive: Option<&'a str>,
    system: &'a str,
    prompt: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenerationReply {
    Wrapped(ProducerOutput),
    Bare(CandidateArtifact),
}

pub struct CommandProducer {
    command: String,
    env: HashMap<String, String>,
    prompts: PromptBuilder,
}

impl CommandProducer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            env: HashMap::new(),
            prompts: PromptBuilder::new(),
        }
    }

    pub fn from_config(section: &ProducerSection) -> Result<Self, WorkflowError> {
        let command = section.command.clone().ok_or_else(|| {
            WorkflowError::Config(
                "no producer configured; set [producer] command or pass --producer".into(),
            )
        })?;
        if command.trim().is_empty() {
            return Err(WorkflowError::Config("producer command is empty".into()));
        }
        Ok(Self::new(command).with_env(section.env.clone()))
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }
}

#[async_trait]
impl CandidateProducer for CommandProducer {
    fn name(&self) -> &str {
        "command"
    }

    async fn generate(
        &self,
        task: &str,
        retry_directive: Option<&str>,
    ) -> Result<ProducerOutput, WorkflowError> {
        let request = GenerationRequest {
            task,
            retry_directive,
            system: SYSTEM_PROMPT,
            prompt: self.prompts.render(task, retry_directive)?,
        };
        let payload = serde_json::to_vec(&request)?;

        tracing::debug!(command = %self.command, retry = retry_directive.is_some(), "Spawning producer");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WorkflowError::producer(format!("failed to spawn '{}': {}", self.command, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&payload).await {
                // The command may answer without reading its request; its exit
                // status and stdout decide the call.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!("Producer closed stdin before reading the request");
                }
                Err(e) => {
                    return Err(WorkflowError::producer(format!(
                        "failed to write request: {e}"
                    )))
                }
                Ok(()) => {}
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| WorkflowError::producer(format!("producer did not finish: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WorkflowError::producer(format!(
                "producer exited with {}: {}",
                output.status,
                last_line(&stderr).unwrap_or("no stderr output")
            )));
        }

        parse_reply(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_reply(stdout: &str) -> Result<ProducerOutput, WorkflowError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::producer("producer printed nothing"));
    }
    match serde_json::from_str::<GenerationReply>(trimmed) {
        Ok(GenerationReply::Wrapped(out)) => Ok(out),
        Ok(GenerationReply::Bare(candidate)) => Ok(candidate.into()),
        Err(e) => Err(WorkflowError::producer(format!(
            "producer output is not a candidate: {e}"
        ))),
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|l| !l.is_empty())
}
