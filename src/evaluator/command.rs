// src/evaluator/command.rs — Detector backed by an external analyzer command
//
// The command receives the candidate as JSON on stdin and prints
// {"findings": [...], "scores": {...}, "cost_units": N} on stdout.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Inspection, IssueDetector};
use crate::core::types::{CandidateArtifact, Finding};
use crate::infra::errors::WorkflowError;

#[derive(Debug, Deserialize)]
struct AnalyzerReply {
    #[serde(default)]
    findings: Vec<Finding>,
    #[serde(default)]
    scores: BTreeMap<String, f64>,
    #[serde(default)]
    cost_units: u64,
}

pub struct CommandDetector {
    command: String,
}

impl CommandDetector {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl IssueDetector for CommandDetector {
    fn name(&self) -> &str {
        "command"
    }

    async fn inspect(&self, candidate: &CandidateArtifact) -> Result<Inspection, WorkflowError> {
        let payload = serde_json::to_vec(candidate)?;

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                WorkflowError::detector(format!("failed to spawn '{}': {}", self.command, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&payload).await {
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!("Analyzer closed stdin before reading the candidate");
                }
                Err(e) => {
                    return Err(WorkflowError::detector(format!(
                        "failed to write candidate: {e}"
                    )))
                }
                Ok(()) => {}
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| WorkflowError::detector(format!("analyzer did not finish: {e}")))?;

        if !output.status.success() {
            return Err(WorkflowError::detector(format!(
                "analyzer exited with {}",
                output.status
            )));
        }

        let reply: AnalyzerReply = serde_json::from_slice(&output.stdout)
            .map_err(|e| WorkflowError::detector(format!("analyzer output is invalid: {e}")))?;

        Ok(Inspection {
            findings: reply.findings,
            scores: reply.scores,
            cost_units: reply.cost_units,
        })
    }
}
