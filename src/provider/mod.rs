// src/provider/mod.rs — Candidate producer layer

pub mod command;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::types::CandidateArtifact;
use crate::infra::errors::WorkflowError;

/// What one generation call hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerOutput {
    pub candidate: CandidateArtifact,
    /// Opaque usage counter (tokens, credits, ...). Zero when unknown.
    #[serde(default)]
    pub cost_units: u64,
}

impl From<CandidateArtifact> for ProducerOutput {
    fn from(candidate: CandidateArtifact) -> Self {
        Self {
            candidate,
            cost_units: 0,
        }
    }
}

/// Produces a candidate artifact for a task, optionally steered by the
/// directive built from the previous attempt's findings.
///
/// Implementations must tolerate repeated calls with different directives and
/// must not rely on memory of earlier calls.
#[async_trait]
pub trait CandidateProducer: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        task: &str,
        retry_directive: Option<&str>,
    ) -> Result<ProducerOutput, WorkflowError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_from_candidate_has_zero_cost() {
        let out = ProducerOutput::from(CandidateArtifact {
            function_name: "f".into(),
            code: "def f(): pass".into(),
            explanation: String::new(),
            dependencies: vec![],
            test_code: String::new(),
            usage_examples: vec![],
        });
        assert_eq!(out.cost_units, 0);
        assert_eq!(out.candidate.function_name, "f");
    }

    #[test]
    fn test_output_parses_wrapped_candidate_with_cost() {
        let json = r#"{
            "candidate": {"function_name": "g", "code": "", "explanation": ""},
            "cost_units": 812
        }"#;
        let out: ProducerOutput = serde_json::from_str(json).unwrap();
        assert_eq!(out.cost_units, 812);
        assert_eq!(out.candidate.function_name, "g");
    }
}
