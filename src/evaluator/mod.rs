// src/evaluator/mod.rs — Issue detection layer

pub mod command;
pub mod static_analysis;

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::core::types::{CandidateArtifact, Finding};
use crate::infra::errors::WorkflowError;

/// Raw result of one inspection pass. All-or-nothing: a detector either
/// returns a complete inspection or fails.
#[derive(Debug, Clone, Default)]
pub struct Inspection {
    pub findings: Vec<Finding>,
    /// Informational scores; passed through to the summary untouched.
    pub scores: BTreeMap<String, f64>,
    pub cost_units: u64,
}

impl From<Vec<Finding>> for Inspection {
    fn from(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            ..Default::default()
        }
    }
}

/// Inspects a candidate and reports findings tagged with severity.
#[async_trait]
pub trait IssueDetector: Send + Sync {
    fn name(&self) -> &str;

    async fn inspect(&self, candidate: &CandidateArtifact) -> Result<Inspection, WorkflowError>;
}

/// Runs several detectors in sequence and concatenates their findings.
/// Fails as soon as one of them fails.
pub struct CompositeDetector {
    detectors: Vec<Box<dyn IssueDetector>>,
}

impl CompositeDetector {
    pub fn new(detectors: Vec<Box<dyn IssueDetector>>) -> Self {
        Self { detectors }
    }
}

#[async_trait]
impl IssueDetector for CompositeDetector {
    fn name(&self) -> &str {
        "composite"
    }

    async fn inspect(&self, candidate: &CandidateArtifact) -> Result<Inspection, WorkflowError> {
        let mut merged = Inspection::default();
        for detector in &self.detectors {
            let part = detector.inspect(candidate).await?;
            tracing::debug!(
                detector = detector.name(),
                findings = part.findings.len(),
                "Detector finished"
            );
            merged.findings.extend(part.findings);
            merged.scores.extend(part.scores);
            merged.cost_units += part.cost_units;
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Category;

    struct Fixed(Vec<Finding>, u64);

    #[async_trait]
    impl IssueDetector for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn inspect(&self, _c: &CandidateArtifact) -> Result<Inspection, WorkflowError> {
            Ok(Inspection {
                findings: self.0.clone(),
                scores: BTreeMap::new(),
                cost_units: self.1,
            })
        }
    }

    struct Broken;

    #[async_trait]
    impl IssueDetector for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        async fn inspect(&self, _c: &CandidateArtifact) -> Result<Inspection, WorkflowError> {
            Err(WorkflowError::detector("analysis backend unavailable"))
        }
    }

    fn candidate() -> CandidateArtifact {
        CandidateArtifact {
            function_name: "f".into(),
            code: String::new(),
            explanation: String::new(),
            dependencies: vec![],
            test_code: String::new(),
            usage_examples: vec![],
        }
    }

    #[tokio::test]
    async fn test_composite_merges_in_order() {
        let composite = CompositeDetector::new(vec![
            Box::new(Fixed(vec![Finding::warning(Category::Style, "a")], 3)),
            Box::new(Fixed(vec![Finding::critical(Category::Syntax, "b")], 4)),
        ]);
        let inspection = composite.inspect(&candidate()).await.unwrap();
        assert_eq!(inspection.findings.len(), 2);
        assert_eq!(inspection.findings[0].message, "a");
        assert_eq!(inspection.cost_units, 7);
    }

    #[tokio::test]
    async fn test_composite_is_all_or_nothing() {
        let composite = CompositeDetector::new(vec![
            Box::new(Fixed(vec![Finding::warning(Category::Style, "a")], 0)),
            Box::new(Broken),
        ]);
        let err = composite.inspect(&candidate()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Detector { .. }));
    }

    #[test]
    fn test_inspection_from_findings() {
        let i = Inspection::from(vec![Finding::info(Category::Advisory, "x")]);
        assert_eq!(i.findings.len(), 1);
        assert!(i.scores.is_empty());
        assert_eq!(i.cost_units, 0);
    }
}
