// src/report/json.rs — Machine-readable report

use super::ReportExporter;
use crate::core::types::WorkflowResult;
use crate::infra::errors::WorkflowError;

/// Pretty-printed serialization of the whole `WorkflowResult`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReport;

impl ReportExporter for JsonReport {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, result: &WorkflowResult) -> Result<String, WorkflowError> {
        Ok(serde_json::to_string_pretty(result)?)
    }
}
