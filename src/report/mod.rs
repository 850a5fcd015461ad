// src/report/mod.rs — Report exporters
//
// Exporters consume a finished `WorkflowResult`; the core never depends on them.

pub mod json;
pub mod markdown;

pub use json::JsonReport;
pub use markdown::MarkdownReport;

use crate::core::types::WorkflowResult;
use crate::infra::errors::WorkflowError;

pub trait ReportExporter {
    /// File extension used when the report is persisted.
    fn extension(&self) -> &'static str;

    fn render(&self, result: &WorkflowResult) -> Result<String, WorkflowError>;
}

/// Share of attempts spent on retries, in percent. Zero when the first attempt
/// decided the run (or nothing ran).
pub fn retry_overhead_percent(attempts: usize) -> f64 {
    if attempts <= 1 {
        return 0.0;
    }
    (attempts - 1) as f64 * 100.0 / attempts as f64
}
