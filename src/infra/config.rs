// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::infra::errors::WorkflowError;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workflow: WorkflowSection,

    #[serde(default)]
    pub feedback: FeedbackSection,

    #[serde(default)]
    pub detector: DetectorSection,

    #[serde(default)]
    pub producer: ProducerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSection {
    pub max_retries: u32,
    pub warning_threshold: u32,
    pub producer_timeout_secs: u64,
    pub detector_timeout_secs: u64,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            max_retries: 5,
            warning_threshold: 5,
            producer_timeout_secs: 120,
            detector_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSection {
    /// Cap on warnings listed in a retry directive. `None` = unlimited.
    pub max_warnings: Option<usize>,
    pub include_info: bool,
}

impl Default for FeedbackSection {
    fn default() -> Self {
        Self {
            max_warnings: None,
            include_info: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSection {
    pub check_security: bool,
    pub check_style: bool,
    pub check_documentation: bool,
    pub check_testing: bool,
    pub min_explanation_chars: usize,
    pub min_usage_examples: usize,
    /// External analyzer run after the built-in checks.
    pub command: Option<String>,
}

impl Default for DetectorSection {
    fn default() -> Self {
        Self {
            check_security: true,
            check_style: true,
            check_documentation: true,
            check_testing: true,
            min_explanation_chars: 50,
            min_usage_examples: 2,
            command: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerSection {
    pub command: Option<String>,
    pub env: HashMap<String, String>,
}

impl Config {
    /// Load from the default location, or defaults if no file exists.
    pub fn load() -> Result<Self, WorkflowError> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, WorkflowError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| WorkflowError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> Result<Self, WorkflowError> {
        toml::from_str(content).map_err(|e| WorkflowError::Config(e.message().to_string()))
    }
}
