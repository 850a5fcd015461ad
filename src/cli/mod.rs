// src/cli/mod.rs — CLI definition (clap derive)

pub mod check;
pub mod progress;
pub mod run;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "codegate",
    about = "Quality-gated code generation: generate, check, retry with feedback",
    version
)]
pub struct Cli {
    /// Task to run (default command when no subcommand given)
    #[arg(trailing_var_arg = true)]
    pub task: Vec<String>,

    /// Run a built-in sample task instead of a free-text one
    #[arg(short, long, value_enum, conflicts_with = "all")]
    pub preset: Option<TaskPreset>,

    /// Run every sample task, each with its own orchestrator
    #[arg(long)]
    pub all: bool,

    /// Retries after the first attempt (overrides config)
    #[arg(short = 'r', long)]
    pub max_retries: Option<u32>,

    /// Warnings tolerated by the quality gate (overrides config)
    #[arg(short = 'w', long)]
    pub warning_threshold: Option<u32>,

    /// Producer shell command (overrides [producer] command)
    #[arg(long)]
    pub producer: Option<String>,

    /// External analyzer shell command (overrides [detector] command)
    #[arg(long)]
    pub analyzer: Option<String>,

    /// Directory for the markdown report
    #[arg(long, default_value = ".")]
    pub report_dir: PathBuf,

    /// Do not write a report file
    #[arg(long)]
    pub no_report: bool,

    /// Print the result as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Suppress progress output (only emit final result)
    #[arg(long)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the detector and quality gate on a candidate JSON file
    Check {
        /// Candidate file (JSON object with function_name, code, ...)
        file: PathBuf,
        /// Task text, enables task-specific advisories
        #[arg(long)]
        task: Option<String>,
    },
}

/// Built-in sample tasks of increasing difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TaskPreset {
    Simple,
    Moderate,
    Complex,
}

impl TaskPreset {
    pub const ALL: [TaskPreset; 3] = [TaskPreset::Simple, TaskPreset::Moderate, TaskPreset::Complex];

    pub fn name(self) -> &'static str {
        match self {
            TaskPreset::Simple => "simple",
            TaskPreset::Moderate => "moderate",
            TaskPreset::Complex => "complex",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TaskPreset::Simple => {
                "Create a Python function that calculates the factorial of a number using recursion. \
                 The function should handle edge cases like negative numbers and zero, and include \
                 comprehensive unit tests to validate its correctness."
            }
            TaskPreset::Moderate => {
                "Create a function that analyzes a CSV file containing student grades and calculates \
                 comprehensive statistics including mean, median, standard deviation, letter grade \
                 distribution, and identifies students who need academic intervention (below 70% \
                 average). The function should handle missing data, validate input formats, and \
                 return a detailed report."
            }
            TaskPreset::Complex => {
                "Create a Python function that implements a multi-threaded web scraper to extract \
                 product prices from an e-commerce website. The scraper should handle pagination, \
                 respect robots.txt rules, and implement error handling for network issues. It \
                 should return a structured JSON object with product names, prices, and URLs. \
                 Include comprehensive unit tests, log its activity and handle rate limiting."
            }
        }
    }
}

impl Cli {
    /// Resolve the task list: `--all`, `--preset`, free text, in that order.
    /// Falls back to the moderate preset when nothing is given.
    pub fn tasks(&self) -> Vec<(String, String)> {
        if self.all {
            return TaskPreset::ALL
                .iter()
                .map(|p| (p.name().to_string(), p.description().to_string()))
                .collect();
        }
        if let Some(preset) = self.preset {
            return vec![(preset.name().to_string(), preset.description().to_string())];
        }
        let text = self.task.join(" ");
        if text.trim().is_empty() {
            let p = TaskPreset::Moderate;
            return vec![(p.name().to_string(), p.description().to_string())];
        }
        vec![("task".to_string(), text)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_text_task() {
        let cli = Cli::parse_from(["codegate", "reverse", "a", "string"]);
        assert_eq!(cli.tasks(), vec![("task".to_string(), "reverse a string".to_string())]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_preset_task() {
        let cli = Cli::parse_from(["codegate", "--preset", "complex"]);
        let tasks = cli.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].0, "complex");
        assert!(tasks[0].1.contains("web scraper"));
    }

    #[test]
    fn test_all_presets() {
        let cli = Cli::parse_from(["codegate", "--all"]);
        let names: Vec<String> = cli.tasks().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["simple", "moderate", "complex"]);
    }

    #[test]
    fn test_default_task_is_moderate() {
        let cli = Cli::parse_from(["codegate"]);
        assert_eq!(cli.tasks()[0].0, "moderate");
    }

    #[test]
    fn test_overrides_parse() {
        let cli = Cli::parse_from(["codegate", "-r", "2", "-w", "0", "--no-report", "-vv", "t"]);
        assert_eq!(cli.max_retries, Some(2));
        assert_eq!(cli.warning_threshold, Some(0));
        assert!(cli.no_report);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_check_subcommand() {
        let cli = Cli::parse_from(["codegate", "check", "cand.json", "--task", "scraper"]);
        match cli.command {
            Some(Commands::Check { file, task }) => {
                assert_eq!(file, PathBuf::from("cand.json"));
                assert_eq!(task.as_deref(), Some("scraper"));
            }
            None => panic!("expected check subcommand"),
        }
    }

    #[test]
    fn test_preset_conflicts_with_all() {
        assert!(Cli::try_parse_from(["codegate", "--all", "--preset", "simple"]).is_err());
    }
}
