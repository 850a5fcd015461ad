// src/infra/paths.rs — Path management
//
// All paths respect the CODEGATE_HOME environment variable. When unset,
// config lives in ~/.codegate/ and reports default to the working directory.

use std::path::PathBuf;

/// Returns the CODEGATE_HOME override, if set.
fn codegate_home() -> Option<PathBuf> {
    std::env::var_os("CODEGATE_HOME").map(PathBuf::from)
}

/// Home directory, falling back to the current directory when none is known.
pub fn dirs_home() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $CODEGATE_HOME/ or ~/.codegate/
pub fn config_dir() -> PathBuf {
    codegate_home().unwrap_or_else(|| dirs_home().join(".codegate"))
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Timestamped report file name, e.g. `codegate_report_20260101_120000.md`.
/// A label (used when several tasks run in one invocation) goes before the timestamp.
pub fn report_file_name(
    at: chrono::DateTime<chrono::Local>,
    label: Option<&str>,
    extension: &str,
) -> String {
    let stamp = at.format("%Y%m%d_%H%M%S");
    match label {
        Some(label) => format!("codegate_report_{}_{}.{}", label, stamp, extension),
        None => format!("codegate_report_{}.{}", stamp, extension),
    }
}
