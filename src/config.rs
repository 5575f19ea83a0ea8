//! Engine connection configuration
//!
//! One YAML file describes how to reach the engine: an `api` section for
//! the live remote-scripting mode, a `cli` section for batch runs, or
//! both (the API mode wins when both are present).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{EngineError, ErrorKind};

fn default_host() -> String {
    "localhost".to_string()
}

fn default_cli_timeout_secs() -> u64 {
    3600
}

/// Live remote-scripting connection parameters
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Port of the input-side scripting server
    pub input_port: u16,
    /// Port of the output-side scripting server
    pub output_port: u16,
    /// Shared-secret credential for both servers
    pub passphrase: String,
    /// Per-request timeout; defaults to the session's own long timeout
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Batch subprocess invocation parameters
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Path to the engine front-end executable
    pub executable: PathBuf,
    /// Wall-clock budget for one batch run
    #[serde(default = "default_cli_timeout_secs")]
    pub timeout_secs: u64,
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub api: Option<ApiConfig>,
    #[serde(default)]
    pub cli: Option<CliConfig>,
}

impl EngineConfig {
    /// Load from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            EngineError::new(
                ErrorKind::Configuration,
                format!("Could not read engine configuration '{}'", path.display()),
                e.to_string(),
                "configuration loading",
            )
        })?;
        serde_yaml::from_str(&text).map_err(|e| {
            EngineError::new(
                ErrorKind::Configuration,
                format!("Engine configuration '{}' is not valid YAML", path.display()),
                e.to_string(),
                "configuration loading",
            )
        })
    }
}
