//! Configuration Management
//!
//! Optional YAML defaults for gcp-role-checker. Command line flags always win
//! over values read here.
//!
//! ```yaml
//! data_dir: /var/lib/iam-audit
//! max_concurrency: 16
//! on_error: abort
//! folder_errors: continue
//! endpoints:
//!   crm_v1: https://cloudresourcemanager.googleapis.com/v1
//! ```

use crate::checker::fanout::{FailurePolicy, DEFAULT_MAX_CONCURRENCY};
use crate::gcp::client::Endpoints;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Output directory used when neither the CLI nor the config names one
pub const DEFAULT_DATA_DIR: &str = "data";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Directory receiving roles.json and members.json
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Upper bound on concurrent API calls per phase
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    /// Failure handling for catalog and policy fetches
    #[serde(default)]
    pub on_error: Option<FailurePolicy>,
    /// Failure handling while walking folders
    #[serde(default)]
    pub folder_errors: Option<FailurePolicy>,
    /// API base URL overrides
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcp-role-checker").join("config.yaml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist and parse. Without one, the default
    /// location is tried and anything missing or unreadable yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        match Self::from_file(&path) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Ignoring config {}: {:#}", path.display(), err);
                Ok(Self::default())
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Get effective data directory (CLI > config > default)
    pub fn effective_data_dir(&self, cli: Option<PathBuf>) -> PathBuf {
        cli.or_else(|| self.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }

    /// Get effective concurrency limit (CLI > config > default)
    pub fn effective_max_concurrency(&self, cli: Option<usize>) -> usize {
        cli.or(self.max_concurrency)
            .unwrap_or(DEFAULT_MAX_CONCURRENCY)
            .max(1)
    }

    /// Get effective fetch failure policy (CLI > config > abort)
    pub fn effective_on_error(&self, cli: Option<FailurePolicy>) -> FailurePolicy {
        cli.or(self.on_error).unwrap_or(FailurePolicy::Abort)
    }

    /// Get effective folder walk failure policy (CLI > config > continue)
    pub fn effective_folder_errors(&self, cli: Option<FailurePolicy>) -> FailurePolicy {
        cli.or(self.folder_errors).unwrap_or(FailurePolicy::Continue)
    }
}
