//! Configuration System
//!
//! TOML-backed configuration with environment variable overrides. The config
//! file is optional; every backend credential can instead arrive through the
//! environment (or a `.env` file loaded at startup), matching how the three
//! external services are usually provisioned.

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LureConfig {
    /// Reference-document context loading
    #[serde(default)]
    pub context: ContextConfig,

    /// Issue-tracker backend (Jira-style REST search)
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Text-generation backend (OpenAI-style chat completions)
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Link-minting backend (Linkly-style short links)
    #[serde(default)]
    pub minter: MinterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Document context configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Directory of plain-text fragment sources
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: PathBuf,

    /// Global character budget across all fragments
    #[serde(default = "default_context_budget")]
    pub budget: usize,
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from("./prompts")
}

fn default_context_budget() -> usize {
    crate::documents::DEFAULT_CONTEXT_BUDGET
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            prompts_dir: default_prompts_dir(),
            budget: default_context_budget(),
        }
    }
}

/// Issue-tracker backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Base URL of the tracker instance (no trailing slash)
    pub base_url: Option<String>,

    /// Account email for basic auth
    pub email: Option<String>,

    /// API token for basic auth
    pub api_token: Option<String>,

    /// Maximum records fetched per query
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_max_results() -> u32 {
    10
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            email: None,
            api_token: None,
            max_results: default_max_results(),
        }
    }
}

/// Text-generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// API key for bearer auth
    pub api_key: Option<String>,

    /// Override endpoint (defaults to the OpenAI API)
    pub base_url: Option<String>,
}

fn default_model() -> String {
    "gpt-4-turbo".to_string()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
        }
    }
}

/// Link-minting backend configuration
///
/// Credential completeness is checked at substitution time, not load time:
/// an incomplete minter config degrades substitution instead of failing the
/// whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinterConfig {
    /// Account email sent in the mint payload
    pub email: Option<String>,

    /// API key sent in the mint payload
    pub api_key: Option<String>,

    /// Workspace identifier; must parse as an integer to be usable
    pub workspace_id: Option<String>,

    /// Link-creation endpoint
    #[serde(default = "default_mint_endpoint")]
    pub endpoint: String,

    /// Fixed destination URL every tracking link points at
    #[serde(default = "default_destination_url")]
    pub destination_url: String,

    /// Display name attached to minted links
    #[serde(default = "default_link_name")]
    pub link_name: String,

    /// utm_source tag attached to minted links
    #[serde(default = "default_utm_source")]
    pub utm_source: String,
}

fn default_mint_endpoint() -> String {
    "https://api.linklyhq.com/v1/link/create".to_string()
}

fn default_destination_url() -> String {
    "https://www.method.me".to_string()
}

fn default_link_name() -> String {
    "My New Tracking Link".to_string()
}

fn default_utm_source() -> String {
    "newsletter".to_string()
}

impl Default for MinterConfig {
    fn default() -> Self {
        Self {
            email: None,
            api_key: None,
            workspace_id: None,
            endpoint: default_mint_endpoint(),
            destination_url: default_destination_url(),
            link_name: default_link_name(),
            utm_source: default_utm_source(),
        }
    }
}

impl LureConfig {
    /// Layer environment variables over file-sourced values.
    ///
    /// Environment always wins; variable names follow the conventions of the
    /// three services so existing provisioning carries over unchanged.
    pub fn apply_env(&mut self) {
        overlay(&mut self.tracker.base_url, "JIRA_URL");
        overlay(&mut self.tracker.email, "JIRA_EMAIL");
        overlay(&mut self.tracker.api_token, "JIRA_API_TOKEN");
        overlay(&mut self.generator.api_key, "OPENAI_API_KEY");
        overlay(&mut self.minter.email, "LINKLY_EMAIL");
        overlay(&mut self.minter.api_key, "LINKLY_API_KEY");
        overlay(&mut self.minter.workspace_id, "LINKLY_WORKSPACE_ID");
        if let Ok(model) = std::env::var("LURE_MODEL") {
            if !model.is_empty() {
                self.generator.model = model;
            }
        }
    }

    /// Canonicalize values after loading: tracker URLs lose their trailing
    /// slash so path joins stay predictable.
    pub fn normalize(&mut self) {
        if let Some(url) = &self.tracker.base_url {
            let trimmed = url.trim_end_matches('/');
            if trimmed.len() != url.len() {
                self.tracker.base_url = Some(trimmed.to_string());
            }
        }
    }

    /// Validate settings that are wrong in any run, independent of which
    /// backends end up used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.budget == 0 {
            return Err(ConfigError::Invalid {
                field: "context.budget",
                reason: "budget must be greater than zero".to_string(),
            });
        }
        if self.generator.model.is_empty() {
            return Err(ConfigError::Invalid {
                field: "generator.model",
                reason: "model must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn overlay(slot: &mut Option<String>, var: &str) {
    if let Ok(value) = std::env::var(var) {
        if !value.is_empty() {
            *slot = Some(value);
        }
    }
}

/// Loads configuration from an explicit path, the default XDG location, or
/// falls back to defaults; then applies env overrides and normalization.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(explicit: Option<&Path>) -> Result<LureConfig, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::load_from_file(&path)?,
                _ => {
                    debug!("No config file found, using defaults");
                    LureConfig::default()
                }
            },
        };

        config.apply_env();
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<LureConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Default location: `~/.config/lure/config.toml` (platform equivalent)
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "lure")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
