//! Supervisor configuration
//!
//! Settings are resolved in this order of precedence:
//! 1. Environment variables
//! 2. `agentvisor.toml` configuration file
//! 3. Defaults
//!
//! `${VAR_NAME}` inside the configuration file is replaced with the value of
//! the environment variable. The resulting `SupervisorConfig` is built once at
//! startup and shared read-only (typically behind an `Arc`).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::validation::ProviderCatalog;
use crate::Error;

/// Default configuration file name looked up by [`SupervisorConfig::load`]
pub const DEFAULT_CONFIG_FILE: &str = "agentvisor.toml";

/// An extra provider recognized by the config validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Provider identifier as written in agent configs
    pub id: String,
    /// Environment variable holding the provider's credential, if any
    #[serde(default)]
    pub credential_env: Option<String>,
}

/// Process-wide supervisor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Upper bound for one task run; `None` leaves runs unbounded
    #[serde(default)]
    pub task_deadline_secs: Option<u64>,

    /// Refuse submissions for agents missing from the admission report
    #[serde(default)]
    pub require_admission: bool,

    /// Providers recognized in addition to the built-in catalog
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            task_deadline_secs: None,
            require_admission: false,
            providers: vec![],
        }
    }
}

impl SupervisorConfig {
    /// Replace `${VAR_NAME}` with the environment variable's value.
    ///
    /// Unset variables expand to the empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Parse configuration from TOML text, then apply environment overrides
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let toml: TomlConfig = toml::from_str(&expanded)?;

        let mut cfg = Self::from_toml_config(toml)?;
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `./agentvisor.toml` when present, otherwise from the environment
    pub fn load() -> crate::Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }
        Self::from_env()
    }

    /// Build configuration from environment variables alone
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    fn from_toml_config(toml: TomlConfig) -> crate::Result<Self> {
        let supervisor = toml.supervisor.unwrap_or_default();

        let mut providers = Vec::new();
        for entry in toml.providers.unwrap_or_default() {
            let id = entry.id.trim().to_lowercase();
            if id.is_empty() {
                return Err(Error::Config("provider entry with empty id".to_string()));
            }
            providers.push(ProviderEntry {
                id,
                credential_env: entry.credential_env.filter(|name| !name.trim().is_empty()),
            });
        }

        Ok(Self {
            task_deadline_secs: supervisor.task_deadline_secs.filter(|secs| *secs > 0),
            require_admission: supervisor.require_admission.unwrap_or(false),
            providers,
        })
    }

    fn apply_env_overrides(&mut self) -> crate::Result<()> {
        if let Ok(secs) = std::env::var("AV_TASK_DEADLINE_SECS") {
            if !secs.is_empty() {
                let secs: u64 = secs.parse().map_err(|_| {
                    Error::Config(format!("AV_TASK_DEADLINE_SECS is not a number: {}", secs))
                })?;
                self.task_deadline_secs = (secs > 0).then_some(secs);
            }
        }

        if let Ok(required) = std::env::var("AV_REQUIRE_ADMISSION") {
            if !required.is_empty() {
                self.require_admission = required.to_lowercase() != "false";
            }
        }

        Ok(())
    }

    /// Deadline applied to each supervised run
    pub fn task_deadline(&self) -> Option<Duration> {
        self.task_deadline_secs.map(Duration::from_secs)
    }

    /// Built-in provider catalog extended with configured providers
    pub fn provider_catalog(&self) -> ProviderCatalog {
        let mut catalog = ProviderCatalog::with_defaults();
        for entry in &self.providers {
            catalog.register(entry.id.clone(), entry.credential_env.clone());
        }
        catalog
    }
}

// ============================================================================
// TOML file layout
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    supervisor: Option<TomlSupervisorConfig>,
    providers: Option<Vec<TomlProviderEntry>>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlSupervisorConfig {
    #[serde(default)]
    task_deadline_secs: Option<u64>,
    #[serde(default)]
    require_admission: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TomlProviderEntry {
    id: String,
    #[serde(default)]
    credential_env: Option<String>,
}
