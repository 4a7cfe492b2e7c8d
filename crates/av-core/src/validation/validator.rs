//! Pre-flight validation of agent configurations
//!
//! Validation collects problems instead of failing fast: malformed or missing
//! fields become entries in the problem list, never errors.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::catalog::{CredentialSource, EnvCredentials, ProviderCatalog};
use super::types::{AgentConfig, AgentValidation, ProviderDescriptor, ProviderRole, ValidationReport};
use crate::config::SupervisorConfig;
use crate::Result;

/// Read-only provider of agent configurations
pub trait AgentConfigSource: Send + Sync {
    fn agent_configs(&self) -> Result<Vec<AgentConfig>>;
}

/// Source backed by a fixed list
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    configs: Vec<AgentConfig>,
}

impl StaticConfigSource {
    pub fn new(configs: Vec<AgentConfig>) -> Self {
        Self { configs }
    }
}

impl AgentConfigSource for StaticConfigSource {
    fn agent_configs(&self) -> Result<Vec<AgentConfig>> {
        Ok(self.configs.clone())
    }
}

/// Validator for agent configurations
pub struct ConfigValidator {
    catalog: ProviderCatalog,
    credentials: Arc<dyn CredentialSource>,
}

impl ConfigValidator {
    pub fn new(catalog: ProviderCatalog, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            catalog,
            credentials,
        }
    }

    /// Validator using the configured catalog and the process environment
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self::new(config.provider_catalog(), Arc::new(EnvCredentials))
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    /// Validate one agent configuration
    pub fn validate(&self, config: &AgentConfig) -> AgentValidation {
        let mut problems = Vec::new();

        if config.agent_name.trim().is_empty() {
            problems.push("agent_name must be non-empty".to_string());
        }

        if !config.enabled {
            problems.push("agent is disabled".to_string());
            return AgentValidation::new(config.agent_name.clone(), problems);
        }

        if config.providers.is_empty() {
            problems.push("providers must be non-empty".to_string());
        } else {
            self.check_chain("provider", &config.providers, &mut problems);
        }

        if !config.embedding_providers.is_empty() {
            self.check_chain("embedding provider", &config.embedding_providers, &mut problems);
        }

        if problems.is_empty() {
            debug!(agent = %config.agent_name, "Agent configuration valid");
        } else {
            warn!(
                agent = %config.agent_name,
                problems = problems.len(),
                "Agent configuration has problems"
            );
        }

        AgentValidation::new(config.agent_name.clone(), problems)
    }

    /// Validate each configuration independently
    pub fn validate_all(&self, configs: &[AgentConfig]) -> ValidationReport {
        let results: Vec<_> = configs.iter().map(|c| self.validate(c)).collect();
        let report = ValidationReport::new(results);
        info!(
            "Validated {} agent configuration(s), {} with problems",
            report.len(),
            report.failing().count()
        );
        report
    }

    /// Validate everything a source yields
    ///
    /// A source that cannot list its agents yields an empty report.
    pub fn validate_source(&self, source: &dyn AgentConfigSource) -> ValidationReport {
        match source.agent_configs() {
            Ok(configs) => self.validate_all(&configs),
            Err(e) => {
                error!("Failed to list agent configurations: {}", e);
                ValidationReport::default()
            }
        }
    }

    fn check_chain(&self, label: &str, chain: &[ProviderDescriptor], problems: &mut Vec<String>) {
        let mut seen = HashSet::new();

        for (index, provider) in chain.iter().enumerate() {
            let position = index + 1;
            let id = provider.id.trim();

            if id.is_empty() {
                problems.push(format!("{label} #{position} has an empty id"));
                continue;
            }

            let expected = if index == 0 {
                ProviderRole::Primary
            } else {
                ProviderRole::Fallback
            };
            if provider.role != expected {
                problems.push(format!(
                    "{label} #{position} '{id}' must have role {}, found {}",
                    expected.as_str(),
                    provider.role.as_str()
                ));
            }

            if !seen.insert(id.to_lowercase()) {
                problems.push(format!("{label} #{position} '{id}' duplicates an earlier entry"));
                continue;
            }

            if !self.catalog.is_recognized(id) {
                problems.push(format!("{label} #{position} '{id}' is not a recognized provider"));
                continue;
            }

            if let Some(credential) = self.catalog.credential_for(id) {
                if !self.credentials.is_present(credential) {
                    problems.push(format!(
                        "{label} #{position} '{id}' requires credential {credential}, which is not set"
                    ));
                }
            }
        }
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new(ProviderCatalog::with_defaults(), Arc::new(EnvCredentials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::StaticCredentials;

    fn validator() -> ConfigValidator {
        let credentials = StaticCredentials::new()
            .with("OPENROUTER_API_KEY", "or-key")
            .with("GOOGLE_API_KEY", "g-key");
        ConfigValidator::new(ProviderCatalog::with_defaults(), Arc::new(credentials))
    }

    fn research_agent() -> AgentConfig {
        AgentConfig::new("research_agent")
            .with_providers(vec![
                ProviderDescriptor::primary("openrouter").with_model("anthropic/claude-haiku-4.5"),
                ProviderDescriptor::fallback("ollama"),
            ])
            .with_embedding_providers(vec![
                ProviderDescriptor::primary("google").with_model("gemini-embedding-001"),
            ])
    }

    #[test]
    fn test_valid_config() {
        let result = validator().validate(&research_agent());
        assert!(result.is_ok());
        assert!(result.problems().is_empty());
        assert_eq!(result.agent_name(), "research_agent");
    }

    #[test]
    fn test_empty_providers() {
        let result = validator().validate(&AgentConfig::new("news_agent"));
        assert!(!result.is_ok());
        assert_eq!(result.problems(), ["providers must be non-empty".to_string()]);
    }

    #[test]
    fn test_validate_all_is_independent() {
        let cfg_ok = research_agent();
        let cfg_missing_providers = AgentConfig::new("auto_trading_agent");

        let report = validator().validate_all(&[cfg_ok, cfg_missing_providers]);

        assert_eq!(report.len(), 2);
        let ok = report.get("research_agent").unwrap();
        assert!(ok.is_ok());
        assert!(ok.problems().is_empty());

        let missing = report.get("auto_trading_agent").unwrap();
        assert!(!missing.is_ok());
        assert_eq!(missing.problems(), ["providers must be non-empty".to_string()]);
    }

    #[test]
    fn test_unrecognized_provider() {
        let config = AgentConfig::new("news_agent")
            .with_providers(vec![ProviderDescriptor::primary("acme-llm")]);
        let result = validator().validate(&config);
        assert_eq!(
            result.problems(),
            ["provider #1 'acme-llm' is not a recognized provider".to_string()]
        );
    }

    #[test]
    fn test_missing_credential() {
        let config = AgentConfig::new("news_agent").with_providers(vec![
            ProviderDescriptor::primary("openrouter"),
            ProviderDescriptor::fallback("openai"),
        ]);
        let result = validator().validate(&config);
        assert_eq!(
            result.problems(),
            ["provider #2 'openai' requires credential OPENAI_API_KEY, which is not set".to_string()]
        );
    }

    #[test]
    fn test_role_ordering() {
        let config = AgentConfig::new("news_agent").with_providers(vec![
            ProviderDescriptor::fallback("openrouter"),
            ProviderDescriptor::primary("ollama"),
        ]);
        let result = validator().validate(&config);
        assert_eq!(
            result.problems(),
            [
                "provider #1 'openrouter' must have role primary, found fallback".to_string(),
                "provider #2 'ollama' must have role fallback, found primary".to_string(),
            ]
        );
    }

    #[test]
    fn test_duplicate_and_empty_ids() {
        let config = AgentConfig::new("news_agent").with_providers(vec![
            ProviderDescriptor::primary("ollama"),
            ProviderDescriptor::fallback(""),
            ProviderDescriptor::fallback("Ollama"),
        ]);
        let result = validator().validate(&config);
        assert_eq!(
            result.problems(),
            [
                "provider #2 has an empty id".to_string(),
                "provider #3 'Ollama' duplicates an earlier entry".to_string(),
            ]
        );
    }

    #[test]
    fn test_embedding_chain_is_checked() {
        let config = research_agent().with_embedding_providers(vec![
            ProviderDescriptor::primary("siliconflow"),
            ProviderDescriptor::fallback("google"),
        ]);
        let result = validator().validate(&config);
        assert_eq!(
            result.problems(),
            ["embedding provider #1 'siliconflow' requires credential SILICONFLOW_API_KEY, which is not set"
                .to_string()]
        );
    }

    #[test]
    fn test_disabled_and_unnamed() {
        let result = validator().validate(&research_agent().disabled());
        assert_eq!(result.problems(), ["agent is disabled".to_string()]);

        let mut unnamed = research_agent();
        unnamed.agent_name = "  ".to_string();
        let result = validator().validate(&unnamed);
        assert_eq!(result.problems(), ["agent_name must be non-empty".to_string()]);
    }

    #[test]
    fn test_validate_source() {
        struct BrokenSource;

        impl AgentConfigSource for BrokenSource {
            fn agent_configs(&self) -> Result<Vec<AgentConfig>> {
                Err(crate::Error::Config("registry unavailable".to_string()))
            }
        }

        let report = validator().validate_source(&BrokenSource);
        assert!(report.is_empty());

        let source = StaticConfigSource::new(vec![research_agent(), AgentConfig::new("news_agent")]);
        let report = validator().validate_source(&source);
        assert_eq!(report.len(), 2);
        assert!(!report.all_ok());
    }

    #[test]
    fn test_from_config_extends_catalog() {
        let config = SupervisorConfig::from_toml_str("[[providers]]\nid = \"local-vllm\"\n").unwrap();
        let validator = ConfigValidator::from_config(&config);
        let agent = AgentConfig::new("local_agent")
            .with_providers(vec![ProviderDescriptor::primary("local-vllm")]);
        assert!(validator.validate(&agent).is_ok());
    }
}
