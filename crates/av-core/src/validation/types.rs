//! Agent configuration and validation report types

use serde::{Deserialize, Serialize};

/// Role of a provider within an agent's chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderRole {
    #[default]
    Primary,
    Fallback,
}

impl ProviderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

/// One entry of a provider chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Provider identifier (e.g. "openrouter", "google")
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub role: ProviderRole,
    /// Model requested from this provider
    #[serde(default)]
    pub model: Option<String>,
}

impl ProviderDescriptor {
    pub fn primary(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: ProviderRole::Primary,
            model: None,
        }
    }

    pub fn fallback(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: ProviderRole::Fallback,
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Declarative runtime requirements of one agent
///
/// Every field has a serde default so that incomplete declarations still
/// reach the validator and show up as problems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Unique agent key
    #[serde(default)]
    pub agent_name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Primary provider first, then fallbacks in the order they are tried
    #[serde(default)]
    pub providers: Vec<ProviderDescriptor>,
    /// Optional embedding provider chain
    #[serde(default)]
    pub embedding_providers: Vec<ProviderDescriptor>,
}

fn default_enabled() -> bool {
    true
}

impl AgentConfig {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            enabled: true,
            providers: vec![],
            embedding_providers: vec![],
        }
    }

    pub fn with_providers(mut self, providers: Vec<ProviderDescriptor>) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_embedding_providers(mut self, providers: Vec<ProviderDescriptor>) -> Self {
        self.embedding_providers = providers;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// The primary provider, if any
    pub fn primary(&self) -> Option<&ProviderDescriptor> {
        self.providers.first()
    }

    /// Fallback providers in the order they are tried
    pub fn fallbacks(&self) -> &[ProviderDescriptor] {
        self.providers.get(1..).unwrap_or(&[])
    }
}

/// Validation outcome for one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentValidation {
    agent_name: String,
    ok: bool,
    problems: Vec<String>,
}

impl AgentValidation {
    pub(crate) fn new(agent_name: impl Into<String>, problems: Vec<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            ok: problems.is_empty(),
            problems,
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Human-readable issues, in the order they were found
    pub fn problems(&self) -> &[String] {
        &self.problems
    }
}

/// Immutable snapshot of one validation run, one entry per input config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    results: Vec<AgentValidation>,
}

impl ValidationReport {
    pub(crate) fn new(results: Vec<AgentValidation>) -> Self {
        Self { results }
    }

    /// Result for an agent; the first entry wins if a name repeats
    pub fn get(&self, agent_name: &str) -> Option<&AgentValidation> {
        self.results.iter().find(|r| r.agent_name == agent_name)
    }

    /// Problems from every entry for an agent, or `None` if it has no entry
    ///
    /// An agent validated more than once is only clean if every entry is.
    pub fn problems_for(&self, agent_name: &str) -> Option<Vec<String>> {
        let mut entries = self
            .results
            .iter()
            .filter(|r| r.agent_name == agent_name)
            .peekable();
        entries.peek()?;
        Some(entries.flat_map(|r| r.problems.iter().cloned()).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentValidation> {
        self.results.iter()
    }

    /// Agents with at least one problem
    pub fn failing(&self) -> impl Iterator<Item = &AgentValidation> {
        self.results.iter().filter(|r| !r.ok)
    }

    /// True when every agent validated cleanly
    pub fn all_ok(&self) -> bool {
        self.results.iter().all(|r| r.ok)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_and_fallbacks() {
        let config = AgentConfig::new("research_agent").with_providers(vec![
            ProviderDescriptor::primary("google").with_model("gemini-2.5-flash"),
            ProviderDescriptor::fallback("openrouter"),
            ProviderDescriptor::fallback("siliconflow"),
        ]);

        assert_eq!(config.primary().map(|p| p.id.as_str()), Some("google"));
        let fallbacks: Vec<_> = config.fallbacks().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(fallbacks, vec!["openrouter", "siliconflow"]);
    }

    #[test]
    fn test_empty_chain_accessors() {
        let config = AgentConfig::new("news_agent");
        assert!(config.primary().is_none());
        assert!(config.fallbacks().is_empty());
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let config: AgentConfig = serde_json::from_str(r#"{"agent_name": "news_agent"}"#).unwrap();
        assert!(config.enabled);
        assert!(config.providers.is_empty());

        let config: AgentConfig =
            serde_json::from_str(r#"{"providers": [{"id": "openai", "role": "fallback"}]}"#).unwrap();
        assert!(config.agent_name.is_empty());
        assert_eq!(config.providers[0].role, ProviderRole::Fallback);
    }

    #[test]
    fn test_report_lookup() {
        let report = ValidationReport::new(vec![
            AgentValidation::new("a", vec![]),
            AgentValidation::new("b", vec!["providers must be non-empty".to_string()]),
        ]);

        assert_eq!(report.len(), 2);
        assert!(!report.all_ok());
        assert!(report.get("a").unwrap().is_ok());
        assert!(!report.get("b").unwrap().is_ok());
        assert!(report.get("c").is_none());
        let failing: Vec<_> = report.failing().map(|r| r.agent_name()).collect();
        assert_eq!(failing, vec!["b"]);
    }

    #[test]
    fn test_problems_for_repeated_agent() {
        let report = ValidationReport::new(vec![
            AgentValidation::new("news_agent", vec![]),
            AgentValidation::new("research_agent", vec![]),
            AgentValidation::new("news_agent", vec!["agent is disabled".to_string()]),
        ]);

        assert_eq!(
            report.problems_for("news_agent"),
            Some(vec!["agent is disabled".to_string()])
        );
        assert_eq!(report.problems_for("research_agent"), Some(vec![]));
        assert_eq!(report.problems_for("unknown_agent"), None);
    }
}
