//! Recognized providers and credential lookup

use std::collections::{BTreeMap, HashMap};

/// Providers the validator recognizes, with the credential each one needs
#[derive(Debug, Clone, Default)]
pub struct ProviderCatalog {
    providers: BTreeMap<String, Option<String>>,
}

impl ProviderCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the providers supported out of the box
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.register("openrouter", Some("OPENROUTER_API_KEY".to_string()));
        catalog.register("openai", Some("OPENAI_API_KEY".to_string()));
        catalog.register("google", Some("GOOGLE_API_KEY".to_string()));
        catalog.register("siliconflow", Some("SILICONFLOW_API_KEY".to_string()));
        catalog.register("anthropic", Some("ANTHROPIC_API_KEY".to_string()));
        catalog.register("azure", Some("AZURE_OPENAI_API_KEY".to_string()));
        catalog.register("ollama", None);
        catalog
    }

    /// Register or replace a provider
    pub fn register(&mut self, id: impl Into<String>, credential_env: Option<String>) {
        self.providers.insert(id.into().to_lowercase(), credential_env);
    }

    pub fn is_recognized(&self, id: &str) -> bool {
        self.providers.contains_key(&id.to_lowercase())
    }

    /// Name of the credential a provider requires, if any
    pub fn credential_for(&self, id: &str) -> Option<&str> {
        self.providers
            .get(&id.to_lowercase())
            .and_then(|c| c.as_deref())
    }

    pub fn provider_ids(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

/// Lookup of credential values by name
pub trait CredentialSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    /// A credential counts as present when it is set and non-blank
    fn is_present(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.trim().is_empty())
    }
}

/// Credentials read from the process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed credential set
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = ProviderCatalog::with_defaults();
        assert!(catalog.is_recognized("openrouter"));
        assert!(catalog.is_recognized("Google"));
        assert!(!catalog.is_recognized("made-up"));
        assert_eq!(catalog.credential_for("openai"), Some("OPENAI_API_KEY"));
        assert_eq!(catalog.credential_for("ollama"), None);
    }

    #[test]
    fn test_register_replaces() {
        let mut catalog = ProviderCatalog::new();
        catalog.register("openai", Some("OPENAI_API_KEY".to_string()));
        catalog.register("OpenAI", Some("OPENAI_KEY_V2".to_string()));
        assert_eq!(catalog.provider_ids().count(), 1);
        assert_eq!(catalog.credential_for("openai"), Some("OPENAI_KEY_V2"));
    }

    #[test]
    fn test_static_credentials_presence() {
        let creds = StaticCredentials::new()
            .with("OPENAI_API_KEY", "sk-test")
            .with("GOOGLE_API_KEY", "   ");
        assert!(creds.is_present("OPENAI_API_KEY"));
        assert!(!creds.is_present("GOOGLE_API_KEY"));
        assert!(!creds.is_present("MISSING"));
    }

    #[test]
    fn test_env_credentials() {
        unsafe {
            std::env::set_var("AV_CATALOG_TEST_KEY", "value");
        }
        assert!(EnvCredentials.is_present("AV_CATALOG_TEST_KEY"));
        assert!(!EnvCredentials.is_present("AV_CATALOG_TEST_UNSET_KEY"));
        unsafe {
            std::env::remove_var("AV_CATALOG_TEST_KEY");
        }
    }
}
