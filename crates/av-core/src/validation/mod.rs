//! Agent configuration validation
//!
//! Checks each agent's declared provider chain before the supervisor admits
//! tasks for it. Results are returned as a [`ValidationReport`]; rendering or
//! gating on it is the caller's business.

pub mod catalog;
pub mod types;
pub mod validator;

pub use catalog::{CredentialSource, EnvCredentials, ProviderCatalog, StaticCredentials};
pub use types::{
    AgentConfig, AgentValidation, ProviderDescriptor, ProviderRole, ValidationReport,
};
pub use validator::{AgentConfigSource, ConfigValidator, StaticConfigSource};
