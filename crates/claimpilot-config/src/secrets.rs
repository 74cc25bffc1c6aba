//! API key resolution.
//!
//! Resolution order:
//! 1. Environment variable for the backend
//! 2. Config file (with warning, see discovery)

use crate::Backend;

/// Result of API key resolution with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    pub value: String,
    pub source: SecretSource,
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    EnvVar(String),
    /// Config file (plaintext, not recommended).
    ConfigFile,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Resolve an API key for a backend: env var first, then the config value.
pub fn resolve_api_key(backend: &Backend, config_value: Option<&str>) -> Option<ResolvedSecret> {
    resolve_from(backend.env_var(), config_value)
}

/// Same chain for an arbitrary env var name.
pub fn resolve_from(env_var: &str, config_value: Option<&str>) -> Option<ResolvedSecret> {
    if let Ok(value) = std::env::var(env_var)
        && !value.is_empty()
    {
        return Some(ResolvedSecret {
            value,
            source: SecretSource::EnvVar(env_var.to_string()),
        });
    }

    config_value.filter(|v| !v.is_empty()).map(|v| ResolvedSecret {
        value: v.to_string(),
        source: SecretSource::ConfigFile,
    })
}

/// Mask a secret for display, keeping a short prefix.
pub fn mask(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_var_wins_over_config() {
        // SAFETY: serialized with the other env-mutating tests.
        unsafe { std::env::set_var("ANTHROPIC_API_KEY", "from-env") };
        let resolved = resolve_api_key(&Backend::Anthropic, Some("from-config")).unwrap();
        unsafe { std::env::remove_var("ANTHROPIC_API_KEY") };

        assert_eq!(resolved.value, "from-env");
        assert_eq!(
            resolved.source,
            SecretSource::EnvVar("ANTHROPIC_API_KEY".to_string())
        );
    }

    #[test]
    #[serial]
    fn test_falls_back_to_config() {
        unsafe { std::env::remove_var("OPENAI_API_KEY") };
        let resolved = resolve_api_key(&Backend::Openai, Some("sk-config")).unwrap();
        assert_eq!(resolved.value, "sk-config");
        assert_eq!(resolved.source, SecretSource::ConfigFile);
    }

    #[test]
    #[serial]
    fn test_empty_values_ignored() {
        unsafe { std::env::set_var("OPENAI_API_KEY", "") };
        let resolved = resolve_api_key(&Backend::Openai, Some(""));
        unsafe { std::env::remove_var("OPENAI_API_KEY") };
        assert!(resolved.is_none());
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("short"), "****");
        assert_eq!(mask("sk-abcdefghijkl"), "sk-a****");
        assert_eq!(SecretSource::ConfigFile.to_string(), "config file (plaintext)");
    }
}
