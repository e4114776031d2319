//! Runtime configuration for the orchestration core.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const ENV_INFERENCE_BACKEND: &str = "BATON_INFERENCE_BACKEND";
pub const ENV_API_KEY: &str = "BATON_API_KEY";
pub const ENV_INTERNAL_PREFIX: &str = "BATON_INTERNAL_PREFIX";

/// Fields whose name starts with this are internal prompt-shaping knobs and
/// never appear in `meta.input_echo`.
pub const DEFAULT_INTERNAL_PREFIX: &str = "__";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("internal field prefix must not be empty")]
    EmptyInternalPrefix,

    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
}

/// The inference backend producers are configured against.
///
/// Only a real backend with credentials can make `llm_connected` true.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceBackend {
    #[default]
    None,
    Mock,
    Remote(String),
}

impl InferenceBackend {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "off" | "disabled" => InferenceBackend::None,
            "mock" | "stub" | "fake" => InferenceBackend::Mock,
            other => InferenceBackend::Remote(other.to_string()),
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, InferenceBackend::Remote(_))
    }
}

impl fmt::Display for InferenceBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceBackend::None => f.write_str("none"),
            InferenceBackend::Mock => f.write_str("mock"),
            InferenceBackend::Remote(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatonConfig {
    pub inference_backend: InferenceBackend,

    /// Whether credentials for the backend are present. The key itself is
    /// never stored.
    pub has_credentials: bool,

    pub internal_prefix: String,
}

impl Default for BatonConfig {
    fn default() -> Self {
        Self {
            inference_backend: InferenceBackend::None,
            has_credentials: false,
            internal_prefix: DEFAULT_INTERNAL_PREFIX.to_string(),
        }
    }
}

impl BatonConfig {
    /// Create configuration from the process environment and defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`BatonConfig::from_env`] but reading from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let inference_backend = lookup(ENV_INFERENCE_BACKEND)
            .map(|v| InferenceBackend::parse(&v))
            .unwrap_or_default();
        let has_credentials = lookup(ENV_API_KEY).is_some_and(|k| !k.trim().is_empty());
        let internal_prefix =
            lookup(ENV_INTERNAL_PREFIX).unwrap_or_else(|| DEFAULT_INTERNAL_PREFIX.to_string());

        let config = Self {
            inference_backend,
            has_credentials,
            internal_prefix,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.internal_prefix.is_empty() {
            return Err(ConfigError::EmptyInternalPrefix);
        }
        Ok(())
    }

    /// True only for a real backend with credentials present.
    pub fn llm_live(&self) -> bool {
        self.inference_backend.is_real() && self.has_credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_offline() {
        let config = BatonConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, BatonConfig::default());
        assert!(!config.llm_live());
    }

    #[test]
    fn real_backend_needs_credentials() {
        let without_key =
            BatonConfig::from_lookup(lookup_from(&[(ENV_INFERENCE_BACKEND, "anthropic")]))
                .unwrap();
        assert!(!without_key.llm_live());

        let with_key = BatonConfig::from_lookup(lookup_from(&[
            (ENV_INFERENCE_BACKEND, "anthropic"),
            (ENV_API_KEY, "sk-test"),
        ]))
        .unwrap();
        assert!(with_key.llm_live());
    }

    #[test]
    fn mock_backend_is_never_live() {
        let config = BatonConfig::from_lookup(lookup_from(&[
            (ENV_INFERENCE_BACKEND, "Mock"),
            (ENV_API_KEY, "sk-test"),
        ]))
        .unwrap();
        assert_eq!(config.inference_backend, InferenceBackend::Mock);
        assert!(!config.llm_live());
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let err = BatonConfig::from_lookup(lookup_from(&[(ENV_INTERNAL_PREFIX, "")]));
        assert!(matches!(err, Err(ConfigError::EmptyInternalPrefix)));
    }

    #[test]
    fn loads_partial_json() {
        let config = BatonConfig::from_json(r#"{"has_credentials": true}"#).unwrap();
        assert!(config.has_credentials);
        assert_eq!(config.internal_prefix, "__");
        assert_eq!(config.inference_backend, InferenceBackend::None);

        let remote =
            BatonConfig::from_json(r#"{"inference_backend": {"remote": "openai"}}"#).unwrap();
        assert!(remote.inference_backend.is_real());
    }
}
