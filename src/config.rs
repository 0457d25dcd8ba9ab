//! Configuration for the tagging and clustering pipeline.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::services::clustering::DbscanParams;

/// Remote model provider used for both classification and embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Provider {
    Gemini,
    #[value(name = "openai")]
    OpenAi,
}

impl Provider {
    /// Environment variable holding this provider's credential.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Provider::Gemini => "GOOGLE_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_classifier_model(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.0-flash",
            Provider::OpenAi => "gpt-4o-mini",
        }
    }

    pub fn default_embedding_model(self) -> &'static str {
        match self {
            Provider::Gemini => "text-embedding-004",
            Provider::OpenAi => "text-embedding-3-small",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => f.write_str("gemini"),
            Provider::OpenAi => f.write_str("openai"),
        }
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAi),
            other => Err(Error::Configuration(format!(
                "unknown LLM_PROVIDER '{other}' (expected 'gemini' or 'openai')"
            ))),
        }
    }
}

/// Main pipeline configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub cache_path: PathBuf,
    pub provider: Provider,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub classifier_model: String,
    pub embedding_model: String,
    pub embedding_dimension: Option<u32>,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub cluster: DbscanParams,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("LLM_PROVIDER") {
            Some(value) => value.parse::<Provider>()?,
            None => Provider::Gemini,
        };
        let defaults = DbscanParams::default();

        Ok(Self {
            database_path: lookup("LAUNCHER_DB_PATH")
                .unwrap_or_else(|| "launcher4x7.db".to_string())
                .into(),
            cache_path: lookup("TAG_CACHE_PATH")
                .unwrap_or_else(|| "app_tags_cache.json".to_string())
                .into(),
            provider,
            api_key: lookup(provider.api_key_var()),
            api_base: lookup("LLM_API_BASE").filter(|v| !v.trim().is_empty()),
            classifier_model: lookup("CLASSIFIER_MODEL")
                .unwrap_or_else(|| provider.default_classifier_model().to_string()),
            embedding_model: lookup("EMBEDDING_MODEL")
                .unwrap_or_else(|| provider.default_embedding_model().to_string()),
            embedding_dimension: lookup("EMBEDDING_DIMENSION").and_then(|v| v.parse().ok()),
            timeout_seconds: lookup("REQUEST_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            max_retries: lookup("MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            cluster: DbscanParams {
                eps: lookup("CLUSTER_EPS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.eps),
                min_points: lookup("CLUSTER_MIN_POINTS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.min_points),
            },
        })
    }

    /// Switch provider, re-deriving its credential and default models.
    ///
    /// Explicit model names are kept only when they were not the old provider's defaults.
    pub fn with_provider<F>(mut self, provider: Provider, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if provider == self.provider {
            return self;
        }
        if self.classifier_model == self.provider.default_classifier_model() {
            self.classifier_model = provider.default_classifier_model().to_string();
        }
        if self.embedding_model == self.provider.default_embedding_model() {
            self.embedding_model = provider.default_embedding_model().to_string();
        }
        self.api_key = lookup(provider.api_key_var());
        self.provider = provider;
        self
    }

    /// Reject configurations that cannot start a run.
    pub fn validate(&self) -> Result<()> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => {
                return Err(Error::Configuration(format!(
                    "{} is not set; add it to the environment or a .env file",
                    self.provider.api_key_var()
                )))
            }
        }
        self.cluster
            .validate()
            .map_err(|e| Error::Configuration(e.to_string()))
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
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.database_path, PathBuf::from("launcher4x7.db"));
        assert_eq!(config.cache_path, PathBuf::from("app_tags_cache.json"));
        assert_eq!(config.classifier_model, "gemini-2.0-flash");
        assert_eq!(config.embedding_model, "text-embedding-004");
        assert_eq!(config.cluster.eps, 0.4);
        assert_eq!(config.cluster.min_points, 2);
        assert_eq!(config.timeout_seconds, 30);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_missing_credential_is_configuration_error() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("GOOGLE_API_KEY"));

        let blank = Config::from_lookup(lookup_from(&[("GOOGLE_API_KEY", "  ")])).unwrap();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_openai_provider_reads_its_own_key() {
        let config = Config::from_lookup(lookup_from(&[
            ("LLM_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-test"),
            ("GOOGLE_API_KEY", "ignored"),
        ]))
        .unwrap();
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = Config::from_lookup(lookup_from(&[("LLM_PROVIDER", "bard")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_cluster_overrides_and_bad_numbers() {
        let config = Config::from_lookup(lookup_from(&[
            ("CLUSTER_EPS", "0.25"),
            ("CLUSTER_MIN_POINTS", "not-a-number"),
            ("GOOGLE_API_KEY", "k"),
        ]))
        .unwrap();
        assert_eq!(config.cluster.eps, 0.25);
        assert_eq!(config.cluster.min_points, 2);

        let invalid = Config::from_lookup(lookup_from(&[
            ("CLUSTER_MIN_POINTS", "0"),
            ("GOOGLE_API_KEY", "k"),
        ]))
        .unwrap();
        assert!(matches!(invalid.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_switching_provider_swaps_defaults_only() {
        let lookup = lookup_from(&[("OPENAI_API_KEY", "sk"), ("EMBEDDING_MODEL", "custom-embed")]);
        let config = Config::from_lookup(&lookup)
            .unwrap()
            .with_provider(Provider::OpenAi, &lookup);
        assert_eq!(config.classifier_model, "gpt-4o-mini");
        assert_eq!(config.embedding_model, "custom-embed");
        assert_eq!(config.api_key.as_deref(), Some("sk"));
    }
}
