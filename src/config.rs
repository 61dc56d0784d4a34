//! Runtime configuration
//!
//! Values come from the environment (optionally seeded from a `.env` file),
//! with the API key falling back to the OS keychain.

use std::time::Duration;

use crate::ai::credentials::CredentialManager;
use crate::ai::http_client::DEFAULT_TIMEOUT;

/// Keychain account the Gemini key is stored under
pub const KEYCHAIN_PROVIDER: &str = "gemini";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Error type for configuration loading
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("No Gemini API key found. Set GEMINI_API_KEY or store one with --store-key")]
    MissingApiKey,
    #[error("API key appears to be a placeholder ('{0}'). Please use a real Gemini API key")]
    PlaceholderKey(String),
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

impl From<ConfigError> for String {
    fn from(err: ConfigError) -> Self {
        err.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl AppConfig {
    /// Load a `.env` file from the current directory, falling back to the parent
    pub fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_path("../.env");
        }
    }

    /// Read configuration from the process environment and keychain
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_sources(
            |name| std::env::var(name).ok(),
            || CredentialManager::get_api_key(KEYCHAIN_PROVIDER).ok(),
        )
    }

    /// Build configuration from an env lookup and a keychain lookup.
    /// Priority for the key: GEMINI_API_KEY > API_KEY > keychain.
    pub fn from_sources(
        env: impl Fn(&str) -> Option<String>,
        keychain: impl FnOnce() -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| env(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = non_empty("GEMINI_API_KEY")
            .or_else(|| non_empty("API_KEY"))
            .or_else(keychain)
            .ok_or(ConfigError::MissingApiKey)?;
        validate_api_key(&api_key)?;

        let model = non_empty("PHOTO_SORTER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url =
            non_empty("PHOTO_SORTER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = match non_empty("PHOTO_SORTER_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::InvalidValue {
                    name: "PHOTO_SORTER_TIMEOUT_SECS",
                    value,
                })?,
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            api_key,
            model,
            base_url,
            timeout,
        })
    }
}

/// Reject keys that are obviously copied from an example
pub fn validate_api_key(key: &str) -> Result<(), ConfigError> {
    let key_lower = key.to_lowercase();

    let placeholder_patterns = [
        "your-api-key",
        "your_api_key",
        "your api key",
        "yourapikey",
        "api-key-here",
        "api_key_here",
        "enter-your",
        "enter_your",
        "replace-with",
        "replace_with",
        "placeholder",
        "xxx",
    ];

    for pattern in placeholder_patterns {
        if key_lower.contains(pattern) {
            return Err(ConfigError::PlaceholderKey(pattern.to_string()));
        }
    }

    if key.len() < 10 {
        return Err(ConfigError::PlaceholderKey(key.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            AppConfig::from_sources(env(&[("GEMINI_API_KEY", "AIzaSyRealLookingKey")]), || None)
                .unwrap();

        assert_eq!(config.api_key, "AIzaSyRealLookingKey");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_key_priority() {
        let both = env(&[("GEMINI_API_KEY", "gemini-key-0123"), ("API_KEY", "generic-key-0123")]);
        let config = AppConfig::from_sources(both, || Some("keychain-key-0123".to_string())).unwrap();
        assert_eq!(config.api_key, "gemini-key-0123");

        let generic = env(&[("API_KEY", "generic-key-0123")]);
        let config = AppConfig::from_sources(generic, || Some("keychain-key-0123".to_string())).unwrap();
        assert_eq!(config.api_key, "generic-key-0123");

        let blank = env(&[("GEMINI_API_KEY", "  ")]);
        let config = AppConfig::from_sources(blank, || Some("keychain-key-0123".to_string())).unwrap();
        assert_eq!(config.api_key, "keychain-key-0123");
    }

    #[test]
    fn test_missing_key() {
        assert_eq!(
            AppConfig::from_sources(env(&[]), || None).unwrap_err(),
            ConfigError::MissingApiKey
        );
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_sources(
            env(&[
                ("GEMINI_API_KEY", "AIzaSyRealLookingKey"),
                ("PHOTO_SORTER_MODEL", "gemini-2.5-pro"),
                ("PHOTO_SORTER_BASE_URL", "http://localhost:9000"),
                ("PHOTO_SORTER_TIMEOUT_SECS", "30"),
            ]),
            || None,
        )
        .unwrap();

        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_timeout() {
        for bad in ["soon", "0", "-5"] {
            let result = AppConfig::from_sources(
                env(&[
                    ("GEMINI_API_KEY", "AIzaSyRealLookingKey"),
                    ("PHOTO_SORTER_TIMEOUT_SECS", bad),
                ]),
                || None,
            );
            assert!(matches!(result, Err(ConfigError::InvalidValue { .. })), "{}", bad);
        }
    }

    #[test]
    fn test_placeholder_keys_rejected() {
        assert!(validate_api_key("your-api-key-here").is_err());
        assert!(validate_api_key("REPLACE_WITH_KEY").is_err());
        assert!(validate_api_key("short").is_err());
        assert!(validate_api_key("AIzaSyRealLookingKey").is_ok());
    }
}
