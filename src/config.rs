//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_ARENA_CONFIG_PATH";

const DEFAULT_JOIN_CODE_LENGTH: usize = 6;
const DEFAULT_MAX_TIMER_SECONDS: u64 = 3600;
const DEFAULT_CAS_RETRY_LIMIT: usize = 8;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    organizer_token: String,
    join_code_length: usize,
    max_timer_seconds: u64,
    cas_retry_limit: usize,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let generated = raw.organizer_token.is_none();
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        join_code_length = app_config.join_code_length,
                        max_timer_seconds = app_config.max_timer_seconds,
                        "loaded configuration"
                    );
                    if generated {
                        announce_generated_token(&app_config.organizer_token);
                    }
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::with_generated_token()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::with_generated_token()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::with_generated_token()
            }
        }
    }

    /// Defaults with a fixed organizer token, for tests and embedding.
    pub fn with_organizer_token(token: impl Into<String>) -> Self {
        Self {
            organizer_token: token.into(),
            ..Self::default()
        }
    }

    fn with_generated_token() -> Self {
        let config = Self::default();
        announce_generated_token(&config.organizer_token);
        config
    }

    /// Secret expected in the `x-organizer-token` header.
    pub fn organizer_token(&self) -> &str {
        &self.organizer_token
    }

    /// Number of characters of generated join codes.
    pub fn join_code_length(&self) -> usize {
        self.join_code_length
    }

    /// Upper bound accepted for a round countdown.
    pub fn max_timer_seconds(&self) -> u64 {
        self.max_timer_seconds
    }

    /// Attempts allowed when an optimistic round status update keeps losing races.
    pub fn cas_retry_limit(&self) -> usize {
        self.cas_retry_limit
    }

    /// Override the maximum countdown.
    pub fn set_max_timer_seconds(mut self, seconds: u64) -> Self {
        self.max_timer_seconds = seconds;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            organizer_token: generate_token(),
            join_code_length: DEFAULT_JOIN_CODE_LENGTH,
            max_timer_seconds: DEFAULT_MAX_TIMER_SECONDS,
            cas_retry_limit: DEFAULT_CAS_RETRY_LIMIT,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    organizer_token: Option<String>,
    #[serde(default)]
    join_code_length: Option<usize>,
    #[serde(default)]
    max_timer_seconds: Option<u64>,
    #[serde(default)]
    cas_retry_limit: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            organizer_token: value
                .organizer_token
                .filter(|token| !token.trim().is_empty())
                .unwrap_or_else(generate_token),
            join_code_length: value
                .join_code_length
                .filter(|length| (4..=12).contains(length))
                .unwrap_or(DEFAULT_JOIN_CODE_LENGTH),
            max_timer_seconds: value
                .max_timer_seconds
                .filter(|seconds| *seconds > 0)
                .unwrap_or(DEFAULT_MAX_TIMER_SECONDS),
            cas_retry_limit: value
                .cas_retry_limit
                .filter(|limit| *limit > 0)
                .unwrap_or(DEFAULT_CAS_RETRY_LIMIT),
        }
    }
}

fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

fn announce_generated_token(token: &str) {
    warn!(
        organizer_token = token,
        "no organizer token configured; generated one for this run"
    );
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_applies_overrides() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"organizer_token": "s3cret", "join_code_length": 8, "max_timer_seconds": 90}"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.organizer_token(), "s3cret");
        assert_eq!(config.join_code_length(), 8);
        assert_eq!(config.max_timer_seconds(), 90);
        assert_eq!(config.cas_retry_limit(), DEFAULT_CAS_RETRY_LIMIT);
    }

    #[test]
    fn out_of_range_values_fall_back_to_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"organizer_token": "  ", "join_code_length": 1, "cas_retry_limit": 0}"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.organizer_token().len(), 32);
        assert_eq!(config.join_code_length(), DEFAULT_JOIN_CODE_LENGTH);
        assert_eq!(config.cas_retry_limit(), DEFAULT_CAS_RETRY_LIMIT);
    }
}
