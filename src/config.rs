//! Application-level configuration loading: game pacing and reveal display settings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_NIGHT_BACK_CONFIG_PATH";

const DEFAULT_QUESTIONS_PER_CATEGORY: usize = 8;
const DEFAULT_FREE_TEXT_CATEGORY: &str = "Final Question";
const DEFAULT_UNANSWERED_LABEL: &str = "No answer";
const DEFAULT_MISSING_ANSWER_PLACEHOLDER: &str = "Answer unavailable";
const DEFAULT_TEAM_NAME_LIMIT: usize = 18;
const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Number of questions per category block; a break follows each block.
    pub questions_per_category: usize,
    /// Category whose questions are answered in free text.
    pub free_text_category: String,
    /// Answer text shown for teams that never submitted.
    pub unanswered_label: String,
    /// Answer text shown when a free-text question has no correct answer recorded.
    pub missing_answer_placeholder: String,
    /// Maximum number of characters of a team name on the presentation rows.
    pub team_name_limit: usize,
    /// Upper bound for one write to the realtime database.
    pub transition_timeout: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        questions_per_category = config.questions_per_category,
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON configuration document; absent keys keep their defaults.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            questions_per_category: DEFAULT_QUESTIONS_PER_CATEGORY,
            free_text_category: DEFAULT_FREE_TEXT_CATEGORY.to_string(),
            unanswered_label: DEFAULT_UNANSWERED_LABEL.to_string(),
            missing_answer_placeholder: DEFAULT_MISSING_ANSWER_PLACEHOLDER.to_string(),
            team_name_limit: DEFAULT_TEAM_NAME_LIMIT,
            transition_timeout: DEFAULT_TRANSITION_TIMEOUT,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    questions_per_category: Option<usize>,
    free_text_category: Option<String>,
    unanswered_label: Option<String>,
    missing_answer_placeholder: Option<String>,
    team_name_limit: Option<usize>,
    transition_timeout_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let questions_per_category = match value.questions_per_category {
            Some(0) => {
                warn!("questions_per_category must be positive; keeping default");
                defaults.questions_per_category
            }
            Some(size) => size,
            None => defaults.questions_per_category,
        };

        Self {
            questions_per_category,
            free_text_category: value
                .free_text_category
                .unwrap_or(defaults.free_text_category),
            unanswered_label: value.unanswered_label.unwrap_or(defaults.unanswered_label),
            missing_answer_placeholder: value
                .missing_answer_placeholder
                .unwrap_or(defaults.missing_answer_placeholder),
            team_name_limit: value.team_name_limit.unwrap_or(defaults.team_name_limit),
            transition_timeout: value
                .transition_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.transition_timeout),
        }
    }
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
    fn partial_document_keeps_defaults() {
        let config =
            AppConfig::from_json(r#"{ "questions_per_category": 5, "transition_timeout_ms": 250 }"#)
                .unwrap();
        assert_eq!(config.questions_per_category, 5);
        assert_eq!(config.transition_timeout, Duration::from_millis(250));
        assert_eq!(config.unanswered_label, DEFAULT_UNANSWERED_LABEL);
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let config = AppConfig::from_json(r#"{ "questions_per_category": 0 }"#).unwrap();
        assert_eq!(config.questions_per_category, DEFAULT_QUESTIONS_PER_CATEGORY);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(AppConfig::from_json("[1, 2]").is_err());
    }
}
