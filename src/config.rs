use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::TrackerError;
use crate::tracker::{ApiToken, BackfillMode, DEFAULT_API_URL};
use crate::workflow::WorkflowState;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TrackerConfig {
    /// Fallback when `PIVOTAL_TOKEN` is not set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// First state that counts as done
    #[serde(default = "default_exit_state")]
    pub exit_state: WorkflowState,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QueryConfig {
    #[serde(default)]
    pub owner_backfill: BackfillMode,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Config {
    /// Load configuration from the given path, or the default location if
    /// one exists. A missing default file means all defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => expand_tilde(p)?,
            None => {
                let default_path = Self::default_config_path()?;
                if !default_path.exists() {
                    return Ok(Config::default());
                }
                default_path
            }
        };

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| TrackerError::Configuration(e.to_string()))
            .with_context(|| format!("Failed to parse config from {:?}", config_path))?;

        Ok(config)
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("pivotal-tools").join("config.toml"))
    }

    /// Resolve the API token: explicit value (flag or `PIVOTAL_TOKEN`) first,
    /// then the config file
    pub fn api_token(&self, explicit: Option<&str>) -> Result<ApiToken, TrackerError> {
        match explicit.or(self.tracker.token.as_deref()) {
            Some(token) => ApiToken::new(token),
            None => Err(TrackerError::MissingToken),
        }
    }
}

/// Expand tilde in paths to home directory
fn expand_tilde(path: &Path) -> Result<PathBuf> {
    if let Some(s) = path.to_str() {
        if let Some(rest) = s.strip_prefix("~/") {
            let home = dirs::home_dir().context("Could not determine home directory")?;
            return Ok(home.join(rest));
        }
    }
    Ok(path.to_path_buf())
}

// Default value functions
fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_exit_state() -> WorkflowState {
    WorkflowState::Accepted
}

fn default_max_workers() -> usize {
    4
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            token: None,
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        WorkflowConfig {
            exit_state: default_exit_state(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            owner_backfill: BackfillMode::default(),
            max_workers: default_max_workers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.tracker.api_url, "https://www.pivotaltracker.com/services/v5");
        assert_eq!(config.tracker.timeout_secs, 30);
        assert_eq!(config.tracker.max_retries, 3);
        assert!(config.tracker.token.is_none());
        assert_eq!(config.workflow.exit_state, WorkflowState::Accepted);
        assert_eq!(config.query.owner_backfill, BackfillMode::Sequential);
        assert_eq!(config.query.max_workers, 4);
    }

    #[test]
    fn test_partial_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[workflow]\nexit_state = \"delivered\"\n\n[query]\nowner_backfill = \"concurrent\""
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.workflow.exit_state, WorkflowState::Delivered);
        assert_eq!(config.query.owner_backfill, BackfillMode::Concurrent);
        assert_eq!(config.query.max_workers, 4);
        assert_eq!(config.tracker.max_retries, 3);
    }

    #[test]
    fn test_unknown_exit_state_is_a_configuration_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[workflow]\nexit_state = \"shipped\"").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();

        let classified = err.chain().find_map(|c| c.downcast_ref::<TrackerError>());
        assert!(matches!(classified, Some(TrackerError::Configuration(_))));
        assert!(format!("{:#}", err).contains("shipped"));
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let result = Config::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();

        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[tracker]"));
        assert!(toml_str.contains("exit_state = \"accepted\""));

        let config2: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config2.workflow.exit_state, config.workflow.exit_state);
        assert_eq!(config2.query.owner_backfill, config.query.owner_backfill);
    }

    #[test]
    fn test_api_token_precedence() {
        let mut config = Config::default();
        assert!(matches!(config.api_token(None), Err(TrackerError::MissingToken)));

        config.tracker.token = Some("from-file".to_string());
        assert_eq!(config.api_token(None).unwrap().expose(), "from-file");
        assert_eq!(config.api_token(Some("from-env")).unwrap().expose(), "from-env");
    }

    #[test]
    fn test_path_expansion() {
        let home = dirs::home_dir().unwrap();
        let expanded = expand_tilde(Path::new("~/test/path")).unwrap();
        assert_eq!(expanded, home.join("test/path"));

        let absolute = PathBuf::from("/absolute/path");
        assert_eq!(expand_tilde(&absolute).unwrap(), absolute);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path().unwrap();
        assert!(path.to_string_lossy().ends_with(".config/pivotal-tools/config.toml"));
    }
}
