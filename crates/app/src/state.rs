use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use common::fs::{GitFsConfig, DEFAULT_MAX_FILE_BYTES};
use common::repo::{GithubConfig, DEFAULT_API_URL, DEFAULT_COMMIT_MESSAGE};
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

pub const APP_NAME: &str = "gitfs";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Repository URL, e.g. `https://github.com/owner/repo`
    pub repo: String,
    /// Branch every read and write targets
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Base URL of the REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Access token; `--token` and `GITFS_TOKEN` take precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Timeout applied to every remote request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Largest file that can be written through the mount; must be non-zero
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
    /// Commit message attached to every remote write and delete
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
    /// Default log level; `RUST_LOG` overrides it
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for daily-rolled log files, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_file_bytes() -> usize {
    DEFAULT_MAX_FILE_BYTES
}

fn default_commit_message() -> String {
    DEFAULT_COMMIT_MESSAGE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            branch: default_branch(),
            api_url: default_api_url(),
            token: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_file_bytes: default_max_file_bytes(),
            commit_message: default_commit_message(),
            log_level: default_log_level(),
            log_dir: None,
        }
    }

    pub fn log_level(&self) -> Result<LevelFilter, StateError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| StateError::InvalidLogLevel(self.log_level.clone()))
    }

    /// Client configuration, with `token` taking precedence over the
    /// configured one
    pub fn github_config(&self, token: Option<&str>) -> Result<GithubConfig, StateError> {
        let token = token
            .or(self.token.as_deref())
            .filter(|t| !t.is_empty())
            .ok_or(StateError::MissingToken)?;

        let mut config = GithubConfig::new(&self.repo, token);
        config.branch = self.branch.clone();
        config.api_url = self.api_url.clone();
        config.commit_message = self.commit_message.clone();
        config.timeout = Duration::from_secs(self.request_timeout_secs);
        Ok(config)
    }

    pub fn fs_config(&self) -> Result<GitFsConfig, StateError> {
        if self.max_file_bytes == 0 {
            return Err(StateError::InvalidMaxFileBytes);
        }
        Ok(GitFsConfig {
            max_file_bytes: self.max_file_bytes,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the gitfs directory (~/.gitfs)
    pub gitfs_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the gitfs directory path (custom or default ~/.gitfs)
    pub fn gitfs_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new gitfs directory holding `config`
    pub fn init(custom_path: Option<PathBuf>, config: AppConfig) -> Result<Self, StateError> {
        let gitfs_dir = Self::gitfs_dir(custom_path)?;
        let config_path = gitfs_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&gitfs_dir)?;
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        Ok(Self {
            gitfs_dir,
            config_path,
            config,
        })
    }

    /// Load existing state from the gitfs directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let gitfs_dir = Self::gitfs_dir(custom_path)?;
        let config_path = gitfs_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            gitfs_dir,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("gitfs directory not initialized. Run 'gitfs init' first")]
    NotInitialized,

    #[error("gitfs directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("no access token: pass --token, set GITFS_TOKEN or add `token` to the config")]
    MissingToken,

    #[error("max_file_bytes must be greater than zero")]
    InvalidMaxFileBytes,

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
