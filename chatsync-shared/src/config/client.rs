//! Layered client configuration: file, environment, then flags.

use std::{env, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::models::ViewerId;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/";
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
const DEFAULT_EDGE_THRESHOLD_PX: i32 = 20;

/// Errors raised while loading or validating a [`ClientConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// YAML parse or encode failure.
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yml::Error),
    /// JSON parse or encode failure.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// TOML parse failure.
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
    /// TOML encode failure.
    #[error("failed to encode TOML configuration: {0}")]
    TomlEncode(#[from] toml::ser::Error),
    /// The extension or requested format is not yaml, json or toml.
    #[error("unsupported configuration format '{0}'. Use 'yaml', 'json' or 'toml'.")]
    UnsupportedFormat(String),
    /// An environment variable could not be parsed.
    #[error("invalid value for {name}: '{value}'")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
    /// Every validation problem found.
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Configuration for a stream synchronizer client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the stream REST API
    pub api_base_url: String,

    /// Identity of the viewer, checked against stream ban lists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_id: Option<ViewerId>,

    /// Top-level messages requested per page
    pub page_size: usize,

    /// Replies requested per bucket page
    pub reply_page_size: usize,

    /// Seconds between newest-page polls
    pub poll_interval_secs: u64,

    /// Distance in pixels from the top or bottom edge that counts as "near"
    pub edge_threshold_px: i32,

    /// Logging level
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ClientConfig {
    /// Generates a default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            viewer_id: None,
            page_size: DEFAULT_PAGE_SIZE,
            reply_page_size: DEFAULT_PAGE_SIZE,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            edge_threshold_px: DEFAULT_EDGE_THRESHOLD_PX,
            log_level: "info".to_string(),
        }
    }

    /// Loads the configuration from a file, environment variables, or defaults.
    ///
    /// File values win over environment variables; an environment variable
    /// only applies while the field still holds its default. The explicit
    /// `api_base_override` wins over both.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, an
    /// environment variable holds an unparsable value, or validation fails.
    pub fn load_config(
        config_path: Option<&Path>,
        api_base_override: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::with_defaults(),
        };

        config.apply_env_overrides()?;

        if let Some(base) = api_base_override {
            config.api_base_url = base.to_string();
        }

        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        match extension {
            "yaml" | "yml" => Ok(serde_yml::from_str(&content)?),
            "json" => Ok(serde_json::from_str(&content)?),
            "toml" => Ok(toml::from_str(&content)?),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let defaults = Self::with_defaults();

        if self.api_base_url == defaults.api_base_url
            && let Ok(value) = env::var("CHATSYNC_API_BASE_URL")
        {
            self.api_base_url = value;
        }
        if self.viewer_id.is_none()
            && let Ok(value) = env::var("CHATSYNC_VIEWER_ID")
        {
            self.viewer_id = Some(value.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "CHATSYNC_VIEWER_ID",
                value: value.clone(),
            })?);
        }
        if self.page_size == defaults.page_size {
            self.page_size = env_parse("CHATSYNC_PAGE_SIZE")?.unwrap_or(self.page_size);
        }
        if self.reply_page_size == defaults.reply_page_size {
            self.reply_page_size =
                env_parse("CHATSYNC_REPLY_PAGE_SIZE")?.unwrap_or(self.reply_page_size);
        }
        if self.poll_interval_secs == defaults.poll_interval_secs {
            self.poll_interval_secs =
                env_parse("CHATSYNC_POLL_INTERVAL_SECS")?.unwrap_or(self.poll_interval_secs);
        }
        if self.edge_threshold_px == defaults.edge_threshold_px {
            self.edge_threshold_px =
                env_parse("CHATSYNC_EDGE_THRESHOLD_PX")?.unwrap_or(self.edge_threshold_px);
        }
        if self.log_level == defaults.log_level
            && let Ok(value) = env::var("CHATSYNC_LOG_LEVEL")
        {
            self.log_level = value;
        }

        Ok(())
    }

    /// Validates the configuration, collecting every problem found.
    ///
    /// # Errors
    /// Returns the list of validation messages when any check fails.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(err) = self.api_base() {
            errors.push(err);
        }
        if self.page_size == 0 {
            errors.push("page_size must be greater than 0".to_string());
        }
        if self.reply_page_size == 0 {
            errors.push("reply_page_size must be greater than 0".to_string());
        }
        if self.poll_interval_secs == 0 {
            errors.push("poll_interval_secs must be greater than 0".to_string());
        }
        if self.edge_threshold_px < 0 {
            errors.push("edge_threshold_px must not be negative".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Parses the API base URL, normalizing it to end with `/` so relative
    /// endpoint joins keep the final path segment.
    ///
    /// # Errors
    /// Returns a message when the URL does not parse or is not http(s).
    pub fn api_base(&self) -> Result<Url, String> {
        let mut raw = self.api_base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw).map_err(|err| format!("invalid api_base_url '{raw}': {err}"))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(format!("api_base_url must use http or https, got '{scheme}'")),
        }
    }

    /// Poll period as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Serializes the configuration in the given format (`yaml`, `json` or `toml`).
    ///
    /// # Errors
    /// Returns a [`ConfigError`] for unknown formats or encoding failures.
    pub fn render(&self, format: &str) -> Result<String, ConfigError> {
        match format {
            "yaml" | "yml" => Ok(serde_yml::to_string(self)?),
            "json" => Ok(serde_json::to_string_pretty(self)?),
            "toml" => Ok(toml::to_string_pretty(self)?),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => match value.trim().parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::InvalidEnv { name, value }),
        },
        Err(_) => Ok(None),
    }
}
