use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use burp_protocol::ChannelId;
use burp_protocol::DEFAULT_MODEL;
use burp_protocol::GenerationParams;
use burp_protocol::ModelId;
use burp_protocol::Nickname;
use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::config::error::ConfigError;
use crate::config::error::Result;
use crate::segmenter::DEFAULT_MAX_PENDING_BYTES;

const ENV_PREFIX: &str = "BURP";

/// Root client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub segmenter: SegmenterConfig,

    /// Sampling parameters sent with every message.
    #[serde(default)]
    pub generation: GenerationParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL for `/recent` and `/wait`.
    #[serde(default = "default_server_url")]
    pub url: String,

    /// Base URL for `/ask`; falls back to `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_channel")]
    pub channel: String,

    #[serde(default = "default_nickname")]
    pub nickname: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Replay `/recent` before following the channel.
    #[serde(default = "default_true")]
    pub load_history: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Pause before retrying a failed `/wait`.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Longest unterminated assistant line kept before it is force-wrapped.
    /// `0` disables the cap.
    #[serde(default = "default_max_pending_bytes")]
    pub max_pending_bytes: usize,
}

fn default_server_url() -> String {
    "http://localhost:9042".to_string()
}
fn default_channel() -> String {
    ChannelId::default().as_str().to_string()
}
fn default_nickname() -> String {
    Nickname::default().as_str().to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_true() -> bool {
    true
}
fn default_retry_delay_ms() -> u64 {
    5_000
}
fn default_max_pending_bytes() -> usize {
    DEFAULT_MAX_PENDING_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            publish_url: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            nickname: default_nickname(),
            model: default_model(),
            load_history: default_true(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_pending_bytes: default_max_pending_bytes(),
        }
    }
}

impl AppConfig {
    /// Check every value the session will rely on.
    pub fn validate(&self) -> Result<()> {
        check_url("server.url", &self.server.url)?;
        if let Some(publish) = &self.server.publish_url {
            check_url("server.publish_url", publish)?;
        }
        if ChannelId::sanitize(&self.session.channel).is_none() {
            return Err(invalid("session.channel", "must contain a letter or digit"));
        }
        if Nickname::sanitize(&self.session.nickname).is_none() {
            return Err(invalid("session.nickname", "must contain a letter or digit"));
        }
        self.model()?;
        if self.poll.retry_delay_ms == 0 {
            return Err(invalid("poll.retry_delay_ms", "must be greater than 0"));
        }
        self.generation
            .validate()
            .map_err(|e| invalid("generation", e))?;
        Ok(())
    }

    pub fn channel(&self) -> ChannelId {
        ChannelId::sanitize(&self.session.channel).unwrap_or_default()
    }

    pub fn nickname(&self) -> Nickname {
        Nickname::sanitize(&self.session.nickname).unwrap_or_default()
    }

    pub fn model(&self) -> Result<ModelId> {
        ModelId::parse(&self.session.model).map_err(|e| invalid("session.model", e))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.poll.retry_delay_ms)
    }

    pub fn max_pending_bytes(&self) -> Option<usize> {
        Some(self.segmenter.max_pending_bytes).filter(|&n| n > 0)
    }
}

fn check_url(field: &'static str, raw: &str) -> Result<()> {
    Url::parse(raw).map(drop).map_err(|e| invalid(field, e))
}

fn invalid(field: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

/// Configuration loader with layered merging.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Merge defaults, the config file (if set) and `BURP_*` environment
    /// variables, then validate.
    ///
    /// Nested keys use a double underscore, e.g. `BURP_POLL__RETRY_DELAY_MS=250`.
    pub fn load(&self) -> Result<AppConfig> {
        let defaults = serde_json::to_string(&AppConfig::default())?;
        let mut builder =
            Config::builder().add_source(File::from_str(&defaults, config::FileFormat::Json));

        if let Some(path) = &self.config_path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            builder = builder.add_source(File::from(path.as_path()));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// First existing file among `./burp.toml`,
    /// `<config dir>/burp/config.toml` and `~/.burp.toml`.
    pub fn find_config_file() -> Option<PathBuf> {
        let cwd_config = PathBuf::from("./burp.toml");
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("burp").join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".burp.toml"))
            .filter(|path| path.exists())
    }

    pub fn load_default() -> Result<AppConfig> {
        let loader = match Self::find_config_file() {
            Some(path) => ConfigLoader::new().with_file(path),
            None => ConfigLoader::new(),
        };
        loader.load()
    }
}
