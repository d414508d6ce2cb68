//! Configuration loading and validation.
//!
//! A TOML file supplies the base settings, `DISCORD_*` environment variables
//! override individual fields, and the result is validated once. The loaded
//! `RelayConfig` is read-only for the rest of the invocation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use hookrelay_protocol::EventKind;
use serde::Deserialize;
use thiserror::Error;

use crate::paths;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub discord: DiscordConfig,
    pub threads: ThreadConfig,
    pub events: EventFilter,
}

/// Discord credentials and transport settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
    pub bot_token: Option<String>,
    /// Parent channel snowflake for bot sends and thread lookups.
    pub channel_id: Option<String>,
    pub api_base: String,
    /// User pinged on boundary events.
    pub mention_user_id: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            bot_token: None,
            channel_id: None,
            api_base: DEFAULT_API_BASE.to_string(),
            mention_user_id: None,
            timeout_secs: 10,
        }
    }
}

impl fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "[REDACTED]"))
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field("channel_id", &self.channel_id)
            .field("api_base", &self.api_base)
            .field("mention_user_id", &self.mention_user_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Kind of channel sessions are threaded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Threads are created up front through the bot API.
    #[default]
    Text,
    /// Posts are created by the first webhook send that names them.
    Forum,
}

impl ChannelType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Forum => "forum",
        }
    }
}

impl FromStr for ChannelType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "forum" => Ok(Self::Forum),
            other => Err(ConfigError::Invalid(format!(
                "channel_type must be 'text' or 'forum', got '{other}'"
            ))),
        }
    }
}

/// Session threading behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThreadConfig {
    pub enabled: bool,
    pub channel_type: ChannelType,
    pub prefix: String,
    /// Overrides `<data_dir>/threads.db`.
    pub storage_path: Option<PathBuf>,
    /// Records unused for this many days are evicted.
    pub cleanup_days: u32,
    /// Upper bound on pages fetched per archived-thread listing.
    pub archived_search_pages: u32,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            channel_type: ChannelType::Text,
            prefix: "Session".to_string(),
            storage_path: None,
            cleanup_days: 30,
            archived_search_pages: 5,
        }
    }
}

/// Allow/deny lists of event names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventFilter {
    /// Empty means every event is enabled.
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
}

impl EventFilter {
    pub fn allows(&self, kind: EventKind) -> bool {
        let named = |names: &[String]| {
            names
                .iter()
                .any(|n| n.parse::<EventKind>().is_ok_and(|k| k == kind))
        };
        if !self.enabled.is_empty() && !named(&self.enabled) {
            return false;
        }
        !named(&self.disabled)
    }
}

impl RelayConfig {
    /// Load configuration from the given path, `$HOOKRELAY_CONFIG`, or the
    /// default location, then apply environment overrides and validate.
    ///
    /// Only an explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("HOOKRELAY_CONFIG").map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match paths::default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `DISCORD_*` overrides. Blank values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DISCORD_WEBHOOK_URL") {
            self.discord.webhook_url = Some(v.trim().to_string());
        }
        if let Some(v) = get("DISCORD_TOKEN") {
            self.discord.bot_token = Some(v.trim().to_string());
        }
        if let Some(v) = get("DISCORD_CHANNEL_ID") {
            self.discord.channel_id = Some(v.trim().to_string());
        }
        if let Some(v) = get("DISCORD_API_BASE") {
            self.discord.api_base = v.trim().to_string();
        }
        if let Some(v) = get("DISCORD_MENTION_USER_ID") {
            self.discord.mention_user_id = Some(v.trim().to_string());
        }
        if let Some(v) = get("DISCORD_USE_THREADS") {
            self.threads.enabled = parse_bool("DISCORD_USE_THREADS", &v)?;
        }
        if let Some(v) = get("DISCORD_CHANNEL_TYPE") {
            self.threads.channel_type = v.parse()?;
        }
        if let Some(v) = get("DISCORD_THREAD_PREFIX") {
            self.threads.prefix = v.trim().to_string();
        }
        if let Some(v) = get("DISCORD_THREAD_STORAGE_PATH") {
            self.threads.storage_path = Some(PathBuf::from(v.trim()));
        }
        if let Some(v) = get("DISCORD_THREAD_CLEANUP_DAYS") {
            self.threads.cleanup_days = v.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "DISCORD_THREAD_CLEANUP_DAYS must be a number, got '{v}'"
                ))
            })?;
        }
        if let Some(v) = get("DISCORD_ENABLED_EVENTS") {
            self.events.enabled = split_list(&v);
        }
        if let Some(v) = get("DISCORD_DISABLED_EVENTS") {
            self.events.disabled = split_list(&v);
        }
        Ok(())
    }

    /// Validate that configured fields are well formed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.discord.webhook_url {
            if !is_http_url(url) {
                return Err(ConfigError::Invalid(
                    "discord.webhook_url must be an http(s) URL".into(),
                ));
            }
        }
        if !is_http_url(&self.discord.api_base) {
            return Err(ConfigError::Invalid(
                "discord.api_base must be an http(s) URL".into(),
            ));
        }
        if let Some(id) = &self.discord.channel_id {
            if !is_snowflake(id) {
                return Err(ConfigError::Invalid(format!(
                    "discord.channel_id must be a numeric snowflake, got '{id}'"
                )));
            }
        }
        if let Some(id) = &self.discord.mention_user_id {
            if !is_snowflake(id) {
                return Err(ConfigError::Invalid(format!(
                    "discord.mention_user_id must be a numeric snowflake, got '{id}'"
                )));
            }
        }
        if self.discord.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "discord.timeout_secs must be at least 1".into(),
            ));
        }
        if self.threads.prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("threads.prefix must not be empty".into()));
        }
        if self.threads.cleanup_days == 0 {
            return Err(ConfigError::Invalid(
                "threads.cleanup_days must be at least 1".into(),
            ));
        }
        if self.threads.archived_search_pages == 0 {
            return Err(ConfigError::Invalid(
                "threads.archived_search_pages must be at least 1".into(),
            ));
        }
        for name in self.events.enabled.iter().chain(&self.events.disabled) {
            name.parse::<EventKind>()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        Ok(())
    }

    pub fn has_webhook(&self) -> bool {
        self.discord.webhook_url.is_some()
    }

    pub fn has_bot(&self) -> bool {
        self.discord.bot_token.is_some() && self.discord.channel_id.is_some()
    }

    /// Whether the selected channel kind has the credentials threading needs:
    /// text channels need the bot, forum channels need the webhook.
    pub fn has_thread_credentials(&self) -> bool {
        match self.threads.channel_type {
            ChannelType::Text => self.has_bot(),
            ChannelType::Forum => self.has_webhook(),
        }
    }

    pub fn threads_enabled(&self) -> bool {
        self.threads.enabled
    }

    pub fn store_path(&self, data_dir: &Path) -> PathBuf {
        self.threads
            .storage_path
            .clone()
            .unwrap_or_else(|| paths::db_path(data_dir))
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}

fn is_snowflake(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}
