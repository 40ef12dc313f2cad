//! Gatekeeper configuration file handling
//!
//! Provides default configuration generation and loading for the relay.
//! Configuration files are TOML format.
//!
//! ## Operator vs Guild Configuration
//!
//! This file contains OPERATOR configuration only: where the control
//! channel is, where the settings store lives, relay tuning and logging.
//!
//! Per-guild settings (opt-in tier, trusted issuers, log channel) live in
//! the settings store and are changed by each guild's own administrators
//! through `g!` commands. The operator file never overrides them.

use gatekeeper::commands::{SurfaceConfig, DEFAULT_COMMAND_PREFIX};
use gatekeeper::platform::{ChannelId, GuildId, InMemoryPlatform, UserId};
use gatekeeper::relay::{EngineConfig, DEFAULT_DELETE_MESSAGE_DAYS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default settings store file name (next to the config file)
const DEFAULT_STORE_FILE: &str = "settings.json";

/// Relay operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatekeeperConfig {
    /// Control channel and command routing
    pub control: ControlConfig,

    /// Guild settings store
    #[serde(default)]
    pub store: StoreConfig,

    /// Propagation tuning
    #[serde(default)]
    pub relay: RelayConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Offline console platform used by `run`
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// Control channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// The only channel where ban/pardon directives are accepted
    pub channel_id: u64,

    /// Prefix for per-guild admin commands
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Users allowed to issue directives (empty: anyone in the channel)
    #[serde(default)]
    pub privileged_issuers: Vec<u64>,

    /// Reply to directives sent from the wrong place instead of ignoring them
    #[serde(default)]
    pub unauthorized_reply: bool,
}

/// Settings store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Path to the settings JSON (default: next to the config file)
    pub path: Option<PathBuf>,
}

/// Propagation tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Bound on each platform call, e.g. "10s" or "500ms"
    #[serde(default = "default_call_timeout")]
    pub call_timeout: String,

    /// Guilds processed at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Days of the target's message history removed with a ban (0-7)
    #[serde(default = "default_delete_message_days")]
    pub delete_message_days: u8,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

/// Console platform description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// User id lines typed on stdin are sent as
    #[serde(default = "default_console_issuer")]
    pub issuer_id: u64,

    #[serde(default = "default_console_issuer_name")]
    pub issuer_name: String,

    #[serde(default)]
    pub guilds: Vec<ConsoleGuild>,

    /// Users that directives may target
    #[serde(default)]
    pub users: Vec<ConsoleUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleGuild {
    pub id: u64,
    pub name: String,
    #[serde(default = "default_true")]
    pub can_ban: bool,
    #[serde(default)]
    pub channels: Vec<ConsoleChannel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleChannel {
    pub id: u64,
    pub name: String,
    #[serde(default = "default_true")]
    pub can_send: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleUser {
    pub id: u64,
    pub name: String,
}

fn default_command_prefix() -> String {
    DEFAULT_COMMAND_PREFIX.to_string()
}

fn default_call_timeout() -> String {
    "10s".to_string()
}

fn default_max_concurrency() -> usize {
    gatekeeper::relay::engine::DEFAULT_MAX_CONCURRENCY
}

fn default_delete_message_days() -> u8 {
    DEFAULT_DELETE_MESSAGE_DAYS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_console_issuer() -> u64 {
    1
}

fn default_console_issuer_name() -> String {
    "operator".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            call_timeout: default_call_timeout(),
            max_concurrency: default_max_concurrency(),
            delete_message_days: default_delete_message_days(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            issuer_id: default_console_issuer(),
            issuer_name: default_console_issuer_name(),
            guilds: Vec::new(),
            users: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl GatekeeperConfig {
    /// Create a new configuration for the given control channel
    pub fn new(control_channel: u64) -> Self {
        Self {
            control: ControlConfig {
                channel_id: control_channel,
                command_prefix: default_command_prefix(),
                privileged_issuers: Vec::new(),
                unauthorized_reply: false,
            },
            store: StoreConfig::default(),
            relay: RelayConfig::default(),
            logging: LoggingConfig::default(),
            console: ConsoleConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: GatekeeperConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Reject values that parse but cannot run
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.control.command_prefix.trim().is_empty() {
            return Err("[control] command_prefix must not be empty".into());
        }
        if self.relay.max_concurrency == 0 {
            return Err("[relay] max_concurrency must be at least 1".into());
        }
        if self.relay.delete_message_days > 7 {
            return Err("[relay] delete_message_days must be between 0 and 7".into());
        }
        self.call_timeout()?;
        Ok(())
    }

    /// Parsed `[relay] call_timeout`
    pub fn call_timeout(&self) -> Result<Duration, Box<dyn std::error::Error>> {
        let timeout = humantime::parse_duration(&self.relay.call_timeout).map_err(|e| {
            format!(
                "Invalid [relay] call_timeout '{}': {}",
                self.relay.call_timeout, e
            )
        })?;
        if timeout.is_zero() {
            return Err("[relay] call_timeout must be greater than zero".into());
        }
        Ok(timeout)
    }

    /// Settings store path; relative paths resolve against the config file
    pub fn store_path(&self, config_path: &Path) -> PathBuf {
        let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        match &self.store.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => dir.join(path),
            None => dir.join(DEFAULT_STORE_FILE),
        }
    }

    pub fn engine_config(&self) -> Result<EngineConfig, Box<dyn std::error::Error>> {
        Ok(EngineConfig {
            call_timeout: self.call_timeout()?,
            max_concurrency: self.relay.max_concurrency,
        })
    }

    pub fn surface_config(&self) -> SurfaceConfig {
        SurfaceConfig {
            control_channel: ChannelId(self.control.channel_id),
            command_prefix: self.control.command_prefix.clone(),
            privileged_issuers: self
                .control
                .privileged_issuers
                .iter()
                .copied()
                .map(UserId)
                .collect(),
            unauthorized_reply: self.control.unauthorized_reply,
            delete_message_days: self.relay.delete_message_days,
        }
    }

    /// Build the offline console platform from `[console]`
    pub fn console_platform(&self) -> InMemoryPlatform {
        // The relay itself gets id 0, which never collides with a real issuer
        let platform = InMemoryPlatform::new(UserId(0));
        platform.add_user(
            UserId(self.console.issuer_id),
            &self.console.issuer_name,
        );
        for user in &self.console.users {
            platform.add_user(UserId(user.id), &user.name);
        }
        for guild in &self.console.guilds {
            platform.add_guild(GuildId(guild.id), &guild.name, guild.can_ban);
            for channel in &guild.channels {
                platform.add_channel(
                    ChannelId(channel.id),
                    Some(GuildId(guild.id)),
                    &channel.name,
                    channel.can_send,
                );
            }
        }
        platform
    }

    /// Guild owning `channel` in the console description
    pub fn console_guild_of(&self, channel: u64) -> Option<GuildId> {
        self.console
            .guilds
            .iter()
            .find(|g| g.channels.iter().any(|c| c.id == channel))
            .map(|g| GuildId(g.id))
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml() -> String {
        r#"# Gatekeeper Relay Configuration (Operator Settings)
#
# This file contains OPERATOR configuration only.
#
# PER-GUILD SETTINGS (opt-in level, trusted users, logging channel) are
# stored in the settings store and changed by each guild's administrators
# with g! commands. Nothing here overrides them.

[control]
# The only channel where ban/pardon directives are accepted
channel_id = 50

# Prefix for per-guild admin commands (g!opt, g!logging, g!trust, ...)
command_prefix = "g!"

# Users allowed to send directives. Empty: anyone who can post in the
# control channel.
privileged_issuers = []

# Reply to directives sent outside the control channel
unauthorized_reply = false

[store]
# Settings store (JSON). Relative paths are resolved next to this file.
# path = "settings.json"

[relay]
# Bound on every platform call (humantime format: "10s", "500ms")
call_timeout = "10s"

# Guilds processed concurrently
max_concurrency = 8

# Days of the target's message history removed with a ban (0-7)
delete_message_days = 7

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/gatekeeper/gatekeeper.log"

# Offline console platform used by `gatekeeper run`. Lines typed on stdin
# are posted to the control channel as this issuer.
[console]
issuer_id = 7
issuer_name = "operator"

[[console.guilds]]
id = 1
name = "moderators"
channels = [{ id = 50, name = "bans" }]

[[console.guilds]]
id = 2
name = "partner"
channels = [{ id = 200, name = "mod-log" }]

[[console.users]]
id = 12345
name = "mallory"
"#
        .to_string()
    }

    /// Create and save a default configuration file
    pub fn create_default(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

/// Get the default config file path
///
/// - Linux: ~/.config/gatekeeper/config.toml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gatekeeper")
        .join("config.toml")
}

/// Config path from `--config`, or the default
pub fn resolve_config_path(config: Option<String>) -> PathBuf {
    config.map(PathBuf::from).unwrap_or_else(default_config_path)
}
