use crate::constants::{
    DEFAULT_CONFIG_PATH, DEFAULT_POLL_INTERVAL, DEFAULT_SERVER_LIST, DEFAULT_TUNNEL_INTERFACE,
    DEFAULT_VPN_PROGRAM,
};
use crate::error::{AppletError, ConfigError, Result};
use crate::utils::expand_path;
use crate::utils::privilege::Elevation;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Applet configuration
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AppletConfig {
    /// External VPN client configuration
    #[serde(default)]
    pub cli: CliConfig,
    /// Status probing configuration
    #[serde(default)]
    pub status: StatusConfig,
    /// Desktop notification configuration
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Server directory configuration
    #[serde(default)]
    pub servers: ServersConfig,
    /// Tray icon configuration
    #[serde(default)]
    pub tray: TrayConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// External VPN client configuration
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CliConfig {
    /// The VPN client executable (default = protonvpn)
    #[serde(default = "default_program")]
    pub program: String,
    /// How the client is elevated (default = Sudo)
    #[serde(default)]
    pub elevation: Elevation,
}

/// Status probing configuration
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StatusConfig {
    /// Where the connection status comes from (default = Cli)
    #[serde(default)]
    pub source: StatusSource,
    /// Name of the tunnel interface checked by the `Interface` source (default = proton0)
    #[serde(default = "default_tunnel_interface")]
    pub tunnel_interface: String,
    /// Interval between two samples of the poll loop in milliseconds (default = 1000)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Desktop notification configuration
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct NotificationConfig {
    /// Whether status notifications are shown at startup (default = false)
    #[serde(default)]
    pub enabled: bool,
}

/// Server directory configuration
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ServersConfig {
    /// The server list cached by the VPN client (default = ~/.pvpn-cli/serverinfo.json)
    #[serde(default = "default_server_list")]
    pub file: PathBuf,
}

/// Tray icon configuration
///
/// Icons are freedesktop icon theme names.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TrayConfig {
    /// Icon shown while connected (default = network-vpn-symbolic)
    #[serde(default = "default_connected_icon")]
    pub connected_icon: String,
    /// Icon shown while disconnected or unknown (default = network-vpn-disconnected-symbolic)
    #[serde(default = "default_disconnected_icon")]
    pub disconnected_icon: String,
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LogConfig {
    /// The log level to use (default = info)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Source of the connection status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum StatusSource {
    /// Parse the output of the client's status subcommand
    #[default]
    #[serde(alias = "cli")]
    Cli,
    /// Check for the presence of the tunnel interface
    #[serde(alias = "interface")]
    Interface,
}

pub trait ConfigInit<T: DeserializeOwned> {
    /// Initializes the configuration object from the given Figment
    ///
    /// ### Arguments
    /// - `figment` - the Figment to use for initialization
    fn init(figment: Figment, _env_prefix: &str) -> Result<T> {
        Ok(figment.extract()?)
    }
}

pub trait FromPath<T: DeserializeOwned + ConfigInit<T>> {
    /// Creates a configuration object from the given path and ENV prefix
    ///
    /// ### Arguments
    /// - `path` - a path to the configuration file
    /// - `env_prefix` - the ENV prefix to use for overrides
    fn from_path(path: &Path, env_prefix: &str) -> Result<T> {
        if !path.exists() {
            return Err(AppletError::config_file_not_found(path));
        }

        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(env_prefix).split("__"));

        T::init(figment, env_prefix)
    }
}

impl ConfigInit<AppletConfig> for AppletConfig {
    fn init(figment: Figment, _env_prefix: &str) -> Result<AppletConfig> {
        let config: AppletConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}

impl FromPath<AppletConfig> for AppletConfig {}

impl AppletConfig {
    /// Loads the applet configuration.
    ///
    /// An explicit `path` must exist. Without one, the default configuration file is used
    /// if present; otherwise only defaults and environment overrides apply.
    ///
    /// ### Arguments
    /// - `path` - an explicit configuration file, if any
    /// - `env_prefix` - the ENV prefix to use for overrides
    pub fn load(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_path(&expand_path(path), env_prefix);
        }

        let default_path = expand_path(Path::new(DEFAULT_CONFIG_PATH));
        if default_path.exists() {
            return Self::from_path(&default_path, env_prefix);
        }

        debug!(
            "No configuration file at {}, using defaults",
            default_path.display()
        );
        Self::init(
            Figment::new().merge(Env::prefixed(env_prefix).split("__")),
            env_prefix,
        )
    }

    fn validate(&self) -> Result<()> {
        if self.cli.program.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cli.program".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if self.status.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "status.poll_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

impl StatusConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            elevation: Elevation::default(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            source: StatusSource::default(),
            tunnel_interface: default_tunnel_interface(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for ServersConfig {
    fn default() -> Self {
        Self {
            file: default_server_list(),
        }
    }
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            connected_icon: default_connected_icon(),
            disconnected_icon: default_disconnected_icon(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_program() -> String {
    DEFAULT_VPN_PROGRAM.to_string()
}

fn default_tunnel_interface() -> String {
    DEFAULT_TUNNEL_INTERFACE.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_server_list() -> PathBuf {
    PathBuf::from(DEFAULT_SERVER_LIST)
}

fn default_connected_icon() -> String {
    "network-vpn-symbolic".to_string()
}

fn default_disconnected_icon() -> String {
    "network-vpn-disconnected-symbolic".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
