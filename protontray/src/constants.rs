use std::time::Duration;

/// Name used for the tray item, notifications and log lines.
pub const APPLET_NAME: &str = "ProtonVPN Applet";

/// Version of the applet itself.
pub const APPLET_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Project homepage shown by the About entry.
pub const APPLET_HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");

/// Interval between two status samples of the poll loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Executable of the external VPN client.
pub const DEFAULT_VPN_PROGRAM: &str = "protonvpn";

/// Tunnel interface created by the VPN client.
pub const DEFAULT_TUNNEL_INTERFACE: &str = "proton0";

/// Server list cached by the VPN client.
pub const DEFAULT_SERVER_LIST: &str = "~/.pvpn-cli/serverinfo.json";

/// Default location of the applet configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/protontray/config.toml";

/// Default prefix for configuration overrides via environment variables.
pub const DEFAULT_ENV_PREFIX: &str = "PROTONTRAY_";
