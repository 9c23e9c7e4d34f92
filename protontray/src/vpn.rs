//! Commands understood by the external VPN client.

use std::fmt;

use crate::config::CliConfig;
use crate::utils::command::Invocation;
use crate::utils::privilege::Elevation;
use crate::validation::validate_country_code;
use crate::Result;

/// Server selection for a connect command.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConnectTarget {
    /// The fastest server available
    Fastest,
    /// The fastest server in the given exit country (ISO code, e.g. `CH`)
    Country(String),
    /// A random server
    Random,
    /// The fastest Secure Core server
    SecureCore,
    /// The fastest P2P server
    P2p,
    /// The fastest Tor server
    Tor,
}

impl fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectTarget::Fastest => f.write_str("fastest server"),
            ConnectTarget::Country(code) => write!(f, "country {code}"),
            ConnectTarget::Random => f.write_str("random server"),
            ConnectTarget::SecureCore => f.write_str("Secure Core server"),
            ConnectTarget::P2p => f.write_str("P2P server"),
            ConnectTarget::Tor => f.write_str("Tor server"),
        }
    }
}

/// A subcommand of the VPN client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VpnCommand {
    Status,
    Connect(ConnectTarget),
    Disconnect,
    Reconnect,
    Version,
}

impl VpnCommand {
    /// Arguments passed to the VPN client for this command.
    pub fn args(&self) -> Vec<&str> {
        match self {
            VpnCommand::Status => vec!["s"],
            VpnCommand::Connect(ConnectTarget::Fastest) => vec!["c", "-f"],
            VpnCommand::Connect(ConnectTarget::Country(code)) => vec!["c", "--cc", code.as_str()],
            VpnCommand::Connect(ConnectTarget::Random) => vec!["c", "-r"],
            VpnCommand::Connect(ConnectTarget::SecureCore) => vec!["c", "--sc"],
            VpnCommand::Connect(ConnectTarget::P2p) => vec!["c", "--p2p"],
            VpnCommand::Connect(ConnectTarget::Tor) => vec!["c", "--tor"],
            VpnCommand::Disconnect => vec!["d"],
            VpnCommand::Reconnect => vec!["r"],
            VpnCommand::Version => vec!["-v"],
        }
    }
}

/// Turns `VpnCommand`s into command lines for one configured client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSet {
    program: String,
    elevation: Elevation,
}

impl CommandSet {
    pub fn new(program: impl Into<String>, elevation: Elevation) -> Self {
        Self {
            program: program.into(),
            elevation,
        }
    }

    pub fn from_config(config: &CliConfig) -> Self {
        Self::new(config.program.clone(), config.elevation)
    }

    /// Builds the command line for `command`.
    ///
    /// Country codes are validated here so that nothing reaches the client unchecked.
    pub fn invocation(&self, command: &VpnCommand) -> Result<Invocation> {
        if let VpnCommand::Connect(ConnectTarget::Country(code)) = command {
            validate_country_code(code)?;
        }

        Ok(self.elevation.wrap(&self.program, &command.args()))
    }
}
