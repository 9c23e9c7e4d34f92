use serde::Deserialize;

use super::command::Invocation;

/// Tool used to run the VPN client with elevated privileges.
///
/// The applet never prompts for credentials itself: the chosen tool must be configured
/// for passwordless use of the VPN client (e.g. a `NOPASSWD` sudoers rule or a polkit
/// rule for `pkexec`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum Elevation {
    /// Run the client directly
    #[serde(alias = "none")]
    None,
    /// Prefix the command with `sudo`
    #[default]
    #[serde(alias = "sudo")]
    Sudo,
    /// Prefix the command with `pkexec` (PolicyKit)
    #[serde(alias = "pkexec")]
    Pkexec,
}

impl Elevation {
    /// Builds the command line that runs `program` with `args` under this elevation.
    pub fn wrap(&self, program: &str, args: &[&str]) -> Invocation {
        match self {
            Elevation::None => Invocation::new(program, args.iter().copied()),
            Elevation::Sudo => Invocation::new(
                "sudo",
                std::iter::once(program).chain(args.iter().copied()),
            ),
            Elevation::Pkexec => Invocation::new(
                "pkexec",
                std::iter::once(program).chain(args.iter().copied()),
            ),
        }
    }
}
