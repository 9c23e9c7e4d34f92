use async_trait::async_trait;
use std::ffi::OsStr;
use std::fmt;
use std::process::{Child, Command, Output, Stdio};
use tracing::debug;

use crate::error::CommandError;

/// A fully resolved external command line: program plus its fixed arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The full argument vector, program first.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// How an external command terminated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandExit {
    /// Exit code zero
    Success,
    /// Non-zero exit code, or `None` when terminated by a signal
    Failed { code: Option<i32> },
    /// The process was never started
    NotStarted { reason: String },
}

/// Everything the runner observed about one external command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit: CommandExit,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit: CommandExit::Success,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            exit: CommandExit::Failed { code },
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn not_started(reason: impl Into<String>) -> Self {
        Self {
            exit: CommandExit::NotStarted {
                reason: reason.into(),
            },
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit == CommandExit::Success
    }

    /// Converts a failed run into the matching `CommandError`.
    ///
    /// ### Arguments
    /// - `invocation` - the command line that produced this output, used in the error message
    pub fn check(self, invocation: &Invocation) -> Result<Self, CommandError> {
        match &self.exit {
            CommandExit::Success => Ok(self),
            CommandExit::Failed { code } => Err(CommandError::NonZeroExit {
                command: invocation.to_string(),
                exit: match code {
                    Some(code) => format!("exit code {code}"),
                    None => "a signal".to_string(),
                },
                stderr: self.stderr.trim().to_string(),
            }),
            CommandExit::NotStarted { reason } => Err(CommandError::SpawnFailure {
                command: invocation.to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        let exit = if output.status.success() {
            CommandExit::Success
        } else {
            CommandExit::Failed {
                code: output.status.code(),
            }
        };

        Self {
            exit,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Spawns `program` with `arguments`, all standard streams piped.
pub fn run_command<I: IntoIterator<Item = S>, S: AsRef<OsStr>>(
    program: &str,
    arguments: I,
) -> Result<Child, CommandError> {
    let mut command = Command::new(program);

    command
        .args(arguments)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    command.spawn().map_err(|e| CommandError::SpawnFailure {
        command: program.to_string(),
        reason: e.to_string(),
    })
}

/// Executes external commands on behalf of the prober and the dispatcher.
///
/// Implementations never fail: every problem is reported inside the returned
/// `CommandOutput`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> CommandOutput;
}

/// Runs commands as real child processes, waiting for them on the blocking pool.
#[derive(Clone, Debug, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, invocation: &Invocation) -> CommandOutput {
        debug!("Running command: {invocation}");

        let child = match run_command(&invocation.program, &invocation.args) {
            Ok(child) => child,
            Err(e) => return CommandOutput::not_started(e.to_string()),
        };

        match tokio::task::spawn_blocking(move || child.wait_with_output()).await {
            Ok(Ok(output)) => output.into(),
            Ok(Err(e)) => CommandOutput::not_started(format!("failed to wait for process: {e}")),
            Err(e) => CommandOutput::not_started(format!("wait task failed: {e}")),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_of_successful_command() {
        let invocation = Invocation::new("sh", ["-c", "echo 'Status: Connected'"]);
        let output = SystemCommandRunner.run(&invocation).await;

        assert!(output.is_success());
        assert_eq!(output.stdout.trim(), "Status: Connected");
    }

    #[tokio::test]
    async fn reports_non_zero_exit() {
        let invocation = Invocation::new("sh", ["-c", "echo oops >&2; exit 3"]);
        let output = SystemCommandRunner.run(&invocation).await;

        assert_eq!(output.exit, CommandExit::Failed { code: Some(3) });
        assert_eq!(output.stderr.trim(), "oops");

        let error = output.check(&invocation).unwrap_err();
        assert!(matches!(error, CommandError::NonZeroExit { .. }));
        assert!(error.to_string().contains("exit code 3"));
    }

    #[tokio::test]
    async fn reports_spawn_failure_without_panicking() {
        let invocation = Invocation::new("protontray-definitely-missing-binary", ["s"]);
        let output = SystemCommandRunner.run(&invocation).await;

        assert!(matches!(output.exit, CommandExit::NotStarted { .. }));
        assert!(matches!(
            output.check(&invocation),
            Err(CommandError::SpawnFailure { .. })
        ));
    }

    #[test]
    fn invocation_displays_full_command_line() {
        let invocation = Invocation::new("sudo", ["protonvpn", "c", "-f"]);
        assert_eq!(invocation.to_string(), "sudo protonvpn c -f");
        assert_eq!(invocation.argv(), vec!["sudo", "protonvpn", "c", "-f"]);
    }
}
