//! Connection status probing and edge-triggered change tracking.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ProbeError;
use crate::utils::command::{CommandRunner, Invocation};

/// Connection state of the VPN client as last observed by the applet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    /// Nothing has been observed yet
    #[default]
    Unknown,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connected => f.write_str("Connected"),
            ConnectionStatus::Disconnected => f.write_str("Disconnected"),
            ConnectionStatus::Unknown => f.write_str("Unknown"),
        }
    }
}

/// A successful status sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusReading {
    pub status: ConnectionStatus,
    /// Human readable detail of the sample (the client's status output, trimmed)
    pub details: String,
}

impl StatusReading {
    pub fn new(status: ConnectionStatus, details: impl Into<String>) -> Self {
        Self {
            status,
            details: details.into(),
        }
    }
}

pub type ProbeResult = std::result::Result<StatusReading, ProbeError>;

/// Classifies the output of the client's status subcommand.
///
/// Only the first non-empty line is inspected. "Disconnected" is matched before
/// "Connected" since the former contains the latter case-insensitively.
pub fn parse_status_output(output: &str) -> std::result::Result<ConnectionStatus, ProbeError> {
    let first_line = output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();

    if first_line.contains("Disconnected") {
        Ok(ConnectionStatus::Disconnected)
    } else if first_line.contains("Connected") {
        Ok(ConnectionStatus::Connected)
    } else {
        Err(ProbeError::ParseFailure {
            output: output.trim().to_string(),
        })
    }
}

/// Produces one sample of the connection status.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn probe(&self) -> ProbeResult;
}

/// Probes the status by running the client's status subcommand.
pub struct CliStatusProbe {
    runner: Arc<dyn CommandRunner>,
    invocation: Invocation,
}

impl CliStatusProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, invocation: Invocation) -> Self {
        Self { runner, invocation }
    }
}

#[async_trait]
impl StatusProbe for CliStatusProbe {
    async fn probe(&self) -> ProbeResult {
        let output = self
            .runner
            .run(&self.invocation)
            .await
            .check(&self.invocation)?;
        let status = parse_status_output(&output.stdout)?;

        Ok(StatusReading::new(status, output.stdout.trim()))
    }
}

/// Probes the status by looking for the tunnel interface of the client.
pub struct InterfaceStatusProbe {
    interface: String,
}

impl InterfaceStatusProbe {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }
}

#[async_trait]
impl StatusProbe for InterfaceStatusProbe {
    async fn probe(&self) -> ProbeResult {
        let interfaces = tokio::task::spawn_blocking(if_addrs::get_if_addrs)
            .await
            .map_err(|e| ProbeError::Interface {
                reason: e.to_string(),
            })?
            .map_err(|e| ProbeError::Interface {
                reason: e.to_string(),
            })?;

        if interfaces.iter().any(|iface| iface.name == self.interface) {
            Ok(StatusReading::new(
                ConnectionStatus::Connected,
                format!("Tunnel interface {} is up", self.interface),
            ))
        } else {
            Ok(StatusReading::new(
                ConnectionStatus::Disconnected,
                format!("Tunnel interface {} is down", self.interface),
            ))
        }
    }
}

/// A change worth telling the user about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusNotice {
    Connected { details: String },
    Disconnected,
    ProbeFailed { diagnostic: String },
}

impl StatusNotice {
    pub fn summary(&self) -> &'static str {
        match self {
            StatusNotice::Connected { .. } => "VPN connected",
            StatusNotice::Disconnected => "VPN disconnected",
            StatusNotice::ProbeFailed { .. } => "VPN status unavailable",
        }
    }

    pub fn body(&self) -> &str {
        match self {
            StatusNotice::Connected { details } => details,
            StatusNotice::Disconnected => "",
            StatusNotice::ProbeFailed { diagnostic } => diagnostic,
        }
    }
}

/// Holds the last recorded status and decides which samples warrant a notice.
///
/// Notices are edge-triggered: a sample only produces one when it differs from the
/// recorded status. The first Unknown -> Disconnected observation is recorded silently.
/// Failed probes degrade the recorded status to Disconnected without a transition notice;
/// unparseable output additionally yields a diagnostic notice once per distinct failure.
#[derive(Debug, Default)]
pub struct StatusTracker {
    recorded: ConnectionStatus,
    last_failure: Option<String>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.recorded
    }

    /// Records one probe outcome, returning the notice it triggers, if any.
    pub fn observe(&mut self, outcome: &ProbeResult) -> Option<StatusNotice> {
        match outcome {
            Ok(reading) => {
                self.last_failure = None;
                self.record(reading)
            }
            Err(e @ ProbeError::ParseFailure { .. }) => {
                self.recorded = ConnectionStatus::Disconnected;
                let diagnostic = e.to_string();
                if self.last_failure.as_deref() == Some(diagnostic.as_str()) {
                    return None;
                }
                warn!("{diagnostic}");
                self.last_failure = Some(diagnostic.clone());
                Some(StatusNotice::ProbeFailed { diagnostic })
            }
            Err(e) => {
                debug!("Status probe failed, assuming disconnected: {e}");
                self.recorded = ConnectionStatus::Disconnected;
                self.last_failure = None;
                None
            }
        }
    }

    fn record(&mut self, reading: &StatusReading) -> Option<StatusNotice> {
        if reading.status == self.recorded {
            return None;
        }

        let previous = std::mem::replace(&mut self.recorded, reading.status);
        debug!("Status changed: {previous} -> {}", reading.status);

        match (previous, reading.status) {
            (ConnectionStatus::Unknown, ConnectionStatus::Disconnected) => None,
            (_, ConnectionStatus::Connected) => Some(StatusNotice::Connected {
                details: reading.details.clone(),
            }),
            (_, ConnectionStatus::Disconnected) => Some(StatusNotice::Disconnected),
            (_, ConnectionStatus::Unknown) => None,
        }
    }
}
