use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::applet::AppletEvent;
use crate::poll::PollLoop;
use crate::status::{ProbeResult, StatusProbe};
use crate::utils::command::{CommandOutput, CommandRunner, Invocation};
use crate::vpn::{CommandSet, ConnectTarget, VpnCommand};
use crate::Result;

/// A user request that results in background work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Connect(ConnectTarget),
    Disconnect,
    Reconnect,
    CheckStatus,
    ShowVersion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Connect,
    Disconnect,
    Reconnect,
    CheckStatus,
    ShowVersion,
}

impl ActionKind {
    /// Exclusive kinds never have two actions in flight at once.
    pub fn is_exclusive(&self) -> bool {
        matches!(self, ActionKind::Connect)
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Connect(_) => ActionKind::Connect,
            Action::Disconnect => ActionKind::Disconnect,
            Action::Reconnect => ActionKind::Reconnect,
            Action::CheckStatus => ActionKind::CheckStatus,
            Action::ShowVersion => ActionKind::ShowVersion,
        }
    }

    /// The client command run for this action. Status checks go through the probe instead.
    fn command(&self) -> Option<VpnCommand> {
        match self {
            Action::Connect(target) => Some(VpnCommand::Connect(target.clone())),
            Action::Disconnect => Some(VpnCommand::Disconnect),
            Action::Reconnect => Some(VpnCommand::Reconnect),
            Action::CheckStatus => None,
            Action::ShowVersion => Some(VpnCommand::Version),
        }
    }

    /// Whether the status is sampled once after the command has run.
    fn probes_after(&self) -> bool {
        matches!(
            self,
            Action::Disconnect | Action::Reconnect | Action::CheckStatus
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Connect(target) => write!(f, "connect to {target}"),
            Action::Disconnect => f.write_str("disconnect"),
            Action::Reconnect => f.write_str("reconnect"),
            Action::CheckStatus => f.write_str("status check"),
            Action::ShowVersion => f.write_str("version query"),
        }
    }
}

/// The result of one dispatched action, delivered as `AppletEvent::ActionFinished`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionReport {
    pub action: Action,
    /// The client command line, if the action ran one
    pub invocation: Option<Invocation>,
    /// Output of that command
    pub output: Option<CommandOutput>,
    /// The status sampled after the command, if the action samples one
    pub probe: Option<ProbeResult>,
}

/// Runs user actions on background tasks.
pub struct ActionDispatcher {
    runner: Arc<dyn CommandRunner>,
    probe: Arc<dyn StatusProbe>,
    commands: CommandSet,
    events: UnboundedSender<AppletEvent>,
    in_flight: HashSet<ActionKind>,
}

impl ActionDispatcher {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        probe: Arc<dyn StatusProbe>,
        commands: CommandSet,
        events: UnboundedSender<AppletEvent>,
    ) -> Self {
        Self {
            runner,
            probe,
            commands,
            events,
            in_flight: HashSet::new(),
        }
    }

    /// Starts `action` on a background task.
    ///
    /// Connect actions stop `poll` first; restarting it is left to whoever handles the
    /// report. Returns `Ok(false)` if an exclusive action of the same kind is still in
    /// flight.
    ///
    /// ### Arguments
    /// - `action` - the action to run
    /// - `poll` - the poll loop paused by connect actions
    pub fn dispatch(&mut self, action: Action, poll: &mut PollLoop) -> Result<bool> {
        let kind = action.kind();
        let invocation = action
            .command()
            .map(|command| self.commands.invocation(&command))
            .transpose()?;

        if self.in_flight.contains(&kind) {
            warn!("Ignoring {action}: a previous {kind:?} action is still running");
            return Ok(false);
        }

        if kind == ActionKind::Connect {
            poll.stop();
        }

        info!("Starting {action}");
        if kind.is_exclusive() {
            self.in_flight.insert(kind);
        }
        tokio::spawn(run_action(
            action,
            invocation,
            self.runner.clone(),
            self.probe.clone(),
            self.events.clone(),
        ));

        Ok(true)
    }

    /// Marks the action kind as finished. Returns `false` if it was not in flight.
    pub fn complete(&mut self, kind: ActionKind) -> bool {
        self.in_flight.remove(&kind)
    }

    pub fn is_in_flight(&self, kind: ActionKind) -> bool {
        self.in_flight.contains(&kind)
    }
}

async fn run_action(
    action: Action,
    invocation: Option<Invocation>,
    runner: Arc<dyn CommandRunner>,
    probe: Arc<dyn StatusProbe>,
    events: UnboundedSender<AppletEvent>,
) {
    let output = match &invocation {
        Some(invocation) => Some(runner.run(invocation).await),
        None => None,
    };

    let probe = if action.probes_after() {
        Some(probe.probe().await)
    } else {
        None
    };

    let report = ActionReport {
        action,
        invocation,
        output,
        probe,
    };

    if events.send(AppletEvent::ActionFinished(report)).is_err() {
        debug!("Applet event channel closed before the action finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{ConnectionStatus, StatusReading};
    use crate::utils::privilege::Elevation;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct RecordingRunner {
        invocations: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, invocation: &Invocation) -> CommandOutput {
            self.invocations
                .lock()
                .unwrap()
                .push(invocation.to_string());
            CommandOutput::success("ok")
        }
    }

    struct FixedProbe;

    #[async_trait]
    impl StatusProbe for FixedProbe {
        async fn probe(&self) -> ProbeResult {
            Ok(StatusReading::new(
                ConnectionStatus::Disconnected,
                "Status: Disconnected",
            ))
        }
    }

    fn setup() -> (
        ActionDispatcher,
        PollLoop,
        Arc<RecordingRunner>,
        mpsc::UnboundedReceiver<AppletEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = Arc::new(RecordingRunner::default());
        let probe: Arc<dyn StatusProbe> = Arc::new(FixedProbe);
        let dispatcher = ActionDispatcher::new(
            runner.clone(),
            probe.clone(),
            CommandSet::new("protonvpn", Elevation::Sudo),
            tx.clone(),
        );
        let poll = PollLoop::new(probe, Duration::from_secs(1), tx);

        (dispatcher, poll, runner, rx)
    }

    async fn next_report(rx: &mut mpsc::UnboundedReceiver<AppletEvent>) -> ActionReport {
        loop {
            match rx.recv().await.expect("channel open") {
                AppletEvent::ActionFinished(report) => return report,
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn disconnect_runs_command_then_probes() {
        let (mut dispatcher, mut poll, runner, mut rx) = setup();

        assert!(dispatcher.dispatch(Action::Disconnect, &mut poll).unwrap());
        let report = next_report(&mut rx).await;

        assert_eq!(report.action, Action::Disconnect);
        assert_eq!(report.output, Some(CommandOutput::success("ok")));
        assert!(matches!(report.probe, Some(Ok(_))));
        assert_eq!(*runner.invocations.lock().unwrap(), vec!["sudo protonvpn d"]);
    }

    #[tokio::test]
    async fn check_status_only_probes() {
        let (mut dispatcher, mut poll, runner, mut rx) = setup();

        dispatcher.dispatch(Action::CheckStatus, &mut poll).unwrap();
        let report = next_report(&mut rx).await;

        assert_eq!(report.output, None);
        assert!(report.probe.is_some());
        assert!(runner.invocations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn connect_stops_polling_and_ignores_duplicates() {
        let (mut dispatcher, mut poll, _runner, mut rx) = setup();
        poll.start();

        assert!(dispatcher
            .dispatch(Action::Connect(ConnectTarget::Fastest), &mut poll)
            .unwrap());
        assert!(!poll.is_running());
        assert!(dispatcher.is_in_flight(ActionKind::Connect));

        assert!(!dispatcher
            .dispatch(Action::Connect(ConnectTarget::Tor), &mut poll)
            .unwrap());

        let report = next_report(&mut rx).await;
        assert_eq!(report.action, Action::Connect(ConnectTarget::Fastest));
        assert_eq!(report.probe, None);
        assert!(dispatcher.complete(ActionKind::Connect));
        assert!(!dispatcher.is_in_flight(ActionKind::Connect));
    }

    #[tokio::test]
    async fn invalid_country_is_rejected_before_polling_stops() {
        let (mut dispatcher, mut poll, runner, _rx) = setup();
        poll.start();

        let result = dispatcher.dispatch(
            Action::Connect(ConnectTarget::Country("switzerland".into())),
            &mut poll,
        );

        assert!(result.is_err());
        assert!(poll.is_running());
        assert!(!dispatcher.is_in_flight(ActionKind::Connect));
        assert!(runner.invocations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_checks_run_side_by_side() {
        let (mut dispatcher, mut poll, _runner, mut rx) = setup();

        assert!(dispatcher.dispatch(Action::CheckStatus, &mut poll).unwrap());
        assert!(dispatcher.dispatch(Action::CheckStatus, &mut poll).unwrap());
        assert!(!dispatcher.is_in_flight(ActionKind::CheckStatus));

        assert_eq!(next_report(&mut rx).await.action, Action::CheckStatus);
        assert_eq!(next_report(&mut rx).await.action, Action::CheckStatus);
        assert!(!dispatcher.complete(ActionKind::CheckStatus));
    }
}
