//! The applet context: single owner of the status, the poll loop and the user-facing sinks.
//!
//! Background work (polling, dispatched actions) never touches this state directly. It
//! reports back through `AppletEvent`s which are applied one at a time by `Applet::run`.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::constants::{APPLET_HOMEPAGE, APPLET_NAME, APPLET_VERSION};
use crate::dispatch::{Action, ActionDispatcher, ActionKind, ActionReport};
use crate::poll::PollLoop;
use crate::status::{ConnectionStatus, ProbeResult, StatusProbe, StatusTracker};
use crate::utils::command::CommandRunner;
use crate::vpn::{CommandSet, ConnectTarget};
use crate::Result;

/// Shows desktop notifications. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, summary: &str, body: &str);
}

/// Renders the applet state, e.g. as a tray icon.
pub trait StatusView: Send {
    fn show_status(&self, status: ConnectionStatus);
    fn show_notifications_enabled(&self, enabled: bool);
}

/// A request coming from the tray menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAction {
    Run(Action),
    ToggleNotifications,
    AboutApplet,
    Quit,
}

/// Everything the applet context reacts to.
#[derive(Debug)]
pub enum AppletEvent {
    User(UserAction),
    Probed(ProbeResult),
    ActionFinished(ActionReport),
}

/// Building blocks of an `Applet`.
pub struct AppletParts {
    pub runner: Arc<dyn CommandRunner>,
    pub probe: Arc<dyn StatusProbe>,
    pub commands: CommandSet,
    pub poll_interval: Duration,
    pub notifier: Box<dyn Notifier>,
    pub view: Box<dyn StatusView>,
    pub notifications_enabled: bool,
}

pub struct Applet {
    tracker: StatusTracker,
    poll: PollLoop,
    dispatcher: ActionDispatcher,
    notifier: Box<dyn Notifier>,
    view: Box<dyn StatusView>,
    notifications_enabled: bool,
}

impl Applet {
    /// Creates a new applet context.
    ///
    /// ### Arguments
    /// - `parts` - the applet's collaborators
    /// - `events` - sender half of the channel later passed to `run`
    pub fn new(parts: AppletParts, events: UnboundedSender<AppletEvent>) -> Self {
        let poll = PollLoop::new(parts.probe.clone(), parts.poll_interval, events.clone());
        let dispatcher =
            ActionDispatcher::new(parts.runner, parts.probe, parts.commands, events);

        Self {
            tracker: StatusTracker::new(),
            poll,
            dispatcher,
            notifier: parts.notifier,
            view: parts.view,
            notifications_enabled: parts.notifications_enabled,
        }
    }

    /// Renders the initial state and starts polling.
    pub fn start(&mut self) {
        self.view.show_status(self.tracker.status());
        self.view
            .show_notifications_enabled(self.notifications_enabled);
        self.poll.start();
    }

    /// Processes events until the user quits, the channel closes or Ctrl-C is received.
    ///
    /// ### Arguments
    /// - `events` - receiver half of the channel given to `new`
    pub async fn run(mut self, mut events: UnboundedReceiver<AppletEvent>) -> Result<()> {
        self.start();

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("Applet event channel closed");
                        break;
                    };
                    if self.handle_event(event).is_break() {
                        break;
                    }
                }
                signal = &mut shutdown => {
                    signal?;
                    info!("Received interrupt, shutting down");
                    break;
                }
            }
        }

        self.poll.stop();
        info!("{APPLET_NAME} stopped");

        Ok(())
    }

    /// Applies one event to the applet state.
    pub fn handle_event(&mut self, event: AppletEvent) -> ControlFlow<()> {
        match event {
            AppletEvent::User(action) => return self.handle_user_action(action),
            AppletEvent::Probed(outcome) => {
                if self.poll.is_running() {
                    self.apply_probe(&outcome, false);
                } else {
                    debug!("Dropping status sample delivered after polling stopped");
                }
            }
            AppletEvent::ActionFinished(report) => self.finish_action(report),
        }

        ControlFlow::Continue(())
    }

    fn handle_user_action(&mut self, action: UserAction) -> ControlFlow<()> {
        match action {
            UserAction::Run(action) => {
                self.dispatch(action);
            }
            UserAction::ToggleNotifications => {
                self.toggle_notifications();
            }
            UserAction::AboutApplet => self.about_applet(),
            UserAction::Quit => {
                info!("Exit requested");
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }

    /// Dispatches `action`, logging rejected requests. Returns whether it was started.
    pub fn dispatch(&mut self, action: Action) -> bool {
        let description = action.to_string();
        match self.dispatcher.dispatch(action, &mut self.poll) {
            Ok(started) => started,
            Err(e) => {
                warn!("Rejected {description}: {e}");
                false
            }
        }
    }

    pub fn connect_fastest(&mut self) -> bool {
        self.dispatch(Action::Connect(ConnectTarget::Fastest))
    }

    pub fn connect_country(&mut self, code: &str) -> bool {
        self.dispatch(Action::Connect(ConnectTarget::Country(code.to_string())))
    }

    pub fn connect_random(&mut self) -> bool {
        self.dispatch(Action::Connect(ConnectTarget::Random))
    }

    pub fn connect_secure_core(&mut self) -> bool {
        self.dispatch(Action::Connect(ConnectTarget::SecureCore))
    }

    pub fn connect_p2p(&mut self) -> bool {
        self.dispatch(Action::Connect(ConnectTarget::P2p))
    }

    pub fn connect_tor(&mut self) -> bool {
        self.dispatch(Action::Connect(ConnectTarget::Tor))
    }

    pub fn disconnect(&mut self) -> bool {
        self.dispatch(Action::Disconnect)
    }

    pub fn reconnect(&mut self) -> bool {
        self.dispatch(Action::Reconnect)
    }

    pub fn check_status(&mut self) -> bool {
        self.dispatch(Action::CheckStatus)
    }

    pub fn show_vpn_version(&mut self) -> bool {
        self.dispatch(Action::ShowVersion)
    }

    /// Flips the notification setting, returning the new value.
    pub fn toggle_notifications(&mut self) -> bool {
        self.notifications_enabled = !self.notifications_enabled;
        self.view
            .show_notifications_enabled(self.notifications_enabled);
        info!(
            "Status notifications {}",
            if self.notifications_enabled {
                "enabled"
            } else {
                "disabled"
            }
        );

        self.notifications_enabled
    }

    pub fn about_applet(&self) {
        self.notifier.notify(
            APPLET_NAME,
            &format!("Version {APPLET_VERSION}\n{APPLET_HOMEPAGE}"),
        );
    }

    pub fn status(&self) -> ConnectionStatus {
        self.tracker.status()
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_running()
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    fn finish_action(&mut self, report: ActionReport) {
        let kind = report.action.kind();
        self.dispatcher.complete(kind);

        if let (Some(invocation), Some(output)) = (&report.invocation, report.output) {
            match output.check(invocation) {
                Ok(output) => {
                    info!("Finished {}", report.action);
                    if kind == ActionKind::ShowVersion {
                        self.notifier.notify("ProtonVPN", output.stdout.trim());
                    } else {
                        debug!("{invocation}: {}", output.stdout.trim());
                    }
                }
                Err(e) => {
                    warn!("{} failed: {e}", report.action);
                    if kind == ActionKind::ShowVersion {
                        self.notifier.notify("ProtonVPN", "Version unavailable");
                    }
                }
            }
        }

        if kind == ActionKind::Connect {
            self.poll.start();
        }

        if let Some(outcome) = report.probe {
            self.apply_probe(&outcome, kind == ActionKind::CheckStatus);
        }
    }

    fn apply_probe(&mut self, outcome: &ProbeResult, explicit: bool) {
        if explicit {
            match outcome {
                Ok(reading) => info!("VPN status:\n{}", reading.details),
                Err(e) => warn!("VPN status check failed: {e}"),
            }
        }

        let previous = self.tracker.status();
        let notice = self.tracker.observe(outcome);

        if self.tracker.status() != previous {
            self.view.show_status(self.tracker.status());
        }

        if let Some(notice) = notice {
            info!("{}", notice.summary());
            if self.notifications_enabled {
                self.notifier.notify(notice.summary(), notice.body());
            }
        }
    }
}
