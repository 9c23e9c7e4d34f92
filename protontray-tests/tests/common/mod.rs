#![allow(dead_code)]

use async_trait::async_trait;
use protontray::applet::{Applet, AppletEvent, AppletParts, Notifier, StatusView};
use protontray::error::{CommandError, ProbeError};
use protontray::status::{ConnectionStatus, ProbeResult, StatusProbe, StatusReading};
use protontray::utils::command::{CommandOutput, CommandRunner, Invocation};
use protontray::utils::privilege::Elevation;
use protontray::vpn::CommandSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;

/// Records every command line and answers with a fixed output.
pub struct FakeRunner {
    output: CommandOutput,
    invocations: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl FakeRunner {
    pub fn new(output: CommandOutput) -> Self {
        Self {
            output,
            invocations: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// A runner whose commands only finish once `gate` is notified.
    pub fn gated(output: CommandOutput, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(output)
        }
    }

    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation) -> CommandOutput {
        self.invocations
            .lock()
            .unwrap()
            .push(invocation.to_string());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.output.clone()
    }
}

/// Answers probes from a script, repeating the last entry once the script runs out.
pub struct ScriptedProbe {
    script: Mutex<VecDeque<ProbeResult>>,
    last: Mutex<ProbeResult>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(script: Vec<ProbeResult>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(reading(ConnectionStatus::Disconnected)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn statuses(statuses: &[ConnectionStatus]) -> Self {
        Self::new(statuses.iter().map(|status| reading(*status)).collect())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusProbe for ScriptedProbe {
    async fn probe(&self) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(next) = next {
            *last = next;
        }

        last.clone()
    }
}

pub fn reading(status: ConnectionStatus) -> ProbeResult {
    Ok(StatusReading::new(status, format!("Status: {status}")))
}

pub fn parse_failure(output: &str) -> ProbeResult {
    Err(ProbeError::ParseFailure {
        output: output.to_string(),
    })
}

pub fn spawn_failure() -> ProbeResult {
    Err(ProbeError::Command(CommandError::SpawnFailure {
        command: "sudo protonvpn s".to_string(),
        reason: "No such file or directory (os error 2)".to_string(),
    }))
}

/// Collects notifications and rendered states.
#[derive(Clone, Default)]
pub struct Recorder {
    notes: Arc<Mutex<Vec<(String, String)>>>,
    statuses: Arc<Mutex<Vec<ConnectionStatus>>>,
}

impl Recorder {
    pub fn notes(&self) -> Vec<(String, String)> {
        self.notes.lock().unwrap().clone()
    }

    pub fn summaries(&self) -> Vec<String> {
        self.notes().into_iter().map(|(summary, _)| summary).collect()
    }

    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.statuses.lock().unwrap().clone()
    }
}

impl Notifier for Recorder {
    fn notify(&self, summary: &str, body: &str) {
        self.notes
            .lock()
            .unwrap()
            .push((summary.to_string(), body.to_string()));
    }
}

impl StatusView for Recorder {
    fn show_status(&self, status: ConnectionStatus) {
        self.statuses.lock().unwrap().push(status);
    }

    fn show_notifications_enabled(&self, _enabled: bool) {}
}

pub struct Harness {
    pub applet: Applet,
    pub events: UnboundedReceiver<AppletEvent>,
    /// Stands in for the tray's sender
    pub sender: UnboundedSender<AppletEvent>,
    pub recorder: Recorder,
}

impl Harness {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        probe: Arc<dyn StatusProbe>,
        notifications_enabled: bool,
    ) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let recorder = Recorder::default();

        let applet = Applet::new(
            AppletParts {
                runner,
                probe,
                commands: CommandSet::new("protonvpn", Elevation::Sudo),
                poll_interval: Duration::from_secs(1),
                notifier: Box::new(recorder.clone()),
                view: Box::new(recorder.clone()),
                notifications_enabled,
            },
            tx.clone(),
        );

        Self {
            applet,
            events,
            sender: tx,
            recorder,
        }
    }

    /// Handles events until one dispatched action has finished.
    pub async fn settle_action(&mut self) {
        loop {
            let event = self.events.recv().await.expect("event channel open");
            let finished = matches!(event, AppletEvent::ActionFinished(_));
            let _ = self.applet.handle_event(event);
            if finished {
                return;
            }
        }
    }

    /// Handles events until `count` poll samples have been applied.
    pub async fn settle_samples(&mut self, count: usize) {
        let mut seen = 0;
        while seen < count {
            let event = self.events.recv().await.expect("event channel open");
            if matches!(event, AppletEvent::Probed(_)) {
                seen += 1;
            }
            let _ = self.applet.handle_event(event);
        }
    }
}
