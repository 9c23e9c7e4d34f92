use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::applet::AppletEvent;
use crate::status::StatusProbe;

/// Lifecycle of the sampling task.
#[derive(Debug, Default)]
enum PollState {
    #[default]
    Stopped,
    Running(CancellationToken),
}

/// Periodically samples a `StatusProbe` on a background task.
///
/// Samples are sent to the applet context as `AppletEvent::Probed`. Stopping is cooperative:
/// the task notices the cancellation at its next suspension point, and any sample taken
/// after that is dropped instead of delivered.
pub struct PollLoop {
    probe: Arc<dyn StatusProbe>,
    interval: Duration,
    events: UnboundedSender<AppletEvent>,
    state: PollState,
}

impl PollLoop {
    /// Creates a new, stopped poll loop.
    ///
    /// ### Arguments
    /// - `probe` - the status source to sample
    /// - `interval` - the time between two samples
    /// - `events` - the channel samples are delivered on
    pub fn new(
        probe: Arc<dyn StatusProbe>,
        interval: Duration,
        events: UnboundedSender<AppletEvent>,
    ) -> Self {
        Self {
            probe,
            interval,
            events,
            state: PollState::Stopped,
        }
    }

    /// Starts sampling. Returns `false` if the loop was already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }

        let token = CancellationToken::new();
        tokio::spawn(sample_loop(
            self.probe.clone(),
            self.interval,
            self.events.clone(),
            token.clone(),
        ));
        self.state = PollState::Running(token);

        debug!("Status polling started ({:?} interval)", self.interval);
        true
    }

    /// Stops sampling. Returns `false` if the loop was not running.
    pub fn stop(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            PollState::Running(token) => {
                token.cancel();
                debug!("Status polling stopped");
                true
            }
            PollState::Stopped => false,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, PollState::Running(_))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sample_loop(
    probe: Arc<dyn StatusProbe>,
    interval: Duration,
    events: UnboundedSender<AppletEvent>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            outcome = probe.probe() => outcome,
        };

        if token.is_cancelled() {
            break;
        }

        if events.send(AppletEvent::Probed(outcome)).is_err() {
            info!("Applet event channel closed, stopping status polling");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{ConnectionStatus, ProbeResult, StatusReading};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct CountingProbe {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StatusProbe for CountingProbe {
        async fn probe(&self) -> ProbeResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StatusReading::new(ConnectionStatus::Connected, "Status: Connected"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn samples_immediately_then_on_interval() {
        let probe = Arc::new(CountingProbe {
            calls: AtomicUsize::new(0),
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poll = PollLoop::new(probe.clone(), Duration::from_secs(1), tx);

        assert!(poll.start());
        assert!(!poll.start());

        for _ in 0..3 {
            assert!(matches!(rx.recv().await, Some(AppletEvent::Probed(Ok(_)))));
        }
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_sampling() {
        let probe = Arc::new(CountingProbe {
            calls: AtomicUsize::new(0),
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poll = PollLoop::new(probe.clone(), Duration::from_secs(1), tx);

        poll.start();
        assert!(rx.recv().await.is_some());

        assert!(poll.stop());
        assert!(!poll.stop());
        assert!(!poll.is_running());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());
    }
}
