use notify_rust::Notification;
use tracing::{debug, warn};

use protontray::applet::Notifier;
use protontray::constants::APPLET_NAME;

/// Freedesktop notifications, shown from the blocking pool.
#[derive(Clone, Debug, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, summary: &str, body: &str) {
        debug!("Notification: {summary}");

        let mut notification = Notification::new();
        notification.appname(APPLET_NAME).summary(summary).body(body);

        tokio::task::spawn_blocking(move || {
            if let Err(e) = notification.show() {
                warn!("Failed to show notification: {e}");
            }
        });
    }
}
