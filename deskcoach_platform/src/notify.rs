//! `NotificationSink` implementations: a recording dry-run sink for tests
//! and `--dry-run` mode, and a real desktop notifier behind the
//! `desktop-notify` feature.
use std::sync::Mutex;

use deskcoach_traits::{NotificationAction, NotificationSink};

/// One recorded delivery, for assertions and for `deskcoach_cli`'s
/// `--dry-run` transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedNotification {
    pub title: String,
    pub message: String,
    pub actions: Vec<NotificationAction>,
}

/// Records deliveries instead of showing them. Default sink when
/// `dry_run=true` (§4.J) or when no desktop notifier is available.
#[derive(Debug, Default)]
pub struct DryRunNotifier {
    delivered: Mutex<Vec<RecordedNotification>>,
}

impl DryRunNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<RecordedNotification> {
        self.delivered.lock().expect("dry-run notifier mutex poisoned").clone()
    }
}

impl NotificationSink for DryRunNotifier {
    fn notify(
        &mut self,
        title: &str,
        message: &str,
        actions: &[NotificationAction],
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(title, message, "dry-run notification");
        self.delivered
            .lock()
            .expect("dry-run notifier mutex poisoned")
            .push(RecordedNotification {
                title: title.to_string(),
                message: message.to_string(),
                actions: actions.to_vec(),
            });
        Ok(true)
    }
}

#[cfg(feature = "desktop-notify")]
pub use desktop::DesktopNotifier;

#[cfg(feature = "desktop-notify")]
mod desktop {
    use deskcoach_traits::{NotificationAction, NotificationSink};
    use notify_rust::Notification;

    /// Real OS notification delivery via `notify-rust`. Action buttons are
    /// best-effort: platforms without action support simply show the
    /// title/message.
    #[derive(Debug, Default)]
    pub struct DesktopNotifier;

    impl DesktopNotifier {
        pub fn new() -> Self {
            Self
        }
    }

    impl NotificationSink for DesktopNotifier {
        fn notify(
            &mut self,
            title: &str,
            message: &str,
            actions: &[NotificationAction],
        ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
            let mut notification = Notification::new();
            notification.summary(title).body(message);
            for action in actions {
                notification.action(&action.id, &action.label);
            }
            match notification.show() {
                Ok(_) => Ok(true),
                Err(e) => {
                    tracing::warn!(error = %e, "desktop notification delivery failed");
                    Ok(false)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_records_deliveries() {
        let mut sink = DryRunNotifier::new();
        sink.notify("Posture check", "msg", &[]).unwrap();
        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].title, "Posture check");
    }
}
