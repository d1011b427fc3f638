//! Notifications rendered on the terminal

use prompt_gallery_core::notify::{Notification, Notifier, Severity};
use tracing::debug;

/// Prints each notification to stderr as `[severity] summary: detail`
pub struct TerminalNotifier;

impl TerminalNotifier {
    fn render(notification: &Notification) -> String {
        let label = match notification.severity {
            Severity::Success => "ok",
            Severity::Info => "info",
            Severity::Warning => "warn",
            Severity::Error => "error",
        };
        if notification.detail.is_empty() {
            format!("[{label}] {}", notification.summary)
        } else {
            format!("[{label}] {}: {}", notification.summary, notification.detail)
        }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        debug!(severity = %notification.severity, "notification: {}", notification.summary);
        eprintln!("{}", Self::render(&notification));
    }
}
