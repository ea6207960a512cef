//! Notification sink seam.
//!
//! The executor decides whether to notify; the sink is where the
//! messaging collaborator plugs in. Delivery is out of scope, so the
//! built-in sinks only record the decision.

use tracing::info;

use crate::domain::notification::NotificationDecision;

/// Receives notification decisions after successful transitions.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, decision: &NotificationDecision);
}

/// Sink that writes decisions to the log. Default for the CLI.
#[derive(Debug, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, decision: &NotificationDecision) {
        info!(
            record_id = %decision.record_id,
            notify_student = decision.notify_student,
            notify_admin = decision.notify_admin,
            summary = %decision.transition_summary,
            "notification decision"
        );
    }
}

/// Sink that drops decisions.
#[derive(Debug, Default)]
pub struct NullNotificationSink;

impl NotificationSink for NullNotificationSink {
    fn notify(&self, _decision: &NotificationDecision) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sink_accepts_decisions() {
        let sink = LogNotificationSink;
        sink.notify(&NotificationDecision::none("rec-1", "moved"));
    }

    #[test]
    fn test_null_sink_accepts_decisions() {
        let sink = NullNotificationSink;
        sink.notify(&NotificationDecision::none("rec-1", "moved"));
    }
}
