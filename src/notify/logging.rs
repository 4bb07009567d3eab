use super::{NotificationDispatcher, NotificationEvent, NotifyError};

/// Writes each event as a structured log line. Default sink when no
/// webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

impl NotificationDispatcher for LogDispatcher {
    fn notify(&self, appointment_id: &str, event: &NotificationEvent) -> Result<(), NotifyError> {
        tracing::info!(
            appointment_id,
            event = event.name(),
            detail = ?event,
            "Appointment notification"
        );
        Ok(())
    }
}
