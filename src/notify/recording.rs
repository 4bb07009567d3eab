use std::sync::Mutex;

use super::{NotificationDispatcher, NotificationEvent, NotifyError};

/// Keeps every dispatched event in memory. Used by tests to assert on
/// exactly-once dispatch; can be switched to fail every call.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<(String, NotificationEvent)>>,
    failing: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher whose every `notify` call errors (nothing is recorded).
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn events(&self) -> Vec<(String, NotificationEvent)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn events_for(&self, appointment_id: &str) -> Vec<NotificationEvent> {
        self.events()
            .into_iter()
            .filter(|(id, _)| id == appointment_id)
            .map(|(_, event)| event)
            .collect()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn notify(&self, appointment_id: &str, event: &NotificationEvent) -> Result<(), NotifyError> {
        if self.failing {
            return Err(NotifyError::Sink("recording dispatcher set to fail".into()));
        }
        self.events
            .lock()
            .map_err(|_| NotifyError::Sink("recording lock poisoned".into()))?
            .push((appointment_id.to_string(), event.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestResult;

    #[test]
    fn records_in_order() {
        let dispatcher = RecordingDispatcher::new();
        let event = NotificationEvent::ResultReady {
            result: TestResult::Negative,
        };
        dispatcher.notify("a-1", &event).unwrap();
        dispatcher.notify("a-2", &event).unwrap();

        let events = dispatcher.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, "a-1");
        assert_eq!(dispatcher.events_for("a-2"), vec![event]);
    }

    #[test]
    fn failing_dispatcher_records_nothing() {
        let dispatcher = RecordingDispatcher::failing();
        let event = NotificationEvent::ResultReady {
            result: TestResult::Positive,
        };
        assert!(dispatcher.notify("a-1", &event).is_err());
        assert!(dispatcher.events().is_empty());
    }
}
