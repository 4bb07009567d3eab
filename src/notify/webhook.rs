//! Fire-and-forget webhook sink.
//!
//! `notify` only enqueues onto a bounded channel; a background tokio task
//! drains it and POSTs each event as JSON. Delivery failures are logged by
//! the worker and never reach the lifecycle layer.

use serde::Serialize;
use tokio::sync::mpsc;

use super::{NotificationDispatcher, NotificationEvent, NotifyError};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload {
    appointment_id: String,
    #[serde(flatten)]
    event: NotificationEvent,
}

pub struct WebhookDispatcher {
    tx: mpsc::Sender<WebhookPayload>,
}

impl WebhookDispatcher {
    /// Spawn the delivery worker. Must be called inside a tokio runtime.
    pub fn spawn(url: String, queue_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let client = reqwest::Client::new();
        tokio::spawn(deliver(client, url, rx));
        Self { tx }
    }
}

impl NotificationDispatcher for WebhookDispatcher {
    fn notify(&self, appointment_id: &str, event: &NotificationEvent) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            appointment_id: appointment_id.to_string(),
            event: event.clone(),
        };
        self.tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotifyError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => NotifyError::Closed,
        })
    }
}

async fn deliver(client: reqwest::Client, url: String, mut rx: mpsc::Receiver<WebhookPayload>) {
    tracing::info!(%url, "Notification webhook worker started");

    while let Some(payload) = rx.recv().await {
        let outcome = client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        match outcome {
            Ok(resp) => tracing::debug!(
                appointment_id = %payload.appointment_id,
                event = payload.event.name(),
                status = resp.status().as_u16(),
                "Notification delivered"
            ),
            Err(e) => tracing::warn!(
                appointment_id = %payload.appointment_id,
                event = payload.event.name(),
                error = %e,
                "Notification delivery failed"
            ),
        }
    }

    tracing::info!("Notification webhook worker stopped");
}
