//! Shared application state.
//!
//! `CoreState` owns the store, the notification dispatcher and the two
//! lifecycle services built on them. It is wrapped in `Arc` at startup and
//! handed to the HTTP layer.

use std::sync::Arc;

use thiserror::Error;

use crate::config::{ServiceConfig, StoreKind};
use crate::db::{self, AppointmentStore, InMemoryAppointmentStore, SqliteAppointmentStore};
use crate::lifecycle::{AppointmentService, ResultProcessor};
use crate::notify::{LogDispatcher, NotificationDispatcher, WebhookDispatcher};

pub struct CoreState {
    pub config: ServiceConfig,
    pub store: Arc<dyn AppointmentStore>,
    pub results: ResultProcessor,
    pub appointments: AppointmentService,
}

impl CoreState {
    /// Wire store and dispatcher from configuration.
    ///
    /// Must be called inside a tokio runtime when a webhook URL is set (the
    /// delivery task is spawned here).
    pub fn from_config(config: ServiceConfig) -> Result<Self, CoreError> {
        let store: Arc<dyn AppointmentStore> = match &config.store {
            StoreKind::Sqlite(path) => {
                tracing::info!(path = %path.display(), "Opening SQLite appointment store");
                Arc::new(SqliteAppointmentStore::open(path)?)
            }
            StoreKind::Memory => {
                tracing::warn!("Using in-memory appointment store; data is lost on exit");
                Arc::new(InMemoryAppointmentStore::new())
            }
        };

        let notifier: Arc<dyn NotificationDispatcher> = match &config.notify_webhook_url {
            Some(url) => {
                tracing::info!(url = %url, "Delivering notifications to webhook");
                Arc::new(WebhookDispatcher::spawn(
                    url.clone(),
                    config.notify_queue_capacity,
                ))
            }
            None => Arc::new(LogDispatcher),
        };

        Ok(Self::with_parts(config, store, notifier))
    }

    pub fn with_parts(
        config: ServiceConfig,
        store: Arc<dyn AppointmentStore>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        let results = ResultProcessor::new(
            store.clone(),
            notifier.clone(),
            config.conflict_retries,
            config.max_batch_size,
        );
        let appointments = AppointmentService::new(store.clone(), notifier, config.conflict_retries);
        Self {
            config,
            store,
            results,
            appointments,
        }
    }

    /// In-memory state for tests, with the given dispatcher.
    #[cfg(test)]
    pub fn for_tests(notifier: Arc<dyn NotificationDispatcher>) -> Self {
        Self::with_parts(
            ServiceConfig::default(),
            Arc::new(InMemoryAppointmentStore::new()),
            notifier,
        )
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}
