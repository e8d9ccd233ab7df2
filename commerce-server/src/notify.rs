//! Notification emission
//!
//! Fire-and-forget delivery through an mpsc worker: the core
//! transaction never blocks on, or fails because of, the notification
//! channel. A full queue or a dead worker is logged and the message
//! dropped.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Outbound notification
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Merchant confirmed payment for an order
    OrderPaid {
        workspace_id: i64,
        order_number: String,
        total: Decimal,
        currency: String,
    },
    /// Direct message to the workspace admin, used for orders sourced
    /// from a chat channel
    AdminDirectMessage { workspace_id: i64, text: String },
}

#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Delivery backend (chat app, webhook dispatcher, ...)
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Cloneable handle held by the service
#[derive(Clone)]
pub struct NotificationSender {
    tx: Option<mpsc::Sender<Notification>>,
}

impl NotificationSender {
    /// Handle with no worker behind it; every send is a logged no-op
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Enqueue without blocking. Never an error for the caller.
    pub fn send(&self, notification: Notification) {
        let Some(tx) = &self.tx else {
            tracing::debug!(?notification, "notifications disabled, dropping");
            return;
        };
        if let Err(e) = tx.try_send(notification) {
            tracing::warn!(error = %e, "notification queue unavailable, dropping message");
        }
    }
}

/// Create the channel and its sender handle
pub fn channel(capacity: usize) -> (NotificationSender, mpsc::Receiver<Notification>) {
    let (tx, rx) = mpsc::channel(capacity);
    (NotificationSender { tx: Some(tx) }, rx)
}

/// Background worker consuming the notification channel
pub struct NotificationWorker {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationWorker {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Run until the channel closes
    pub async fn run(self, mut rx: mpsc::Receiver<Notification>) {
        tracing::info!("notification worker started");
        while let Some(notification) = rx.recv().await {
            if let Err(e) = self.sink.deliver(&notification).await {
                tracing::error!(error = %e, "failed to deliver notification");
            }
        }
        tracing::info!("notification channel closed, worker stopping");
    }
}

/// Sink that records deliveries, for tests
#[derive(Default)]
pub struct MemorySink {
    delivered: parking_lot::Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut self.delivered.lock())
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.delivered.lock().push(notification.clone());
        Ok(())
    }
}
