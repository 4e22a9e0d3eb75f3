//! Notification publishing for the medication tracker.
//!
//! Publishing is fire-and-forget: callers hand an event to a `Notifier` and never wait on,
//! or fail because of, delivery.

mod channel;
mod event;
mod sink;

use async_trait::async_trait;

pub use channel::ChannelNotifier;
pub use event::{MedEvent, Notification};
pub use sink::{JsonlSink, MemorySink, NotificationSink, TracingSink};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notifier closed")]
    Closed,
    #[error("sink error: {0}")]
    Sink(String),
}

/// Accepts events for asynchronous delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: MedEvent) -> Result<(), NotifyError>;
}

/// Drops every event. For callers that do not want notifications.
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _event: MedEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}
