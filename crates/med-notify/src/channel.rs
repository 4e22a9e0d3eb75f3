//! Channel notifier: one unbounded queue drained by a single worker task.

use crate::{MedEvent, NotificationSink, Notification, Notifier, NotifyError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Queues events and delivers them to a sink from a background worker, so publishing never
/// waits on delivery. Delivery failures are logged and dropped.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Create the notifier and spawn its worker. Must be called inside a tokio runtime.
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
        tokio::spawn(async move {
            while let Some(n) = rx.recv().await {
                match sink.deliver(&n).await {
                    Ok(()) => {
                        tracing::debug!(event_id = %n.event_id, kind = n.event.kind(), "delivered")
                    }
                    Err(e) => tracing::warn!(
                        event_id = %n.event_id,
                        kind = n.event.kind(),
                        error = %e,
                        "notification delivery failed"
                    ),
                }
            }
        });
        Self { tx }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, event: MedEvent) -> Result<(), NotifyError> {
        self.tx
            .send(Notification::new(event))
            .map_err(|_| NotifyError::Closed)
    }
}
