//! Delivery targets for notifications.

use crate::{Notification, NotifyError};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

/// Where the notifier worker hands each notification.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes each notification as a structured log line.
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn deliver(&self, n: &Notification) -> Result<(), NotifyError> {
        let payload =
            serde_json::to_string(&n.event).map_err(|e| NotifyError::Sink(e.to_string()))?;
        tracing::info!(
            event_id = %n.event_id,
            kind = n.event.kind(),
            program_id = n.event.program_id(),
            %payload,
            "notification"
        );
        Ok(())
    }
}

/// Keeps delivered notifications in memory (process lifetime only).
pub struct MemorySink {
    delivered: tokio::sync::RwLock<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            delivered: tokio::sync::RwLock::new(Vec::new()),
        }
    }

    pub async fn snapshot(&self) -> Vec<Notification> {
        self.delivered.read().await.clone()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn deliver(&self, n: &Notification) -> Result<(), NotifyError> {
        self.delivered.write().await.push(n.clone());
        Ok(())
    }
}

/// Appends notifications to a JSONL file for downstream consumers.
pub struct JsonlSink {
    path: std::path::PathBuf,
    append_lock: tokio::sync::Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl AsRef<std::path::Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            append_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Read back every notification in the file. Unparseable lines are skipped.
    pub async fn read_all(&self) -> Result<Vec<Notification>, NotifyError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(NotifyError::Sink(e.to_string())),
        };
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect())
    }
}

#[async_trait]
impl NotificationSink for JsonlSink {
    async fn deliver(&self, n: &Notification) -> Result<(), NotifyError> {
        let _guard = self.append_lock.lock().await;
        let line = serde_json::to_string(n).map_err(|e| NotifyError::Sink(e.to_string()))?;
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| NotifyError::Sink(e.to_string()))?;
        f.write_all(format!("{}\n", line).as_bytes())
            .await
            .map_err(|e| NotifyError::Sink(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MedEvent;

    #[tokio::test]
    async fn jsonl_sink_appends_and_reads_back() {
        let path = std::env::temp_dir().join(format!("medtrack-{}.jsonl", uuid::Uuid::new_v4()));
        let sink = JsonlSink::new(&path);
        assert!(sink.read_all().await.unwrap().is_empty());

        let first = Notification::new(MedEvent::AlertResolved {
            alert_id: 3,
            program_id: 1,
            resolved_by: 9,
        });
        let second = Notification::new(MedEvent::LowStock {
            medication_id: 4,
            program_id: 1,
            resident_id: 2,
            current_count: 3,
            threshold: 5,
        });
        sink.deliver(&first).await.unwrap();
        sink.deliver(&second).await.unwrap();

        let read = sink.read_all().await.unwrap();
        assert_eq!(read, vec![first, second]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn notification_json_is_flat_and_tagged() {
        let n = Notification::new(MedEvent::AuditSubmitted {
            audit_id: 5,
            program_id: 1,
            has_discrepancies: true,
            discrepancy_count: 1,
        });
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["kind"], "audit_submitted");
        assert_eq!(v["audit_id"], 5);
        assert!(v["event_id"].is_string());
    }
}
