//! Fire-and-forget integrity event recorder. Events flow through a bounded
//! channel into a single writer task; attempt operations never block on or
//! fail because of security logging.

use std::sync::Arc;

use sqlx::types::Json;
use time::PrimitiveDateTime;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::core::time::primitive_now_utc;
use crate::db::models::SecurityLogEntry;
use crate::db::types::{EventSeverity, SecurityEventType};
use crate::domain::security;
use crate::store::EngineStore;

#[derive(Debug, Clone)]
pub(crate) struct RecordEvent {
    pub(crate) trainee_id: String,
    pub(crate) assessment_id: String,
    pub(crate) attempt_id: Option<String>,
    pub(crate) event_type: SecurityEventType,
    /// Only honored for `suspicious_activity`; other kinds carry a fixed
    /// server-side severity.
    pub(crate) severity: Option<EventSeverity>,
    pub(crate) activity: String,
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: Option<String>,
    /// Client-reported occurrence time; defaults to arrival time.
    pub(crate) event_timestamp: Option<PrimitiveDateTime>,
    pub(crate) additional_data: Option<serde_json::Value>,
}

#[derive(Clone)]
pub(crate) struct IntegrityRecorder {
    tx: mpsc::Sender<RecordEvent>,
}

impl IntegrityRecorder {
    pub(crate) fn spawn(
        store: Arc<dyn EngineStore>,
        queue_capacity: usize,
        mut shutdown: watch::Receiver<bool>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<RecordEvent>(queue_capacity.max(1));

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    maybe_event = rx.recv() => match maybe_event {
                        Some(event) => write_entry(store.as_ref(), event).await,
                        None => break,
                    },
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            // Flush whatever is already queued before exiting.
            while let Ok(event) = rx.try_recv() {
                write_entry(store.as_ref(), event).await;
            }
            tracing::debug!("Integrity recorder stopped");
        });

        (Self { tx }, handle)
    }

    /// Enqueues an event without waiting. When the queue is full or the
    /// writer is gone the event is dropped and counted, never surfaced to
    /// the caller.
    pub(crate) fn record(&self, event: RecordEvent) {
        if let Err(err) = self.tx.try_send(event) {
            metrics::counter!("integrity_events_dropped_total").increment(1);
            tracing::warn!(error = %err, "Integrity event dropped");
        }
    }
}

async fn write_entry(store: &dyn EngineStore, event: RecordEvent) {
    let entry = build_entry(event);
    if let Err(err) = store.append_security_event(&entry).await {
        metrics::counter!("integrity_event_write_failures_total").increment(1);
        tracing::error!(
            error = %err,
            event_type = entry.event_type.as_str(),
            trainee_id = %entry.trainee_id,
            "Failed to persist security log entry"
        );
    }
}

fn build_entry(event: RecordEvent) -> SecurityLogEntry {
    let now = primitive_now_utc();
    SecurityLogEntry {
        id: uuid::Uuid::new_v4().to_string(),
        trainee_id: event.trainee_id,
        assessment_id: event.assessment_id,
        attempt_id: event.attempt_id,
        severity: security::severity_for(event.event_type, event.severity),
        event_type: event.event_type,
        activity: event.activity,
        ip_address: event.ip_address,
        user_agent: event.user_agent,
        event_timestamp: event.event_timestamp.unwrap_or(now),
        additional_data: event.additional_data.map(Json),
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::store::memory::MemoryStore;

    fn event(kind: SecurityEventType) -> RecordEvent {
        RecordEvent {
            trainee_id: "trainee-1".to_string(),
            assessment_id: "asm-1".to_string(),
            attempt_id: Some("att-1".to_string()),
            event_type: kind,
            severity: None,
            activity: "unit test".to_string(),
            ip_address: None,
            user_agent: None,
            event_timestamp: None,
            additional_data: None,
        }
    }

    async fn wait_for_count(store: &MemoryStore, expected: usize) {
        for _ in 0..100 {
            if store.security_event_count().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("recorder did not persist {expected} events in time");
    }

    #[tokio::test]
    async fn records_events_through_the_queue() {
        let store = Arc::new(MemoryStore::new());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (recorder, _handle) = IntegrityRecorder::spawn(store.clone(), 16, shutdown_rx);

        recorder.record(event(SecurityEventType::TabSwitch));
        recorder.record(event(SecurityEventType::DeveloperTools));

        wait_for_count(&store, 2).await;
    }

    #[tokio::test]
    async fn store_failure_does_not_reach_the_caller() {
        let store = Arc::new(MemoryStore::new());
        store.set_security_write_failure(true);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (recorder, handle) = IntegrityRecorder::spawn(store.clone(), 16, shutdown_rx);

        recorder.record(event(SecurityEventType::CopyAttempt));

        shutdown_tx.send(true).ok();
        handle.await.ok();
        assert_eq!(store.security_event_count().await, 0);
    }

    #[tokio::test]
    async fn record_after_writer_stopped_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (recorder, handle) = IntegrityRecorder::spawn(store.clone(), 16, shutdown_rx);

        shutdown_tx.send(true).ok();
        handle.await.ok();

        recorder.record(event(SecurityEventType::PasteAttempt));
        assert_eq!(store.security_event_count().await, 0);
    }

    #[tokio::test]
    async fn drains_queued_events_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (recorder, handle) = IntegrityRecorder::spawn(store.clone(), 16, shutdown_rx);

        for _ in 0..5 {
            recorder.record(event(SecurityEventType::WindowFocusLost));
        }

        shutdown_tx.send(true).ok();
        handle.await.ok();
        assert_eq!(store.security_event_count().await, 5);
    }
}
