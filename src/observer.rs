//! Observability Sink for Dispatch Records
//!
//! An optional, best-effort channel between executing operations and
//! anything that wants to visualize or debug batch timing. The executor
//! takes the observer by explicit injection; there is no ambient global
//! hook, and running without any observer is a valid configuration.

use tokio::sync::broadcast;
use tracing::trace;

use crate::types::DispatchRecord;

/// Best-effort consumer of dispatch records
///
/// Implementations must not block and must not fail the caller; a record
/// that nobody receives is dropped silently.
pub trait OperationObserver: Send + Sync {
    /// Accept one record; best-effort, infallible from the caller's view
    fn record(&self, record: &DispatchRecord);
}

/// Broadcast-channel observer for visualizers and debugging tools
///
/// Publishing succeeds whether or not any subscriber is attached; a send
/// into an empty channel is deliberately not an error, matching the
/// fire-and-forget nature of the records themselves.
#[derive(Debug, Clone)]
pub struct ObservationPublisher {
    sender: broadcast::Sender<DispatchRecord>,
}

impl ObservationPublisher {
    /// Create a publisher with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to future dispatch records
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchRecord> {
        self.sender.subscribe()
    }

    /// Number of currently attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ObservationPublisher {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl OperationObserver for ObservationPublisher {
    fn record(&self, record: &DispatchRecord) {
        // send() errors only when no subscriber exists, which is fine here.
        match self.sender.send(record.clone()) {
            Ok(receivers) => trace!(
                operation_id = %record.operation_id,
                kind = record.kind.tag(),
                receivers = receivers,
                "Dispatch record published"
            ),
            Err(broadcast::error::SendError(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OperationKind;
    use chrono::Utc;
    use uuid::Uuid;

    fn record() -> DispatchRecord {
        DispatchRecord {
            kind: OperationKind::Hack,
            actual_start: Utc::now(),
            actual_end: Utc::now(),
            operation_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        let publisher = ObservationPublisher::new(16);
        assert_eq!(publisher.subscriber_count(), 0);
        // Must not panic or error with nobody listening.
        publisher.record(&record());
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_record() {
        let publisher = ObservationPublisher::new(16);
        let mut subscription = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 1);

        let sent = record();
        publisher.record(&sent);
        let received = subscription.recv().await.unwrap();
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_all_receive() {
        let publisher = ObservationPublisher::new(16);
        let mut first = publisher.subscribe();
        let mut second = publisher.subscribe();

        let sent = record();
        publisher.record(&sent);
        assert_eq!(first.recv().await.unwrap(), sent);
        assert_eq!(second.recv().await.unwrap(), sent);
    }
}
