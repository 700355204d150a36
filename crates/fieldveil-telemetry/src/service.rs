//! Async audit recording service
//!
//! Wraps a recorder in a background writer thread fed by a bounded channel,
//! giving callers fire-and-forget recording with backpressure: when the
//! store is slow the channel fills and `record` blocks instead of growing
//! memory without bound. Failure events are fanned out to the notifier.

use crate::audit::{AuditEvent, AuditRecorder};
use crate::notify::Notifier;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Commands sent to the background writer
enum AuditCommand {
    Record(Box<AuditEvent>),
    Flush,
}

/// Background audit writer with bounded buffering.
///
/// Shutdown works by closing the channel: dropping the sender lets the
/// writer drain everything still queued, flush, and exit. This holds even
/// when the channel is full at shutdown time, where sending a sentinel
/// command would block or be dropped.
pub struct AuditService {
    sender: Option<mpsc::Sender<AuditCommand>>,
    handle: Option<JoinHandle<()>>,
}

impl AuditService {
    /// Spawn the writer thread. `capacity` bounds the number of in-flight
    /// events before senders block.
    pub fn new(
        recorder: Arc<dyn AuditRecorder>,
        notifier: Option<Arc<dyn Notifier>>,
        capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        let handle = std::thread::spawn(move || run_writer(recorder, notifier, receiver));
        info!(capacity, "audit service started");
        Self {
            sender: Some(sender),
            handle: Some(handle),
        }
    }

    /// Queue an event for persistence, blocking when the buffer is full
    pub fn record(&self, event: AuditEvent) {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender
            .blocking_send(AuditCommand::Record(Box::new(event)))
            .is_err()
        {
            warn!("audit service is shut down, event dropped");
        }
    }

    /// Ask the writer to flush buffered events to durable storage
    pub fn flush(&self) {
        if let Some(sender) = &self.sender {
            let _ = sender.blocking_send(AuditCommand::Flush);
        }
    }

    /// Stop the writer, flushing everything still queued
    pub fn shutdown(mut self) {
        self.close_and_join();
    }

    fn close_and_join(&mut self) {
        // Closing the channel is the shutdown signal; the writer drains the
        // queue and exits once `blocking_recv` returns `None`.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AuditService {
    fn drop(&mut self) {
        self.close_and_join();
    }
}

fn run_writer(
    recorder: Arc<dyn AuditRecorder>,
    notifier: Option<Arc<dyn Notifier>>,
    mut receiver: mpsc::Receiver<AuditCommand>,
) {
    while let Some(command) = receiver.blocking_recv() {
        match command {
            AuditCommand::Record(event) => {
                if let Err(e) = recorder.record(&event) {
                    // The store retries internally; a surfaced error here
                    // means the event is lost to the async path and worth
                    // an operator's attention.
                    error!(
                        record = %event.record_id,
                        field = %event.field_path,
                        "async audit write failed: {}", e
                    );
                }
                if event.outcome.is_failure() {
                    if let Some(notifier) = &notifier {
                        notifier.deliver(&event);
                    }
                }
            }
            AuditCommand::Flush => {
                if let Err(e) = recorder.flush() {
                    error!("audit flush failed: {}", e);
                }
            }
        }
    }
    if let Err(e) = recorder.flush() {
        error!("final audit flush failed: {}", e);
    }
    info!("audit service stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{MemoryAuditStore, RecordReceipt};
    use crate::notify::testing::CollectingNotifier;
    use fieldveil_core::Result;
    use std::time::Duration;

    /// Store that takes a while per write, filling the channel upstream
    struct SlowStore {
        inner: MemoryAuditStore,
        delay: Duration,
    }

    impl AuditRecorder for SlowStore {
        fn record(&self, event: &AuditEvent) -> Result<RecordReceipt> {
            std::thread::sleep(self.delay);
            self.inner.record(event)
        }

        fn query(&self, record_id: &str) -> Result<Vec<AuditEvent>> {
            self.inner.query(record_id)
        }
    }

    #[test]
    fn events_reach_the_store_and_failures_the_notifier() {
        let store = Arc::new(MemoryAuditStore::new());
        let notifier = Arc::new(CollectingNotifier::default());
        let service = AuditService::new(store.clone(), Some(notifier.clone()), 16);

        service.record(AuditEvent::success("rec-1", "email".into(), "mask", 0, None));
        service.record(AuditEvent::failure(
            "rec-1",
            "user.ssn".into(),
            "tokenize",
            1,
            "vault down",
        ));
        service.shutdown();

        assert_eq!(store.query("rec-1").unwrap().len(), 2);
        let delivered = notifier.delivered.lock();
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].outcome.is_failure());
    }

    #[test]
    fn shutdown_flushes_queued_events() {
        let store = Arc::new(MemoryAuditStore::new());
        let service = AuditService::new(store.clone(), None, 64);

        for sequence in 0..50 {
            service.record(AuditEvent::success(
                "rec-bulk",
                format!("f{sequence}").as_str().into(),
                "hash",
                sequence,
                None,
            ));
        }
        service.shutdown();

        assert_eq!(store.query("rec-bulk").unwrap().len(), 50);
    }

    #[test]
    fn drop_drains_a_full_channel_and_returns() {
        let store = Arc::new(SlowStore {
            inner: MemoryAuditStore::new(),
            delay: Duration::from_millis(50),
        });
        let service = AuditService::new(store.clone(), None, 1);

        // With capacity 1 and a slow store the channel is full here.
        for sequence in 0..3 {
            service.record(AuditEvent::success(
                "rec-1",
                format!("f{sequence}").as_str().into(),
                "mask",
                sequence,
                None,
            ));
        }
        drop(service);

        // Drop joined the writer, so every queued event is already stored.
        assert_eq!(store.query("rec-1").unwrap().len(), 3);
    }
}
