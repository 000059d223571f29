//! The download-audit background queue (SPEC_FULL §9 "fire-and-forget
//! audit writes become enqueued tasks on a bounded background queue;
//! queue overflow drops with a metric increment, never blocks the
//! request"; spec §4.7.6 step 3, §5 "best-effort append that must not
//! delay the response").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dms_graph::GraphStore;
use dms_search::AuditDownloadRecord;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

const QUEUE_CAPACITY: usize = 1024;

/// A cheaply-cloneable sender half: handlers enqueue and return
/// immediately. The receiving task owns the graph handle and runs until
/// the sender side is dropped at shutdown.
#[derive(Clone)]
pub struct AuditQueue {
    sender: mpsc::Sender<AuditDownloadRecord>,
    dropped: Arc<AtomicU64>,
}

impl AuditQueue {
    /// Spawns the background drain task and returns the handle callers
    /// enqueue into. Overflow never blocks the caller: `try_send` drops
    /// the record and increments a counter instead of awaiting capacity.
    pub fn spawn(graph: Arc<dyn GraphStore>) -> Self {
        let (sender, mut receiver) = mpsc::channel(QUEUE_CAPACITY);
        let dropped = Arc::new(AtomicU64::new(0));

        tokio::spawn(async move {
            while let Some(record) = receiver.recv().await {
                let key = Uuid::new_v4().to_string();
                if let Err(err) = dms_search::append_audit_download(graph.as_ref(), record, &key).await {
                    warn!(error = %err, "failed to persist audit_downloads row");
                }
            }
            debug!("audit queue drained; sender side has been dropped");
        });

        Self { sender, dropped }
    }

    /// Enqueues a download record without delaying the caller. Returns
    /// immediately whether or not the record was accepted.
    pub fn enqueue(&self, record: AuditDownloadRecord) {
        if self.sender.try_send(record).is_err() {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(total_dropped = total, "audit queue full; dropping download audit record");
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
