//! Deferred Disposal of Zero-Copied Buffers
//!
//! Zero-copied payloads alias a receive buffer owned by the worker that read
//! them. Such handles can travel anywhere (other records, other threads), but
//! the buffer is released on its owning worker, in batches, when that worker
//! calls `drain()`.
//!
//! ```text
//! any thread                               owning worker
//! ──────────                               ─────────────
//! last Arc<ZeroCopiedRecord> drops
//!         │
//!         ▼
//! Disposer::dispose(payload) ──queue──►  ZeroCopiedRecordDisposal::drain()
//!                                                 │
//!                                                 ▼
//!                                         buffer released (exactly once)
//! ```
//!
//! If the registry is already gone when a handle drops, the payload is freed
//! inline on the dropping thread. Either way each buffer is released once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use logtail_observability::metrics;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::payload::PayloadHolder;

/// Sending side of a disposal queue. Cheap to clone, `Send + Sync`.
#[derive(Debug, Clone)]
pub struct Disposer {
    tx: UnboundedSender<PayloadHolder>,
    pending: Arc<AtomicUsize>,
}

impl Disposer {
    /// Queue `payload` for release by the owning worker.
    pub fn dispose(&self, payload: PayloadHolder) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        metrics::ZERO_COPY_BUFFERS_PENDING.inc();

        if let Err(mpsc::error::SendError(payload)) = self.tx.send(payload) {
            // Registry is gone
            self.pending.fetch_sub(1, Ordering::AcqRel);
            metrics::ZERO_COPY_BUFFERS_PENDING.dec();
            drop(payload);
            metrics::ZERO_COPY_BUFFERS_DISPOSED_TOTAL.inc();
        }
    }
}

/// Per-worker queue of zero-copied buffers awaiting release
pub struct ZeroCopiedRecordDisposal {
    tx: UnboundedSender<PayloadHolder>,
    rx: UnboundedReceiver<PayloadHolder>,
    pending: Arc<AtomicUsize>,
    disposed: u64,
}

impl Default for ZeroCopiedRecordDisposal {
    fn default() -> Self {
        Self::new()
    }
}

impl ZeroCopiedRecordDisposal {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            pending: Arc::new(AtomicUsize::new(0)),
            disposed: 0,
        }
    }

    pub fn disposer(&self) -> Disposer {
        Disposer {
            tx: self.tx.clone(),
            pending: Arc::clone(&self.pending),
        }
    }

    /// Release every queued buffer. Returns how many were released.
    pub fn drain(&mut self) -> usize {
        let mut released = 0;
        while let Ok(payload) = self.rx.try_recv() {
            drop(payload);
            released += 1;
        }

        if released > 0 {
            self.pending.fetch_sub(released, Ordering::AcqRel);
            self.disposed += released as u64;
            metrics::ZERO_COPY_BUFFERS_PENDING.sub(released as i64);
            metrics::ZERO_COPY_BUFFERS_DISPOSED_TOTAL.inc_by(released as u64);
            debug!(released, total_disposed = self.disposed, "drained zero-copy disposal queue");
        }
        released
    }

    /// Buffers queued and not yet released
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Buffers released by this registry so far
    pub fn disposed(&self) -> u64 {
        self.disposed
    }
}

impl Drop for ZeroCopiedRecordDisposal {
    fn drop(&mut self) {
        self.rx.close();
        self.drain();
    }
}
