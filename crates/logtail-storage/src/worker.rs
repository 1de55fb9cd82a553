//! Worker Execution Context
//!
//! A `Worker` is the execution unit (one thread, typically one per connection
//! or shard) that owns a zero-copy disposal registry. Code running on a worker
//! finds it through a thread-local set by `Worker::enter`:
//!
//! ```ignore
//! let worker = Worker::new(0);
//! let _guard = worker.enter();
//!
//! // Zero-copy decodes on this thread register with `worker`
//! let record = TailRecord::decode(&mut reader, true)?;
//!
//! // Periodically, from the worker's own loop
//! worker.drain_disposal();
//! ```
//!
//! `Worker` is `!Send`: its registry may only be drained from the thread that
//! entered it. `Disposer` handles taken from it are `Send` and can release
//! buffers from anywhere.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::disposal::{Disposer, ZeroCopiedRecordDisposal};

thread_local! {
    static CURRENT_WORKER: RefCell<Option<Rc<Worker>>> = const { RefCell::new(None) };
}

pub struct Worker {
    id: usize,
    disposal: RefCell<ZeroCopiedRecordDisposal>,
}

impl Worker {
    pub fn new(id: usize) -> Rc<Self> {
        Rc::new(Self {
            id,
            disposal: RefCell::new(ZeroCopiedRecordDisposal::new()),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Make this worker current on the calling thread until the guard drops.
    /// Nested `enter` calls restore the previous worker on exit.
    pub fn enter(self: &Rc<Self>) -> WorkerGuard {
        let previous = CURRENT_WORKER.with(|current| current.replace(Some(Rc::clone(self))));
        trace!(worker = self.id, "entered worker");
        WorkerGuard { previous }
    }

    /// The worker current on this thread, if any
    pub fn on_this_thread() -> Option<Rc<Worker>> {
        CURRENT_WORKER.with(|current| current.borrow().clone())
    }

    /// Disposer of the worker current on this thread, if any
    pub fn current_disposer() -> Option<Disposer> {
        CURRENT_WORKER.with(|current| current.borrow().as_ref().map(|worker| worker.disposer()))
    }

    pub fn disposer(&self) -> Disposer {
        self.disposal.borrow().disposer()
    }

    /// Release every zero-copied buffer whose last handle has dropped.
    pub fn drain_disposal(&self) -> usize {
        self.disposal.borrow_mut().drain()
    }

    pub fn pending_disposal(&self) -> usize {
        self.disposal.borrow().pending()
    }

    pub fn disposed(&self) -> u64 {
        self.disposal.borrow().disposed()
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("pending_disposal", &self.pending_disposal())
            .finish()
    }
}

/// Restores the previously current worker on drop
#[must_use = "the worker is only current while the guard is alive"]
pub struct WorkerGuard {
    previous: Option<Rc<Worker>>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_WORKER.with(|current| *current.borrow_mut() = previous);
    }
}
