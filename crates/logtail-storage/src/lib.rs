//! LogTail Storage Layer
//!
//! This crate implements the tail record of a log: the most recently known
//! record, kept per log and per epoch so that tail reads, recovery and
//! trimming can answer "what is the last thing written here?" without
//! replaying anything.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐
//! │   TailRecord    │ header + optional payload
//! └────────┬────────┘
//!          │ serialize()
//!          ▼
//! ┌─────────────────┐
//! │ ProtocolWriter  │ header, blob_size, payload_size, payload (linked, no copy)
//! └────────┬────────┘
//!          │ bytes on the wire
//!          ▼
//! ┌─────────────────┐
//! │ ProtocolReader  │ skips fields from newer versions
//! └────────┬────────┘
//!          │ decode(zero_copy)
//!          ▼
//! ┌─────────────────┐      ┌───────────────────────────┐
//! │   TailRecord    │ ───► │ Worker disposal queue     │
//! │ Flat payload or │ drop │ (zero-copied buffers only)│
//! │ ZeroCopied      │      └───────────────────────────┘
//! └─────────────────┘
//! ```
//!
//! ## Main Components
//!
//! ### TailRecord
//! Header plus payload, with the versioned blob encoding. See `tail_record`.
//!
//! ### PayloadHolder / ZeroCopiedRecord
//! The two ways a payload is owned: an owned (possibly shared) flat buffer, or
//! a slice of a receive buffer returned to its worker on release.
//!
//! ### Worker / ZeroCopiedRecordDisposal
//! The per-thread execution context and the queue through which zero-copied
//! buffers are released.
//!
//! ## Usage Example
//!
//! ```ignore
//! use logtail_core::{ProtocolReader, TailRecordHeader};
//! use logtail_storage::{PayloadHolder, TailRecord, Worker};
//!
//! let header = TailRecordHeader::new(1, lsn, now_ms(), TailRecordHeader::HAS_PAYLOAD, 0);
//! let record = TailRecord::new_flat(header, Some(PayloadHolder::from("abcd")));
//! let bytes = record.encode()?;
//!
//! let worker = Worker::new(0);
//! let _guard = worker.enter();
//! let decoded = TailRecord::decode(&mut ProtocolReader::new(bytes), true)?;
//! assert!(decoded.same_content(&record));
//! ```

pub mod disposal;
pub mod payload;
pub mod tail_record;
pub mod worker;

pub use disposal::{Disposer, ZeroCopiedRecordDisposal};
pub use payload::{PayloadHolder, TailPayload, ZeroCopiedRecord};
pub use tail_record::TailRecord;
pub use worker::{Worker, WorkerGuard};
