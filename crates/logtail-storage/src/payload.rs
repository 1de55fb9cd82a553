//! Payload Ownership
//!
//! A tail record's payload is held in exactly one of two ways:
//!
//! - **Flat** (`PayloadHolder`): the record owns its bytes. The `Bytes` inside
//!   may be shared read-only with other holders; memory is released when the
//!   last one drops.
//! - **Zero-copied** (`Arc<ZeroCopiedRecord>`): the bytes are a slice of a
//!   receive buffer. When the last handle drops, the slice is not freed inline
//!   but handed to the disposal queue of the worker that decoded it.
//!
//! `TailPayload` is the tagged union of the two. Both expose the same view:
//! `size()` and `as_bytes()`.
//!
//! ## Lifetimes
//!
//! `as_bytes()` borrows from the payload, so the compiler keeps callers from
//! holding the view past the record. Callers that need the bytes longer take
//! `to_bytes()`, a counted handle that keeps the backing buffer alive on its
//! own.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use logtail_core::{ProtocolReader, Result};

use crate::disposal::Disposer;

/// Flat payload storage
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PayloadHolder {
    data: Bytes,
}

impl PayloadHolder {
    /// Copy `data` into a fresh allocation
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(data),
        }
    }

    /// Take shared ownership of `data` without copying
    pub fn from_bytes(data: Bytes) -> Self {
        Self { data }
    }

    /// Read `size` payload bytes from `reader`. With `zero_copy` the holder
    /// aliases the reader's receive buffer, otherwise the bytes are copied.
    pub fn deserialize(reader: &mut ProtocolReader, size: usize, zero_copy: bool) -> Result<Self> {
        let data = if zero_copy {
            reader.read_bytes(size)?
        } else {
            reader.copy_bytes(size)?
        };
        Ok(Self { data })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_flat_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn to_bytes(&self) -> Bytes {
        self.data.clone()
    }
}

impl From<Bytes> for PayloadHolder {
    fn from(data: Bytes) -> Self {
        Self::from_bytes(data)
    }
}

impl From<Vec<u8>> for PayloadHolder {
    fn from(data: Vec<u8>) -> Self {
        Self::from_bytes(Bytes::from(data))
    }
}

impl From<&'static str> for PayloadHolder {
    fn from(data: &'static str) -> Self {
        Self::from_bytes(Bytes::from_static(data.as_bytes()))
    }
}

impl fmt::Debug for PayloadHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadHolder")
            .field("size", &self.size())
            .finish()
    }
}

/// A payload aliasing a receive buffer, released through a worker's
/// disposal queue
pub struct ZeroCopiedRecord {
    lsn: u64,
    timestamp: i64,
    offset_within_epoch: Option<u64>,
    payload: PayloadHolder,
    disposer: Disposer,
}

impl ZeroCopiedRecord {
    pub fn create(
        disposer: Disposer,
        lsn: u64,
        timestamp: i64,
        offset_within_epoch: Option<u64>,
        payload: PayloadHolder,
    ) -> Arc<Self> {
        Arc::new(Self {
            lsn,
            timestamp,
            offset_within_epoch,
            payload,
            disposer,
        })
    }

    pub fn lsn(&self) -> u64 {
        self.lsn
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn offset_within_epoch(&self) -> Option<u64> {
        self.offset_within_epoch
    }

    pub fn payload_raw(&self) -> &[u8] {
        self.payload.as_flat_bytes()
    }

    pub fn payload_bytes(&self) -> Bytes {
        self.payload.to_bytes()
    }
}

impl Drop for ZeroCopiedRecord {
    fn drop(&mut self) {
        let payload = std::mem::take(&mut self.payload);
        self.disposer.dispose(payload);
    }
}

impl fmt::Debug for ZeroCopiedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZeroCopiedRecord")
            .field("lsn", &self.lsn)
            .field("timestamp", &self.timestamp)
            .field("offset_within_epoch", &self.offset_within_epoch)
            .field("size", &self.payload.size())
            .finish()
    }
}

/// The payload held by a tail record
#[derive(Debug)]
pub enum TailPayload {
    Flat(PayloadHolder),
    ZeroCopied(Arc<ZeroCopiedRecord>),
}

impl TailPayload {
    pub fn size(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            TailPayload::Flat(holder) => holder.as_flat_bytes(),
            TailPayload::ZeroCopied(record) => record.payload_raw(),
        }
    }

    /// Counted handle to the bytes that may outlive this payload
    pub fn to_bytes(&self) -> Bytes {
        match self {
            TailPayload::Flat(holder) => holder.to_bytes(),
            TailPayload::ZeroCopied(record) => record.payload_bytes(),
        }
    }

    pub fn is_zero_copied(&self) -> bool {
        matches!(self, TailPayload::ZeroCopied(_))
    }

    /// Metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            TailPayload::Flat(_) => "flat",
            TailPayload::ZeroCopied(_) => "zero_copy",
        }
    }
}
