//! Tail Record
//!
//! This module implements `TailRecord`, the last known record of a log (or
//! epoch). Tail reads and recovery are answered from it instead of replaying
//! the log.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────────────────┬───────────────┬──────────────────┬─────────────────┐
//! │ TailRecordHeader     │ blob_size     │ payload_size     │ payload bytes   │
//! │ (36 bytes)           │ u32           │ u32              │                 │
//! └──────────────────────┴───────────────┴──────────────────┴─────────────────┘
//!                        └────────────── present iff INCLUDE_BLOB ────────────┘
//! ```
//!
//! `blob_size` covers everything after itself: `4 + payload_size` today, more
//! if a newer version appends fields.
//!
//! ## Compatibility
//!
//! After decoding the fields it knows, the decoder compares what it consumed
//! with what the header and `blob_size` declared:
//!
//! - consumed more than declared: malformed, `BadMsg`
//! - consumed less, header has flag bits outside `ALL_KNOWN_FLAGS`: the rest
//!   belongs to a newer version and is skipped
//! - consumed less, all flags known: malformed, `BadMsg`
//!
//! ## Payload Ownership
//!
//! `decode(reader, zero_copy)` copies the payload unless the caller asks for
//! zero-copy *and* the calling thread has entered a `Worker`. In that case the
//! payload aliases the reader's buffer and is released through the worker's
//! disposal queue.
//!
//! ## Failure Atomicity
//!
//! `deserialize` resets the target first and only assigns it after a
//! successful decode, so a failed decode always leaves the invalid sentinel.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use logtail_core::header::{lsn_to_string, LOGID_INVALID};
use logtail_core::{Error, ProtocolReader, ProtocolWriter, Result, TailRecordHeader};
use logtail_observability::metrics;
use tracing::{debug, warn};

use crate::payload::{PayloadHolder, TailPayload, ZeroCopiedRecord};
use crate::worker::Worker;

/// Size of the `blob_size` field
pub const BLOB_SIZE_FIELD: usize = std::mem::size_of::<u32>();

/// Size of the `payload_size` field
pub const PAYLOAD_SIZE_FIELD: usize = std::mem::size_of::<u32>();

/// The most recently known record of a log or epoch
#[derive(Default)]
pub struct TailRecord {
    header: TailRecordHeader,
    payload: Option<TailPayload>,
}

impl TailRecord {
    /// Build a tail record with a flat payload. The payload is dropped if the
    /// header says the record carries none.
    pub fn new_flat(header: TailRecordHeader, payload: Option<PayloadHolder>) -> Self {
        Self::from_parts(header, payload.map(TailPayload::Flat))
    }

    /// Build a tail record around an existing zero-copied payload
    pub fn new_zero_copied(header: TailRecordHeader, record: Arc<ZeroCopiedRecord>) -> Self {
        Self::from_parts(header, Some(TailPayload::ZeroCopied(record)))
    }

    fn from_parts(mut header: TailRecordHeader, payload: Option<TailPayload>) -> Self {
        // Wire-only
        header.flags &= !TailRecordHeader::INCLUDE_BLOB;
        let payload = if header.log_id == LOGID_INVALID || !header.has_payload() {
            None
        } else {
            Some(payload.unwrap_or_else(|| TailPayload::Flat(PayloadHolder::default())))
        };
        Self { header, payload }
    }

    pub fn header(&self) -> &TailRecordHeader {
        &self.header
    }

    /// Replace the header, keeping the payload only if the new header still
    /// carries one.
    pub fn set_header(&mut self, header: TailRecordHeader) {
        let payload = self.payload.take();
        *self = Self::from_parts(header, payload);
    }

    /// False for the "no tail known yet" sentinel
    pub fn is_valid(&self) -> bool {
        self.header.log_id != LOGID_INVALID
    }

    pub fn has_payload(&self) -> bool {
        self.header.has_payload()
    }

    pub fn contain_offset_within_epoch(&self) -> bool {
        self.header.contain_offset_within_epoch()
    }

    /// Release the payload and return to the invalid sentinel.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Move the record out, leaving the invalid sentinel behind.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn payload(&self) -> Option<&TailPayload> {
        self.payload.as_ref()
    }

    pub fn is_zero_copied(&self) -> bool {
        self.payload.as_ref().is_some_and(TailPayload::is_zero_copied)
    }

    /// View of the payload, empty when there is none. Borrowed from the record.
    pub fn payload_slice(&self) -> &[u8] {
        if !self.is_valid() || !self.has_payload() {
            return &[];
        }
        self.payload.as_ref().map(TailPayload::as_bytes).unwrap_or(&[])
    }

    /// Counted handle to the payload that may outlive the record
    pub fn payload_bytes(&self) -> Bytes {
        if !self.is_valid() || !self.has_payload() {
            return Bytes::new();
        }
        self.payload.as_ref().map(TailPayload::to_bytes).unwrap_or_default()
    }

    /// Size of the blob section for this record, 0 when none is written.
    ///
    /// # Panics
    ///
    /// If the payload is not strictly smaller than `max_message_len`.
    pub fn calculate_blob_size(&self, max_message_len: usize) -> u32 {
        debug_assert!(self.is_valid());
        if !self.has_payload() {
            return 0;
        }

        let payload_size = self.payload_slice().len();
        assert!(
            payload_size < max_message_len
                && payload_size <= u32::MAX as usize - PAYLOAD_SIZE_FIELD,
            "tail record payload of {} bytes exceeds max message length {}",
            payload_size,
            max_message_len
        );
        (payload_size + PAYLOAD_SIZE_FIELD) as u32
    }

    /// Bytes a record with this `blob_size` occupies on the wire
    pub fn expected_record_size_in_buffer(blob_size: u32) -> usize {
        let blob = if blob_size > 0 {
            blob_size as usize + BLOB_SIZE_FIELD
        } else {
            0
        };
        TailRecordHeader::SIZE + blob
    }

    /// Encoded size of this record. Zero for invalid records.
    pub fn serialized_size(&self) -> usize {
        if !self.is_valid() {
            return 0;
        }
        let payload_size = self.payload_slice().len();
        let blob = if self.has_payload() {
            BLOB_SIZE_FIELD + PAYLOAD_SIZE_FIELD + payload_size
        } else {
            0
        };
        TailRecordHeader::SIZE + blob
    }

    /// Append this record to `writer`. An invalid record sets `InvalidParam`
    /// on the writer and writes nothing.
    pub fn serialize(&self, writer: &mut ProtocolWriter) -> Result<()> {
        if !self.is_valid() {
            let err = Error::invalid_param("cannot serialize an invalid tail record");
            metrics::TAIL_RECORD_ENCODE_ERRORS_TOTAL
                .with_label_values(&[err.reason()])
                .inc();
            writer.set_error(err.clone());
            return Err(err);
        }

        let blob_size = self.calculate_blob_size(writer.max_message_len());

        let mut write_header = self.header;
        write_header.flags &= !TailRecordHeader::INCLUDE_BLOB;
        if blob_size > 0 {
            write_header.flags |= TailRecordHeader::INCLUDE_BLOB;
        }

        writer.write(&write_header);
        if blob_size > 0 {
            let payload = self.payload_bytes();
            writer.write(&blob_size);
            writer.write(&(payload.len() as u32));
            writer.write_without_copy(&payload);
            metrics::TAIL_RECORD_PAYLOAD_BYTES.observe(payload.len() as f64);
        }

        match writer.error() {
            Some(err) => Err(err.clone()),
            None => {
                metrics::TAIL_RECORDS_ENCODED_TOTAL.inc();
                Ok(())
            }
        }
    }

    /// Encode into a standalone buffer
    pub fn encode(&self) -> Result<Bytes> {
        let mut writer = ProtocolWriter::new();
        self.serialize(&mut writer)?;
        writer.finish()
    }

    /// Decode into `self`. On failure `self` is left as the invalid sentinel.
    pub fn deserialize(&mut self, reader: &mut ProtocolReader, zero_copy: bool) -> Result<()> {
        self.reset();
        *self = Self::decode(reader, zero_copy)?;
        Ok(())
    }

    /// Decode one tail record from `reader`.
    ///
    /// `zero_copy` is a request: it is honoured only for non-empty payloads and
    /// only when the calling thread has entered a `Worker`.
    pub fn decode(reader: &mut ProtocolReader, zero_copy: bool) -> Result<Self> {
        match Self::decode_inner(reader, zero_copy) {
            Ok(record) => {
                let path = record.payload.as_ref().map_or("none", TailPayload::kind);
                metrics::TAIL_RECORDS_DECODED_TOTAL
                    .with_label_values(&[path])
                    .inc();
                debug!(
                    log_id = record.header.log_id,
                    lsn = %lsn_to_string(record.header.lsn),
                    path,
                    payload_size = record.payload_slice().len(),
                    "decoded tail record"
                );
                Ok(record)
            }
            Err(err) => {
                reader.set_error(err.clone());
                metrics::TAIL_RECORD_DECODE_ERRORS_TOTAL
                    .with_label_values(&[err.reason()])
                    .inc();
                warn!(
                    error = %err,
                    bytes_read = reader.bytes_read(),
                    "failed to decode tail record"
                );
                Err(err)
            }
        }
    }

    fn decode_inner(reader: &mut ProtocolReader, zero_copy: bool) -> Result<Self> {
        let start = reader.bytes_read();

        let mut header: TailRecordHeader = reader.read().map_err(as_bad_msg)?;
        if header.log_id == LOGID_INVALID {
            return Err(Error::bad_msg("tail record with invalid log id"));
        }

        let mut blob_size: u32 = 0;
        let mut payload = None;
        if header.includes_blob() {
            blob_size = reader.read().map_err(as_bad_msg)?;
            if header.has_payload() {
                let payload_size: u32 = reader.read().map_err(as_bad_msg)?;
                let payload_size = payload_size as usize;
                if payload_size >= reader.max_message_len() {
                    return Err(Error::bad_msg(format!(
                        "payload of {} bytes exceeds max message length {}",
                        payload_size,
                        reader.max_message_len()
                    )));
                }
                payload = Some(Self::decode_payload(reader, &header, payload_size, zero_copy)?);
            }
        } else if header.has_payload() {
            return Err(Error::bad_msg("payload flag set without a blob section"));
        }

        // Wire-only
        header.flags &= !TailRecordHeader::INCLUDE_BLOB;

        let consumed = reader.bytes_read() - start;
        let expected = Self::expected_record_size_in_buffer(blob_size);
        if consumed > expected {
            return Err(Error::bad_msg(format!(
                "tail record consumed {} bytes but declared {}",
                consumed, expected
            )));
        }

        if header.has_unknown_flags() {
            reader.allow_trailing_bytes();
        } else {
            reader.disallow_trailing_bytes();
        }
        let trailing = expected - consumed;
        reader.handle_trailing_bytes(trailing).map_err(as_bad_msg)?;
        if trailing > 0 {
            metrics::TAIL_RECORD_TRAILING_BYTES_SKIPPED_TOTAL.inc_by(trailing as u64);
            debug!(
                log_id = header.log_id,
                unknown_flags = header.flags & !TailRecordHeader::ALL_KNOWN_FLAGS,
                skipped = trailing,
                "skipped tail record fields from a newer protocol version"
            );
        }

        Ok(Self { header, payload })
    }

    fn decode_payload(
        reader: &mut ProtocolReader,
        header: &TailRecordHeader,
        payload_size: usize,
        zero_copy: bool,
    ) -> Result<TailPayload> {
        // Nothing to alias for an empty payload
        let disposer = if zero_copy && payload_size > 0 {
            let disposer = Worker::current_disposer();
            if disposer.is_none() {
                metrics::ZERO_COPY_FALLBACKS_TOTAL.inc();
                warn!(
                    log_id = header.log_id,
                    payload_size, "zero-copy decode requested off a worker thread, copying payload"
                );
            }
            disposer
        } else {
            None
        };

        let holder = PayloadHolder::deserialize(reader, payload_size, disposer.is_some())?;
        Ok(match disposer {
            Some(disposer) => TailPayload::ZeroCopied(ZeroCopiedRecord::create(
                disposer,
                header.lsn,
                header.timestamp,
                header.offset_within_epoch(),
                holder,
            )),
            None => TailPayload::Flat(holder),
        })
    }

    /// Content equality independent of payload representation. Any two
    /// invalid records are the same.
    pub fn same_content(&self, other: &TailRecord) -> bool {
        match (self.is_valid(), other.is_valid()) {
            (false, false) => true,
            (true, true) => {
                self.header.to_wire() == other.header.to_wire()
                    && self.payload_slice() == other.payload_slice()
            }
            _ => false,
        }
    }

    pub fn same_content_of(a: &TailRecord, b: &TailRecord) -> bool {
        a.same_content(b)
    }
}

fn as_bad_msg(err: Error) -> Error {
    match err {
        Error::BadMsg(_) => err,
        other => Error::bad_msg(other.to_string()),
    }
}

impl fmt::Display for TailRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[L:{} N:{} T:{} {} F:{}]",
            self.header.log_id,
            lsn_to_string(self.header.lsn),
            self.header.timestamp,
            self.header.offset(),
            self.header.flags
        )?;
        if !self.is_valid() {
            write!(f, "(Invalid)")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TailRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TailRecord")
            .field("header", &self.header)
            .field("payload", &self.payload)
            .finish()
    }
}
