//! Tail Record Header
//!
//! This module defines `TailRecordHeader`, the fixed-layout metadata at the
//! front of every encoded tail record.
//!
//! ## Layout (36 bytes, little-endian)
//!
//! ```text
//! ┌──────────┬──────────┬───────────┬─────────┬─────────────────────────────┐
//! │ log_id   │ lsn      │ timestamp │ flags   │ offset_within_epoch         │
//! │ u64      │ u64      │ i64 (ms)  │ u32     │   or byte_offset (u64)      │
//! └──────────┴──────────┴───────────┴─────────┴─────────────────────────────┘
//! ```
//!
//! The last field is a union: `OFFSET_WITHIN_EPOCH` in `flags` selects which
//! interpretation is valid. `offset()` returns it as a `RecordOffset` so the
//! two can never be confused.
//!
//! ## Flags
//!
//! `has_payload()` and `contain_offset_within_epoch()` are the only places
//! flags are interpreted; every other component goes through them.
//! `INCLUDE_BLOB` is wire-only: the encoder sets it on a copy of the header and
//! the decoder clears it before handing the header out.
//!
//! Any bit outside `ALL_KNOWN_FLAGS` was set by a newer protocol version.

use std::fmt;

use bytes::{Buf, BufMut};

use crate::protocol::WireValue;

pub const LOGID_INVALID: u64 = 0;
pub const LSN_INVALID: u64 = 0;

/// Split an LSN into its epoch (high 32 bits)
#[inline]
pub const fn epoch_of(lsn: u64) -> u32 {
    (lsn >> 32) as u32
}

/// Split an LSN into its epoch sequence number (low 32 bits)
#[inline]
pub const fn esn_of(lsn: u64) -> u32 {
    lsn as u32
}

#[inline]
pub const fn compose_lsn(epoch: u32, esn: u32) -> u64 {
    ((epoch as u64) << 32) | esn as u64
}

/// Render an LSN as `e<epoch>n<esn>`
pub fn lsn_to_string(lsn: u64) -> String {
    format!("e{}n{}", epoch_of(lsn), esn_of(lsn))
}

/// Interpretation of the header's offset union
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOffset {
    /// Bytes written to the epoch before this record
    WithinEpoch(u64),
    /// Bytes written to the log before this record
    Bytes(u64),
}

impl RecordOffset {
    pub fn value(self) -> u64 {
        match self {
            RecordOffset::WithinEpoch(v) | RecordOffset::Bytes(v) => v,
        }
    }
}

impl fmt::Display for RecordOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordOffset::WithinEpoch(v) => write!(f, "O:{}", v),
            RecordOffset::Bytes(v) => write!(f, "B:{}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TailRecordHeader {
    pub log_id: u64,
    pub lsn: u64,
    /// Milliseconds
    pub timestamp: i64,
    pub flags: u32,
    /// Raw offset union, interpreted through `offset()`
    offset: u64,
}

impl TailRecordHeader {
    /// Record type carries a payload
    pub const HAS_PAYLOAD: u32 = 1 << 0;
    /// Payload carries a checksum
    pub const CHECKSUM: u32 = 1 << 1;
    pub const CHECKSUM_64BIT: u32 = 1 << 2;
    pub const CHECKSUM_PARITY: u32 = 1 << 3;
    /// Offset union holds `offset_within_epoch`
    pub const OFFSET_WITHIN_EPOCH: u32 = 1 << 4;
    /// Tail is a gap marker
    pub const GAP: u32 = 1 << 5;
    /// Wire-only: a blob section follows the header
    pub const INCLUDE_BLOB: u32 = 1 << 6;

    pub const ALL_KNOWN_FLAGS: u32 = Self::HAS_PAYLOAD
        | Self::CHECKSUM
        | Self::CHECKSUM_64BIT
        | Self::CHECKSUM_PARITY
        | Self::OFFSET_WITHIN_EPOCH
        | Self::GAP
        | Self::INCLUDE_BLOB;

    /// Encoded size
    pub const SIZE: usize = 8 + 8 + 8 + 4 + 8;

    pub fn new(log_id: u64, lsn: u64, timestamp: i64, flags: u32, offset: u64) -> Self {
        Self {
            log_id,
            lsn,
            timestamp,
            flags,
            offset,
        }
    }

    pub fn has_payload(&self) -> bool {
        self.flags & Self::HAS_PAYLOAD != 0
    }

    pub fn contain_offset_within_epoch(&self) -> bool {
        self.flags & Self::OFFSET_WITHIN_EPOCH != 0
    }

    pub fn includes_blob(&self) -> bool {
        self.flags & Self::INCLUDE_BLOB != 0
    }

    pub fn has_unknown_flags(&self) -> bool {
        self.flags & !Self::ALL_KNOWN_FLAGS != 0
    }

    pub fn offset(&self) -> RecordOffset {
        if self.contain_offset_within_epoch() {
            RecordOffset::WithinEpoch(self.offset)
        } else {
            RecordOffset::Bytes(self.offset)
        }
    }

    /// Raw union value regardless of interpretation
    pub fn raw_offset(&self) -> u64 {
        self.offset
    }

    pub fn offset_within_epoch(&self) -> Option<u64> {
        match self.offset() {
            RecordOffset::WithinEpoch(v) => Some(v),
            RecordOffset::Bytes(_) => None,
        }
    }

    pub fn byte_offset(&self) -> Option<u64> {
        match self.offset() {
            RecordOffset::Bytes(v) => Some(v),
            RecordOffset::WithinEpoch(_) => None,
        }
    }

    pub fn set_offset(&mut self, offset: RecordOffset) {
        match offset {
            RecordOffset::WithinEpoch(v) => {
                self.flags |= Self::OFFSET_WITHIN_EPOCH;
                self.offset = v;
            }
            RecordOffset::Bytes(v) => {
                self.flags &= !Self::OFFSET_WITHIN_EPOCH;
                self.offset = v;
            }
        }
    }

    /// The exact bytes this header occupies on the wire
    pub fn to_wire(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        self.put(&mut &mut out[..]);
        out
    }
}

impl WireValue for TailRecordHeader {
    const WIRE_SIZE: usize = Self::SIZE;

    fn put(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.log_id);
        buf.put_u64_le(self.lsn);
        buf.put_i64_le(self.timestamp);
        buf.put_u32_le(self.flags);
        buf.put_u64_le(self.offset);
    }

    fn get(buf: &mut impl Buf) -> Self {
        Self {
            log_id: buf.get_u64_le(),
            lsn: buf.get_u64_le(),
            timestamp: buf.get_i64_le(),
            flags: buf.get_u32_le(),
            offset: buf.get_u64_le(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size() {
        assert_eq!(TailRecordHeader::SIZE, 36);
        assert_eq!(<TailRecordHeader as WireValue>::WIRE_SIZE, 36);
    }

    #[test]
    fn test_predicates() {
        let header = TailRecordHeader::new(
            1,
            2,
            3,
            TailRecordHeader::HAS_PAYLOAD | TailRecordHeader::OFFSET_WITHIN_EPOCH,
            4,
        );
        assert!(header.has_payload());
        assert!(header.contain_offset_within_epoch());
        assert!(!header.includes_blob());
        assert!(!header.has_unknown_flags());

        let gap = TailRecordHeader::new(1, 2, 3, TailRecordHeader::GAP, 0);
        assert!(!gap.has_payload());
        assert!(!gap.contain_offset_within_epoch());
    }

    #[test]
    fn test_has_payload_ignores_include_blob() {
        let header = TailRecordHeader::new(1, 2, 3, TailRecordHeader::INCLUDE_BLOB, 0);
        assert!(!header.has_payload());
    }

    #[test]
    fn test_unknown_flags() {
        let header = TailRecordHeader::new(1, 2, 3, 1 << 20, 0);
        assert!(header.has_unknown_flags());
    }

    #[test]
    fn test_offset_union() {
        let mut header = TailRecordHeader::new(1, 2, 3, 0, 99);
        assert_eq!(header.offset(), RecordOffset::Bytes(99));
        assert_eq!(header.byte_offset(), Some(99));
        assert_eq!(header.offset_within_epoch(), None);

        header.set_offset(RecordOffset::WithinEpoch(42));
        assert!(header.contain_offset_within_epoch());
        assert_eq!(header.offset_within_epoch(), Some(42));
        assert_eq!(header.byte_offset(), None);

        header.set_offset(RecordOffset::Bytes(7));
        assert!(!header.contain_offset_within_epoch());
        assert_eq!(header.raw_offset(), 7);
    }

    #[test]
    fn test_wire_layout() {
        let header = TailRecordHeader::new(
            1,
            500,
            1000,
            TailRecordHeader::OFFSET_WITHIN_EPOCH,
            42,
        );
        let wire = header.to_wire();

        assert_eq!(&wire[0..8], &1u64.to_le_bytes());
        assert_eq!(&wire[8..16], &500u64.to_le_bytes());
        assert_eq!(&wire[16..24], &1000i64.to_le_bytes());
        assert_eq!(&wire[24..28], &TailRecordHeader::OFFSET_WITHIN_EPOCH.to_le_bytes());
        assert_eq!(&wire[28..36], &42u64.to_le_bytes());

        let mut cursor = &wire[..];
        assert_eq!(TailRecordHeader::get(&mut cursor), header);
    }

    #[test]
    fn test_lsn_helpers() {
        let lsn = compose_lsn(3, 17);
        assert_eq!(epoch_of(lsn), 3);
        assert_eq!(esn_of(lsn), 17);
        assert_eq!(lsn_to_string(lsn), "e3n17");
        assert_eq!(lsn_to_string(500), "e0n500");
    }

    #[test]
    fn test_offset_display() {
        assert_eq!(RecordOffset::WithinEpoch(5).to_string(), "O:5");
        assert_eq!(RecordOffset::Bytes(6).to_string(), "B:6");
    }
}
