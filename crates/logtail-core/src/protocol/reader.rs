//! Protocol Reader
//!
//! `ProtocolReader` walks a received message held as `Bytes`. Every read is
//! bounds-checked; running past the end sets a sticky `BadMsg` error instead of
//! panicking, so malformed input can never cause an out-of-bounds access.
//!
//! ## Trailing Bytes
//!
//! Decoders that know how many bytes a value is supposed to occupy report the
//! unread remainder through `handle_trailing_bytes`. What happens then depends
//! on the policy the decoder picked:
//!
//! - `allow_trailing_bytes()`: the bytes came from a newer protocol version and
//!   are skipped
//! - `disallow_trailing_bytes()` (default): leftover bytes mean the message is
//!   malformed

use bytes::Bytes;
use tracing::debug;

use super::WireValue;
use crate::config::ProtocolConfig;
use crate::{Error, Result};

/// Reads wire values out of a received buffer
#[derive(Debug)]
pub struct ProtocolReader {
    /// The receive buffer
    src: Bytes,

    /// Read position within `src`
    pos: usize,

    /// First error seen
    error: Option<Error>,

    /// Trailing-bytes policy
    allow_trailing: bool,

    /// Upper bound for any single length field
    max_message_len: usize,
}

impl ProtocolReader {
    pub fn new(src: impl Into<Bytes>) -> Self {
        Self::with_config(src, &ProtocolConfig::default())
    }

    pub fn with_config(src: impl Into<Bytes>, config: &ProtocolConfig) -> Self {
        Self {
            src: src.into(),
            pos: 0,
            error: None,
            allow_trailing: false,
            max_message_len: config.max_message_len,
        }
    }

    /// Read a fixed-layout value
    pub fn read<T: WireValue>(&mut self) -> Result<T> {
        self.ensure(T::WIRE_SIZE, std::any::type_name::<T>())?;
        let mut cursor = &self.src[self.pos..self.pos + T::WIRE_SIZE];
        let value = T::get(&mut cursor);
        self.pos += T::WIRE_SIZE;
        Ok(value)
    }

    /// Read `len` bytes as a slice of the receive buffer (no copy).
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.ensure(len, "bytes")?;
        let data = self.src.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok(data)
    }

    /// Read `len` bytes into a fresh allocation.
    pub fn copy_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.ensure(len, "bytes")?;
        let data = Bytes::copy_from_slice(&self.src[self.pos..self.pos + len]);
        self.pos += len;
        Ok(data)
    }

    /// Record an error. Only the first one is kept.
    pub fn set_error(&mut self, error: Error) {
        if self.error.is_none() {
            debug!(error = %error, bytes_read = self.pos, "protocol reader error");
            self.error = Some(error);
        }
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn bytes_read(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.src.len() - self.pos
    }

    pub fn max_message_len(&self) -> usize {
        self.max_message_len
    }

    pub fn allow_trailing_bytes(&mut self) {
        self.allow_trailing = true;
    }

    pub fn disallow_trailing_bytes(&mut self) {
        self.allow_trailing = false;
    }

    pub fn trailing_bytes_allowed(&self) -> bool {
        self.allow_trailing
    }

    /// Deal with `count` bytes the current value declared but the decoder did
    /// not consume. Skipped when trailing bytes are allowed, rejected otherwise.
    pub fn handle_trailing_bytes(&mut self, count: usize) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if count == 0 {
            return Ok(());
        }
        if !self.allow_trailing {
            return Err(self.fail(Error::bad_msg(format!(
                "{} unexpected trailing bytes at offset {}",
                count, self.pos
            ))));
        }

        self.ensure(count, "trailing bytes")?;
        self.pos += count;
        debug!(skipped = count, bytes_read = self.pos, "skipped trailing bytes");
        Ok(())
    }

    /// Check the reader ended cleanly: no error, and no unread bytes unless
    /// trailing bytes are allowed.
    pub fn finish(self) -> Result<()> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if !self.allow_trailing && self.pos < self.src.len() {
            return Err(Error::bad_msg(format!(
                "{} unread bytes at end of message",
                self.src.len() - self.pos
            )));
        }
        Ok(())
    }

    fn ensure(&mut self, len: usize, what: &str) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if self.remaining() < len {
            let remaining = self.remaining();
            return Err(self.fail(Error::bad_msg(format!(
                "truncated {}: need {} bytes, {} remaining",
                what, len, remaining
            ))));
        }
        Ok(())
    }

    fn fail(&mut self, error: Error) -> Error {
        self.set_error(error.clone());
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_scalars() {
        let mut reader = ProtocolReader::new(vec![1u8, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(reader.read::<u32>().unwrap(), 1);
        assert_eq!(reader.read::<u64>().unwrap(), 2);
        assert_eq!(reader.bytes_read(), 12);
        assert_eq!(reader.remaining(), 0);
        reader.finish().unwrap();
    }

    #[test]
    fn test_truncated_read_is_bad_msg() {
        let mut reader = ProtocolReader::new(vec![1u8, 2, 3]);
        let err = reader.read::<u32>().unwrap_err();
        assert!(err.is_bad_msg());
        assert_eq!(reader.bytes_read(), 0);

        // Sticky: even a read that would fit now fails
        assert_eq!(reader.read::<u8>().unwrap_err(), err);
        assert_eq!(reader.error(), Some(&err));
    }

    #[test]
    fn test_read_bytes_aliases_buffer() {
        let src = Bytes::from(vec![9u8; 16]);
        let mut reader = ProtocolReader::new(src.clone());
        reader.read::<u32>().unwrap();

        let slice = reader.read_bytes(8).unwrap();
        assert_eq!(slice.as_ptr(), src[4..].as_ptr());

        let copy = reader.copy_bytes(4).unwrap();
        assert_ne!(copy.as_ptr(), src[12..].as_ptr());
        assert_eq!(&copy[..], &[9, 9, 9, 9]);
    }

    #[test]
    fn test_trailing_bytes_disallowed_by_default() {
        let mut reader = ProtocolReader::new(vec![0u8; 8]);
        assert!(!reader.trailing_bytes_allowed());
        reader.handle_trailing_bytes(0).unwrap();

        let err = reader.handle_trailing_bytes(3).unwrap_err();
        assert!(err.is_bad_msg());
        assert_eq!(reader.bytes_read(), 0);
    }

    #[test]
    fn test_trailing_bytes_skipped_when_allowed() {
        let mut reader = ProtocolReader::new(vec![0u8, 0, 0, 5, 1, 0, 0, 0]);
        reader.allow_trailing_bytes();
        reader.handle_trailing_bytes(4).unwrap();
        assert_eq!(reader.read::<u32>().unwrap(), 1);
    }

    #[test]
    fn test_trailing_bytes_past_end_is_bad_msg() {
        let mut reader = ProtocolReader::new(vec![0u8; 2]);
        reader.allow_trailing_bytes();
        assert!(reader.handle_trailing_bytes(3).unwrap_err().is_bad_msg());
    }

    #[test]
    fn test_finish_rejects_unread_bytes() {
        let mut reader = ProtocolReader::new(vec![1u8, 0, 0, 0, 0xFF]);
        reader.read::<u32>().unwrap();
        assert!(reader.finish().unwrap_err().is_bad_msg());

        let mut reader = ProtocolReader::new(vec![1u8, 0, 0, 0, 0xFF]);
        reader.read::<u32>().unwrap();
        reader.allow_trailing_bytes();
        reader.finish().unwrap();
    }
}
