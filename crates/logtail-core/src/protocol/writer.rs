//! Protocol Writer
//!
//! `ProtocolWriter` accumulates an encoded message. In linked mode
//! (`ProtocolConfig::linked_output`) large caller-owned buffers passed to
//! `write_without_copy` are kept as separate `Bytes` chunks that reference the
//! caller's memory; everything else is appended to a contiguous `BytesMut`.
//!
//! ```text
//! write(header)            ──► current: [header]
//! write(blob_size)         ──► current: [header | blob_size]
//! write_without_copy(p)    ──► chunks:  [header | blob_size] [p]   (no copy)
//! write(next)              ──► current: [next]
//! ```
//!
//! Transports that support vectored writes take `into_chunks()`; everyone
//! else calls `finish()` and gets one contiguous buffer.

use bytes::{BufMut, Bytes, BytesMut};

use super::WireValue;
use crate::config::ProtocolConfig;
use crate::{Error, Result};

/// Builds an encoded message with sticky error tracking
#[derive(Debug)]
pub struct ProtocolWriter {
    /// Bytes written since the last linked chunk
    current: BytesMut,

    /// Completed chunks, in order
    chunks: Vec<Bytes>,

    /// Total bytes written across all chunks
    bytes_written: usize,

    /// First error seen
    error: Option<Error>,

    /// Upper bound for any single payload written through this writer
    max_message_len: usize,

    /// Whether `write_without_copy` may link caller buffers
    linked_output: bool,
}

impl Default for ProtocolWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolWriter {
    pub fn new() -> Self {
        Self::with_config(&ProtocolConfig::default())
    }

    pub fn with_config(config: &ProtocolConfig) -> Self {
        Self {
            current: BytesMut::new(),
            chunks: Vec::new(),
            bytes_written: 0,
            error: None,
            max_message_len: config.max_message_len,
            linked_output: config.linked_output,
        }
    }

    /// Write a fixed-layout value. No-op once an error is set.
    pub fn write<T: WireValue>(&mut self, value: &T) {
        if self.error.is_some() {
            return;
        }
        value.put(&mut self.current);
        self.bytes_written += T::WIRE_SIZE;
    }

    /// Append raw bytes, always copying.
    pub fn write_bytes(&mut self, data: &[u8]) {
        if self.error.is_some() {
            return;
        }
        self.current.put_slice(data);
        self.bytes_written += data.len();
    }

    /// Emit `data` by reference when the writer is in linked mode, otherwise
    /// copy it like `write_bytes`.
    pub fn write_without_copy(&mut self, data: &Bytes) {
        if self.error.is_some() || data.is_empty() {
            return;
        }
        if !self.linked_output {
            self.write_bytes(data);
            return;
        }

        self.seal_current();
        self.chunks.push(data.clone());
        self.bytes_written += data.len();
    }

    /// Record an error. Only the first one is kept.
    pub fn set_error(&mut self, error: Error) {
        if self.error.is_none() {
            tracing::debug!(
                error = %error,
                bytes_written = self.bytes_written,
                "protocol writer error"
            );
            self.error = Some(error);
        }
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub fn max_message_len(&self) -> usize {
        self.max_message_len
    }

    /// Number of chunks the output currently spans
    pub fn chunk_count(&self) -> usize {
        self.chunks.len() + usize::from(!self.current.is_empty())
    }

    /// Return the encoded message as a list of chunks without copying.
    pub fn into_chunks(mut self) -> Result<Vec<Bytes>> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.seal_current();
        Ok(self.chunks)
    }

    /// Return the encoded message as one contiguous buffer.
    pub fn finish(mut self) -> Result<Bytes> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        if self.chunks.is_empty() {
            return Ok(self.current.freeze());
        }

        let mut output = BytesMut::with_capacity(self.bytes_written);
        for chunk in &self.chunks {
            output.put_slice(chunk);
        }
        output.put_slice(&self.current);
        Ok(output.freeze())
    }

    fn seal_current(&mut self) {
        if !self.current.is_empty() {
            let sealed = self.current.split().freeze();
            self.chunks.push(sealed);
        }
    }
}
