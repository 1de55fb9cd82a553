//! Error Types for LogTail
//!
//! This module defines the errors produced while encoding or decoding tail
//! records and their wire primitives.
//!
//! ## Error Categories
//!
//! ### Wire Errors
//! - `BadMsg`: Input bytes are malformed (truncated, overrun of a declared size,
//!   unexpected trailing bytes from a known protocol version, a length field
//!   at or above the configured maximum message length)
//!
//! ### Caller Errors
//! - `InvalidParam`: The caller asked to encode something that cannot be encoded
//!   (for example the invalid "no tail known yet" record)
//!
//! ### Configuration Errors
//! - `Config`: A `ProtocolConfig` failed validation
//!
//! ## Sticky Errors
//! `ProtocolReader` and `ProtocolWriter` remember the first error they see, so
//! `Error` is `Clone`. It deliberately carries no `std::io::Error`.
//!
//! ## Example
//! ```ignore
//! use logtail_core::{Error, Result};
//!
//! fn check_len(len: usize, max: usize) -> Result<()> {
//!     if len >= max {
//!         return Err(Error::bad_msg(format!("length {} exceeds max {}", len, max)));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Bad message: {0}")]
    BadMsg(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn bad_msg(msg: impl Into<String>) -> Self {
        Self::BadMsg(msg.into())
    }

    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Self::InvalidParam(msg.into())
    }

    /// Short, stable label used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Self::BadMsg(_) => "bad_msg",
            Self::InvalidParam(_) => "invalid_param",
            Self::Config(_) => "config",
        }
    }

    pub fn is_bad_msg(&self) -> bool {
        matches!(self, Self::BadMsg(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
