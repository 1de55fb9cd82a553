//! Protocol Configuration
//!
//! Controls how tail records are framed on the wire:
//!
//! - **max_message_len**: Upper bound for a single payload; encoders treat a
//!   payload at or above it as a bug, decoders reject it as malformed
//!   (default: 32MB)
//! - **linked_output**: Let `ProtocolWriter::write_without_copy` reference the
//!   caller's buffer instead of copying it (default: true)
//!
//! ## Usage
//!
//! ```ignore
//! use logtail_core::ProtocolConfig;
//!
//! let config: ProtocolConfig = serde_json::from_str(r#"{"max_message_len": 1048576}"#)?;
//! config.validate()?;
//!
//! let writer = ProtocolWriter::with_config(&config);
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Maximum payload length in bytes (default: 32MB)
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,

    /// Link large buffers into writer output instead of copying (default: true)
    #[serde(default = "default_linked_output")]
    pub linked_output: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_message_len: default_max_message_len(),
            linked_output: default_linked_output(),
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_message_len == 0 {
            return Err(Error::Config("max_message_len must be non-zero".to_string()));
        }
        if self.max_message_len > u32::MAX as usize {
            return Err(Error::Config(format!(
                "max_message_len {} does not fit a u32 length field",
                self.max_message_len
            )));
        }
        Ok(())
    }
}

fn default_max_message_len() -> usize {
    32 * 1024 * 1024 // 32MB
}

fn default_linked_output() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProtocolConfig::default();
        assert_eq!(config.max_message_len, 32 * 1024 * 1024);
        assert!(config.linked_output);
        config.validate().unwrap();
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: ProtocolConfig = serde_json::from_str(r#"{"linked_output": false}"#).unwrap();
        assert_eq!(config.max_message_len, 32 * 1024 * 1024);
        assert!(!config.linked_output);

        let config: ProtocolConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ProtocolConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = ProtocolConfig {
            max_message_len: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
