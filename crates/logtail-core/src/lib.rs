pub mod config;
pub mod error;
pub mod header;
pub mod protocol;

pub use config::ProtocolConfig;
pub use error::{Error, Result};
pub use header::{RecordOffset, TailRecordHeader};
pub use protocol::{ProtocolReader, ProtocolWriter, WireValue};
