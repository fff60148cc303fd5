//! SOME/IP wire codec: big-endian byte cursor, CRC primitives, and the
//! fixed message header/E2E header/message framing.

pub mod crc;
pub mod cursor;
pub mod error;
pub mod header;
pub mod message;

pub use crc::CrcWidth;
pub use cursor::{Reader, Writer};
pub use error::{Result, WireError};
pub use header::{Header, MessageType, HEADER_SIZE, PROTOCOL_VERSION, SD_METHOD_ID, SD_SERVICE_ID};
pub use message::{E2eHeader, Message, WireConfig, E2E_HEADER_SIZE};
