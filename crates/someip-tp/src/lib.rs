//! SOME/IP-TP: segmentation and reassembly of oversized messages (§4.5, §4.6).

pub mod config;
pub mod error;
pub mod reassembler;
pub mod segment;
pub mod segmenter;

pub use config::{TpConfig, MAX_SEGMENT_SIZE_CEILING};
pub use error::{Result, TpError};
pub use reassembler::{Reassembler, ReassemblyKey};
pub use segment::{Segment, SEGMENT_ALIGNMENT, TP_HEADER_SIZE};
pub use segmenter::Segmenter;
