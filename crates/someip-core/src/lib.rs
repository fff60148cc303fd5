//! Facade crate tying the SOME/IP wire codec, E2E protection, TP
//! segmentation/reassembly, and Service Discovery together (§6).

pub mod config;
pub mod env;
pub mod error;
pub mod stack;
pub mod transport;

pub use config::Config;
pub use env::{Environment, SystemEnv};
pub use error::{Result, StackError};
pub use stack::{contains_find, Inbound, Stack};
pub use transport::Transport;
