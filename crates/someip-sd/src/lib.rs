//! SOME/IP Service Discovery: entry/option codec and the server/client
//! state machines that drive dynamic service and eventgroup availability
//! (§3, §4.7, §4.8, §4.9).

pub mod client;
pub mod codec;
pub mod config;
pub mod entry;
pub mod error;
pub mod option;
pub mod server;

pub use client::{EventgroupKey, SdClient, SdClientAction, ServiceKey as ClientServiceKey};
pub use codec::{SdMessage, SD_INTERFACE_VERSION};
pub use config::SdConfig;
pub use entry::{OptionRun, SdEntry, ENTRY_SIZE, TTL_INFINITE};
pub use error::{Result, SdError};
pub use option::{L4Proto, SdOption};
pub use server::{SdServer, SdServerAction, ServiceKey as ServerServiceKey};
