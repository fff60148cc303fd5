//! The reference E2E profile: CRC + per-DataID counter + freshness (§4.4).

use std::collections::HashMap;
use std::sync::Mutex;

use someip_wire::{E2eHeader, Message};

use crate::config::E2eConfig;
use crate::error::{E2eError, Result};
use crate::profile::Profile;

/// Numeric id of the shipped reference profile in the registry.
pub const REFERENCE_PROFILE_ID: u32 = 1;
/// Name of the shipped reference profile in the registry.
pub const REFERENCE_PROFILE_NAME: &str = "e2e-reference";

#[derive(Debug, Clone, Copy, Default)]
struct DataIdState {
    last_counter: u32,
}

/// CRC + counter + freshness profile built from public CRC standards
/// (§4.3, §4.4). State is keyed per DataID and protected by a short-lived
/// lock; no lock is held across a callback.
#[derive(Debug, Default)]
pub struct ReferenceProfile {
    state: Mutex<HashMap<u16, DataIdState>>,
}

impl ReferenceProfile {
    /// Creates a profile with no prior counter history.
    pub fn new() -> Self {
        Self::default()
    }

    fn check_counter(&self, data_id: u16, counter: u32, config: &E2eConfig) -> Result<()> {
        #[allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]
        let mut table = self.state.lock().expect("e2e state poisoned");
        let entry = table.entry(data_id).or_default();
        let last = entry.last_counter;

        if last == 0 {
            if counter == 0 || counter > config.max_counter_value {
                return Err(E2eError::InvalidArgument(format!(
                    "first counter {counter} out of range 1..={}",
                    config.max_counter_value
                )));
            }
            entry.last_counter = counter;
            return Ok(());
        }

        if counter == last {
            if config.accept_repeated_counter {
                return Ok(());
            }
            return Err(E2eError::InvalidArgument(format!(
                "repeated counter {counter} rejected under strict monotonicity"
            )));
        }

        if counter > last {
            entry.last_counter = counter;
            return Ok(());
        }

        // counter < last: only acceptable inside the wrap window.
        let near_wrap = last > config.max_counter_value.saturating_sub(10);
        let in_low_range = counter >= 1 && counter <= 10;
        if near_wrap && in_low_range {
            entry.last_counter = counter;
            return Ok(());
        }

        Err(E2eError::InvalidArgument(format!(
            "counter {counter} is a replay of an already-seen value (last {last})"
        )))
    }

    fn next_counter(&self, data_id: u16, config: &E2eConfig) -> u32 {
        #[allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]
        let mut table = self.state.lock().expect("e2e state poisoned");
        let entry = table.entry(data_id).or_default();
        entry.last_counter = if entry.last_counter >= config.max_counter_value {
            1
        } else {
            entry.last_counter + 1
        };
        entry.last_counter
    }

    fn check_freshness(freshness: u16, now_ms: u64, timeout_ms: u16) -> Result<()> {
        let now16 = (now_ms & 0xFFFF) as u16;
        let d = now16.wrapping_sub(freshness);
        let upper = (1u32 << 16) - u32::from(timeout_ms);
        if d > timeout_ms && u32::from(d) < upper {
            return Err(E2eError::Timeout(format!(
                "freshness distance {d}ms outside tolerance {timeout_ms}ms"
            )));
        }
        Ok(())
    }
}

impl Profile for ReferenceProfile {
    fn id(&self) -> u32 {
        REFERENCE_PROFILE_ID
    }

    fn name(&self) -> &str {
        REFERENCE_PROFILE_NAME
    }

    fn protect(&self, message: &mut Message, config: &E2eConfig, now_ms: u64) -> Result<()> {
        let counter = if config.enable_counter {
            self.next_counter(config.data_id, config)
        } else {
            0
        };
        let freshness = if config.enable_freshness {
            (now_ms & 0xFFFF) as u16
        } else {
            0
        };

        let mut header = E2eHeader {
            crc: 0,
            counter,
            data_id: config.data_id,
            freshness,
        };
        message.set_e2e_header(header);

        if config.enable_crc {
            let crc = config.crc_width.checksum(&message.signing_data());
            header.crc = crc;
            message.set_e2e_header(header);
        }

        Ok(())
    }

    fn validate(&self, message: &Message, config: &E2eConfig, now_ms: u64) -> Result<()> {
        let header = message
            .e2e_header()
            .ok_or_else(|| E2eError::InvalidArgument("message carries no E2E header".into()))?;

        if header.data_id != config.data_id {
            return Err(E2eError::InvalidArgument(format!(
                "data id mismatch: header {} config {}",
                header.data_id, config.data_id
            )));
        }

        if config.enable_crc {
            let expected = config.crc_width.checksum(&message.signing_data());
            let mask: u32 = match config.crc_width {
                someip_wire::CrcWidth::Crc8 => 0xFF,
                someip_wire::CrcWidth::Crc16 => 0xFFFF,
                someip_wire::CrcWidth::Crc32 => u32::MAX,
            };
            if (header.crc & mask) != (expected & mask) {
                return Err(E2eError::InvalidArgument(format!(
                    "crc mismatch: header 0x{:X} computed 0x{:X}",
                    header.crc, expected
                )));
            }
        }

        if config.enable_counter {
            self.check_counter(header.data_id, header.counter, config)?;
        }

        if config.enable_freshness {
            Self::check_freshness(header.freshness, now_ms, config.freshness_timeout_ms)?;
        }

        Ok(())
    }
}
