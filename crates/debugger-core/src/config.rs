//! Session tuning knobs.

use std::time::Duration;

use crate::{
    ConfigError, MemoryPage, DEFAULT_MAX_INSTRUCTIONS_PER_TICK, DEFAULT_REFRESH_INTERVAL,
    DEFAULT_TIME_SLICE,
};

/// Instructions disassembled ahead of PC by default.
pub const DEFAULT_DISASSEMBLY_BEFORE: u16 = 10;
/// Instructions disassembled from PC on by default.
pub const DEFAULT_DISASSEMBLY_AFTER: u16 = 20;
/// Default program load address.
pub const DEFAULT_LOAD_ADDRESS: u16 = 0x0200;

/// Configuration for a debugger session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SessionConfig {
    /// Wall-clock budget of one execution burst.
    pub time_slice: Duration,
    /// Instruction cap of one execution burst.
    pub max_instructions_per_tick: u32,
    /// Refresh timer period while running.
    pub refresh_interval: Duration,
    /// Instructions disassembled before PC on refresh.
    pub disassembly_before: u16,
    /// Instructions disassembled from PC on refresh.
    pub disassembly_after: u16,
    /// Address programs are loaded at unless told otherwise.
    pub load_address: u16,
    /// Memory page shown on refresh.
    pub memory_page: MemoryPage,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_slice: DEFAULT_TIME_SLICE,
            max_instructions_per_tick: DEFAULT_MAX_INSTRUCTIONS_PER_TICK,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            disassembly_before: DEFAULT_DISASSEMBLY_BEFORE,
            disassembly_after: DEFAULT_DISASSEMBLY_AFTER,
            load_address: DEFAULT_LOAD_ADDRESS,
            memory_page: MemoryPage::Ram,
        }
    }
}

impl SessionConfig {
    /// Checks that the run loop can make progress with these values.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.time_slice.is_zero() {
            return Err(ConfigError::ZeroTimeSlice);
        }
        if self.max_instructions_per_tick == 0 {
            return Err(ConfigError::ZeroInstructionCap);
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::ZeroRefreshInterval);
        }
        Ok(())
    }
}
