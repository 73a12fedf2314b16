//! Sender and DSR tunables
//!
//! Every bounded hardware wait is described by a [`PollConfig`]; the defaults
//! are the budgets the Merrifield controller is known to need.

use platform::PollConfig;

/// Packet sender configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SenderConfig {
    /// Generic / DBI FIFO empty wait (10 000 × 3 µs ≈ 30 ms)
    pub fifo_poll: PollConfig,
    /// Read response wait (5 000 × 100 µs ≈ 500 ms)
    pub read_poll: PollConfig,
    /// DBI command buffer ready wait before a frame update (1 000 × 10 µs)
    pub dbi_ready_poll: PollConfig,
    /// Clear attempts for a persisting high-contention interrupt
    pub contention_retries: u8,
    /// DSI virtual channel stamped into every packet header (0..=3)
    pub virtual_channel: u8,
    /// Bus address of the DBI command buffer holding `write_mem_start`
    pub dbi_cb_addr: u32,
}

impl SenderConfig {
    /// Default configuration
    pub const DEFAULT: Self = Self {
        fifo_poll: PollConfig::new(10_000, 3),
        read_poll: PollConfig::new(5_000, 100),
        dbi_ready_poll: PollConfig::new(1_000, 10),
        contention_retries: 3,
        virtual_channel: 0,
        dbi_cb_addr: 0,
    };

    /// Same configuration with another command buffer address.
    #[must_use]
    pub const fn with_dbi_cb_addr(mut self, addr: u32) -> Self {
        self.dbi_cb_addr = addr;
        self
    }
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How deep the DSR gate powers down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DsrLevel {
    /// DBI link off, display island kept powered
    Level0,
    /// Link off and display island power-gated
    Level1,
}

/// DSR gate configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DsrConfig {
    /// Idle tearing events tolerated before entering; entry happens on the next one
    pub idle_threshold: u32,
    /// Level entered once idle
    pub level: DsrLevel,
    /// Start enabled
    pub enabled: bool,
}

impl Default for DsrConfig {
    fn default() -> Self {
        Self {
            idle_threshold: 15,
            level: DsrLevel::Level1,
            enabled: false,
        }
    }
}
