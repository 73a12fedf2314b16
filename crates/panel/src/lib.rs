//! MIPI-DSI panel drivers and per-output orchestration.
//!
//! - [`PanelDriver`]: what the display core needs from a panel
//!   (reset, init, power, brightness, detect, ESD)
//! - [`CommandModePanel`] / [`VideoModePanel`]: drivers driven by a
//!   [`PanelProfile`] (geometry plus init tables)
//! - [`sequence`]: init tables as data, with critical and best-effort steps
//! - [`DsiOutput`]: the lock that serializes panel calls, TE servicing and
//!   frame updates on one output, and owns its DSR gate; TEs are signalled
//!   lock-free from interrupt context
//!
//! # Example
//!
//! ```
//! use dsi::{DsiLink, DsrConfig, PacketSender, Pipe, SenderConfig};
//! use embassy_sync::blocking_mutex::raw::NoopRawMutex;
//! use embedded_hal_mock::eh1::delay::NoopDelay;
//! use embedded_hal_mock::eh1::digital::Mock as PinMock;
//! use panel::{profiles, CommandModePanel, DsiOutput};
//! use platform::mocks::{MockPowerManager, MockRegisterFile};
//!
//! let regs = MockRegisterFile::new();
//! let sender = PacketSender::new(regs, NoopDelay, Pipe::Primary, SenderConfig::default());
//! let link = DsiLink::new(sender, MockPowerManager::new());
//! let mut rst = PinMock::new(&[]);
//! let panel = CommandModePanel::new(profiles::CMD_720P, rst.clone());
//!
//! let output: DsiOutput<NoopRawMutex, _, _, _, _> = DsiOutput::new(link, panel, Some(DsrConfig::default()));
//! assert_eq!(output.dsr_state().unwrap(), Some(dsi::DsrState::Init));
//! rst.done();
//! ```
//!
//! # Features
//!
//! - `std`: `std::error::Error` impls
//! - `defmt`: logging and `Format` derives for target builds
//! - `tracing`: logging for host builds

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // DCS command names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(feature = "std")]
extern crate std;

// Must stay first: the logging macros are textually scoped.
#[macro_use]
mod fmt;

pub mod cmd;
pub mod driver;
pub mod error;
pub mod output;
pub mod profiles;
pub mod sequence;
pub mod vid;

pub use cmd::CommandModePanel;
pub use driver::{DsiMode, PanelDriver, ResetTiming};
pub use error::PanelError;
pub use output::{DsiOutput, EsdOutcome, OutputState};
pub use profiles::PanelProfile;
pub use sequence::{run_sequence, InitStep};
pub use vid::VideoModePanel;
