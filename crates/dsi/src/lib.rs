//! MIPI-DSI packet sender and DSR power gate for the Merrifield display
//! controller.
//!
//! # Layers
//!
//! ```text
//! DsiOutput (panel crate: one lock per output)
//!         ↓
//! Dsr ──── DsrHardware ──── DsiLink (power islands, controller image)
//!                              ↓
//!                        PacketSender (queue, pool, framing, FIFO waits,
//!                              ↓       interrupt error handler)
//!                        RegisterFile (platform)
//! ```
//!
//! Everything here is synchronous: an operation either completes or
//! busy-polls a hardware bit within a fixed budget before returning.
//!
//! # Example
//!
//! ```
//! use dsi::{CommandSet, Delivery, PacketSender, Pipe, SenderConfig, TransmissionMode};
//! use embedded_hal_mock::eh1::delay::NoopDelay;
//! use platform::mocks::MockRegisterFile;
//!
//! let regs = MockRegisterFile::new();
//! regs.set(dsi::regs::GEN_FIFO_STAT, dsi::regs::ALL_FIFOS_EMPTY);
//!
//! let mut sender = PacketSender::new(regs.clone(), NoopDelay, Pipe::Primary, SenderConfig::default());
//! sender
//!     .send_short(CommandSet::Mcs, 0x11, 0, 0, TransmissionMode::HighSpeed, Delivery::Immediate)
//!     .unwrap();
//! assert_eq!(regs.writes(), [(dsi::regs::HS_GEN_CTRL, 0x1105)]);
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
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(feature = "std")]
extern crate std;

// Must stay first: the logging macros are textually scoped.
#[macro_use]
mod fmt;

pub mod config;
pub mod controller;
pub mod dsr;
pub mod error;
pub mod link;
pub mod packet;
pub mod pool;
pub mod regs;
pub mod sender;

pub use config::{DsrConfig, DsrLevel, SenderConfig};
pub use controller::{DsiControllerContext, PixelFormat};
pub use dsr::{Dsr, DsrHardware, DsrState};
pub use error::DsiError;
pub use link::DsiLink;
pub use packet::{CommandSet, Delivery, DpiSpecial, Packet, PacketKind, TransmissionMode};
pub use pool::PacketPool;
pub use regs::{DsiRegisterMap, Pipe};
pub use sender::{PacketSender, SenderStatus, WorkingPanel};
