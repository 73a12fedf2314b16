//! Hardware Abstraction Layer for the Merrifield / Moorefield MIPI-DSI display
//! path.
//!
//! This crate provides trait-based abstractions for everything the DSI packet
//! sender and the panel drivers touch outside of themselves, enabling
//! development and testing without the SoC.
//!
//! # Architecture Layers
//!
//! ```text
//! Panel drivers + DsiOutput (panel crate)
//!         ↓
//! Packet sender + DSR power gate (dsi crate)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! MMIO register file, PMU power islands, GPIO
//! ```
//!
//! # Abstractions
//!
//! - [`RegisterFile`] - 32-bit MMIO register access
//! - [`PowerIslandManager`] - platform power-island gating
//! - [`DisplayTiming`] / [`PhysicalSize`] - panel geometry reported to the pipeline
//! - [`poll`] - bounded busy-poll helper used by every hardware wait
//!
//! # Features
//!
//! - `std`: Enable standard library support and the [`mocks`] module (for testing)
//! - `defmt`: Enable defmt `Format` derives
//!
//! # Example
//!
//! ```
//! use platform::{poll::poll_with_timeout, PollConfig, RegisterFile};
//!
//! fn wait_ready<R: RegisterFile, D: embedded_hal::delay::DelayNs>(
//!     regs: &mut R,
//!     delay: &mut D,
//! ) -> bool {
//!     poll_with_timeout(delay, PollConfig::new(100, 10), || regs.read32(0xb000) & 1 != 0).is_ok()
//! }
//! ```

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
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(feature = "std")]
extern crate std;

pub mod display;
pub mod poll;
pub mod power;
pub mod registers;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

pub use display::{ConnectionStatus, DisplayTiming, PhysicalSize};
pub use poll::{PollConfig, PollTimeout};
pub use power::{PowerIsland, PowerIslandManager};
pub use registers::RegisterFile;
