//! DSR (Display Self Refresh) power gate
//!
//! A command-mode panel keeps showing the last frame from its own memory, so
//! while nothing is drawn the SoC side of the link can be powered down. The
//! gate counts idle tearing events and enters self refresh once the output
//! has been idle for long enough; any user of the link brackets its traffic
//! with [`Dsr::forbid_locked`] / [`Dsr::allow_locked`], which powers the link
//! back up first.
//!
//! # States
//!
//! ```text
//! Init < Exited < EnteredLevel0 < EnteredLevel1
//!
//! Exited --idle TE #threshold+1--> EnteredLevelN   (ref_count == 0 only)
//! EnteredLevelN --forbid / exit--> Exited
//! ```
//!
//! Level 0 turns the DBI link off. Level 1 additionally power-gates the
//! display island, after the FIFOs have drained.
//!
//! # Locking
//!
//! Every `_locked` method expects the caller to hold the output lock that
//! owns the gate. Holding `&mut Dsr` and `&mut H` together is that proof;
//! the output layer provides the unlocked wrappers.
//!
//! # Invariant
//!
//! `ref_count > 0` implies `state <= Exited` after every call, including
//! failed ones.

use crate::config::{DsrConfig, DsrLevel};
use crate::error::DsiError;

/// Self-refresh state, ordered from most to least powered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DsrState {
    /// Gate created, link state not established yet
    Init,
    /// Link powered
    Exited,
    /// DBI link off
    EnteredLevel0,
    /// Link off and display island gated
    EnteredLevel1,
}

impl DsrLevel {
    /// State reached by entering this level
    pub const fn state(self) -> DsrState {
        match self {
            Self::Level0 => DsrState::EnteredLevel0,
            Self::Level1 => DsrState::EnteredLevel1,
        }
    }
}

/// Hardware actions the gate sequences.
///
/// Implemented by [`DsiLink`](crate::DsiLink); tests use instrumented fakes.
pub trait DsrHardware {
    /// Turn the DBI link and its PHY off.
    fn link_off(&mut self) -> Result<(), DsiError>;
    /// Bring the DBI link back up and reprogram the controller.
    fn link_on(&mut self) -> Result<(), DsiError>;
    /// Drain the FIFOs and power-gate the display island.
    fn island_off(&mut self) -> Result<(), DsiError>;
    /// Power the display island back on.
    fn island_on(&mut self) -> Result<(), DsiError>;
    /// Whether the panel is currently powered on
    fn panel_on(&self) -> bool;
}

impl<T: DsrHardware + ?Sized> DsrHardware for &mut T {
    fn link_off(&mut self) -> Result<(), DsiError> {
        T::link_off(self)
    }

    fn link_on(&mut self) -> Result<(), DsiError> {
        T::link_on(self)
    }

    fn island_off(&mut self) -> Result<(), DsiError> {
        T::island_off(self)
    }

    fn island_on(&mut self) -> Result<(), DsiError> {
        T::island_on(self)
    }

    fn panel_on(&self) -> bool {
        T::panel_on(self)
    }
}

/// DSR gate for one command-mode output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dsr {
    state: DsrState,
    config: DsrConfig,
    ref_count: u32,
    free_count: u32,
}

impl Dsr {
    /// Create a gate in [`DsrState::Init`].
    pub fn new(config: DsrConfig) -> Self {
        Self {
            state: DsrState::Init,
            config,
            ref_count: 0,
            free_count: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> DsrState {
        self.state
    }

    /// Forbid depth
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    /// Idle tearing events counted since the last activity
    pub fn free_count(&self) -> u32 {
        self.free_count
    }

    /// Whether idle entry is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Level entered once idle
    pub fn level(&self) -> DsrLevel {
        self.config.level
    }

    /// Idle TE count tolerated before entering
    pub fn idle_threshold(&self) -> u32 {
        self.config.idle_threshold
    }

    /// Choose the level entered once idle.
    pub fn set_level(&mut self, level: DsrLevel) {
        self.config.level = level;
    }

    /// Allow idle entry. The link is powered when this is called.
    pub fn enable(&mut self) {
        self.config.enabled = true;
        if self.state == DsrState::Init {
            self.state = DsrState::Exited;
        }
        self.free_count = 0;
        debug!("DSR enabled, level {:?}", self.config.level);
    }

    /// Stop idle entry, powering the link back up if needed.
    pub fn disable_locked<H: DsrHardware>(&mut self, hw: &mut H) -> Result<(), DsiError> {
        self.config.enabled = false;
        self.exit_locked(hw)
    }

    // -----------------------------------------------------------------------
    // Locked operations
    // -----------------------------------------------------------------------

    /// Take a forbid reference, exiting self refresh first if needed.
    ///
    /// If the exit fails the count is left unchanged and the error returned.
    pub fn forbid_locked<H: DsrHardware>(&mut self, hw: &mut H) -> Result<(), DsiError> {
        if self.ref_count == 0 && self.state > DsrState::Exited {
            self.exit_locked(hw)?;
        }
        self.ref_count = self.ref_count.saturating_add(1);
        self.free_count = 0;
        Ok(())
    }

    /// Drop a forbid reference. Never enters self refresh by itself.
    pub fn allow_locked(&mut self) {
        if self.ref_count == 0 {
            error!("DSR allow without matching forbid");
            return;
        }
        self.ref_count = self.ref_count.saturating_sub(1);
    }

    /// Count one tearing event; enters self refresh on the idle TE after
    /// `idle_threshold`.
    pub fn report_te_locked<H: DsrHardware>(&mut self, hw: &mut H) -> Result<(), DsiError> {
        let target = self.config.level.state();
        if !self.config.enabled || !hw.panel_on() || target <= self.state {
            return Ok(());
        }

        self.free_count = self.free_count.saturating_add(1);
        if self.free_count <= self.config.idle_threshold || self.ref_count != 0 {
            return Ok(());
        }
        self.free_count = 0;
        self.enter_locked(hw, self.config.level)
    }

    /// Enter `level`. On failure the gate stays in its current state and any
    /// partial power-down is rolled back.
    pub fn enter_locked<H: DsrHardware>(&mut self, hw: &mut H, level: DsrLevel) -> Result<(), DsiError> {
        if self.ref_count != 0 {
            return Err(DsiError::Busy);
        }
        if level.state() <= self.state {
            return Ok(());
        }

        let link_was_on = self.state <= DsrState::Exited;
        if link_was_on {
            hw.link_off().map_err(|e| {
                warn!("DSR enter: link off failed: {:?}", e);
                e
            })?;
        }

        if level == DsrLevel::Level1 {
            if let Err(e) = hw.island_off() {
                warn!("DSR enter: island off refused: {:?}", e);
                if link_was_on {
                    if let Err(e) = hw.link_on() {
                        error!("DSR enter rollback: link on failed: {:?}", e);
                        self.state = DsrState::EnteredLevel0;
                    }
                }
                return Err(DsiError::PowerTransitionDenied);
            }
        }

        self.state = level.state();
        debug!("DSR entered {:?}", self.state);
        Ok(())
    }

    /// Power everything back up. On failure the state reflects what is
    /// still gated.
    pub fn exit_locked<H: DsrHardware>(&mut self, hw: &mut H) -> Result<(), DsiError> {
        if self.state <= DsrState::Exited {
            self.state = DsrState::Exited;
            return Ok(());
        }

        if self.state == DsrState::EnteredLevel1 {
            hw.island_on().map_err(|e| {
                error!("DSR exit: island on failed: {:?}", e);
                e
            })?;
            self.state = DsrState::EnteredLevel0;
        }

        hw.link_on().map_err(|e| {
            error!("DSR exit: link on failed: {:?}", e);
            e
        })?;

        self.state = DsrState::Exited;
        self.free_count = 0;
        debug!("DSR exited");
        Ok(())
    }

    /// Frame-update path: make sure the link is up and restart idle counting.
    pub fn exit_for_update_locked<H: DsrHardware>(&mut self, hw: &mut H) -> Result<(), DsiError> {
        self.exit_locked(hw)?;
        self.free_count = 0;
        Ok(())
    }
}
