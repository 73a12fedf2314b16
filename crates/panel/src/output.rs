//! One DSI output: link, DSR gate and panel behind a single lock
//!
//! Four paths share an output: panel orchestration (power, brightness),
//! the periodic ESD check, the TE interrupt path and the frame-update path.
//! All of them go through [`DsiOutput`], which serializes them with one
//! `embassy_sync` blocking mutex.
//!
//! # Locking
//!
//! Every public method takes the lock once. Code that already holds it (a
//! closure passed to [`DsiOutput::lock`]) works on [`OutputState`] directly
//! and uses the `_locked` DSR methods. Calling back into `DsiOutput` from
//! inside the lock fails with `Busy` instead of deadlocking.
//!
//! # Tearing effects from interrupt context
//!
//! The TE interrupt never takes the lock. It calls
//! [`DsiOutput::signal_tearing_effect`], one atomic increment, and the
//! counted events are folded into the sender and the DSR gate by the next
//! locked call that services them ([`DsiOutput::service_tearing_effects`],
//! [`DsiOutput::on_tearing_effect`] or [`DsiOutput::update_frame`]).
//!
//! # Mutex choice
//!
//! Panel power sequences sleep for up to 120 ms while holding the lock, so
//! the lock must never mask interrupts on target:
//!
//! - `NoopRawMutex`: output owned by a single thread of execution
//! - `ThreadModeRawMutex`: output in a `static`, TE signalled from the ISR
//!
//! `CriticalSectionRawMutex` sets PRIMASK for every hold; it is only used by
//! the host tests, where the std critical-section impl is a plain mutex.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use dsi::{DsiError, DsiLink, Dsr, DsrConfig, DsrLevel, DsrState};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;
use platform::{ConnectionStatus, PowerIslandManager, RegisterFile};

use crate::driver::{DsiMode, PanelDriver};
use crate::error::PanelError;

/// Result of [`DsiOutput::esd_check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EsdOutcome {
    /// Panel is off, nothing to check
    Skipped,
    /// Panel reported the expected power mode
    Healthy,
    /// Check failed; panel and sender were re-initialized
    Recovered,
}

/// Everything the output lock protects.
pub struct OutputState<R, D, P, PNL> {
    /// Sender, power islands and controller image
    pub link: DsiLink<R, D, P>,
    /// Self-refresh gate (command-mode panels only)
    pub dsr: Option<Dsr>,
    /// Panel driver
    pub panel: PNL,
}

impl<R, D, P, PNL> OutputState<R, D, P, PNL>
where
    R: RegisterFile,
    D: DelayNs,
    P: PowerIslandManager,
    PNL: PanelDriver,
{
    /// Run `f` with a DSR forbid reference held, so the link stays powered.
    ///
    /// The reference is dropped whatever `f` returns. If the gate cannot be
    /// exited, `f` does not run.
    pub fn forbidden<T, F>(&mut self, f: F) -> Result<T, PanelError>
    where
        F: FnOnce(&mut Self) -> Result<T, PanelError>,
    {
        if let Some(dsr) = self.dsr.as_mut() {
            dsr.forbid_locked(&mut self.link)?;
        }
        let result = f(self);
        if let Some(dsr) = self.dsr.as_mut() {
            dsr.allow_locked();
        }
        result
    }

    /// Run a panel operation against the sender inside a hardware-access
    /// bracket on the display island.
    pub fn with_panel<T, F>(&mut self, f: F) -> Result<T, PanelError>
    where
        F: FnOnce(&mut PNL, &mut dsi::PacketSender<R, D>) -> Result<T, PanelError>,
    {
        let island = self.link.island();
        let Self { link, panel, .. } = &mut *self;
        link.with_hw(island, true, |link| f(panel, link.sender()))
    }

    /// Full panel bring-up: sender reset, controller programming, reset
    /// pulse, vendor init, power-on.
    pub fn bring_up(&mut self) -> Result<(), PanelError> {
        self.link.sender().reinit();
        let island = self.link.island();
        let Self { link, panel, .. } = &mut *self;
        link.with_hw(island, true, |link| {
            link.program_controller()?;
            let sender = link.sender();
            panel.reset(sender)?;
            panel.exit_deep_standby(sender)?;
            panel.drv_ic_init(sender)?;
            panel.power_on(sender)
        })?;
        self.link.set_panel_on(true);
        Ok(())
    }
}

/// One DSI output.
///
/// Generic over:
/// - `M`: the raw mutex guarding the output
/// - `R`, `D`, `P`: register file, delay and power manager of the link
/// - `PNL`: the [`PanelDriver`]
pub struct DsiOutput<M: RawMutex, R, D, P, PNL> {
    state: Mutex<M, RefCell<OutputState<R, D, P, PNL>>>,
    /// TEs signalled but not yet serviced under the lock
    te_pending: AtomicU32,
}

impl<M, R, D, P, PNL> DsiOutput<M, R, D, P, PNL>
where
    M: RawMutex,
    R: RegisterFile,
    D: DelayNs,
    P: PowerIslandManager,
    PNL: PanelDriver,
{
    /// Build an output. The panel fills the link's controller image; a DSR
    /// gate is created for command-mode panels when `dsr` is given.
    pub fn new(mut link: DsiLink<R, D, P>, panel: PNL, dsr: Option<DsrConfig>) -> Self {
        panel.dsi_controller_init(link.controller_mut());
        let dsr = match panel.dsi_mode() {
            DsiMode::Command => dsr.map(Dsr::new),
            DsiMode::Video => {
                if dsr.is_some() {
                    warn!("DSR requested for a video-mode panel, ignored");
                }
                None
            }
        };
        Self {
            state: Mutex::new(RefCell::new(OutputState { link, dsr, panel })),
            te_pending: AtomicU32::new(0),
        }
    }

    /// Take the output lock and run `f`.
    ///
    /// Fails with `Busy` if the lock is already held by this context.
    pub fn lock<T, F>(&self, f: F) -> Result<T, PanelError>
    where
        F: FnOnce(&mut OutputState<R, D, P, PNL>) -> Result<T, PanelError>,
    {
        self.state.lock(|cell| {
            let mut state = cell.try_borrow_mut().map_err(|_| {
                warn!("output lock re-entered");
                PanelError::Dsi(DsiError::Busy)
            })?;
            f(&mut state)
        })
    }

    // -----------------------------------------------------------------------
    // Panel orchestration
    // -----------------------------------------------------------------------

    /// Bring the panel up and turn the display on.
    pub fn power_on(&self) -> Result<(), PanelError> {
        self.lock(|s| {
            s.forbidden(OutputState::bring_up)?;
            if let Some(dsr) = s.dsr.as_mut() {
                if dsr.is_enabled() {
                    dsr.enable();
                }
            }
            Ok(())
        })
    }

    /// Turn the display off. The panel is considered off afterwards even if
    /// a command failed.
    pub fn power_off(&self) -> Result<(), PanelError> {
        self.lock(|s| {
            s.forbidden(|s| {
                let result = s.with_panel(|panel, sender| panel.power_off(sender));
                s.link.set_panel_on(false);
                result
            })
        })
    }

    /// Set the backlight. Fails with `InvalidConfig` while the panel is off.
    pub fn set_brightness(&self, level: u8) -> Result<(), PanelError> {
        self.lock(|s| {
            if !s.link.is_panel_on() {
                return Err(PanelError::InvalidConfig);
            }
            s.forbidden(|s| s.with_panel(|panel, sender| panel.set_brightness(sender, level)))
        })
    }

    /// Check whether a panel answers. A sender left abnormal by an unanswered read is
    /// re-initialized.
    pub fn detect(&self) -> Result<ConnectionStatus, PanelError> {
        self.lock(|s| {
            s.forbidden(|s| {
                let status = s.with_panel(|panel, sender| panel.detect(sender));
                let sender = s.link.sender();
                if sender.status() == dsi::SenderStatus::Abnormal {
                    sender.reinit();
                }
                status
            })
        })
    }

    /// Periodic ESD check; on failure the panel is brought up again.
    pub fn esd_check(&self) -> Result<EsdOutcome, PanelError> {
        self.lock(|s| {
            if !s.link.is_panel_on() {
                return Ok(EsdOutcome::Skipped);
            }
            s.forbidden(|s| match s.with_panel(|panel, sender| panel.esd_check(sender)) {
                Ok(()) => Ok(EsdOutcome::Healthy),
                Err(e) if e.is_transient() => Err(e),
                Err(e) => {
                    warn!("ESD check failed: {:?}, re-initializing", e);
                    s.bring_up()?;
                    Ok(EsdOutcome::Recovered)
                }
            })
        })
    }

    // -----------------------------------------------------------------------
    // TE and frame updates
    // -----------------------------------------------------------------------

    /// Count one TE. Safe from interrupt context: never takes the lock.
    pub fn signal_tearing_effect(&self) {
        self.te_pending.fetch_add(1, Ordering::Release);
    }

    /// TEs signalled and not serviced yet
    pub fn pending_tearing_effects(&self) -> u32 {
        self.te_pending.load(Ordering::Acquire)
    }

    /// Fold every signalled TE into the sender and let the DSR gate decide
    /// on entry. Returns the number of events serviced.
    ///
    /// Events stay pending if the lock is already held by this context.
    pub fn service_tearing_effects(&self) -> Result<u32, PanelError> {
        self.lock(|s| self.fold_tearing_effects(s))
    }

    /// TE reported from thread context: signal and service in one call.
    pub fn on_tearing_effect(&self) -> Result<(), PanelError> {
        self.signal_tearing_effect();
        self.service_tearing_effects().map(|_| ())
    }

    /// Every pending TE advances the sequence number and the idle counter.
    /// A refused DSR entry does not stop the remaining events; the first
    /// error is returned.
    fn fold_tearing_effects(&self, s: &mut OutputState<R, D, P, PNL>) -> Result<u32, PanelError> {
        let pending = self.te_pending.swap(0, Ordering::AcqRel);
        let mut first_err = None;
        for _ in 0..pending {
            s.link.sender().report_tearing_event();
            if let Some(dsr) = s.dsr.as_mut() {
                if let Err(e) = dsr.report_te_locked(&mut s.link) {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(pending),
        }
    }

    /// Push a new frame (command-mode panels). Services pending TEs, then
    /// leaves self refresh.
    pub fn update_frame(&self) -> Result<(), PanelError> {
        self.lock(|s| {
            if s.panel.dsi_mode() != DsiMode::Command {
                return Err(PanelError::InvalidConfig);
            }
            if let Err(e) = self.fold_tearing_effects(s) {
                warn!("TE servicing before frame update failed: {:?}", e);
            }
            if let Some(dsr) = s.dsr.as_mut() {
                dsr.exit_for_update_locked(&mut s.link)?;
            }
            s.link.sender().send_dcs_write_mem_start()?;
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // DSR
    // -----------------------------------------------------------------------

    /// Keep the link powered until the matching [`dsr_allow`](Self::dsr_allow).
    pub fn dsr_forbid(&self) -> Result<(), PanelError> {
        self.lock(|s| {
            if let Some(dsr) = s.dsr.as_mut() {
                dsr.forbid_locked(&mut s.link)?;
            }
            Ok(())
        })
    }

    /// Drop a reference taken by [`dsr_forbid`](Self::dsr_forbid).
    pub fn dsr_allow(&self) -> Result<(), PanelError> {
        self.lock(|s| {
            if let Some(dsr) = s.dsr.as_mut() {
                dsr.allow_locked();
            }
            Ok(())
        })
    }

    /// Enable idle entry at `level`.
    pub fn enable_dsr(&self, level: DsrLevel) -> Result<(), PanelError> {
        self.lock(|s| {
            let dsr = s.dsr.as_mut().ok_or(PanelError::InvalidConfig)?;
            dsr.set_level(level);
            dsr.enable();
            Ok(())
        })
    }

    /// Disable idle entry and power the link back up.
    pub fn disable_dsr(&self) -> Result<(), PanelError> {
        self.lock(|s| {
            if let Some(dsr) = s.dsr.as_mut() {
                dsr.disable_locked(&mut s.link)?;
            }
            Ok(())
        })
    }

    /// Current DSR state, `None` without a gate.
    pub fn dsr_state(&self) -> Result<Option<DsrState>, PanelError> {
        self.lock(|s| Ok(s.dsr.as_ref().map(Dsr::state)))
    }

    /// Destroy the DSR gate, leaving the link powered.
    pub fn teardown(&self) -> Result<(), PanelError> {
        self.lock(|s| {
            let Some(mut dsr) = s.dsr.take() else {
                return Ok(());
            };
            let result = dsr.exit_locked(&mut s.link);
            if let Err(e) = result {
                warn!("DSR teardown: exit failed: {:?}", e);
            }
            debug!("DSR gate destroyed");
            result.map_err(PanelError::from)
        })
    }
}
