//! Panel driver interface
//!
//! One implementation per panel family. The output layer calls these in a
//! fixed order on power-up:
//!
//! ```text
//! reset → exit_deep_standby → drv_ic_init → power_on → set_brightness
//! ```
//!
//! `dsi_controller_init` fills the controller image the link restores after
//! every power gating; `detect` and `esd_check` read the DCS power mode.

use dsi::packet::dcs;
use dsi::{CommandSet, Delivery, DsiControllerContext, DsiError, PacketSender, Pipe, TransmissionMode};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use platform::{ConnectionStatus, DisplayTiming, PhysicalSize, RegisterFile};

use crate::error::PanelError;

/// Wait after exit/enter sleep before the next command, in milliseconds.
pub const SLEEP_SETTLE_MS: u32 = 120;

/// How the panel receives pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DsiMode {
    /// DBI: the panel has its own frame memory, updated on demand
    Command,
    /// DPI: pixels are streamed continuously
    Video,
}

/// Panel driver capability table.
///
/// Methods that talk to the panel get the output's packet sender; the
/// caller already holds the output lock and has powered the link.
pub trait PanelDriver {
    /// Command or video mode
    fn dsi_mode(&self) -> DsiMode;

    /// Native display mode
    fn config_mode(&self) -> DisplayTiming;

    /// Physical size of the panel on `pipe`
    fn panel_info(&self, pipe: Pipe) -> PhysicalSize;

    /// Pulse the panel reset line.
    fn reset<R: RegisterFile, D: DelayNs>(&mut self, sender: &mut PacketSender<R, D>) -> Result<(), PanelError>;

    /// Leave deep standby. Most panels have nothing to do.
    fn exit_deep_standby<R: RegisterFile, D: DelayNs>(
        &mut self,
        _sender: &mut PacketSender<R, D>,
    ) -> Result<(), PanelError> {
        Ok(())
    }

    /// Send the vendor initialization table.
    fn drv_ic_init<R: RegisterFile, D: DelayNs>(&mut self, sender: &mut PacketSender<R, D>) -> Result<(), PanelError>;

    /// Describe how the DSI controller must be programmed for this panel.
    fn dsi_controller_init(&self, ctx: &mut DsiControllerContext);

    /// Probe whether a panel answers.
    fn detect<R: RegisterFile, D: DelayNs>(
        &mut self,
        sender: &mut PacketSender<R, D>,
    ) -> Result<ConnectionStatus, PanelError>;

    /// Wake the panel and turn the display on.
    fn power_on<R: RegisterFile, D: DelayNs>(&mut self, sender: &mut PacketSender<R, D>) -> Result<(), PanelError>;

    /// Turn the display off and put the panel to sleep.
    fn power_off<R: RegisterFile, D: DelayNs>(&mut self, sender: &mut PacketSender<R, D>) -> Result<(), PanelError>;

    /// Set the backlight level.
    fn set_brightness<R: RegisterFile, D: DelayNs>(
        &mut self,
        sender: &mut PacketSender<R, D>,
        level: u8,
    ) -> Result<(), PanelError>;

    /// Check that the panel is still in its expected power mode.
    fn esd_check<R: RegisterFile, D: DelayNs>(&mut self, sender: &mut PacketSender<R, D>) -> Result<(), PanelError>;
}

// ---------------------------------------------------------------------------
// Helpers shared by the drivers
// ---------------------------------------------------------------------------

/// Reset line timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetTiming {
    /// Time the line is held low
    pub low_ms: u32,
    /// Time to wait after release before the first command
    pub settle_ms: u32,
}

/// Drive `rst` low for `timing.low_ms`, release it and wait `timing.settle_ms`.
pub(crate) fn pulse_reset<RST: OutputPin, D: DelayNs>(
    rst: &mut RST,
    delay: &mut D,
    timing: ResetTiming,
) -> Result<(), PanelError> {
    rst.set_low().map_err(|_| PanelError::Gpio)?;
    delay.delay_ms(timing.low_ms);
    rst.set_high().map_err(|_| PanelError::Gpio)?;
    delay.delay_ms(timing.settle_ms);
    Ok(())
}

/// Read the one-byte DCS power mode in LP mode.
pub(crate) fn read_power_mode<R: RegisterFile, D: DelayNs>(sender: &mut PacketSender<R, D>) -> Result<u8, DsiError> {
    let mut buf = [0u8; 1];
    sender.read(CommandSet::Mcs, &[dcs::GET_POWER_MODE], &mut buf, TransmissionMode::LowPower)?;
    let [mode] = buf;
    Ok(mode)
}

/// `detect` on top of [`read_power_mode`]: a read that times out means no
/// panel. The sender is left `Abnormal` in that case; the output layer
/// re-initializes it.
pub(crate) fn detect_by_power_mode<R: RegisterFile, D: DelayNs>(
    sender: &mut PacketSender<R, D>,
) -> Result<ConnectionStatus, PanelError> {
    match read_power_mode(sender) {
        Ok(mode) => {
            debug!("panel answered, power mode {}", mode);
            Ok(ConnectionStatus::Connected)
        }
        Err(DsiError::Timeout) => Ok(ConnectionStatus::Disconnected),
        Err(e) => Err(e.into()),
    }
}

/// Compare the panel's power mode with `expected`.
pub(crate) fn check_power_mode<R: RegisterFile, D: DelayNs>(
    sender: &mut PacketSender<R, D>,
    expected: u8,
) -> Result<(), PanelError> {
    let mode = read_power_mode(sender)?;
    if mode != expected {
        warn!("ESD: power mode {} (expected {})", mode, expected);
        return Err(PanelError::Unhealthy);
    }
    Ok(())
}

/// Write the DCS display brightness.
pub(crate) fn write_brightness<R: RegisterFile, D: DelayNs>(
    sender: &mut PacketSender<R, D>,
    level: u8,
) -> Result<(), DsiError> {
    sender.send_short(
        CommandSet::Mcs,
        dcs::WRITE_DISPLAY_BRIGHTNESS,
        level,
        1,
        TransmissionMode::HighSpeed,
        Delivery::Immediate,
    )
}
