//! Video-mode (DPI) panel driver
//!
//! Pixels stream continuously, so there is no frame memory to self refresh
//! from and no DSR. The DPI stream is started and stopped with special
//! packets around the DCS display on/off commands.

use dsi::packet::dcs;
use dsi::{Delivery, DpiSpecial, DsiControllerContext, PacketSender, Pipe, TransmissionMode};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use platform::{ConnectionStatus, DisplayTiming, PhysicalSize, RegisterFile};

use crate::driver::{self, DsiMode, PanelDriver, SLEEP_SETTLE_MS};
use crate::error::PanelError;
use crate::profiles::PanelProfile;
use crate::sequence::{run_sequence, InitStep};

/// Frames to let through after shutting the DPI stream down.
const DPI_SHUTDOWN_FRAMES: u32 = 2;

const POWER_ON: &[InitStep] = &[
    InitStep::mcs(dcs::EXIT_SLEEP_MODE),
    InitStep::delay_ms(SLEEP_SETTLE_MS),
    InitStep::mcs(dcs::SET_DISPLAY_ON),
];

const POWER_OFF: &[InitStep] = &[
    InitStep::mcs(dcs::SET_DISPLAY_OFF),
    InitStep::mcs(dcs::ENTER_SLEEP_MODE),
    InitStep::delay_ms(SLEEP_SETTLE_MS),
];

/// Driver for a video-mode panel described by a [`PanelProfile`].
pub struct VideoModePanel<RST> {
    profile: PanelProfile,
    rst: RST,
    brightness: u8,
}

impl<RST: OutputPin> VideoModePanel<RST> {
    /// Create a driver; the brightness starts at the profile default.
    pub fn new(profile: PanelProfile, rst: RST) -> Self {
        Self {
            brightness: profile.default_brightness,
            profile,
            rst,
        }
    }

    /// Panel description
    pub fn profile(&self) -> &PanelProfile {
        &self.profile
    }

    /// Last brightness written
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Give the reset pin back.
    pub fn release(self) -> RST {
        self.rst
    }

    fn frame_time_ms(&self) -> u32 {
        let hz = u32::from(self.profile.timing.refresh_hz).max(1);
        1_000u32.div_ceil(hz)
    }
}

impl<RST: OutputPin> PanelDriver for VideoModePanel<RST> {
    fn dsi_mode(&self) -> DsiMode {
        DsiMode::Video
    }

    fn config_mode(&self) -> DisplayTiming {
        self.profile.timing
    }

    fn panel_info(&self, _pipe: Pipe) -> PhysicalSize {
        self.profile.size
    }

    fn reset<R: RegisterFile, D: DelayNs>(&mut self, sender: &mut PacketSender<R, D>) -> Result<(), PanelError> {
        driver::pulse_reset(&mut self.rst, sender.delay(), self.profile.reset)
    }

    fn drv_ic_init<R: RegisterFile, D: DelayNs>(&mut self, sender: &mut PacketSender<R, D>) -> Result<(), PanelError> {
        let skipped = run_sequence(sender, self.profile.init, TransmissionMode::LowPower)?;
        debug!("{} init done, {} optional steps skipped", self.profile.name, skipped);
        Ok(())
    }

    fn dsi_controller_init(&self, ctx: &mut DsiControllerContext) {
        *ctx = DsiControllerContext::video_mode(self.profile.lanes, self.profile.format, &self.profile.timing);
    }

    fn detect<R: RegisterFile, D: DelayNs>(
        &mut self,
        sender: &mut PacketSender<R, D>,
    ) -> Result<ConnectionStatus, PanelError> {
        driver::detect_by_power_mode(sender)
    }

    fn power_on<R: RegisterFile, D: DelayNs>(&mut self, sender: &mut PacketSender<R, D>) -> Result<(), PanelError> {
        run_sequence(sender, POWER_ON, TransmissionMode::HighSpeed)?;
        driver::write_brightness(sender, self.brightness)?;
        sender.send_dpi_spk(DpiSpecial::TurnOn, TransmissionMode::HighSpeed, Delivery::Immediate)?;
        info!("{} on", self.profile.name);
        Ok(())
    }

    fn power_off<R: RegisterFile, D: DelayNs>(&mut self, sender: &mut PacketSender<R, D>) -> Result<(), PanelError> {
        sender.send_dpi_spk(DpiSpecial::Shutdown, TransmissionMode::HighSpeed, Delivery::Immediate)?;
        let settle = self.frame_time_ms().saturating_mul(DPI_SHUTDOWN_FRAMES);
        sender.delay().delay_ms(settle);
        run_sequence(sender, POWER_OFF, TransmissionMode::LowPower)?;
        info!("{} off", self.profile.name);
        Ok(())
    }

    fn set_brightness<R: RegisterFile, D: DelayNs>(
        &mut self,
        sender: &mut PacketSender<R, D>,
        level: u8,
    ) -> Result<(), PanelError> {
        driver::write_brightness(sender, level)?;
        self.brightness = level;
        Ok(())
    }

    fn esd_check<R: RegisterFile, D: DelayNs>(&mut self, sender: &mut PacketSender<R, D>) -> Result<(), PanelError> {
        driver::check_power_mode(sender, self.profile.expected_power_mode)
    }
}
