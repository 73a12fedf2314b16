//! Command-mode (DBI) panel driver
//!
//! The panel keeps its own frame memory: frames are pushed with
//! `write_mem_start` after each tearing event and the link may be power
//! gated in between (DSR).

use dsi::packet::dcs;
use dsi::{DsiControllerContext, PacketSender, Pipe, TransmissionMode};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use platform::{ConnectionStatus, DisplayTiming, PhysicalSize, RegisterFile};

use crate::driver::{self, DsiMode, PanelDriver, ResetTiming, SLEEP_SETTLE_MS};
use crate::error::PanelError;
use crate::profiles::PanelProfile;
use crate::sequence::{run_sequence, InitStep};

/// Backlight control: brightness registers active, backlight on
const CTRL_DISPLAY_BL_ON: u8 = 0x24;
/// Content adaptive brightness: user-interface image mode
const CABC_UI: u8 = 0x01;

/// Reset pulse that takes the driver IC out of deep standby.
const DEEP_STANDBY_EXIT: ResetTiming = ResetTiming {
    low_ms: 1,
    settle_ms: 5,
};

const POWER_ON: &[InitStep] = &[
    InitStep::mcs(dcs::EXIT_SLEEP_MODE),
    InitStep::delay_ms(SLEEP_SETTLE_MS),
    // TE on vblank only
    InitStep::mcs1(dcs::SET_TEAR_ON, 0x00),
    InitStep::mcs(dcs::SET_DISPLAY_ON),
    InitStep::mcs1(dcs::WRITE_CTRL_DISPLAY, CTRL_DISPLAY_BL_ON),
    InitStep::mcs1(dcs::WRITE_POWER_SAVE, CABC_UI).best_effort(),
];

const POWER_OFF: &[InitStep] = &[
    InitStep::mcs(dcs::SET_DISPLAY_OFF),
    InitStep::mcs(dcs::ENTER_SLEEP_MODE),
    InitStep::delay_ms(SLEEP_SETTLE_MS),
];

/// Driver for a command-mode panel described by a [`PanelProfile`].
pub struct CommandModePanel<RST> {
    profile: PanelProfile,
    rst: RST,
    brightness: u8,
}

impl<RST: OutputPin> CommandModePanel<RST> {
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

    /// Last brightness written (or to be written on power-on)
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Give the reset pin back.
    pub fn release(self) -> RST {
        self.rst
    }
}

impl<RST: OutputPin> PanelDriver for CommandModePanel<RST> {
    fn dsi_mode(&self) -> DsiMode {
        DsiMode::Command
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

    fn exit_deep_standby<R: RegisterFile, D: DelayNs>(
        &mut self,
        sender: &mut PacketSender<R, D>,
    ) -> Result<(), PanelError> {
        driver::pulse_reset(&mut self.rst, sender.delay(), DEEP_STANDBY_EXIT)
    }

    fn drv_ic_init<R: RegisterFile, D: DelayNs>(&mut self, sender: &mut PacketSender<R, D>) -> Result<(), PanelError> {
        let skipped = run_sequence(sender, self.profile.init, TransmissionMode::LowPower)?;
        debug!("{} init done, {} optional steps skipped", self.profile.name, skipped);
        Ok(())
    }

    fn dsi_controller_init(&self, ctx: &mut DsiControllerContext) {
        *ctx = DsiControllerContext::command_mode(self.profile.lanes, self.profile.format, &self.profile.timing);
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
        info!("{} on", self.profile.name);
        Ok(())
    }

    fn power_off<R: RegisterFile, D: DelayNs>(&mut self, sender: &mut PacketSender<R, D>) -> Result<(), PanelError> {
        run_sequence(sender, POWER_OFF, TransmissionMode::HighSpeed)?;
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

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::profiles::CMD_720P;
    use dsi::regs::*;
    use dsi::{DsiError, SenderConfig, SenderStatus};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State as PinState, Transaction as PinTransaction};
    use platform::mocks::MockRegisterFile;
    use platform::PollConfig;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    type Sender = PacketSender<MockRegisterFile, NoopDelay>;

    fn sender() -> (Sender, MockRegisterFile) {
        let regs = MockRegisterFile::new();
        regs.set(GEN_FIFO_STAT, ALL_FIFOS_EMPTY);
        regs.write_one_to_clear(INTR_STAT);
        let cfg = SenderConfig {
            fifo_poll: PollConfig::new(4, 1),
            read_poll: PollConfig::new(4, 1),
            ..SenderConfig::default()
        };
        (PacketSender::new(regs.clone(), NoopDelay, Pipe::Primary, cfg), regs)
    }

    /// Reset pin expecting one low/high pulse per entry in `pulses`.
    fn rst_pin(pulses: usize) -> PinMock {
        let mut txns = vec![];
        for _ in 0..pulses {
            txns.push(PinTransaction::set(PinState::Low));
            txns.push(PinTransaction::set(PinState::High));
        }
        PinMock::new(&txns)
    }

    /// Script one successful power-mode read returning `mode`.
    fn answer_power_mode(regs: &MockRegisterFile, mode: u8) {
        regs.script_reads(INTR_STAT, &[0, INTR_GEN_READ_DATA_AVAIL]);
        regs.script_reads(LP_GEN_DATA, &[u32::from(mode)]);
    }

    // -----------------------------------------------------------------------
    // Bring-up
    // -----------------------------------------------------------------------

    #[test]
    fn reset_and_deep_standby_pulse_the_reset_line() {
        let (mut s, _regs) = sender();
        let mut pin = rst_pin(2);
        let mut panel = CommandModePanel::new(CMD_720P, pin.clone());

        panel.reset(&mut s).unwrap();
        panel.exit_deep_standby(&mut s).unwrap();
        pin.done();
    }

    #[test]
    fn init_table_goes_out_in_lp() {
        let (mut s, regs) = sender();
        let mut pin = rst_pin(0);
        let mut panel = CommandModePanel::new(CMD_720P, pin.clone());

        panel.drv_ic_init(&mut s).unwrap();
        assert_eq!(regs.writes_to(LP_GEN_CTRL).len(), CMD_720P.init.len());
        assert!(regs.writes_to(HS_GEN_CTRL).is_empty());
        // First step: generic 2-parameter write B0 04
        assert_eq!(regs.writes_to(LP_GEN_CTRL).first(), Some(&0x0004_B023));
        pin.done();
    }

    #[test]
    fn controller_image_is_command_mode() {
        let mut pin = rst_pin(0);
        let panel = CommandModePanel::new(CMD_720P, pin.clone());
        let mut ctx = DsiControllerContext::default();
        panel.dsi_controller_init(&mut ctx);
        assert_eq!(ctx.lane_count, 4);
        assert!(ctx.is_valid());
        assert_eq!(ctx, DsiControllerContext::command_mode(4, CMD_720P.format, &CMD_720P.timing));
        pin.done();
    }

    /// Power-on: exit sleep, TE on, display on, backlight, CABC, brightness.
    #[test]
    fn power_on_sequence() {
        let (mut s, regs) = sender();
        let mut pin = rst_pin(0);
        let mut panel = CommandModePanel::new(CMD_720P, pin.clone());

        panel.power_on(&mut s).unwrap();
        assert_eq!(
            regs.writes_to(HS_GEN_CTRL),
            vec![0x1105, 0x3515, 0x2905, 0x0024_5315, 0x0001_5515, 0x00B4_5115]
        );
        assert!(!s.panel_sleeping());
        pin.done();
    }

    #[test]
    fn power_off_sequence() {
        let (mut s, regs) = sender();
        let mut pin = rst_pin(0);
        let mut panel = CommandModePanel::new(CMD_720P, pin.clone());

        panel.power_off(&mut s).unwrap();
        assert_eq!(regs.writes_to(HS_GEN_CTRL), vec![0x2805, 0x1005]);
        assert!(s.panel_sleeping());
        pin.done();
    }

    #[test]
    fn brightness_is_remembered() {
        let (mut s, regs) = sender();
        let mut pin = rst_pin(0);
        let mut panel = CommandModePanel::new(CMD_720P, pin.clone());

        panel.set_brightness(&mut s, 0x40).unwrap();
        assert_eq!(panel.brightness(), 0x40);
        assert_eq!(regs.writes_to(HS_GEN_CTRL), vec![0x0040_5115]);
        pin.done();
    }

    // -----------------------------------------------------------------------
    // Detect / ESD
    // -----------------------------------------------------------------------

    #[test]
    fn detect_connected_when_panel_answers() {
        let (mut s, regs) = sender();
        answer_power_mode(&regs, 0x08);
        let mut pin = rst_pin(0);
        let mut panel = CommandModePanel::new(CMD_720P, pin.clone());

        assert_eq!(panel.detect(&mut s), Ok(ConnectionStatus::Connected));
        assert_eq!(regs.writes_to(LP_GEN_CTRL), vec![0x0A06], "DCS read of the power mode");
        pin.done();
    }

    #[test]
    fn detect_disconnected_on_silence() {
        let (mut s, _regs) = sender();
        let mut pin = rst_pin(0);
        let mut panel = CommandModePanel::new(CMD_720P, pin.clone());

        assert_eq!(panel.detect(&mut s), Ok(ConnectionStatus::Disconnected));
        assert_eq!(s.status(), SenderStatus::Abnormal, "caller re-initializes the sender");
        pin.done();
    }

    #[test]
    fn esd_check_compares_power_mode() {
        let (mut s, regs) = sender();
        let mut pin = rst_pin(0);
        let mut panel = CommandModePanel::new(CMD_720P, pin.clone());

        answer_power_mode(&regs, 0x9C);
        assert_eq!(panel.esd_check(&mut s), Ok(()));

        answer_power_mode(&regs, 0x08);
        assert_eq!(panel.esd_check(&mut s), Err(PanelError::Unhealthy));
        pin.done();
    }

    #[test]
    fn esd_check_propagates_read_failure() {
        let (mut s, _regs) = sender();
        let mut pin = rst_pin(0);
        let mut panel = CommandModePanel::new(CMD_720P, pin.clone());

        assert_eq!(panel.esd_check(&mut s), Err(PanelError::Dsi(DsiError::Timeout)));
        pin.done();
    }
}
