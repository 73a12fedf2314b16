//! DSI controller register image
//!
//! Panel drivers describe how the controller must be programmed for their
//! panel (lane count, timeouts, D-PHY timings) by filling a
//! [`DsiControllerContext`]. The link replays it into the hardware every
//! time the controller comes back from reset or power gating.

// Field packing shifts 16-bit values into a u32.
#![allow(clippy::arithmetic_side_effects)]

use platform::{DisplayTiming, RegisterFile};

use crate::regs::{self, DsiRegisterMap};

/// Pixel format on the DSI link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelFormat {
    /// 16 bpp
    Rgb565,
    /// 18 bpp, packed
    Rgb666,
    /// 24 bpp
    #[default]
    Rgb888,
}

impl PixelFormat {
    /// Video-mode color format field of DSI_FUNC_PRG (bits 9:7)
    const fn video_field(self) -> u32 {
        match self {
            Self::Rgb565 => 1 << 7,
            Self::Rgb666 => 2 << 7,
            Self::Rgb888 => 4 << 7,
        }
    }

    /// Command-mode data width field of DSI_FUNC_PRG (bits 15:13)
    const fn dbi_field(self) -> u32 {
        match self {
            Self::Rgb565 => 1 << 13,
            Self::Rgb666 => 2 << 13,
            Self::Rgb888 => 4 << 13,
        }
    }
}

/// Controller register image for one output.
///
/// Fields other than `lane_count` hold the value of the register they name.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DsiControllerContext {
    /// Number of data lanes in use (1..=4)
    pub lane_count: u8,
    pub func_prg: u32,
    pub hs_tx_timeout: u32,
    pub lp_rx_timeout: u32,
    pub turn_around_timeout: u32,
    pub device_reset_timer: u32,
    pub dpi_resolution: u32,
    pub init_count: u32,
    pub max_return_pack_size: u32,
    pub video_mode_format: u32,
    pub eot_disable: u32,
    pub lp_byteclk: u32,
    pub hs_ls_dbi_enable: u32,
    pub dphy_param: u32,
    pub dbi_bw_ctrl: u32,
    pub clk_lane_switch_time_cnt: u32,
    pub intr_en: u32,
}

impl DsiControllerContext {
    /// Baseline image for a command-mode (DBI) panel.
    pub fn command_mode(lane_count: u8, format: PixelFormat, timing: &DisplayTiming) -> Self {
        Self {
            lane_count,
            func_prg: lane_bits(lane_count) | format.dbi_field(),
            dpi_resolution: resolution(timing),
            ..Self::common()
        }
    }

    /// Baseline image for a video-mode (DPI) panel.
    pub fn video_mode(lane_count: u8, format: PixelFormat, timing: &DisplayTiming) -> Self {
        Self {
            lane_count,
            func_prg: lane_bits(lane_count) | format.video_field(),
            dpi_resolution: resolution(timing),
            // Non-burst, sync pulses
            video_mode_format: 0x1,
            ..Self::common()
        }
    }

    fn common() -> Self {
        Self {
            hs_tx_timeout: 0x00ff_ffff,
            lp_rx_timeout: 0x00ff_ffff,
            turn_around_timeout: 0x1f,
            device_reset_timer: 0xffff,
            init_count: 0x7d0,
            max_return_pack_size: 0x40,
            eot_disable: 0,
            lp_byteclk: 0x4,
            dbi_bw_ctrl: 0x820,
            clk_lane_switch_time_cnt: 0x000a_0014,
            // Every error bit plus read-data-available
            intr_en: 0xffff_ffff,
            ..Self::default()
        }
    }

    /// Whether the image describes a usable link
    pub fn is_valid(&self) -> bool {
        (1..=4).contains(&self.lane_count) && self.func_prg != 0
    }

    /// Program the controller. The controller is held out of device-ready
    /// while its configuration registers change.
    pub fn apply<R: RegisterFile>(&self, regs: &mut R, map: &DsiRegisterMap) {
        regs.clear_bits32(map.device_ready, regs::DEVICE_READY_BIT);

        regs.write32(map.func_prg, self.func_prg);
        regs.write32(map.hs_tx_timeout, self.hs_tx_timeout);
        regs.write32(map.lp_rx_timeout, self.lp_rx_timeout);
        regs.write32(map.turn_around_timeout, self.turn_around_timeout);
        regs.write32(map.device_reset_timer, self.device_reset_timer);
        regs.write32(map.dpi_resolution, self.dpi_resolution);
        regs.write32(map.init_count, self.init_count);
        regs.write32(map.max_return_pack_size, self.max_return_pack_size);
        regs.write32(map.video_mode_format, self.video_mode_format);
        regs.write32(map.eot_disable, self.eot_disable);
        regs.write32(map.lp_byteclk, self.lp_byteclk);
        regs.write32(map.hs_ls_dbi_enable, self.hs_ls_dbi_enable);
        regs.write32(map.dphy_param, self.dphy_param);
        regs.write32(map.dbi_bw_ctrl, self.dbi_bw_ctrl);
        regs.write32(map.clk_lane_switch_time_cnt, self.clk_lane_switch_time_cnt);
        regs.write32(map.intr_en, self.intr_en);
    }
}

fn lane_bits(lane_count: u8) -> u32 {
    u32::from(lane_count & 0x7)
}

fn resolution(timing: &DisplayTiming) -> u32 {
    (u32::from(timing.vdisplay) << 16) | u32::from(timing.hdisplay)
}
