//! Vendor panel profiles
//!
//! A profile is everything panel-specific that is data rather than code:
//! geometry, lane count, reset timing, init table and the power mode a
//! healthy panel reports. The tables here are representative of the 720p
//! panels shipped on Merrifield handsets; board code adds its own.

use dsi::packet::dcs;
use dsi::PixelFormat;
use platform::{DisplayTiming, PhysicalSize};

use crate::driver::{DsiMode, ResetTiming};
use crate::sequence::InitStep;

/// DCS power mode of a panel that is awake, in normal mode, display on:
/// booster on, sleep out, normal mode on, display on.
pub const POWER_MODE_DISPLAY_ON: u8 = 0x9C;

/// Static description of one panel model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelProfile {
    /// Model name, for logs
    pub name: &'static str,
    /// Command or video mode
    pub mode: DsiMode,
    /// Native mode
    pub timing: DisplayTiming,
    /// Physical size
    pub size: PhysicalSize,
    /// DSI data lanes
    pub lanes: u8,
    /// Pixel format on the link
    pub format: PixelFormat,
    /// Reset pulse
    pub reset: ResetTiming,
    /// Vendor initialization, sent in LP mode after reset
    pub init: &'static [InitStep],
    /// Power mode `esd_check` expects
    pub expected_power_mode: u8,
    /// Brightness applied on power-on
    pub default_brightness: u8,
}

// ---------------------------------------------------------------------------
// Command mode: 720×1280, 4 lanes, TE-driven updates
// ---------------------------------------------------------------------------

const CMD_720P_INIT: &[InitStep] = &[
    // Manufacturer command access
    InitStep::generic2(0xB0, 0x04),
    // Interface setting: DSI command mode, TE output on vsync
    InitStep::generic_long(&[0xB3, 0x14, 0x00, 0x00, 0x00, 0x00, 0x00]),
    // Display settings: 1280 lines, column inversion
    InitStep::generic_long(&[0xC1, 0x0C, 0x62, 0x40, 0x52, 0x02, 0x00, 0x00, 0x00]),
    // Gamma tuning is cosmetic
    InitStep::generic_long(&[
        0xC7, 0x00, 0x09, 0x14, 0x23, 0x30, 0x48, 0x3D, 0x52, 0x5F, 0x67, 0x6B, 0x70, 0x00, 0x09, 0x14, 0x23,
        0x30, 0x48, 0x3D, 0x52, 0x5F, 0x67, 0x6B, 0x70,
    ])
    .best_effort(),
    InitStep::generic2(0xB0, 0x03),
    // Pixel format: 24 bpp
    InitStep::mcs1(0x3A, 0x77),
    // Column / page address for the full panel
    InitStep::mcs_long(&[0x2A, 0x00, 0x00, 0x02, 0xCF]),
    InitStep::mcs_long(&[0x2B, 0x00, 0x00, 0x04, 0xFF]),
];

/// Command-mode 720×1280 panel (DBI, self refresh capable).
pub const CMD_720P: PanelProfile = PanelProfile {
    name: "cmd-720x1280",
    mode: DsiMode::Command,
    timing: DisplayTiming {
        hdisplay: 720,
        hsync_start: 736,
        hsync_end: 744,
        htotal: 784,
        vdisplay: 1280,
        vsync_start: 1288,
        vsync_end: 1292,
        vtotal: 1300,
        refresh_hz: 60,
    },
    size: PhysicalSize {
        width_mm: 58,
        height_mm: 103,
    },
    lanes: 4,
    format: PixelFormat::Rgb888,
    reset: ResetTiming {
        low_ms: 10,
        settle_ms: 20,
    },
    init: CMD_720P_INIT,
    expected_power_mode: POWER_MODE_DISPLAY_ON,
    default_brightness: 0xB4,
};

// ---------------------------------------------------------------------------
// Video mode: 720×1280, 4 lanes, burst
// ---------------------------------------------------------------------------

const VID_720P_INIT: &[InitStep] = &[
    // Extended command set unlock
    InitStep::generic_long(&[0xB9, 0xFF, 0x83, 0x92]),
    // Power: VGH/VGL pumps
    InitStep::generic_long(&[0xB1, 0x7C, 0x00, 0x44, 0x14, 0x00, 0x11, 0x11, 0x24, 0x2C, 0x3F, 0x3F, 0x42, 0x72]),
    // Display waveform cycle
    InitStep::generic_long(&[0xB4, 0x00, 0x00, 0x05, 0x00, 0xA0, 0x05, 0x16, 0x9D, 0x30, 0x03, 0x16, 0x00]),
    // Video mode, burst
    InitStep::generic2(0xBA, 0x13),
    InitStep::generic2(0xC2, 0x03),
    // VCOM trim is panel-lot specific
    InitStep::generic_long(&[0xB6, 0x5C, 0x5C]).best_effort(),
    InitStep::mcs(dcs::SET_TEAR_OFF).best_effort(),
    InitStep::mcs1(0x3A, 0x70),
];

/// Video-mode 720×1280 panel (DPI).
pub const VID_720P: PanelProfile = PanelProfile {
    name: "vid-720x1280",
    mode: DsiMode::Video,
    timing: DisplayTiming {
        hdisplay: 720,
        hsync_start: 816,
        hsync_end: 824,
        htotal: 920,
        vdisplay: 1280,
        vsync_start: 1288,
        vsync_end: 1290,
        vtotal: 1300,
        refresh_hz: 60,
    },
    size: PhysicalSize {
        width_mm: 59,
        height_mm: 104,
    },
    lanes: 4,
    format: PixelFormat::Rgb888,
    reset: ResetTiming {
        low_ms: 5,
        settle_ms: 10,
    },
    init: VID_720P_INIT,
    expected_power_mode: POWER_MODE_DISPLAY_ON,
    default_brightness: 0xB4,
};
