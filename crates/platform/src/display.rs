//! Display abstraction layer
//!
//! Geometry and connection types that panel drivers report to the display
//! pipeline.

/// Display mode timing (the panel's native mode)
///
/// All horizontal values are in pixels, vertical values in lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayTiming {
    /// Active width
    pub hdisplay: u16,
    /// Horizontal sync start
    pub hsync_start: u16,
    /// Horizontal sync end
    pub hsync_end: u16,
    /// Total line length
    pub htotal: u16,
    /// Active height
    pub vdisplay: u16,
    /// Vertical sync start
    pub vsync_start: u16,
    /// Vertical sync end
    pub vsync_end: u16,
    /// Total frame length
    pub vtotal: u16,
    /// Refresh rate in Hz
    pub refresh_hz: u8,
}

impl DisplayTiming {
    /// Horizontal front porch
    pub const fn hfront_porch(&self) -> u16 {
        self.hsync_start.saturating_sub(self.hdisplay)
    }

    /// Horizontal sync pulse width
    pub const fn hsync_width(&self) -> u16 {
        self.hsync_end.saturating_sub(self.hsync_start)
    }

    /// Horizontal back porch
    pub const fn hback_porch(&self) -> u16 {
        self.htotal.saturating_sub(self.hsync_end)
    }

    /// Vertical front porch
    pub const fn vfront_porch(&self) -> u16 {
        self.vsync_start.saturating_sub(self.vdisplay)
    }

    /// Vertical sync pulse width
    pub const fn vsync_width(&self) -> u16 {
        self.vsync_end.saturating_sub(self.vsync_start)
    }

    /// Vertical back porch
    pub const fn vback_porch(&self) -> u16 {
        self.vtotal.saturating_sub(self.vsync_end)
    }

    /// Pixel clock in kHz (`htotal × vtotal × refresh`), saturating.
    pub fn pixel_clock_khz(&self) -> u32 {
        u32::from(self.htotal)
            .saturating_mul(u32::from(self.vtotal))
            .saturating_mul(u32::from(self.refresh_hz))
            / 1000
    }

    /// Whether the sync points are ordered (`display <= sync_start <= sync_end <= total`).
    pub const fn is_consistent(&self) -> bool {
        self.hdisplay <= self.hsync_start
            && self.hsync_start <= self.hsync_end
            && self.hsync_end <= self.htotal
            && self.vdisplay <= self.vsync_start
            && self.vsync_start <= self.vsync_end
            && self.vsync_end <= self.vtotal
            && self.hdisplay > 0
            && self.vdisplay > 0
    }
}

/// Physical panel dimensions in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhysicalSize {
    /// Width in mm
    pub width_mm: u16,
    /// Height in mm
    pub height_mm: u16,
}

/// Panel detection result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionStatus {
    /// Panel answered
    Connected,
    /// No panel, or panel not responding
    Disconnected,
}
