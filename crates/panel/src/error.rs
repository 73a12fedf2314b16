//! Panel-layer errors.

use dsi::DsiError;

/// Errors returned by panel drivers and [`DsiOutput`](crate::DsiOutput).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelError {
    /// The packet sender, link or DSR gate failed
    Dsi(DsiError),
    /// Reset GPIO could not be driven
    Gpio,
    /// The panel did not answer
    NotConnected,
    /// ESD check read an unexpected power mode
    Unhealthy,
    /// The operation does not apply to this panel or output
    InvalidConfig,
}

impl PanelError {
    /// Whether a retry may succeed without re-initializing the panel.
    pub const fn is_transient(self) -> bool {
        match self {
            Self::Dsi(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<DsiError> for PanelError {
    fn from(e: DsiError) -> Self {
        Self::Dsi(e)
    }
}

impl core::fmt::Display for PanelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Dsi(e) => write!(f, "DSI error: {e}"),
            Self::Gpio => write!(f, "Panel reset GPIO error"),
            Self::NotConnected => write!(f, "Panel not connected"),
            Self::Unhealthy => write!(f, "Panel power mode check failed"),
            Self::InvalidConfig => write!(f, "Operation not supported by this panel"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PanelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Dsi(e) => Some(e),
            _ => None,
        }
    }
}
