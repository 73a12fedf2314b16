//! Error type shared by the packet sender, the DSI link and the DSR gate.

/// DSI errors
///
/// Every public operation of the sender returns one of these; none of them
/// is a fault. Callers decide whether to abort a panel sequence or log and
/// continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DsiError {
    /// Caller bug: empty or oversized buffer, bad parameter count.
    /// Returned before any register is touched.
    InvalidArgument,
    /// No free packet descriptor (transient; drain the queue and retry).
    PoolExhausted,
    /// The sender is mid-transmission or the output lock is already held.
    Busy,
    /// Frame update rejected: no tearing event since the last update.
    Again,
    /// A bounded FIFO / command-complete poll ran out of iterations.
    Timeout,
    /// Unrecoverable controller error reported by the interrupt status.
    Io,
    /// The sender is in the `Abnormal` state and needs re-initialization.
    Abnormal,
    /// The platform power manager refused a power-island transition.
    PowerTransitionDenied,
}

impl DsiError {
    /// Whether this error leaves the link in a suspect state, moving the
    /// sender to `Abnormal`.
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Timeout | Self::Io)
    }

    /// Whether retrying the same call later may succeed without a re-init.
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::PoolExhausted | Self::Busy | Self::Again)
    }
}

impl core::fmt::Display for DsiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "Invalid argument"),
            Self::PoolExhausted => write!(f, "Packet pool exhausted"),
            Self::Busy => write!(f, "DSI sender is busy"),
            Self::Again => write!(f, "No tearing event since last frame update"),
            Self::Timeout => write!(f, "DSI operation timeout"),
            Self::Io => write!(f, "DSI controller error"),
            Self::Abnormal => write!(f, "DSI sender is abnormal, re-init required"),
            Self::PowerTransitionDenied => write!(f, "Power island transition denied"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DsiError {}

impl From<platform::PollTimeout> for DsiError {
    fn from(_: platform::PollTimeout) -> Self {
        Self::Timeout
    }
}
