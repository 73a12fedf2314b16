//! Bounded busy-poll helper.
//!
//! Every hardware wait in the display path (FIFO empty, read data available,
//! DBI command consumed) is a spin against a status bit with a fixed iteration
//! budget. None of them may spin forever: a wedged controller must surface as
//! a timeout the caller can log and recover from.

use embedded_hal::delay::DelayNs;

/// Iteration budget for a bounded poll.
///
/// The worst-case wait is `max_iters × interval_us` microseconds plus the
/// cost of evaluating the predicate `max_iters` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollConfig {
    /// Maximum number of predicate evaluations.
    pub max_iters: u32,
    /// Delay between two evaluations, in microseconds.
    pub interval_us: u32,
}

impl PollConfig {
    /// Create a poll budget.
    pub const fn new(max_iters: u32, interval_us: u32) -> Self {
        Self {
            max_iters,
            interval_us,
        }
    }

    /// Upper bound of the time spent sleeping, in microseconds (saturating).
    pub fn budget_us(&self) -> u64 {
        u64::from(self.max_iters).saturating_mul(u64::from(self.interval_us))
    }
}

/// The predicate never became true within the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollTimeout {
    /// Number of predicate evaluations performed (== `max_iters`).
    pub iterations: u32,
}

impl core::fmt::Display for PollTimeout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "condition not met after {} polls", self.iterations)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PollTimeout {}

/// Evaluate `done` until it returns `true` or the budget is exhausted.
///
/// The predicate is checked before each delay, so a condition that already
/// holds costs one evaluation and no delay. On success returns the number of
/// evaluations performed (1-based).
///
/// A `max_iters` of zero never evaluates the predicate and times out
/// immediately.
pub fn poll_with_timeout<D, F>(delay: &mut D, config: PollConfig, mut done: F) -> Result<u32, PollTimeout>
where
    D: DelayNs,
    F: FnMut() -> bool,
{
    let mut evaluated: u32 = 0;
    while evaluated < config.max_iters {
        evaluated = evaluated.saturating_add(1);
        if done() {
            return Ok(evaluated);
        }
        if config.interval_us != 0 {
            delay.delay_us(config.interval_us);
        }
    }
    Err(PollTimeout {
        iterations: evaluated,
    })
}
