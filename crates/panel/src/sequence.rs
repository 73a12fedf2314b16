//! Data-driven panel command sequences
//!
//! Vendor init tables and the power-on / power-off recipes are plain
//! `&'static [InitStep]` slices. [`run_sequence`] plays one through the
//! packet sender: a failing critical step aborts the sequence, a failing
//! best-effort step (CABC, vendor tuning) is logged and skipped.

use dsi::{CommandSet, Delivery, DsiError, PacketSender, TransmissionMode};
use embedded_hal::delay::DelayNs;
use platform::RegisterFile;

use crate::error::PanelError;

/// One panel command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Short write: `cmd` plus `count` parameters (at most 2 for generic,
    /// 1 for MCS; see [`PacketSender::send_short`])
    Short {
        /// Command namespace
        set: CommandSet,
        /// Command or first parameter byte
        cmd: u8,
        /// Parameter byte
        param: u8,
        /// Number of parameters
        count: u8,
    },
    /// Long write; the first byte is the command
    Long {
        /// Command namespace
        set: CommandSet,
        /// Command followed by its parameters
        data: &'static [u8],
    },
    /// Wait before the next step
    DelayMs(u32),
}

/// A command plus its failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitStep {
    /// What to send
    pub command: Command,
    /// Abort the sequence if this step fails
    pub critical: bool,
}

impl InitStep {
    const fn critical(command: Command) -> Self {
        Self {
            command,
            critical: true,
        }
    }

    /// MCS/DCS short write without parameter
    pub const fn mcs(cmd: u8) -> Self {
        Self::critical(Command::Short {
            set: CommandSet::Mcs,
            cmd,
            param: 0,
            count: 0,
        })
    }

    /// MCS/DCS short write with one parameter
    pub const fn mcs1(cmd: u8, param: u8) -> Self {
        Self::critical(Command::Short {
            set: CommandSet::Mcs,
            cmd,
            param,
            count: 1,
        })
    }

    /// MCS/DCS long write
    pub const fn mcs_long(data: &'static [u8]) -> Self {
        Self::critical(Command::Long {
            set: CommandSet::Mcs,
            data,
        })
    }

    /// Generic short write with two parameters
    pub const fn generic2(p0: u8, p1: u8) -> Self {
        Self::critical(Command::Short {
            set: CommandSet::Generic,
            cmd: p0,
            param: p1,
            count: 2,
        })
    }

    /// Generic long write
    pub const fn generic_long(data: &'static [u8]) -> Self {
        Self::critical(Command::Long {
            set: CommandSet::Generic,
            data,
        })
    }

    /// Delay step
    pub const fn delay_ms(ms: u32) -> Self {
        Self::critical(Command::DelayMs(ms))
    }

    /// Same step, but a failure only logs.
    #[must_use]
    pub const fn best_effort(mut self) -> Self {
        self.critical = false;
        self
    }
}

/// Execute one step immediately.
pub fn run_step<R, D>(sender: &mut PacketSender<R, D>, step: &InitStep, mode: TransmissionMode) -> Result<(), DsiError>
where
    R: RegisterFile,
    D: DelayNs,
{
    match step.command {
        Command::Short {
            set,
            cmd,
            param,
            count,
        } => sender.send_short(set, cmd, param, count, mode, Delivery::Immediate),
        Command::Long { set, data } => sender.send_long(set, data, mode, Delivery::Immediate),
        Command::DelayMs(ms) => {
            sender.delay().delay_ms(ms);
            Ok(())
        }
    }
}

/// Play `steps` in order.
///
/// Returns the number of best-effort steps that failed. A critical failure
/// stops the sequence and is returned as is.
pub fn run_sequence<R, D>(
    sender: &mut PacketSender<R, D>,
    steps: &[InitStep],
    mode: TransmissionMode,
) -> Result<usize, PanelError>
where
    R: RegisterFile,
    D: DelayNs,
{
    let mut skipped: usize = 0;
    for (index, step) in steps.iter().enumerate() {
        match run_step(sender, step, mode) {
            Ok(()) => {}
            Err(e) if step.critical => {
                error!("panel sequence aborted at step {}: {:?}", index, e);
                return Err(e.into());
            }
            Err(e) => {
                warn!("panel step {} failed, continuing: {:?}", index, e);
                skipped = skipped.saturating_add(1);
            }
        }
    }
    Ok(skipped)
}
