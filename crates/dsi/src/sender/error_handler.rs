//! Interrupt-status error handler
//!
//! Runs before every transmission. Each set INTR_STAT bit is handled by a
//! fixed policy; most bits are informational and only logged and cleared.
//! The handler never retries the packet about to be sent, it only clears
//! host-side state so that the transmission starts clean.

use embedded_hal::delay::DelayNs;
use platform::RegisterFile;

use super::PacketSender;
use crate::error::DsiError;
use crate::regs;

/// What to do about one interrupt-status bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IntrAction {
    /// Log and write-one-to-clear
    Clear,
    /// Set the EOT workaround bits, then retry the clear a bounded number of times
    HighContention,
    /// Clear, then wait for every FIFO to drain
    FlushAll,
    /// Clear, then wait for the HS generic FIFOs
    FlushHs,
    /// Clear, then wait for the LP generic FIFOs
    FlushLp,
}

pub(crate) const fn intr_action(bit: u32) -> IntrAction {
    match bit {
        18 => IntrAction::HighContention,
        20..=22 => IntrAction::FlushAll,
        27 => IntrAction::FlushHs,
        28 => IntrAction::FlushLp,
        _ => IntrAction::Clear,
    }
}

impl<R, D> PacketSender<R, D>
where
    R: RegisterFile,
    D: DelayNs,
{
    /// Inspect and clear INTR_STAT. Returns [`DsiError::Io`] for errors the
    /// policy could not clear.
    pub(crate) fn handle_errors(&mut self) -> Result<(), DsiError> {
        let intr_stat = self.register_map().intr_stat;
        let pending = self.regs.read32(intr_stat);
        if pending == 0 {
            return Ok(());
        }

        for bit in 0..32u32 {
            let mask = 1u32.wrapping_shl(bit);
            if pending & mask != 0 {
                self.handle_intr_bit(bit, mask)?;
            }
        }
        Ok(())
    }

    fn handle_intr_bit(&mut self, bit: u32, mask: u32) -> Result<(), DsiError> {
        let map = self.register_map();
        let name = regs::intr_name(bit);

        match intr_action(bit) {
            IntrAction::Clear => {
                debug!("DSI interrupt: {}", name);
                self.regs.write32(map.intr_stat, mask);
            }
            IntrAction::HighContention => {
                warn!("DSI interrupt: {}, enabling EOT workaround", name);
                self.regs.set_bits32(map.eot_disable, regs::EOT_CONTENTION_WORKAROUND);
                self.eot_workaround = true;
                let mut cleared = false;
                for _ in 0..self.config.contention_retries {
                    self.regs.write32(map.intr_stat, mask);
                    if self.regs.read32(map.intr_stat) & mask == 0 {
                        cleared = true;
                        break;
                    }
                }
                if !cleared {
                    error!("DSI interrupt: {} persists", name);
                    return Err(DsiError::Io);
                }
            }
            IntrAction::FlushAll => {
                warn!("DSI interrupt: {}, waiting for all FIFOs", name);
                self.regs.write32(map.intr_stat, mask);
                self.wait_fifo_mask(regs::ALL_FIFOS_EMPTY).map_err(|_| DsiError::Io)?;
            }
            IntrAction::FlushHs => {
                warn!("DSI interrupt: {}, waiting for HS FIFOs", name);
                self.regs.write32(map.intr_stat, mask);
                self.wait_fifo_mask(regs::HS_FIFOS_EMPTY).map_err(|_| DsiError::Io)?;
            }
            IntrAction::FlushLp => {
                warn!("DSI interrupt: {}, waiting for LP FIFOs", name);
                self.regs.write32(map.intr_stat, mask);
                self.wait_fifo_mask(regs::LP_FIFOS_EMPTY).map_err(|_| DsiError::Io)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::config::SenderConfig;
    use crate::packet::{CommandSet, Delivery, TransmissionMode};
    use crate::regs::*;
    use crate::sender::SenderStatus;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use platform::mocks::MockRegisterFile;
    use platform::PollConfig;

    fn sender(regs: &MockRegisterFile) -> PacketSender<MockRegisterFile, NoopDelay> {
        let cfg = SenderConfig {
            fifo_poll: PollConfig::new(4, 1),
            ..SenderConfig::default()
        };
        PacketSender::new(regs.clone(), NoopDelay, Pipe::Primary, cfg)
    }

    fn send_display_on(s: &mut PacketSender<MockRegisterFile, NoopDelay>) -> Result<(), DsiError> {
        s.send_short(CommandSet::Mcs, 0x29, 0, 0, TransmissionMode::HighSpeed, Delivery::Immediate)
    }

    #[test]
    fn policy_table() {
        assert_eq!(intr_action(0), IntrAction::Clear);
        assert_eq!(intr_action(18), IntrAction::HighContention);
        assert_eq!(intr_action(19), IntrAction::Clear);
        for bit in 20..=22 {
            assert_eq!(intr_action(bit), IntrAction::FlushAll);
        }
        assert_eq!(intr_action(27), IntrAction::FlushHs);
        assert_eq!(intr_action(28), IntrAction::FlushLp);
        assert_eq!(intr_action(29), IntrAction::Clear);
        assert_eq!(intr_action(31), IntrAction::Clear);
    }

    /// Informational bits are cleared and the packet still goes out.
    #[test]
    fn informational_bits_cleared() {
        let regs = MockRegisterFile::new();
        regs.set(GEN_FIFO_STAT, ALL_FIFOS_EMPTY);
        regs.write_one_to_clear(INTR_STAT);
        regs.set(INTR_STAT, 0b101 | (1 << 31));
        let mut s = sender(&regs);

        assert_eq!(send_display_on(&mut s), Ok(()));
        assert_eq!(regs.value(INTR_STAT), 0);
        assert_eq!(regs.writes_to(INTR_STAT), vec![1 << 0, 1 << 2, 1 << 31]);
        assert_eq!(regs.writes_to(HS_GEN_CTRL), vec![0x2905]);
    }

    #[test]
    fn transient_high_contention_recovers() {
        let regs = MockRegisterFile::new();
        regs.set(GEN_FIFO_STAT, ALL_FIFOS_EMPTY);
        regs.write_one_to_clear(INTR_STAT);
        regs.set(INTR_STAT, INTR_HIGH_CONTENTION);
        let mut s = sender(&regs);

        assert_eq!(send_display_on(&mut s), Ok(()));
        assert_eq!(regs.value(EOT_DISABLE) & EOT_CONTENTION_WORKAROUND, EOT_CONTENTION_WORKAROUND);
        assert_eq!(regs.writes_to(INTR_STAT), vec![INTR_HIGH_CONTENTION]);
        assert!(s.eot_workaround());
    }

    /// A contention bit that survives every clear is an unrecoverable error.
    #[test]
    fn persistent_high_contention_is_fatal() {
        let regs = MockRegisterFile::new();
        regs.set(GEN_FIFO_STAT, ALL_FIFOS_EMPTY);
        // Plain register: writing the mask back keeps the bit set.
        regs.set(INTR_STAT, INTR_HIGH_CONTENTION);
        let mut s = sender(&regs);

        assert_eq!(send_display_on(&mut s), Err(DsiError::Io));
        assert_eq!(s.status(), SenderStatus::Abnormal);
        assert_eq!(regs.writes_to(INTR_STAT).len(), 3, "bounded by contention_retries");
        assert!(regs.writes_to(HS_GEN_CTRL).is_empty(), "packet must not be sent");
    }

    #[test]
    fn write_fifo_full_waits_for_matching_fifo() {
        let regs = MockRegisterFile::new();
        regs.set(GEN_FIFO_STAT, ALL_FIFOS_EMPTY);
        regs.write_one_to_clear(INTR_STAT);
        regs.set(INTR_STAT, INTR_LP_GEN_WRITE_FIFO_FULL);
        // Handler wait sees a full LP FIFO once, then empty.
        regs.script_reads(GEN_FIFO_STAT, &[HS_FIFOS_EMPTY]);
        let mut s = sender(&regs);

        assert_eq!(send_display_on(&mut s), Ok(()));
        assert_eq!(regs.pending_scripted(GEN_FIFO_STAT), 0);
    }

    /// DPI underrun with FIFOs that never drain fails the call.
    #[test]
    fn underrun_with_stuck_fifos_is_fatal() {
        let regs = MockRegisterFile::new();
        regs.write_one_to_clear(INTR_STAT);
        regs.set(INTR_STAT, INTR_DPI_FIFO_UNDERRUN);
        let mut s = sender(&regs);

        assert_eq!(send_display_on(&mut s), Err(DsiError::Io));
        assert_eq!(s.status(), SenderStatus::Abnormal);
        assert_eq!(regs.value(INTR_STAT), 0, "status bit cleared even on failure");
    }
}
