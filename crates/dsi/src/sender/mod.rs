//! MIPI-DSI packet sender
//!
//! Turns panel-level requests ("send these bytes as an MCS long write in HS
//! mode") into register traffic on one DSI controller:
//!
//! 1. run the interrupt-status error handler,
//! 2. wait for the DBI FIFO, then the HS or LP generic FIFOs, to drain,
//! 3. write the payload words to the generic data register,
//! 4. write the header to the generic control register, which starts the
//!    transmission.
//!
//! Completion means "control write accepted"; the controller keeps packets
//! in order internally.
//!
//! # Status
//!
//! ```text
//! Free --transmit--> Busy --ok--> Free
//!                        \--Timeout/Io--> Abnormal --reinit()--> Free
//! ```
//!
//! `Abnormal` is terminal until [`PacketSender::reinit`]: after a controller
//! error the link state is unknown and only a full panel re-init restores it.
//!
//! # Deferred packets
//!
//! Writes submitted with [`Delivery::Deferred`] are queued and sent by
//! [`PacketSender::drain_queue`] in submission order. Mixing immediate and
//! deferred writes is the caller's business: an immediate write overtakes
//! everything still queued.

mod error_handler;

use embedded_hal::delay::DelayNs;
use heapless::Deque;
use platform::poll::poll_with_timeout;
use platform::{PollConfig, RegisterFile};

use crate::config::SenderConfig;
use crate::error::DsiError;
use crate::packet::{
    dcs, CommandSet, Delivery, DpiSpecial, Packet, PacketKind, TransmissionMode, MAX_LONG_PAYLOAD,
};
use crate::pool::{PacketPool, POOL_CAPACITY};
use crate::regs::{self, DsiRegisterMap, Pipe};

/// Sender status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SenderStatus {
    /// Idle, ready for the next packet
    Free,
    /// A packet is being written to the controller
    Busy,
    /// A controller error or timeout occurred; re-init required
    Abnormal,
}

/// Which panel of a dual-panel configuration receives packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WorkingPanel {
    /// Panel on the sender's own pipe
    #[default]
    Primary,
    /// Slave panel, driven through the secondary controller
    Slave,
}

/// Packet sender for one DSI output.
///
/// Generic over:
/// - `R`: the controller's [`RegisterFile`]
/// - `D`: a blocking [`DelayNs`] used between FIFO polls
///
/// All methods take `&mut self`: the output lock that owns the sender is what
/// serializes the panel driver, ESD, TE and frame-update paths.
pub struct PacketSender<R, D> {
    regs: R,
    delay: D,
    config: SenderConfig,
    pipe: Pipe,
    primary_map: DsiRegisterMap,
    slave_map: DsiRegisterMap,
    working_panel: WorkingPanel,
    status: SenderStatus,
    te_seq: u32,
    last_screen_update: u32,
    pool: PacketPool,
    queue: Deque<Packet, POOL_CAPACITY>,
    panel_sleeping: bool,
    eot_workaround: bool,
}

impl<R, D> PacketSender<R, D>
where
    R: RegisterFile,
    D: DelayNs,
{
    /// Create a sender for `pipe`, resolving its register map.
    ///
    /// The panel is assumed asleep until an exit-sleep command goes out.
    pub fn new(regs: R, delay: D, pipe: Pipe, config: SenderConfig) -> Self {
        Self {
            regs,
            delay,
            config,
            pipe,
            primary_map: DsiRegisterMap::for_pipe(pipe),
            slave_map: DsiRegisterMap::for_pipe(Pipe::Secondary),
            working_panel: WorkingPanel::Primary,
            status: SenderStatus::Free,
            te_seq: 0,
            last_screen_update: 0,
            pool: PacketPool::new(),
            queue: Deque::new(),
            panel_sleeping: true,
            eot_workaround: false,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Current status
    pub fn status(&self) -> SenderStatus {
        self.status
    }

    /// Pipe the sender was created for
    pub fn pipe(&self) -> Pipe {
        self.pipe
    }

    /// Configuration in use
    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Tearing-effect sequence number
    pub fn te_seq(&self) -> u32 {
        self.te_seq
    }

    /// TE sequence number of the last accepted frame update
    pub fn last_screen_update(&self) -> u32 {
        self.last_screen_update
    }

    /// Number of deferred packets waiting for [`drain_queue`](Self::drain_queue)
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Free packet descriptors
    pub fn pool_available(&self) -> usize {
        self.pool.available()
    }

    /// Whether the last sleep command sent was enter-sleep
    pub fn panel_sleeping(&self) -> bool {
        self.panel_sleeping
    }

    /// Whether a high-contention error turned on the EOT workaround.
    ///
    /// Sticky for the sender's lifetime; controller reprogramming must keep
    /// [`regs::EOT_CONTENTION_WORKAROUND`] set in EOT_DISABLE once this is true.
    pub fn eot_workaround(&self) -> bool {
        self.eot_workaround
    }

    /// Panel currently addressed
    pub fn working_panel(&self) -> WorkingPanel {
        self.working_panel
    }

    /// Address the primary or the slave panel from now on.
    pub fn set_working_panel(&mut self, panel: WorkingPanel) {
        self.working_panel = panel;
    }

    /// Register map of the panel currently addressed
    pub fn register_map(&self) -> DsiRegisterMap {
        match self.working_panel {
            WorkingPanel::Primary => self.primary_map,
            WorkingPanel::Slave => self.slave_map,
        }
    }

    /// Raw register access for link power sequencing.
    pub fn registers(&mut self) -> &mut R {
        &mut self.regs
    }

    /// The sender's delay provider.
    pub fn delay(&mut self) -> &mut D {
        &mut self.delay
    }

    // -----------------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------------

    /// Send a short write with `param_count` parameters.
    ///
    /// For [`CommandSet::Mcs`], `cmd` is the DCS command and `param` its
    /// optional argument (0 or 1 parameter). For [`CommandSet::Generic`],
    /// `cmd` and `param` are the first and second parameter (0 to 2).
    pub fn send_short(
        &mut self,
        set: CommandSet,
        cmd: u8,
        param: u8,
        param_count: u8,
        mode: TransmissionMode,
        delivery: Delivery,
    ) -> Result<(), DsiError> {
        let kind = PacketKind::short_write(set, param_count)?;
        let (data0, data1) = match kind {
            PacketKind::GenericShortWrite0 => (0, 0),
            PacketKind::McsShortWrite0 | PacketKind::GenericShortWrite1 => (cmd, 0),
            _ => (cmd, param),
        };
        self.submit(delivery, |packet| {
            packet.set_short(kind, data0, data1, mode);
            Ok(())
        })
    }

    /// Send `data` as one long write. The bytes are copied before returning.
    ///
    /// `data` must hold 1 to [`MAX_LONG_PAYLOAD`] bytes (the inline
    /// descriptor buffer); anything else fails with
    /// [`DsiError::InvalidArgument`] before touching the hardware.
    pub fn send_long(
        &mut self,
        set: CommandSet,
        data: &[u8],
        mode: TransmissionMode,
        delivery: Delivery,
    ) -> Result<(), DsiError> {
        if data.is_empty() || data.len() > MAX_LONG_PAYLOAD {
            return Err(DsiError::InvalidArgument);
        }
        let kind = PacketKind::long_write(set);
        self.submit(delivery, |packet| packet.set_long(kind, data, mode))
    }

    /// Send a DPI special packet (video-mode panels).
    pub fn send_dpi_spk(&mut self, spk: DpiSpecial, mode: TransmissionMode, delivery: Delivery) -> Result<(), DsiError> {
        let code = u8::try_from(spk.control_bits()).map_err(|_| DsiError::InvalidArgument)?;
        self.submit(delivery, |packet| {
            packet.set_short(PacketKind::DpiSpecial, code, 0, mode);
            Ok(())
        })
    }

    /// Tell the panel how many bytes it may return per read.
    pub fn set_max_return_size(&mut self, size: u16, mode: TransmissionMode) -> Result<(), DsiError> {
        let [lo, hi] = size.to_le_bytes();
        self.submit(Delivery::Immediate, |packet| {
            packet.set_short(PacketKind::SetMaxReturnSize, lo, hi, mode);
            Ok(())
        })
    }

    /// Read `out.len()` bytes back from the panel.
    ///
    /// `params` is the request: exactly the DCS command for
    /// [`CommandSet::Mcs`], zero to two parameters for [`CommandSet::Generic`].
    /// Reads are always synchronous. Returns the number of bytes written.
    pub fn read(
        &mut self,
        set: CommandSet,
        params: &[u8],
        out: &mut [u8],
        mode: TransmissionMode,
    ) -> Result<usize, DsiError> {
        if out.is_empty() {
            return Err(DsiError::InvalidArgument);
        }
        let kind = PacketKind::read(set, params.len())?;
        let data0 = params.first().copied().unwrap_or(0);
        let data1 = params.get(1).copied().unwrap_or(0);

        self.check_ready()?;
        let mut packet = self.pool.acquire()?;
        packet.set_short(kind, data0, data1, mode);

        self.status = SenderStatus::Busy;
        let result = self.read_inner(&packet, out);
        self.pool.release(packet);
        self.finish(result)
    }

    /// Kick a frame-buffer transfer through the DBI command buffer.
    ///
    /// Rejected with [`DsiError::Again`] until a tearing event has been
    /// reported since the last accepted update (a freshly created sender
    /// waits for its first TE). If the DBI path does not become ready within
    /// the budget the frame is dropped with [`DsiError::Timeout`]; the sender
    /// stays usable.
    pub fn send_dcs_write_mem_start(&mut self) -> Result<(), DsiError> {
        self.check_ready()?;
        if self.last_screen_update == self.te_seq {
            trace!("frame update skipped, no TE since seq {}", self.te_seq);
            return Err(DsiError::Again);
        }

        let mut packet = self.pool.acquire()?;
        packet.set_short(PacketKind::Dcs, dcs::WRITE_MEM_START, 0, TransmissionMode::HighSpeed);

        self.status = SenderStatus::Busy;
        if let Err(e) = self.handle_errors() {
            self.pool.release(packet);
            return self.finish(Err(e));
        }
        let result = self.kick_dbi_command_buffer(&packet);
        self.pool.release(packet);
        self.status = SenderStatus::Free;

        match result {
            Ok(()) => self.last_screen_update = self.te_seq,
            Err(e) => warn!("frame dropped: {:?}", e),
        }
        result
    }

    /// Transmit every deferred packet in submission order.
    ///
    /// Stops at the first failure; the failing packet is discarded and the
    /// rest stay queued. Refused while the sender is `Abnormal`. Returns the
    /// number of packets sent.
    pub fn drain_queue(&mut self) -> Result<usize, DsiError> {
        if self.status == SenderStatus::Abnormal {
            return Err(DsiError::Abnormal);
        }
        let mut sent: usize = 0;
        while let Some(packet) = self.queue.pop_front() {
            let result = self.transmit(&packet);
            self.pool.release(packet);
            result?;
            sent = sent.saturating_add(1);
        }
        Ok(sent)
    }

    /// Record one tearing-effect interrupt.
    pub fn report_tearing_event(&mut self) {
        self.te_seq = self.te_seq.wrapping_add(1);
    }

    /// Wait until every controller FIFO is empty.
    pub fn wait_fifos_empty(&mut self) -> Result<(), DsiError> {
        self.wait_fifo_mask(regs::ALL_FIFOS_EMPTY)
    }

    /// Wait until the DBI FIFO is empty.
    pub fn wait_dbi_fifo_empty(&mut self) -> Result<(), DsiError> {
        self.wait_fifo_mask(regs::DBI_FIFO_EMPTY)
    }

    /// Reset after a panel re-init: discard queued packets, clear pending
    /// interrupt status and return to `Free`.
    pub fn reinit(&mut self) {
        let mut dropped: usize = 0;
        while let Some(packet) = self.queue.pop_front() {
            self.pool.release(packet);
            dropped = dropped.saturating_add(1);
        }
        let map = self.register_map();
        self.regs.write32(map.intr_stat, u32::MAX);
        if self.status != SenderStatus::Free {
            info!("sender re-initialized, {} queued packets dropped", dropped);
        }
        self.status = SenderStatus::Free;
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn check_ready(&self) -> Result<(), DsiError> {
        match self.status {
            SenderStatus::Free => Ok(()),
            SenderStatus::Busy => Err(DsiError::Busy),
            SenderStatus::Abnormal => Err(DsiError::Abnormal),
        }
    }

    /// Settle `status` after an operation that set it to `Busy`.
    fn finish<T>(&mut self, result: Result<T, DsiError>) -> Result<T, DsiError> {
        self.status = match &result {
            Err(e) if e.is_fatal() => {
                error!("DSI sender on pipe {} abnormal: {:?}", self.pipe.index(), e);
                SenderStatus::Abnormal
            }
            _ => SenderStatus::Free,
        };
        result
    }

    fn submit<F>(&mut self, delivery: Delivery, fill: F) -> Result<(), DsiError>
    where
        F: FnOnce(&mut Packet) -> Result<(), DsiError>,
    {
        if delivery == Delivery::Immediate {
            self.check_ready()?;
        }
        let mut packet = self.pool.acquire()?;
        if let Err(e) = fill(&mut packet) {
            self.pool.release(packet);
            return Err(e);
        }
        match delivery {
            Delivery::Deferred => self.queue.push_back(packet).map_err(|packet| {
                self.pool.release(packet);
                DsiError::PoolExhausted
            }),
            Delivery::Immediate => {
                let result = self.transmit(&packet);
                self.pool.release(packet);
                result
            }
        }
    }

    fn transmit(&mut self, packet: &Packet) -> Result<(), DsiError> {
        self.check_ready()?;
        self.status = SenderStatus::Busy;
        let result = self.transmit_inner(packet);
        self.finish(result)
    }

    fn transmit_inner(&mut self, packet: &Packet) -> Result<(), DsiError> {
        self.handle_errors()?;

        self.wait_fifo_mask(regs::DBI_FIFO_EMPTY)?;
        self.wait_fifo_mask(fifo_mask(packet.mode()))?;

        let map = self.register_map();
        if packet.kind() == PacketKind::DpiSpecial {
            self.regs.write32(map.dpi_control, u32::from(packet.cmd()));
            return Ok(());
        }

        let control = packet
            .control_word(self.config.virtual_channel)
            .ok_or(DsiError::InvalidArgument)?;
        let (data_reg, ctrl_reg) = match packet.mode() {
            TransmissionMode::HighSpeed => (map.hs_gen_data, map.hs_gen_ctrl),
            TransmissionMode::LowPower => (map.lp_gen_data, map.lp_gen_ctrl),
        };
        for word in packet.payload_words() {
            self.regs.write32(data_reg, word);
        }
        self.regs.write32(ctrl_reg, control);

        self.track_sleep(packet);
        Ok(())
    }

    fn read_inner(&mut self, request: &Packet, out: &mut [u8]) -> Result<usize, DsiError> {
        let map = self.register_map();
        let avail = regs::INTR_GEN_READ_DATA_AVAIL;

        self.regs.write32(map.intr_stat, avail);
        self.transmit_inner(request)?;

        let regs = &mut self.regs;
        poll_with_timeout(&mut self.delay, self.config.read_poll, || {
            regs.read32(map.intr_stat) & avail != 0
        })
        .map_err(|t| {
            error!("no read response after {} polls", t.iterations);
            DsiError::Timeout
        })?;
        self.regs.write32(map.intr_stat, avail);

        let data_reg = match request.mode() {
            TransmissionMode::HighSpeed => map.hs_gen_data,
            TransmissionMode::LowPower => map.lp_gen_data,
        };
        for chunk in out.chunks_mut(4) {
            let word = self.regs.read32(data_reg).to_le_bytes();
            for (dst, src) in chunk.iter_mut().zip(word) {
                *dst = src;
            }
        }
        Ok(out.len())
    }

    fn kick_dbi_command_buffer(&mut self, packet: &Packet) -> Result<(), DsiError> {
        let map = self.register_map();
        let budget = self.config.dbi_ready_poll;

        self.poll_bits(map.gen_fifo_stat, regs::DBI_FIFO_EMPTY, regs::DBI_FIFO_EMPTY, budget)?;
        self.poll_bits(map.cmd_address, regs::CMD_VALID, 0, budget)?;

        trace!("DBI command {} kicked", packet.cmd());
        self.regs.write32(map.cmd_length, 1);
        self.regs.write32(
            map.cmd_address,
            (self.config.dbi_cb_addr & !0x3) | regs::CMD_MEM_WRITE | regs::CMD_VALID,
        );
        Ok(())
    }

    fn track_sleep(&mut self, packet: &Packet) {
        if packet.kind() != PacketKind::McsShortWrite0 {
            return;
        }
        match packet.cmd() {
            dcs::EXIT_SLEEP_MODE => self.panel_sleeping = false,
            dcs::ENTER_SLEEP_MODE => self.panel_sleeping = true,
            _ => {}
        }
    }

    /// Wait until every bit of `mask` reads set in GEN_FIFO_STAT.
    fn wait_fifo_mask(&mut self, mask: u32) -> Result<(), DsiError> {
        let reg = self.register_map().gen_fifo_stat;
        let budget = self.config.fifo_poll;
        self.poll_bits(reg, mask, mask, budget).map_err(|e| {
            error!("FIFO wait timed out, mask {}", mask);
            e
        })
    }

    /// Poll until `reg & mask == expected`.
    fn poll_bits(&mut self, reg: u32, mask: u32, expected: u32, budget: PollConfig) -> Result<(), DsiError> {
        let regs = &mut self.regs;
        poll_with_timeout(&mut self.delay, budget, || regs.read32(reg) & mask == expected)?;
        Ok(())
    }
}

const fn fifo_mask(mode: TransmissionMode) -> u32 {
    match mode {
        TransmissionMode::HighSpeed => regs::HS_FIFOS_EMPTY,
        TransmissionMode::LowPower => regs::LP_FIFOS_EMPTY,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::regs::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use platform::mocks::MockRegisterFile;

    type Sender = PacketSender<MockRegisterFile, NoopDelay>;

    fn fast_config() -> SenderConfig {
        SenderConfig {
            fifo_poll: PollConfig::new(8, 1),
            read_poll: PollConfig::new(8, 1),
            dbi_ready_poll: PollConfig::new(8, 1),
            ..SenderConfig::default()
        }
    }

    /// Sender on the primary pipe whose FIFOs always read empty.
    fn sender() -> (Sender, MockRegisterFile) {
        let regs = MockRegisterFile::new();
        regs.set(GEN_FIFO_STAT, ALL_FIFOS_EMPTY);
        regs.write_one_to_clear(INTR_STAT);
        let sender = PacketSender::new(regs.clone(), NoopDelay, Pipe::Primary, fast_config());
        (sender, regs)
    }

    // -----------------------------------------------------------------------
    // Framing
    // -----------------------------------------------------------------------

    /// exit_sleep_mode goes out as one control write and nothing else.
    #[test]
    fn short_write_is_single_control_write() {
        let (mut s, regs) = sender();
        let result = s.send_short(
            CommandSet::Mcs,
            dcs::EXIT_SLEEP_MODE,
            0,
            0,
            TransmissionMode::HighSpeed,
            Delivery::Immediate,
        );
        assert_eq!(result, Ok(()));
        assert_eq!(regs.writes(), vec![(HS_GEN_CTRL, 0x1105)]);
        assert!(regs.writes_to(HS_GEN_DATA).is_empty(), "short packet has no data words");
    }

    /// Four payload bytes become one little-endian data word before the header.
    #[test]
    fn long_write_data_then_control() {
        let (mut s, regs) = sender();
        s.send_long(
            CommandSet::Mcs,
            &[0xB9, 0xFF, 0x83, 0x92],
            TransmissionMode::HighSpeed,
            Delivery::Immediate,
        )
        .unwrap();
        assert_eq!(
            regs.writes(),
            vec![(HS_GEN_DATA, 0x9283_FFB9), (HS_GEN_CTRL, (4 << 8) | 0x39)]
        );
    }

    #[test]
    fn low_power_uses_lp_registers() {
        let (mut s, regs) = sender();
        s.send_long(CommandSet::Generic, &[1, 2, 3, 4, 5], TransmissionMode::LowPower, Delivery::Immediate)
            .unwrap();
        assert_eq!(
            regs.writes(),
            vec![
                (LP_GEN_DATA, 0x0403_0201),
                (LP_GEN_DATA, 0x0000_0005),
                (LP_GEN_CTRL, (5 << 8) | 0x29),
            ]
        );
    }

    #[test]
    fn generic_short_write_parameter_placement() {
        let (mut s, regs) = sender();
        s.send_short(CommandSet::Generic, 0xB0, 0x04, 2, TransmissionMode::LowPower, Delivery::Immediate)
            .unwrap();
        s.send_short(CommandSet::Generic, 0xB0, 0x04, 1, TransmissionMode::LowPower, Delivery::Immediate)
            .unwrap();
        s.send_short(CommandSet::Generic, 0xB0, 0x04, 0, TransmissionMode::LowPower, Delivery::Immediate)
            .unwrap();
        assert_eq!(regs.writes_to(LP_GEN_CTRL), vec![0x0004_B023, 0x0000_B013, 0x0000_0003]);
    }

    #[test]
    fn dpi_special_packet_goes_to_dpi_control() {
        let (mut s, regs) = sender();
        s.send_dpi_spk(DpiSpecial::TurnOn, TransmissionMode::HighSpeed, Delivery::Immediate)
            .unwrap();
        assert_eq!(regs.writes(), vec![(DPI_CONTROL, DPI_TURN_ON)]);
    }

    #[test]
    fn max_return_size_packet() {
        let (mut s, regs) = sender();
        s.set_max_return_size(0x0110, TransmissionMode::LowPower).unwrap();
        assert_eq!(regs.writes_to(LP_GEN_CTRL), vec![0x0001_1037]);
    }

    #[test]
    fn slave_panel_uses_secondary_registers() {
        let (mut s, regs) = sender();
        regs.set(GEN_FIFO_STAT + SECONDARY_PIPE_OFFSET, ALL_FIFOS_EMPTY);
        s.set_working_panel(WorkingPanel::Slave);
        s.send_short(CommandSet::Mcs, dcs::SET_DISPLAY_ON, 0, 0, TransmissionMode::HighSpeed, Delivery::Immediate)
            .unwrap();
        assert_eq!(regs.writes(), vec![(HS_GEN_CTRL + SECONDARY_PIPE_OFFSET, 0x2905)]);
    }

    // -----------------------------------------------------------------------
    // FIFO gating
    // -----------------------------------------------------------------------

    /// Empty generic FIFOs are not enough while a DBI transfer is in flight.
    #[test]
    fn busy_dbi_fifo_blocks_generic_writes() {
        let (mut s, regs) = sender();
        regs.set(GEN_FIFO_STAT, HS_FIFOS_EMPTY | LP_FIFOS_EMPTY);
        let result = s.send_short(
            CommandSet::Mcs,
            dcs::SET_DISPLAY_ON,
            0,
            0,
            TransmissionMode::LowPower,
            Delivery::Immediate,
        );
        assert_eq!(result, Err(DsiError::Timeout));
        assert!(regs.writes_to(LP_GEN_CTRL).is_empty(), "no control write");
        assert!(regs.writes_to(HS_GEN_CTRL).is_empty(), "no control write");
    }

    /// The write goes out once the DBI FIFO drains.
    #[test]
    fn generic_write_follows_dbi_drain() {
        let (mut s, regs) = sender();
        regs.script_reads(GEN_FIFO_STAT, &[HS_FIFOS_EMPTY | LP_FIFOS_EMPTY, HS_FIFOS_EMPTY | LP_FIFOS_EMPTY]);
        s.send_short(CommandSet::Mcs, dcs::SET_DISPLAY_ON, 0, 0, TransmissionMode::HighSpeed, Delivery::Immediate)
            .unwrap();
        assert_eq!(regs.pending_scripted(GEN_FIFO_STAT), 0);
        assert_eq!(regs.writes_to(HS_GEN_CTRL), vec![0x2905]);
    }

    /// An LP write only waits for the LP FIFOs, whatever the HS side holds.
    #[test]
    fn lp_write_ignores_busy_hs_fifos() {
        let (mut s, regs) = sender();
        regs.set(GEN_FIFO_STAT, ALL_FIFOS_EMPTY & !HS_FIFOS_EMPTY);
        s.send_long(CommandSet::Generic, &[0xB0, 0x04], TransmissionMode::LowPower, Delivery::Immediate)
            .unwrap();
        assert_eq!(regs.writes_to(LP_GEN_CTRL), vec![(2 << 8) | 0x29]);
        assert_eq!(s.status(), SenderStatus::Free);
    }

    // -----------------------------------------------------------------------
    // Argument validation
    // -----------------------------------------------------------------------

    /// Bad arguments never touch the register file.
    #[test]
    fn invalid_arguments_rejected_before_hardware() {
        let (mut s, regs) = sender();
        let hs = TransmissionMode::HighSpeed;
        assert_eq!(
            s.send_long(CommandSet::Mcs, &[], hs, Delivery::Immediate),
            Err(DsiError::InvalidArgument)
        );
        assert_eq!(
            s.send_long(CommandSet::Mcs, &[0; MAX_LONG_PAYLOAD + 1], hs, Delivery::Immediate),
            Err(DsiError::InvalidArgument)
        );
        assert_eq!(
            s.send_short(CommandSet::Mcs, 0x51, 0, 2, hs, Delivery::Immediate),
            Err(DsiError::InvalidArgument)
        );
        assert_eq!(
            s.read(CommandSet::Mcs, &[0x0A], &mut [], hs),
            Err(DsiError::InvalidArgument)
        );
        assert!(regs.writes().is_empty());
        assert_eq!(regs.read_count(INTR_STAT), 0);
        assert_eq!(regs.read_count(GEN_FIFO_STAT), 0);
        assert_eq!(s.pool_available(), POOL_CAPACITY, "no descriptor leaked");
        assert_eq!(s.status(), SenderStatus::Free);
    }

    // -----------------------------------------------------------------------
    // Status transitions
    // -----------------------------------------------------------------------

    /// A FIFO that never drains times out and leaves the sender Abnormal.
    #[test]
    fn fifo_timeout_marks_abnormal() {
        let (mut s, regs) = sender();
        regs.set(GEN_FIFO_STAT, 0);
        let result = s.send_short(
            CommandSet::Mcs,
            dcs::EXIT_SLEEP_MODE,
            0,
            0,
            TransmissionMode::HighSpeed,
            Delivery::Immediate,
        );
        assert_eq!(result, Err(DsiError::Timeout));
        assert_eq!(s.status(), SenderStatus::Abnormal);
        assert_eq!(regs.read_count(GEN_FIFO_STAT), 8, "poll is bounded by the budget");
        assert!(regs.writes().is_empty());
    }

    #[test]
    fn abnormal_persists_until_reinit() {
        let (mut s, regs) = sender();
        regs.set(GEN_FIFO_STAT, 0);
        let hs = TransmissionMode::HighSpeed;
        let _ = s.send_short(CommandSet::Mcs, 0x29, 0, 0, hs, Delivery::Immediate);

        regs.set(GEN_FIFO_STAT, ALL_FIFOS_EMPTY);
        assert_eq!(
            s.send_short(CommandSet::Mcs, 0x29, 0, 0, hs, Delivery::Immediate),
            Err(DsiError::Abnormal)
        );
        assert_eq!(s.status(), SenderStatus::Abnormal);

        s.reinit();
        assert_eq!(s.status(), SenderStatus::Free);
        assert_eq!(s.send_short(CommandSet::Mcs, 0x29, 0, 0, hs, Delivery::Immediate), Ok(()));
    }

    /// Busy is never observable once a call has returned.
    #[test]
    fn status_is_free_after_every_completed_call() {
        let (mut s, _regs) = sender();
        let hs = TransmissionMode::HighSpeed;
        s.send_short(CommandSet::Mcs, 0x29, 0, 0, hs, Delivery::Immediate).unwrap();
        assert_eq!(s.status(), SenderStatus::Free);
        s.send_long(CommandSet::Mcs, &[1, 2], hs, Delivery::Deferred).unwrap();
        assert_eq!(s.status(), SenderStatus::Free);
        s.drain_queue().unwrap();
        assert_eq!(s.status(), SenderStatus::Free);
        let _ = s.send_dcs_write_mem_start();
        assert_eq!(s.status(), SenderStatus::Free);
    }

    #[test]
    fn sleep_state_follows_sleep_commands() {
        let (mut s, _regs) = sender();
        let hs = TransmissionMode::HighSpeed;
        assert!(s.panel_sleeping());
        s.send_short(CommandSet::Mcs, dcs::EXIT_SLEEP_MODE, 0, 0, hs, Delivery::Immediate)
            .unwrap();
        assert!(!s.panel_sleeping());
        s.send_short(CommandSet::Mcs, dcs::ENTER_SLEEP_MODE, 0, 0, hs, Delivery::Immediate)
            .unwrap();
        assert!(s.panel_sleeping());
    }

    // -----------------------------------------------------------------------
    // Deferred queue
    // -----------------------------------------------------------------------

    #[test]
    fn deferred_packets_wait_for_drain() {
        let (mut s, regs) = sender();
        let lp = TransmissionMode::LowPower;
        s.send_short(CommandSet::Generic, 0xB0, 0x04, 2, lp, Delivery::Deferred).unwrap();
        s.send_short(CommandSet::Mcs, 0x29, 0, 0, lp, Delivery::Deferred).unwrap();
        assert!(regs.writes().is_empty(), "deferred packets must not be sent yet");
        assert_eq!(s.pending(), 2);

        assert_eq!(s.drain_queue(), Ok(2));
        assert_eq!(regs.writes_to(LP_GEN_CTRL), vec![0x0004_B023, 0x2905]);
        assert_eq!(s.pending(), 0);
        assert_eq!(s.pool_available(), POOL_CAPACITY);
    }

    #[test]
    fn queue_is_bounded_by_pool() {
        let (mut s, _regs) = sender();
        let hs = TransmissionMode::HighSpeed;
        for _ in 0..POOL_CAPACITY {
            s.send_short(CommandSet::Mcs, 0x00, 0, 0, hs, Delivery::Deferred).unwrap();
        }
        assert_eq!(
            s.send_short(CommandSet::Mcs, 0x00, 0, 0, hs, Delivery::Deferred),
            Err(DsiError::PoolExhausted)
        );
        assert_eq!(
            s.send_short(CommandSet::Mcs, 0x00, 0, 0, hs, Delivery::Immediate),
            Err(DsiError::PoolExhausted)
        );
        assert_eq!(s.drain_queue(), Ok(POOL_CAPACITY));
    }

    #[test]
    fn drain_refused_while_abnormal_and_reinit_discards() {
        let (mut s, regs) = sender();
        let hs = TransmissionMode::HighSpeed;
        s.send_short(CommandSet::Mcs, 0x29, 0, 0, hs, Delivery::Deferred).unwrap();

        regs.set(GEN_FIFO_STAT, 0);
        let _ = s.send_short(CommandSet::Mcs, 0x28, 0, 0, hs, Delivery::Immediate);
        assert_eq!(s.drain_queue(), Err(DsiError::Abnormal));
        assert_eq!(s.pending(), 1, "queue kept for inspection");

        s.reinit();
        assert_eq!(s.pending(), 0);
        assert_eq!(s.pool_available(), POOL_CAPACITY);
    }

    #[test]
    fn drain_stops_at_first_failure() {
        let (mut s, regs) = sender();
        let hs = TransmissionMode::HighSpeed;
        for cmd in [0x01, 0x02, 0x03] {
            s.send_short(CommandSet::Mcs, cmd, 0, 0, hs, Delivery::Deferred).unwrap();
        }
        regs.set(GEN_FIFO_STAT, 0);
        assert_eq!(s.drain_queue(), Err(DsiError::Timeout));
        assert_eq!(s.pending(), 2);
        assert_eq!(s.pool_available(), POOL_CAPACITY - 2);
    }

    // -----------------------------------------------------------------------
    // Read path
    // -----------------------------------------------------------------------

    #[test]
    fn read_unpacks_little_endian_words() {
        let (mut s, regs) = sender();
        // First INTR_STAT read belongs to the error handler, the second to the poll.
        regs.script_reads(INTR_STAT, &[0, INTR_GEN_READ_DATA_AVAIL]);
        regs.script_reads(HS_GEN_DATA, &[0x0403_0201, 0x0000_0605]);

        let mut buf = [0u8; 6];
        let n = s
            .read(CommandSet::Mcs, &[dcs::GET_POWER_MODE], &mut buf, TransmissionMode::HighSpeed)
            .unwrap();
        assert_eq!(n, 6);
        assert_eq!(buf, [1, 2, 3, 4, 5, 6]);
        assert_eq!(regs.writes_to(HS_GEN_CTRL), vec![0x0A06]);
        assert_eq!(
            regs.writes_to(INTR_STAT),
            vec![INTR_GEN_READ_DATA_AVAIL, INTR_GEN_READ_DATA_AVAIL],
            "data-available is cleared before the request and after the response"
        );
        assert_eq!(s.status(), SenderStatus::Free);
    }

    #[test]
    fn read_without_response_times_out() {
        let (mut s, _regs) = sender();
        let mut buf = [0u8; 1];
        assert_eq!(
            s.read(CommandSet::Generic, &[], &mut buf, TransmissionMode::LowPower),
            Err(DsiError::Timeout)
        );
        assert_eq!(s.status(), SenderStatus::Abnormal);
    }

    // -----------------------------------------------------------------------
    // Frame updates
    // -----------------------------------------------------------------------

    #[test]
    fn redundant_frame_update_rejected() {
        let (mut s, regs) = sender();
        assert_eq!(s.send_dcs_write_mem_start(), Err(DsiError::Again), "no TE yet");

        s.report_tearing_event();
        assert_eq!(s.send_dcs_write_mem_start(), Ok(()));
        assert_eq!(s.last_screen_update(), s.te_seq());
        assert_eq!(s.send_dcs_write_mem_start(), Err(DsiError::Again));

        // The controller consumed the command buffer.
        regs.set(CMD_ADDRESS, 0);
        s.report_tearing_event();
        assert_eq!(s.send_dcs_write_mem_start(), Ok(()));
        assert_eq!(regs.writes_to(CMD_LENGTH), vec![1, 1]);
    }

    #[test]
    fn write_mem_start_programs_command_buffer() {
        let regs = MockRegisterFile::new();
        regs.set(GEN_FIFO_STAT, ALL_FIFOS_EMPTY);
        let cfg = fast_config().with_dbi_cb_addr(0x1000_0000);
        let mut s = PacketSender::new(regs.clone(), NoopDelay, Pipe::Primary, cfg);
        s.report_tearing_event();
        s.send_dcs_write_mem_start().unwrap();
        assert_eq!(
            regs.writes(),
            vec![(CMD_LENGTH, 1), (CMD_ADDRESS, 0x1000_0000 | CMD_MEM_WRITE | CMD_VALID)]
        );
    }

    /// A busy command buffer drops the frame without poisoning the sender.
    #[test]
    fn stuck_command_buffer_drops_frame() {
        let (mut s, regs) = sender();
        regs.set(CMD_ADDRESS, CMD_VALID);
        s.report_tearing_event();
        assert_eq!(s.send_dcs_write_mem_start(), Err(DsiError::Timeout));
        assert_eq!(s.status(), SenderStatus::Free);
        assert_eq!(s.last_screen_update(), 0, "dropped frame is not recorded");
        assert!(regs.writes_to(CMD_LENGTH).is_empty());
    }
}
