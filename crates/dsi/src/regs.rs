//! MIPI-DSI controller register map
//!
//! Offsets are given for the primary pipe (MIPI A). The secondary pipe's
//! controller (MIPI C) sits at a fixed distance from the primary one; every
//! offset is resolved once through [`DsiRegisterMap::for_pipe`] when a sender
//! is created, so the hot path never recomputes addresses.

// Register and bit names follow the controller datasheet. Offsets stay below
// 0xc000, so adding the pipe offset cannot overflow.
#![allow(missing_docs, clippy::arithmetic_side_effects)]

// ---------------------------------------------------------------------------
// Pipes
// ---------------------------------------------------------------------------

/// Distance between the primary and secondary controller register blocks.
pub const SECONDARY_PIPE_OFFSET: u32 = 0x800;

/// Display pipe driving a DSI controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pipe {
    /// Pipe A, MIPI A controller
    #[default]
    Primary,
    /// Pipe C, MIPI C controller
    Secondary,
}

impl Pipe {
    /// Offset added to every controller register of this pipe
    pub const fn register_offset(self) -> u32 {
        match self {
            Self::Primary => 0,
            Self::Secondary => SECONDARY_PIPE_OFFSET,
        }
    }

    /// Pipe index as used by the display pipeline (0 or 2)
    pub const fn index(self) -> u8 {
        match self {
            Self::Primary => 0,
            Self::Secondary => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Primary-pipe offsets
// ---------------------------------------------------------------------------

pub const DEVICE_READY: u32 = 0xb000;
pub const INTR_STAT: u32 = 0xb004;
pub const INTR_EN: u32 = 0xb008;
pub const DSI_FUNC_PRG: u32 = 0xb00c;
pub const HS_TX_TIMEOUT: u32 = 0xb010;
pub const LP_RX_TIMEOUT: u32 = 0xb014;
pub const TURN_AROUND_TIMEOUT: u32 = 0xb018;
pub const DEVICE_RESET_TIMER: u32 = 0xb01c;
pub const DPI_RESOLUTION: u32 = 0xb020;
pub const DPI_CONTROL: u32 = 0xb048;
pub const DPI_DATA: u32 = 0xb04c;
pub const INIT_COUNT: u32 = 0xb050;
pub const MAX_RETURN_PACK_SIZE: u32 = 0xb054;
pub const VIDEO_MODE_FORMAT: u32 = 0xb058;
pub const EOT_DISABLE: u32 = 0xb05c;
pub const LP_BYTECLK: u32 = 0xb060;
pub const LP_GEN_DATA: u32 = 0xb064;
pub const HS_GEN_DATA: u32 = 0xb068;
pub const LP_GEN_CTRL: u32 = 0xb06c;
pub const HS_GEN_CTRL: u32 = 0xb070;
pub const GEN_FIFO_STAT: u32 = 0xb074;
pub const HS_LS_DBI_ENABLE: u32 = 0xb078;
pub const DPHY_PARAM: u32 = 0xb080;
pub const DBI_BW_CTRL: u32 = 0xb084;
pub const CLK_LANE_SWITCH_TIME_CNT: u32 = 0xb088;
pub const CMD_ADDRESS: u32 = 0xb108;
pub const CMD_LENGTH: u32 = 0xb10c;

// ---------------------------------------------------------------------------
// Bit fields
// ---------------------------------------------------------------------------

/// DEVICE_READY: controller enabled
pub const DEVICE_READY_BIT: u32 = 1 << 0;
/// DEVICE_READY: ULPS state field (bits 2:1)
pub const ULPS_MASK: u32 = 0b11 << 1;
/// DEVICE_READY: request ULPS entry
pub const ULPS_ENTER: u32 = 0b01 << 1;
/// DEVICE_READY: request ULPS exit
pub const ULPS_EXIT: u32 = 0b10 << 1;

/// GEN_FIFO_STAT: HS generic data FIFO empty
pub const HS_DATA_FIFO_EMPTY: u32 = 1 << 2;
/// GEN_FIFO_STAT: LP generic data FIFO empty
pub const LP_DATA_FIFO_EMPTY: u32 = 1 << 10;
/// GEN_FIFO_STAT: HS generic control FIFO empty
pub const HS_CTRL_FIFO_EMPTY: u32 = 1 << 18;
/// GEN_FIFO_STAT: LP generic control FIFO empty
pub const LP_CTRL_FIFO_EMPTY: u32 = 1 << 26;
/// GEN_FIFO_STAT: DBI FIFO empty
pub const DBI_FIFO_EMPTY: u32 = 1 << 27;
/// GEN_FIFO_STAT: DPI FIFO empty
pub const DPI_FIFO_EMPTY: u32 = 1 << 28;

pub const HS_FIFOS_EMPTY: u32 = HS_DATA_FIFO_EMPTY | HS_CTRL_FIFO_EMPTY;
pub const LP_FIFOS_EMPTY: u32 = LP_DATA_FIFO_EMPTY | LP_CTRL_FIFO_EMPTY;
pub const ALL_FIFOS_EMPTY: u32 = HS_FIFOS_EMPTY | LP_FIFOS_EMPTY | DBI_FIFO_EMPTY | DPI_FIFO_EMPTY;

/// DPI_CONTROL: shutdown special packet
pub const DPI_SHUTDOWN: u32 = 1 << 0;
/// DPI_CONTROL: turn-on special packet
pub const DPI_TURN_ON: u32 = 1 << 1;

/// EOT_DISABLE: high-contention workaround bits
pub const EOT_CONTENTION_WORKAROUND: u32 = 0x30;

/// CMD_ADDRESS: command buffer valid; the controller clears it when done
pub const CMD_VALID: u32 = 1 << 0;
/// CMD_ADDRESS: memory-write command
pub const CMD_MEM_WRITE: u32 = 1 << 1;

// ---------------------------------------------------------------------------
// Interrupt status
// ---------------------------------------------------------------------------

pub const INTR_HIGH_CONTENTION: u32 = 1 << 18;
pub const INTR_DPI_FIFO_UNDERRUN: u32 = 1 << 20;
pub const INTR_HS_TX_TIMEOUT: u32 = 1 << 21;
pub const INTR_LP_RX_TIMEOUT: u32 = 1 << 22;
pub const INTR_HS_GEN_WRITE_FIFO_FULL: u32 = 1 << 27;
pub const INTR_LP_GEN_WRITE_FIFO_FULL: u32 = 1 << 28;
pub const INTR_GEN_READ_DATA_AVAIL: u32 = 1 << 29;

/// Names of the 32 INTR_STAT bits, indexed by bit number.
pub const INTR_STAT_NAMES: [&str; 32] = [
    "RX SOT Error",
    "RX SOT Sync Error",
    "RX EOT Sync Error",
    "RX Escape Mode Entry Error",
    "RX LP TX Sync Error",
    "RX HS Receive Timeout Error",
    "RX False Control Error",
    "RX ECC Single Bit Error",
    "RX ECC Multibit Error",
    "RX Checksum Error",
    "RX DSI Data Type Not Recognised",
    "RX DSI VC ID Invalid",
    "TX False Control Error",
    "TX ECC Single Bit Error",
    "TX ECC Multibit Error",
    "TX Checksum Error",
    "TX DSI Data Type Not Recognised",
    "TX DSI VC ID Invalid",
    "High Contention",
    "Low Contention",
    "DPI FIFO Under run",
    "HS TX Timeout",
    "LP RX Timeout",
    "Turn Around ACK Timeout",
    "ACK With No Error",
    "RX Invalid TX Length",
    "RX Prot Violation",
    "HS Generic Write FIFO Full",
    "LP Generic Write FIFO Full",
    "Generic Read Data Avail",
    "Special Packet Sent",
    "Tearing Effect",
];

/// Name of one INTR_STAT bit (`"Unknown"` past bit 31)
pub fn intr_name(bit: u32) -> &'static str {
    usize::try_from(bit)
        .ok()
        .and_then(|i| INTR_STAT_NAMES.get(i))
        .copied()
        .unwrap_or("Unknown")
}

// ---------------------------------------------------------------------------
// Resolved map
// ---------------------------------------------------------------------------

/// Controller register offsets for one pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DsiRegisterMap {
    pub device_ready: u32,
    pub intr_stat: u32,
    pub intr_en: u32,
    pub func_prg: u32,
    pub hs_tx_timeout: u32,
    pub lp_rx_timeout: u32,
    pub turn_around_timeout: u32,
    pub device_reset_timer: u32,
    pub dpi_resolution: u32,
    pub dpi_control: u32,
    pub dpi_data: u32,
    pub init_count: u32,
    pub max_return_pack_size: u32,
    pub video_mode_format: u32,
    pub eot_disable: u32,
    pub lp_byteclk: u32,
    pub lp_gen_data: u32,
    pub hs_gen_data: u32,
    pub lp_gen_ctrl: u32,
    pub hs_gen_ctrl: u32,
    pub gen_fifo_stat: u32,
    pub hs_ls_dbi_enable: u32,
    pub dphy_param: u32,
    pub dbi_bw_ctrl: u32,
    pub clk_lane_switch_time_cnt: u32,
    pub cmd_address: u32,
    pub cmd_length: u32,
}

impl DsiRegisterMap {
    /// Resolve every controller register for `pipe`.
    pub const fn for_pipe(pipe: Pipe) -> Self {
        let base = pipe.register_offset();
        Self {
            device_ready: DEVICE_READY + base,
            intr_stat: INTR_STAT + base,
            intr_en: INTR_EN + base,
            func_prg: DSI_FUNC_PRG + base,
            hs_tx_timeout: HS_TX_TIMEOUT + base,
            lp_rx_timeout: LP_RX_TIMEOUT + base,
            turn_around_timeout: TURN_AROUND_TIMEOUT + base,
            device_reset_timer: DEVICE_RESET_TIMER + base,
            dpi_resolution: DPI_RESOLUTION + base,
            dpi_control: DPI_CONTROL + base,
            dpi_data: DPI_DATA + base,
            init_count: INIT_COUNT + base,
            max_return_pack_size: MAX_RETURN_PACK_SIZE + base,
            video_mode_format: VIDEO_MODE_FORMAT + base,
            eot_disable: EOT_DISABLE + base,
            lp_byteclk: LP_BYTECLK + base,
            lp_gen_data: LP_GEN_DATA + base,
            hs_gen_data: HS_GEN_DATA + base,
            lp_gen_ctrl: LP_GEN_CTRL + base,
            hs_gen_ctrl: HS_GEN_CTRL + base,
            gen_fifo_stat: GEN_FIFO_STAT + base,
            hs_ls_dbi_enable: HS_LS_DBI_ENABLE + base,
            dphy_param: DPHY_PARAM + base,
            dbi_bw_ctrl: DBI_BW_CTRL + base,
            clk_lane_switch_time_cnt: CLK_LANE_SWITCH_TIME_CNT + base,
            cmd_address: CMD_ADDRESS + base,
            cmd_length: CMD_LENGTH + base,
        }
    }
}
