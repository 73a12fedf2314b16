//! DSI packet model and control-word framing
//!
//! A [`Packet`] is one unit of work for the sender. Short packets carry up to
//! two inline parameter bytes; long packets own a copy of the caller's bytes
//! in an inline `heapless` buffer, so the caller's slice can be reused as
//! soon as the submitting call returns.

// Framing shifts operate on bytes widened to u32 and stay below bit 32.
#![allow(clippy::arithmetic_side_effects)]

use heapless::Vec;

use crate::error::DsiError;

/// Largest long-packet payload accepted by the sender, in bytes.
///
/// Payloads live inline in every pool descriptor, so this bounds the pool's
/// static footprint. Panel init writes stay far below it.
pub const MAX_LONG_PAYLOAD: usize = 128;

// ---------------------------------------------------------------------------
// MIPI data types
// ---------------------------------------------------------------------------

/// MIPI-DSI data type identifiers used by this controller.
pub mod data_type {
    /// DCS/MCS short write, no parameter
    pub const DCS_SHORT_WRITE_0: u8 = 0x05;
    /// DCS/MCS short write, one parameter
    pub const DCS_SHORT_WRITE_1: u8 = 0x15;
    /// DCS/MCS read
    pub const DCS_READ: u8 = 0x06;
    /// DCS/MCS long write
    pub const DCS_LONG_WRITE: u8 = 0x39;
    /// Generic short write, no parameter
    pub const GENERIC_SHORT_WRITE_0: u8 = 0x03;
    /// Generic short write, one parameter
    pub const GENERIC_SHORT_WRITE_1: u8 = 0x13;
    /// Generic short write, two parameters
    pub const GENERIC_SHORT_WRITE_2: u8 = 0x23;
    /// Generic read, no parameter
    pub const GENERIC_READ_0: u8 = 0x04;
    /// Generic read, one parameter
    pub const GENERIC_READ_1: u8 = 0x14;
    /// Generic read, two parameters
    pub const GENERIC_READ_2: u8 = 0x24;
    /// Generic long write
    pub const GENERIC_LONG_WRITE: u8 = 0x29;
    /// Set maximum return packet size
    pub const SET_MAX_RETURN_SIZE: u8 = 0x37;
}

/// Well-known DCS commands.
pub mod dcs {
    /// Read display power mode
    pub const GET_POWER_MODE: u8 = 0x0A;
    /// Enter sleep mode
    pub const ENTER_SLEEP_MODE: u8 = 0x10;
    /// Exit sleep mode
    pub const EXIT_SLEEP_MODE: u8 = 0x11;
    /// Display off
    pub const SET_DISPLAY_OFF: u8 = 0x28;
    /// Display on
    pub const SET_DISPLAY_ON: u8 = 0x29;
    /// Start frame memory write
    pub const WRITE_MEM_START: u8 = 0x2C;
    /// Tearing effect line off
    pub const SET_TEAR_OFF: u8 = 0x34;
    /// Tearing effect line on
    pub const SET_TEAR_ON: u8 = 0x35;
    /// Write display brightness
    pub const WRITE_DISPLAY_BRIGHTNESS: u8 = 0x51;
    /// Write CTRL display (backlight control)
    pub const WRITE_CTRL_DISPLAY: u8 = 0x53;
    /// Write content adaptive brightness control
    pub const WRITE_POWER_SAVE: u8 = 0x55;
}

// ---------------------------------------------------------------------------
// Selectors
// ---------------------------------------------------------------------------

/// HS vs LP transmission; selects the generic FIFO pair used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmissionMode {
    /// High-speed
    #[default]
    HighSpeed,
    /// Low-power
    LowPower,
}

/// Command namespace a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandSet {
    /// Manufacturer / display command set (DCS data types)
    Mcs,
    /// Generic read/write
    Generic,
}

/// Whether a write is transmitted before the call returns or queued for
/// [`drain_queue`](crate::PacketSender::drain_queue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Delivery {
    /// Transmit now
    Immediate,
    /// Append to the pending queue
    Deferred,
}

/// DPI special packets, written to the DPI control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DpiSpecial {
    /// Shut the video stream down
    Shutdown,
    /// Turn the video stream on
    TurnOn,
}

impl DpiSpecial {
    /// DPI control register value for this packet
    pub const fn control_bits(self) -> u32 {
        match self {
            Self::Shutdown => crate::regs::DPI_SHUTDOWN,
            Self::TurnOn => crate::regs::DPI_TURN_ON,
        }
    }
}

// ---------------------------------------------------------------------------
// Packet kind
// ---------------------------------------------------------------------------

/// Packet variants understood by the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketKind {
    /// Frame-buffer update through the DBI command buffer
    Dcs,
    /// Generic short write with no parameter
    GenericShortWrite0,
    /// Generic short write with one parameter
    GenericShortWrite1,
    /// Generic short write with two parameters
    GenericShortWrite2,
    /// Generic read with no parameter
    GenericRead0,
    /// Generic read with one parameter
    GenericRead1,
    /// Generic read with two parameters
    GenericRead2,
    /// MCS short write with no parameter
    #[default]
    McsShortWrite0,
    /// MCS short write with one parameter
    McsShortWrite1,
    /// MCS read
    McsRead,
    /// MCS long write
    McsLongWrite,
    /// Generic long write
    GenericLongWrite,
    /// DPI shutdown / turn-on
    DpiSpecial,
    /// Set maximum return packet size
    SetMaxReturnSize,
}

impl PacketKind {
    /// Short write kind for `set` with `param_count` parameters.
    pub const fn short_write(set: CommandSet, param_count: u8) -> Result<Self, DsiError> {
        match (set, param_count) {
            (CommandSet::Mcs, 0) => Ok(Self::McsShortWrite0),
            (CommandSet::Mcs, 1) => Ok(Self::McsShortWrite1),
            (CommandSet::Generic, 0) => Ok(Self::GenericShortWrite0),
            (CommandSet::Generic, 1) => Ok(Self::GenericShortWrite1),
            (CommandSet::Generic, 2) => Ok(Self::GenericShortWrite2),
            _ => Err(DsiError::InvalidArgument),
        }
    }

    /// Read request kind for `set` with `param_count` request parameters.
    pub const fn read(set: CommandSet, param_count: usize) -> Result<Self, DsiError> {
        match (set, param_count) {
            (CommandSet::Mcs, 1) => Ok(Self::McsRead),
            (CommandSet::Generic, 0) => Ok(Self::GenericRead0),
            (CommandSet::Generic, 1) => Ok(Self::GenericRead1),
            (CommandSet::Generic, 2) => Ok(Self::GenericRead2),
            _ => Err(DsiError::InvalidArgument),
        }
    }

    /// Long write kind for `set`.
    pub const fn long_write(set: CommandSet) -> Self {
        match set {
            CommandSet::Mcs => Self::McsLongWrite,
            CommandSet::Generic => Self::GenericLongWrite,
        }
    }

    /// MIPI data type written into the control word. `None` for packets
    /// that do not go through the generic control register.
    pub const fn data_type(self) -> Option<u8> {
        use data_type as dt;
        match self {
            Self::Dcs | Self::DpiSpecial => None,
            Self::GenericShortWrite0 => Some(dt::GENERIC_SHORT_WRITE_0),
            Self::GenericShortWrite1 => Some(dt::GENERIC_SHORT_WRITE_1),
            Self::GenericShortWrite2 => Some(dt::GENERIC_SHORT_WRITE_2),
            Self::GenericRead0 => Some(dt::GENERIC_READ_0),
            Self::GenericRead1 => Some(dt::GENERIC_READ_1),
            Self::GenericRead2 => Some(dt::GENERIC_READ_2),
            Self::McsShortWrite0 => Some(dt::DCS_SHORT_WRITE_0),
            Self::McsShortWrite1 => Some(dt::DCS_SHORT_WRITE_1),
            Self::McsRead => Some(dt::DCS_READ),
            Self::McsLongWrite => Some(dt::DCS_LONG_WRITE),
            Self::GenericLongWrite => Some(dt::GENERIC_LONG_WRITE),
            Self::SetMaxReturnSize => Some(dt::SET_MAX_RETURN_SIZE),
        }
    }

    /// Whether the packet carries a payload through the data register
    pub const fn is_long(self) -> bool {
        matches!(self, Self::McsLongWrite | Self::GenericLongWrite)
    }

    /// Whether the packet is a read request
    pub const fn is_read(self) -> bool {
        matches!(
            self,
            Self::McsRead | Self::GenericRead0 | Self::GenericRead1 | Self::GenericRead2
        )
    }
}

// ---------------------------------------------------------------------------
// Control-word encoding
// ---------------------------------------------------------------------------

/// Short packet header: `param<<16 | cmd<<8 | vc<<6 | type`.
pub const fn short_control_word(data_type: u8, vc: u8, cmd: u8, param: u8) -> u32 {
    ((param as u32) << 16) | ((cmd as u32) << 8) | (((vc & 0x3) as u32) << 6) | (data_type as u32 & 0x3f)
}

/// Long packet header: word count in bits 23:8, `vc<<6 | type` below.
pub const fn long_control_word(data_type: u8, vc: u8, len: u16) -> u32 {
    ((len as u32) << 8) | (((vc & 0x3) as u32) << 6) | (data_type as u32 & 0x3f)
}

/// Pack up to four bytes into one little-endian data-register word.
/// Missing high bytes are zero.
pub fn pack_word(chunk: &[u8]) -> u32 {
    chunk
        .iter()
        .take(4)
        .rev()
        .fold(0u32, |word, &b| (word << 8) | u32::from(b))
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// One packet descriptor.
///
/// Descriptors only come out of a [`PacketPool`](crate::PacketPool); they go
/// back to it, zeroed, once transmitted or discarded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    kind: PacketKind,
    mode: TransmissionMode,
    cmd: u8,
    param: u8,
    payload: Vec<u8, MAX_LONG_PAYLOAD>,
}

impl Packet {
    pub(crate) fn blank() -> Self {
        Self::default()
    }

    /// Reset every field to its zero value.
    pub(crate) fn clear(&mut self) {
        self.kind = PacketKind::default();
        self.mode = TransmissionMode::default();
        self.cmd = 0;
        self.param = 0;
        self.payload.clear();
    }

    /// Whether every field holds its zero value
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }

    /// Fill as a short packet.
    pub fn set_short(&mut self, kind: PacketKind, cmd: u8, param: u8, mode: TransmissionMode) {
        self.kind = kind;
        self.mode = mode;
        self.cmd = cmd;
        self.param = param;
        self.payload.clear();
    }

    /// Fill as a long packet, copying `data`.
    ///
    /// Empty and oversized buffers are rejected and leave the packet blank.
    pub fn set_long(&mut self, kind: PacketKind, data: &[u8], mode: TransmissionMode) -> Result<(), DsiError> {
        self.clear();
        if data.is_empty() || !kind.is_long() {
            return Err(DsiError::InvalidArgument);
        }
        self.payload
            .extend_from_slice(data)
            .map_err(|_| DsiError::InvalidArgument)?;
        self.kind = kind;
        self.mode = mode;
        Ok(())
    }

    /// Packet variant
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// Transmission mode
    pub fn mode(&self) -> TransmissionMode {
        self.mode
    }

    /// First inline byte (DCS command or first generic parameter)
    pub fn cmd(&self) -> u8 {
        self.cmd
    }

    /// Second inline byte
    pub fn param(&self) -> u8 {
        self.param
    }

    /// Long-packet payload (empty for short packets)
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Control word for the generic control register, `None` for packets
    /// that are not framed through it.
    pub fn control_word(&self, vc: u8) -> Option<u32> {
        let dt = self.kind.data_type()?;
        if self.kind.is_long() {
            let len = u16::try_from(self.payload.len()).ok()?;
            Some(long_control_word(dt, vc, len))
        } else {
            Some(short_control_word(dt, vc, self.cmd, self.param))
        }
    }

    /// Payload split into data-register words, in transmission order.
    pub fn payload_words(&self) -> impl Iterator<Item = u32> + '_ {
        self.payload.chunks(4).map(pack_word)
    }
}
