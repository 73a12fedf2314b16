//! MMIO register file abstraction.
//!
//! The DSI controller is programmed exclusively through 32-bit registers at
//! fixed offsets from the display MMIO base. Offsets are resolved once by the
//! caller (see `dsi::regs::DsiRegisterMap`); this trait only moves words.

/// Blocking access to 32-bit device registers.
///
/// Implementations on hardware wrap volatile reads and writes of the mapped
/// MMIO window. Register access cannot fail at this level: a powered-down
/// island reads back garbage rather than returning an error, which is why
/// callers bracket power transitions with
/// [`PowerIslandManager::using_hw_begin`](crate::PowerIslandManager::using_hw_begin).
pub trait RegisterFile {
    /// Read the 32-bit register at `offset`.
    fn read32(&mut self, offset: u32) -> u32;

    /// Write `value` to the 32-bit register at `offset`.
    fn write32(&mut self, offset: u32, value: u32);

    /// Read-modify-write: set the bits in `mask`.
    fn set_bits32(&mut self, offset: u32, mask: u32) {
        let value = self.read32(offset);
        self.write32(offset, value | mask);
    }

    /// Read-modify-write: clear the bits in `mask`.
    fn clear_bits32(&mut self, offset: u32, mask: u32) {
        let value = self.read32(offset);
        self.write32(offset, value & !mask);
    }
}

impl<T: RegisterFile + ?Sized> RegisterFile for &mut T {
    fn read32(&mut self, offset: u32) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: u32, value: u32) {
        (**self).write32(offset, value);
    }
}
