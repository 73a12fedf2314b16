//! Power management abstraction
//!
//! The SoC gates the display controller, the DSI PHYs and the graphics block
//! as separate power islands owned by the platform PMU driver. The display
//! path only ever asks for islands to be turned on or off and brackets
//! register access with `using_hw_begin` / `using_hw_end` so that the PMU does
//! not gate an island underneath an in-flight register sequence.

/// Platform power-island interface
pub trait PowerIslandManager {
    /// Error type
    type Error: core::fmt::Debug;

    /// Request `island` to be powered on (`on == true`) or gated.
    ///
    /// The PMU may refuse a transition (e.g. another client still holds the
    /// island); the caller must then stay in its current power state.
    fn power_island_request(&mut self, island: PowerIsland, on: bool) -> Result<(), Self::Error>;

    /// Mark the start of register access on `island`.
    ///
    /// With `force_on` the island is powered up if it is currently gated.
    /// Returns `false` when the island is off and was not (or could not be)
    /// powered, in which case the caller must not touch its registers and must
    /// not call [`using_hw_end`](Self::using_hw_end).
    fn using_hw_begin(&mut self, island: PowerIsland, force_on: bool) -> bool;

    /// Mark the end of register access started by a successful
    /// [`using_hw_begin`](Self::using_hw_begin).
    fn using_hw_end(&mut self, island: PowerIsland);

    /// Whether `island` is currently powered (if the platform can tell).
    fn is_powered(&self, _island: PowerIsland) -> Option<bool> {
        None
    }
}

impl<T: PowerIslandManager + ?Sized> PowerIslandManager for &mut T {
    type Error = T::Error;

    fn power_island_request(&mut self, island: PowerIsland, on: bool) -> Result<(), Self::Error> {
        (**self).power_island_request(island, on)
    }

    fn using_hw_begin(&mut self, island: PowerIsland, force_on: bool) -> bool {
        (**self).using_hw_begin(island, force_on)
    }

    fn using_hw_end(&mut self, island: PowerIsland) {
        (**self).using_hw_end(island);
    }

    fn is_powered(&self, island: PowerIsland) -> Option<bool> {
        (**self).is_powered(island)
    }
}

/// Power islands relevant to the display path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerIsland {
    /// Display controller for pipe A (primary MIPI port)
    DisplayA,
    /// Display controller for pipe C (secondary MIPI port)
    DisplayC,
    /// MIPI DSI PHY / adapter
    Mipi,
}
