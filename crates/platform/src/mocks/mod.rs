//! Mock implementations for testing
//!
//! This module provides mock implementations of the platform traits for use
//! in unit and integration tests. Both mocks are clone-handles over shared
//! state: keep one clone in the test, move the other into the code under test,
//! and inspect the recorded traffic afterwards.

#![cfg(any(test, feature = "std"))]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::vec::Vec;

use crate::{PowerIsland, PowerIslandManager, RegisterFile};

#[derive(Default)]
struct RegisterState {
    values: BTreeMap<u32, u32>,
    scripted: BTreeMap<u32, VecDeque<u32>>,
    write_one_to_clear: BTreeSet<u32>,
    writes: Vec<(u32, u32)>,
    reads: BTreeMap<u32, usize>,
}

/// Mock register file
///
/// - Unwritten registers read as zero.
/// - [`script_reads`](Self::script_reads) queues values returned by the next
///   reads of one offset; once drained, reads fall back to the stored value.
/// - Offsets marked with [`write_one_to_clear`](Self::write_one_to_clear)
///   behave like interrupt-status registers: writing a mask clears those bits.
/// - Every write is recorded in order.
#[derive(Clone, Default)]
pub struct MockRegisterFile {
    state: Arc<Mutex<RegisterState>>,
}

impl MockRegisterFile {
    /// Create an empty register file (every register reads zero)
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegisterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the stored value of a register without recording a write
    pub fn set(&self, offset: u32, value: u32) {
        self.state().values.insert(offset, value);
    }

    /// Current stored value of a register
    pub fn value(&self, offset: u32) -> u32 {
        self.state().values.get(&offset).copied().unwrap_or(0)
    }

    /// Queue values returned by the next reads of `offset`
    pub fn script_reads(&self, offset: u32, values: &[u32]) {
        self.state()
            .scripted
            .entry(offset)
            .or_default()
            .extend(values.iter().copied());
    }

    /// Number of scripted reads of `offset` not consumed yet
    pub fn pending_scripted(&self, offset: u32) -> usize {
        self.state().scripted.get(&offset).map_or(0, VecDeque::len)
    }

    /// Give `offset` write-one-to-clear semantics
    pub fn write_one_to_clear(&self, offset: u32) {
        self.state().write_one_to_clear.insert(offset);
    }

    /// All recorded writes, in order
    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.state().writes.clone()
    }

    /// Recorded values written to one offset, in order
    pub fn writes_to(&self, offset: u32) -> Vec<u32> {
        self.state()
            .writes
            .iter()
            .filter(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Forget recorded writes (stored values are kept)
    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    /// Number of reads performed on `offset`
    pub fn read_count(&self, offset: u32) -> usize {
        self.state().reads.get(&offset).copied().unwrap_or(0)
    }
}

impl RegisterFile for MockRegisterFile {
    fn read32(&mut self, offset: u32) -> u32 {
        let mut state = self.state();
        let count = state.reads.entry(offset).or_insert(0);
        *count = count.saturating_add(1);
        if let Some(value) = state.scripted.get_mut(&offset).and_then(VecDeque::pop_front) {
            return value;
        }
        state.values.get(&offset).copied().unwrap_or(0)
    }

    fn write32(&mut self, offset: u32, value: u32) {
        let mut state = self.state();
        state.writes.push((offset, value));
        if state.write_one_to_clear.contains(&offset) {
            let current = state.values.get(&offset).copied().unwrap_or(0);
            state.values.insert(offset, current & !value);
        } else {
            state.values.insert(offset, value);
        }
    }
}

#[derive(Default)]
struct PowerState {
    requests: Vec<(PowerIsland, bool)>,
    powered: BTreeMap<PowerIsland, bool>,
    deny_off: bool,
    deny_on: bool,
    hw_begin: usize,
    hw_end: usize,
}

/// Mock platform power manager
///
/// Every island starts powered. Transitions succeed unless the test asked for
/// them to be denied.
#[derive(Clone, Default)]
pub struct MockPowerManager {
    state: Arc<Mutex<PowerState>>,
}

/// Error returned by [`MockPowerManager`] when a transition is denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionDenied;

impl MockPowerManager {
    /// Create a power manager with every island on
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, PowerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuse every power-off request from now on
    pub fn deny_power_off(&self, deny: bool) {
        self.state().deny_off = deny;
    }

    /// Refuse every power-on request from now on
    pub fn deny_power_on(&self, deny: bool) {
        self.state().deny_on = deny;
    }

    /// All island requests, in order (including denied ones)
    pub fn requests(&self) -> Vec<(PowerIsland, bool)> {
        self.state().requests.clone()
    }

    /// Whether `island` is currently on
    pub fn powered(&self, island: PowerIsland) -> bool {
        self.state().powered.get(&island).copied().unwrap_or(true)
    }

    /// `(begin, end)` counts of `using_hw_*` brackets
    pub fn hw_brackets(&self) -> (usize, usize) {
        let state = self.state();
        (state.hw_begin, state.hw_end)
    }
}

impl PowerIslandManager for MockPowerManager {
    type Error = TransitionDenied;

    fn power_island_request(&mut self, island: PowerIsland, on: bool) -> Result<(), Self::Error> {
        let mut state = self.state();
        state.requests.push((island, on));
        if (on && state.deny_on) || (!on && state.deny_off) {
            return Err(TransitionDenied);
        }
        state.powered.insert(island, on);
        Ok(())
    }

    fn using_hw_begin(&mut self, island: PowerIsland, force_on: bool) -> bool {
        let mut state = self.state();
        let on = state.powered.get(&island).copied().unwrap_or(true);
        if !on {
            if !force_on || state.deny_on {
                return false;
            }
            state.powered.insert(island, true);
        }
        state.hw_begin = state.hw_begin.saturating_add(1);
        true
    }

    fn using_hw_end(&mut self, _island: PowerIsland) {
        let mut state = self.state();
        state.hw_end = state.hw_end.saturating_add(1);
    }

    fn is_powered(&self, island: PowerIsland) -> Option<bool> {
        Some(self.powered(island))
    }
}
