//! Fixed-capacity packet descriptor pool.

use heapless::Deque;

use crate::error::DsiError;
use crate::packet::Packet;

/// Number of descriptors owned by each sender.
pub const POOL_CAPACITY: usize = 32;

/// Free list of reusable [`Packet`] descriptors.
///
/// The pool never grows: once every descriptor is out, [`acquire`](Self::acquire)
/// fails with [`DsiError::PoolExhausted`] so the caller sees the backpressure.
/// Released descriptors are zeroed and appended to the tail, so reuse is FIFO.
#[derive(Debug)]
pub struct PacketPool {
    free: Deque<Packet, POOL_CAPACITY>,
}

impl PacketPool {
    /// Create a pool holding [`POOL_CAPACITY`] blank descriptors.
    pub fn new() -> Self {
        let mut free = Deque::new();
        while !free.is_full() {
            if free.push_back(Packet::blank()).is_err() {
                break;
            }
        }
        Self { free }
    }

    /// Take one descriptor off the head of the free list.
    pub fn acquire(&mut self) -> Result<Packet, DsiError> {
        self.free.pop_front().ok_or_else(|| {
            warn!("packet pool exhausted");
            DsiError::PoolExhausted
        })
    }

    /// Zero `packet` and return it to the tail of the free list.
    ///
    /// A descriptor that does not fit (it came from another pool) is dropped.
    pub fn release(&mut self, mut packet: Packet) {
        packet.clear();
        if self.free.push_back(packet).is_err() {
            warn!("packet pool overfilled, descriptor dropped");
        }
    }

    /// Free descriptors left
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Total number of descriptors
    pub const fn capacity(&self) -> usize {
        POOL_CAPACITY
    }
}

impl Default for PacketPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::packet::{PacketKind, TransmissionMode};

    #[test]
    fn starts_full() {
        let pool = PacketPool::new();
        assert_eq!(pool.available(), POOL_CAPACITY);
    }

    #[test]
    fn exhaustion_is_reported_not_grown() {
        let mut pool = PacketPool::new();
        let mut held = std::vec::Vec::new();
        for _ in 0..POOL_CAPACITY {
            held.push(pool.acquire().expect("within capacity"));
        }
        assert_eq!(pool.acquire(), Err(DsiError::PoolExhausted));
        assert_eq!(pool.available(), 0);

        pool.release(held.pop().unwrap());
        assert!(pool.acquire().is_ok(), "release makes a descriptor available again");
    }

    #[test]
    fn released_descriptor_comes_back_zeroed() {
        let mut pool = PacketPool::new();
        let mut p = pool.acquire().unwrap();
        p.set_long(PacketKind::McsLongWrite, &[1, 2, 3], TransmissionMode::LowPower)
            .unwrap();
        pool.release(p);

        // FIFO reuse: drain the untouched ones first, then ours comes back.
        for _ in 0..POOL_CAPACITY - 1 {
            assert!(pool.acquire().unwrap().is_blank());
        }
        let reused = pool.acquire().unwrap();
        assert!(reused.is_blank(), "released descriptor must be zeroed");
    }

    #[test]
    fn foreign_descriptor_is_dropped_when_full() {
        let mut a = PacketPool::new();
        let mut b = PacketPool::new();
        let p = b.acquire().unwrap();
        a.release(p);
        assert_eq!(a.available(), POOL_CAPACITY);
    }
}
