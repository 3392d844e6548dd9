//! Object handle with generational index
//!
//! Handles are lightweight (8 bytes) references to objects owned by the
//! caller's world state. The spatial index stores handles only; it never owns
//! or destroys the objects behind them.

/// Object handle (generation-indexed for safety)
///
/// Format: [32-bit index | 32-bit generation]
/// - Index: Slot of the object in the caller's storage
/// - Generation: Incremented by the caller when the slot is reused, so a
///   stale handle left in an index never aliases the new occupant
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle {
    index: u32,
    generation: u32,
}

impl ObjectHandle {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Same slot, next generation.
    pub fn next_generation(&self) -> Self {
        Self::new(self.index, self.generation.wrapping_add(1))
    }

    /// Pack into a 64-bit integer (for logging and debugging overlays)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Unpack from a 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}
