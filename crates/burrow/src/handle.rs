//! Allocation handles and checkpoints.
//!
//! An [`Allocation`] names a byte range by its offset from the arena base
//! rather than by address. "Is this the most recent allocation?" becomes a
//! plain integer comparison against the arena cursor, and the `generation`
//! field gives an O(1) staleness check after a reset. The `epoch` field
//! does the same for handles thrown away by a restore.

use std::fmt;

/// A byte range handed out by an [`Arena`](crate::Arena).
///
/// Handles are `Copy` and carry no borrow of the arena; resolve them with
/// [`Arena::bytes`](crate::Arena::bytes) or
/// [`Arena::bytes_mut`](crate::Arena::bytes_mut).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Allocation {
    /// Arena generation when this allocation was made.
    pub(crate) generation: u32,
    /// Number of restores the arena had seen when this handle was issued.
    pub(crate) epoch: u64,
    /// Byte offset from the arena base.
    pub(crate) offset: usize,
    /// Length of the allocation in bytes.
    pub(crate) len: usize,
    /// Alignment the offset was rounded to. Reused when a grow relocates.
    pub(crate) align: usize,
}

impl Allocation {
    pub(crate) fn new(generation: u32, epoch: u64, offset: usize, len: usize, align: usize) -> Self {
        Self {
            generation,
            epoch,
            offset,
            len,
            align,
        }
    }

    /// The arena generation this handle belongs to.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Byte offset from the arena base.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this is a zero-length allocation.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset one past the last byte.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Alignment the start offset satisfies.
    pub fn align(&self) -> usize {
        self.align
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Allocation(gen={}, off={}, len={}, align={})",
            self.generation, self.offset, self.len, self.align
        )
    }
}

/// A captured arena cursor, used to roll back every allocation made since.
///
/// Produced by [`Arena::checkpoint`](crate::Arena::checkpoint).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct Checkpoint {
    pub(crate) generation: u32,
    pub(crate) cursor: usize,
}

impl Checkpoint {
    /// The arena generation the checkpoint was taken in.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// The cursor offset at capture time.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_is_offset_plus_len() {
        let a = Allocation::new(0, 0, 8, 10, 8);
        assert_eq!(a.end(), 18);
        assert!(!a.is_empty());
    }

    #[test]
    fn empty_allocation() {
        let a = Allocation::new(3, 0, 16, 0, 8);
        assert!(a.is_empty());
        assert_eq!(a.generation(), 3);
        assert_eq!(a.end(), 16);
    }

    #[test]
    fn display_lists_fields() {
        let a = Allocation::new(1, 2, 24, 4, 4);
        assert_eq!(a.to_string(), "Allocation(gen=1, off=24, len=4, align=4)");
    }
}
