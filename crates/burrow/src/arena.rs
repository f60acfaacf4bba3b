//! The bump arena.
//!
//! [`Arena`] owns one reserved region and a cursor. Allocation aligns the
//! cursor, bounds-checks, and bumps it. Nothing is ever freed individually;
//! [`Arena::reset`] and [`Arena::restore`] move the cursor back in O(1).
//!
//! ```text
//! 0                 cursor                         capacity
//! ├── handed out ───┤────────── free ───────────────┤
//! ```

use std::fmt;

use crate::align::checked_align;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::handle::{Allocation, Checkpoint};
use crate::raw::Region;
use crate::scope::ArenaScope;

/// Running counters for one arena. Never reset, not even by [`Arena::reset`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Successful fresh allocations, including those made by relocating grows.
    pub allocations: u64,
    /// Grows satisfied by moving the cursor only.
    pub in_place_grows: u64,
    /// Grows that had to allocate a new block and copy.
    pub relocating_grows: u64,
    /// Calls to [`Arena::reset`].
    pub resets: u64,
    /// Bytes copied by relocating grows.
    pub bytes_copied: u64,
    /// Highest cursor value ever reached.
    pub high_water: usize,
}

/// Cursor position a [`Arena::restore`] rolled back to.
///
/// Handles issued before `epoch` that reach past `cursor` were discarded.
#[derive(Clone, Copy, Debug)]
struct Rollback {
    epoch: u64,
    cursor: usize,
}

/// A region-based bump allocator over one fixed reservation.
///
/// The arena hands out [`Allocation`] handles (arena-relative offsets)
/// instead of raw pointers. Handles stay valid until the next
/// [`reset`](Arena::reset); resolving one afterwards yields
/// [`ArenaError::StaleHandle`] instead of reading recycled memory.
///
/// An arena has exactly one owner and is neither `Send` nor `Sync`.
pub struct Arena {
    region: Region,
    /// Next free offset. Invariant: `cursor <= region.len()`.
    cursor: usize,
    /// Alignment applied by [`Arena::alloc`].
    alignment: usize,
    /// Bumped on every reset.
    generation: u32,
    /// Bumped on every restore that discards something.
    epoch: u64,
    /// Restores in this generation, epochs ascending and cursors strictly
    /// ascending. Restores dominated by a later, lower one are dropped.
    rollbacks: Vec<Rollback>,
    stats: ArenaStats,
}

impl Arena {
    /// Reserve a region and create an arena over it.
    ///
    /// Fails with [`ArenaError::InvalidConfig`] for a zero capacity or
    /// alignment, and with [`ArenaError::ReservationFailed`] when the
    /// operating system refuses the reservation.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let region = Region::reserve(config.capacity)?;
        Ok(Self {
            region,
            cursor: 0,
            alignment: config.alignment,
            generation: 0,
            epoch: 0,
            rollbacks: Vec::new(),
            stats: ArenaStats::default(),
        })
    }

    /// Create an arena of `capacity` bytes with the default alignment.
    pub fn with_capacity(capacity: usize) -> Result<Self, ArenaError> {
        Self::new(ArenaConfig::new(capacity))
    }

    /// Create an arena with [`ArenaConfig::DEFAULT_CAPACITY`] (2 GiB).
    pub fn with_default_capacity() -> Result<Self, ArenaError> {
        Self::new(ArenaConfig::default())
    }

    /// Bump-allocate `size` bytes at the arena's current alignment.
    ///
    /// On [`ArenaError::OutOfMemory`] the cursor is left unchanged.
    pub fn alloc(&mut self, size: usize) -> Result<Allocation, ArenaError> {
        self.alloc_aligned(size, self.alignment)
    }

    /// Bump-allocate `size` bytes with an explicit start alignment.
    pub fn alloc_aligned(&mut self, size: usize, alignment: usize) -> Result<Allocation, ArenaError> {
        if alignment == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "alignment must be non-zero",
            });
        }
        let aligned = checked_align(self.cursor, alignment);
        let end = aligned
            .and_then(|start| start.checked_add(size))
            .filter(|&end| end <= self.capacity());
        let (Some(start), Some(end)) = (aligned, end) else {
            let requested = aligned.map_or(usize::MAX, |start| (start - self.cursor).saturating_add(size));
            debug!(
                "out of memory: requested {} bytes, {} remaining",
                requested,
                self.remaining()
            );
            return Err(ArenaError::OutOfMemory {
                requested,
                remaining: self.remaining(),
            });
        };

        self.region.commit(end)?;
        self.cursor = end;
        self.stats.allocations += 1;
        self.stats.high_water = self.stats.high_water.max(end);
        Ok(Allocation::new(self.generation, self.epoch, start, size, alignment))
    }

    /// Allocate space for `data` and copy it in.
    pub fn alloc_bytes(&mut self, data: &[u8]) -> Result<Allocation, ArenaError> {
        let allocation = self.alloc(data.len())?;
        self.region
            .bytes_mut(allocation.offset, allocation.len)
            .copy_from_slice(data);
        Ok(allocation)
    }

    /// Grow an allocation to `new_size` bytes, in place when possible.
    ///
    /// - `new_size <= len`: the handle is returned unchanged (no shrinking).
    /// - The allocation ends at the cursor: the cursor moves forward and the
    ///   returned handle keeps the same offset. Nothing is copied.
    /// - Otherwise a new block of `new_size` bytes is allocated with the
    ///   handle's alignment and the old contents are copied into it. The old
    ///   bytes stay behind as garbage until the next reset.
    pub fn grow_in_place(&mut self, allocation: Allocation, new_size: usize) -> Result<Allocation, ArenaError> {
        self.check(&allocation)?;
        if new_size <= allocation.len {
            return Ok(allocation);
        }

        if self.is_most_recent(&allocation) {
            let extra = new_size - allocation.len;
            let Some(end) = self
                .cursor
                .checked_add(extra)
                .filter(|&end| end <= self.capacity())
            else {
                debug!(
                    "out of memory growing {}: {} more bytes, {} remaining",
                    allocation,
                    extra,
                    self.remaining()
                );
                return Err(ArenaError::OutOfMemory {
                    requested: extra,
                    remaining: self.remaining(),
                });
            };
            self.region.commit(end)?;
            self.cursor = end;
            self.stats.in_place_grows += 1;
            self.stats.high_water = self.stats.high_water.max(end);
            return Ok(Allocation {
                len: new_size,
                epoch: self.epoch,
                ..allocation
            });
        }

        let fresh = self.alloc_aligned(new_size, allocation.align)?;
        self.region
            .copy_within(allocation.offset, fresh.offset, allocation.len);
        self.stats.relocating_grows += 1;
        self.stats.bytes_copied += allocation.len as u64;
        trace!(
            "relocated {} -> offset {} ({} bytes copied)",
            allocation,
            fresh.offset,
            allocation.len
        );
        Ok(fresh)
    }

    /// Whether `allocation` is live and nothing has been allocated after it.
    pub fn is_most_recent(&self, allocation: &Allocation) -> bool {
        self.check(allocation).is_ok() && allocation.end() == self.cursor
    }

    /// Move the cursor back to the start of the region.
    ///
    /// Every handle issued so far becomes stale. No memory is released or
    /// zeroed.
    pub fn reset(&mut self) {
        debug!(
            "reset arena (generation {}, {} bytes in use)",
            self.generation, self.cursor
        );
        self.cursor = 0;
        self.generation = self.generation.wrapping_add(1);
        self.rollbacks.clear();
        self.stats.resets += 1;
    }

    /// Capture the current cursor so later allocations can be rolled back.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            generation: self.generation,
            cursor: self.cursor,
        }
    }

    /// Roll the cursor back to `checkpoint`.
    ///
    /// Handles that reach past the checkpoint stop resolving for good and
    /// report [`ArenaError::RolledBack`], even once the cursor passes them
    /// again. Rejects checkpoints from an earlier generation and checkpoints
    /// ahead of the cursor.
    pub fn restore(&mut self, checkpoint: Checkpoint) -> Result<(), ArenaError> {
        if checkpoint.generation != self.generation {
            return Err(ArenaError::StaleHandle {
                handle_generation: checkpoint.generation,
                arena_generation: self.generation,
            });
        }
        if checkpoint.cursor > self.cursor {
            return Err(ArenaError::ForeignHandle {
                offset: checkpoint.cursor,
                end: checkpoint.cursor,
                used: self.cursor,
            });
        }
        if checkpoint.cursor == self.cursor {
            return Ok(());
        }
        trace!("restore cursor {} -> {}", self.cursor, checkpoint.cursor);
        self.epoch += 1;
        while self
            .rollbacks
            .last()
            .is_some_and(|rollback| rollback.cursor >= checkpoint.cursor)
        {
            self.rollbacks.pop();
        }
        self.rollbacks.push(Rollback {
            epoch: self.epoch,
            cursor: checkpoint.cursor,
        });
        self.cursor = checkpoint.cursor;
        Ok(())
    }

    /// Open a sub-allocation scope.
    ///
    /// The returned guard dereferences to this arena; when it is dropped
    /// the cursor returns to where it was when `scope` was called.
    pub fn scope(&mut self) -> ArenaScope<'_> {
        ArenaScope::new(self)
    }

    /// Resolve a handle to its bytes.
    pub fn bytes(&self, allocation: &Allocation) -> Result<&[u8], ArenaError> {
        self.check(allocation)?;
        Ok(self.region.bytes(allocation.offset, allocation.len))
    }

    /// Resolve a handle to its bytes, mutably.
    pub fn bytes_mut(&mut self, allocation: &Allocation) -> Result<&mut [u8], ArenaError> {
        self.check(allocation)?;
        Ok(self.region.bytes_mut(allocation.offset, allocation.len))
    }

    /// Total size of the reservation in bytes.
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// Bytes between the base and the cursor, padding included.
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Bytes left between the cursor and the end of the region.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.cursor
    }

    /// Alignment applied by [`Arena::alloc`].
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Change the alignment used by subsequent [`Arena::alloc`] calls.
    pub fn set_alignment(&mut self, alignment: usize) -> Result<(), ArenaError> {
        if alignment == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "alignment must be non-zero",
            });
        }
        self.alignment = alignment;
        Ok(())
    }

    /// Number of resets so far, as encoded in fresh handles.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Address of the first byte of the region.
    ///
    /// The base is page-aligned, so an offset aligned to any power of two up
    /// to the page size is an equally aligned address.
    pub fn base_ptr(&self) -> *const u8 {
        self.region.base_ptr()
    }

    /// Allocation counters.
    pub fn stats(&self) -> &ArenaStats {
        &self.stats
    }

    fn check(&self, allocation: &Allocation) -> Result<(), ArenaError> {
        if allocation.generation != self.generation {
            return Err(ArenaError::StaleHandle {
                handle_generation: allocation.generation,
                arena_generation: self.generation,
            });
        }
        // Lowest cursor restored to since the handle was issued.
        let later = self
            .rollbacks
            .partition_point(|rollback| rollback.epoch <= allocation.epoch);
        if let Some(rollback) = self.rollbacks.get(later) {
            let end = allocation.offset.saturating_add(allocation.len);
            if end > rollback.cursor {
                return Err(ArenaError::RolledBack {
                    offset: allocation.offset,
                    end,
                    restored_to: rollback.cursor,
                });
            }
        }
        match allocation.offset.checked_add(allocation.len) {
            Some(end) if end <= self.cursor => Ok(()),
            _ => Err(ArenaError::ForeignHandle {
                offset: allocation.offset,
                end: allocation.offset.saturating_add(allocation.len),
                used: self.cursor,
            }),
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("base", &self.base_ptr())
            .field("capacity", &self.capacity())
            .field("used", &self.cursor)
            .field("alignment", &self.alignment)
            .field("generation", &self.generation)
            .finish()
    }
}
