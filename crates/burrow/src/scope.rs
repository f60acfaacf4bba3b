//! Scoped sub-allocation.
//!
//! [`ArenaScope`] checkpoints the arena on creation and restores the
//! checkpoint on drop, so everything allocated through the guard is
//! discarded when the scope ends, whichever way it ends.

use std::ops::{Deref, DerefMut};

use crate::arena::Arena;
use crate::handle::Checkpoint;

/// Guard returned by [`Arena::scope`].
///
/// Holds the arena's only mutable borrow for its lifetime. Allocate through
/// it as if it were the arena; on drop the cursor returns to the captured
/// checkpoint. Call [`ArenaScope::keep`] to retain the allocations instead.
///
/// If the arena is [`reset`](Arena::reset) inside the scope, the reset wins
/// and the drop does nothing.
#[must_use]
pub struct ArenaScope<'a> {
    arena: &'a mut Arena,
    checkpoint: Checkpoint,
    armed: bool,
}

impl<'a> ArenaScope<'a> {
    pub(crate) fn new(arena: &'a mut Arena) -> Self {
        let checkpoint = arena.checkpoint();
        Self {
            arena,
            checkpoint,
            armed: true,
        }
    }

    /// The position the arena will return to.
    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    /// End the scope without rolling back.
    pub fn keep(mut self) {
        self.armed = false;
    }
}

impl Deref for ArenaScope<'_> {
    type Target = Arena;

    fn deref(&self) -> &Arena {
        &*self.arena
    }
}

impl DerefMut for ArenaScope<'_> {
    fn deref_mut(&mut self) -> &mut Arena {
        &mut *self.arena
    }
}

impl Drop for ArenaScope<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.arena.restore(self.checkpoint).is_err() {
            trace!(
                "scope checkpoint at {} no longer applies; leaving cursor at {}",
                self.checkpoint.cursor(),
                self.arena.used()
            );
        }
    }
}
