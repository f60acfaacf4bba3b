//! Arena error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The operating system refused to reserve the backing region.
    ///
    /// Only returned from arena construction. There is nothing to recover
    /// at this layer.
    ReservationFailed {
        /// Number of bytes that were requested.
        capacity: usize,
        /// OS-provided description of the failure.
        reason: String,
    },
    /// A configuration value is unusable (zero capacity or alignment).
    InvalidConfig {
        /// What was wrong.
        reason: &'static str,
    },
    /// An allocation or growth would run past the end of the region.
    ///
    /// The arena cursor is left untouched when this is returned.
    OutOfMemory {
        /// Number of bytes requested (including alignment padding).
        requested: usize,
        /// Bytes left between the cursor and the end of the region.
        remaining: usize,
    },
    /// A dynamic array was indexed outside `[0, len)`.
    OutOfBounds {
        /// The offending index.
        index: usize,
        /// Number of live elements.
        len: usize,
    },
    /// An [`Allocation`](crate::Allocation) or [`Checkpoint`](crate::Checkpoint)
    /// from before the most recent reset.
    StaleHandle {
        /// The generation encoded in the handle.
        handle_generation: u32,
        /// The arena's current generation.
        arena_generation: u32,
    },
    /// A handle whose range does not lie inside this arena's used region.
    ///
    /// Produced by handles from another arena, or checkpoints ahead of the
    /// cursor.
    ForeignHandle {
        /// Start of the handle's range.
        offset: usize,
        /// One past the end of the handle's range.
        end: usize,
        /// The arena cursor at the time of the check.
        used: usize,
    },
    /// An [`Allocation`](crate::Allocation) discarded by
    /// [`Arena::restore`](crate::Arena::restore).
    ///
    /// Returned even after the cursor has moved past the handle again, since
    /// its bytes may now belong to a newer allocation.
    RolledBack {
        /// Start of the handle's range.
        offset: usize,
        /// One past the end of the handle's range.
        end: usize,
        /// Cursor the arena was rolled back to.
        restored_to: usize,
    },
    /// The thread's default arena cannot be reached.
    ContextUnavailable {
        /// Why (not initialised, or already borrowed).
        reason: &'static str,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservationFailed { capacity, reason } => {
                write!(f, "failed to reserve {capacity} bytes: {reason}")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid arena config: {reason}")
            }
            Self::OutOfMemory {
                requested,
                remaining,
            } => {
                write!(
                    f,
                    "arena out of memory: requested {requested} bytes, {remaining} bytes remaining"
                )
            }
            Self::OutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
            Self::StaleHandle {
                handle_generation,
                arena_generation,
            } => {
                write!(
                    f,
                    "stale handle: generation {handle_generation}, arena generation {arena_generation}"
                )
            }
            Self::ForeignHandle { offset, end, used } => {
                write!(
                    f,
                    "handle range {offset}..{end} is outside the used arena range 0..{used}"
                )
            }
            Self::RolledBack {
                offset,
                end,
                restored_to,
            } => {
                write!(
                    f,
                    "handle range {offset}..{end} was discarded by a restore to {restored_to}"
                )
            }
            Self::ContextUnavailable { reason } => {
                write!(f, "default arena unavailable: {reason}")
            }
        }
    }
}

impl Error for ArenaError {}
