//! Region-based bump allocation.
//!
//! `burrow` reserves one contiguous block of address space up front and
//! serves allocations from it by advancing a cursor. There is no per-object
//! free: memory comes back all at once through [`Arena::reset`], or back to
//! an earlier point through [`Arena::restore`] / [`Arena::scope`].
//!
//! # Architecture
//!
//! ```text
//! Context (owning handle, or the thread-local default in `context`)
//! └── Arena
//!     ├── Region      (mmap / VirtualAlloc reservation, lazily committed; raw.rs)
//!     ├── cursor      (offset of the next free byte)
//!     ├── generation  (bumped on reset; stamped into every Allocation)
//!     └── epoch       (bumped on restore; stamped into every Allocation)
//!
//! DynArray<T>  ── Allocation handle + len + capacity, elements in the Arena
//! ArenaScope   ── checkpoint on entry, restore on drop
//! Defer        ── run a closure at scope exit (LIFO)
//! ```
//!
//! Allocations are [`Allocation`] handles (offsets from the region base),
//! not pointers. Resolving a handle checks its generation, epoch and range,
//! so a use after reset is an [`ArenaError::StaleHandle`] and a use after a
//! restore is an [`ArenaError::RolledBack`], never a read of recycled
//! memory.
//!
//! # Threading
//!
//! An arena has a single owner. It is neither `Send` nor `Sync`, and no
//! operation blocks or locks.
//!
//! # Safety
//!
//! `unsafe` is confined to `raw.rs`: the virtual memory reservation and the typed
//! views over its bytes.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

#[macro_use]
mod logging;

pub mod align;
pub mod arena;
pub mod array;
pub mod config;
pub mod context;
pub mod defer;
pub mod error;
pub mod handle;
mod raw;
pub mod scope;

// Public re-exports for the primary API surface.
pub use align::align;
pub use arena::{Arena, ArenaStats};
pub use array::DynArray;
pub use config::ArenaConfig;
pub use context::Context;
pub use defer::{defer, defer_with, Defer, DeferWith};
pub use error::ArenaError;
pub use handle::{Allocation, Checkpoint};
pub use raw::Element;
pub use scope::ArenaScope;
