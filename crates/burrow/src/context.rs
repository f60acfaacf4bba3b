//! Shared default arena.
//!
//! Two ways to give callers an arena without each of them creating one:
//!
//! - [`Context`]: an owning handle created once at start-up and passed down
//!   explicitly. Preferred.
//! - A per-thread default arena behind [`init`] / [`with_arena`]. Arenas
//!   are single-owner and `!Send`, so "process-wide" means "for this
//!   thread". Initialisation is explicit and idempotent; nothing is created
//!   behind the caller's back.

use std::cell::RefCell;

use crate::arena::Arena;
use crate::array::DynArray;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::raw::Element;

/// Owning handle to the arena shared by one logical thread of control.
#[derive(Debug)]
pub struct Context {
    arena: Arena,
}

impl Context {
    /// Reserve the arena described by `config`.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        Ok(Self {
            arena: Arena::new(config)?,
        })
    }

    /// Wrap an existing arena.
    pub fn from_arena(arena: Arena) -> Self {
        Self { arena }
    }

    /// The shared arena.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// The shared arena, mutably.
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// Start an empty [`DynArray`] in the shared arena.
    pub fn array<T: Element>(&mut self) -> Result<DynArray<T>, ArenaError> {
        DynArray::new(&mut self.arena)
    }

    /// Give up the context, keeping the arena.
    pub fn into_arena(self) -> Arena {
        self.arena
    }
}

thread_local! {
    static DEFAULT_ARENA: RefCell<Option<Arena>> = const { RefCell::new(None) };
}

/// Initialise this thread's default arena.
///
/// Returns `Ok(true)` if the arena was created by this call and `Ok(false)`
/// if one already existed (in which case `config` is ignored).
pub fn init(config: ArenaConfig) -> Result<bool, ArenaError> {
    DEFAULT_ARENA.with(|slot| {
        let mut slot = slot.try_borrow_mut().map_err(|_| ArenaError::ContextUnavailable {
            reason: "default arena is in use",
        })?;
        if slot.is_some() {
            return Ok(false);
        }
        *slot = Some(Arena::new(config)?);
        debug!("initialised thread default arena");
        Ok(true)
    })
}

/// Whether this thread's default arena exists.
pub fn is_initialized() -> bool {
    DEFAULT_ARENA.with(|slot| match slot.try_borrow() {
        Ok(slot) => slot.is_some(),
        // Mutably borrowed by an enclosing `with_arena`, so it exists.
        Err(_) => true,
    })
}

/// Run `f` with this thread's default arena.
///
/// Fails with [`ArenaError::ContextUnavailable`] if [`init`] has not been
/// called, or if called from inside another `with_arena` on the same
/// thread.
pub fn with_arena<R>(f: impl FnOnce(&mut Arena) -> R) -> Result<R, ArenaError> {
    DEFAULT_ARENA.with(|slot| {
        let mut slot = slot.try_borrow_mut().map_err(|_| ArenaError::ContextUnavailable {
            reason: "default arena is already borrowed",
        })?;
        let arena = slot.as_mut().ok_or(ArenaError::ContextUnavailable {
            reason: "default arena is not initialised",
        })?;
        Ok(f(arena))
    })
}

/// Remove this thread's default arena, returning it to the caller.
///
/// Returns `Ok(None)` if no arena was initialised, and
/// [`ArenaError::ContextUnavailable`] if called from inside
/// [`with_arena`]. A later [`init`] creates a fresh one.
pub fn release() -> Result<Option<Arena>, ArenaError> {
    DEFAULT_ARENA.with(|slot| {
        let mut slot = slot.try_borrow_mut().map_err(|_| ArenaError::ContextUnavailable {
            reason: "default arena is in use",
        })?;
        let arena = slot.take();
        if arena.is_some() {
            debug!("released thread default arena");
        }
        Ok(arena)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_owns_arena() {
        let mut ctx = Context::new(ArenaConfig::new(1024)).unwrap();
        let mut values = ctx.array::<u32>().unwrap();
        values.push(ctx.arena_mut(), 11).unwrap();
        assert_eq!(values.get(ctx.arena(), 0).unwrap(), 11);
        let arena = ctx.into_arena();
        assert_eq!(arena.used(), 4);
    }

    #[test]
    fn with_arena_requires_init() {
        assert!(!is_initialized());
        assert!(matches!(
            with_arena(|arena| arena.used()),
            Err(ArenaError::ContextUnavailable { .. })
        ));
    }

    #[test]
    fn init_is_idempotent() {
        assert!(init(ArenaConfig::new(1024)).unwrap());
        assert!(!init(ArenaConfig::new(64)).unwrap());
        assert_eq!(with_arena(|arena| arena.capacity()).unwrap(), 1024);
        release().unwrap();
    }

    #[test]
    fn default_arena_keeps_state_between_calls() {
        init(ArenaConfig::new(1024)).unwrap();
        let first = with_arena(|arena| arena.alloc(10)).unwrap().unwrap();
        let second = with_arena(|arena| arena.alloc(10)).unwrap().unwrap();
        assert_eq!(first.offset(), 0);
        assert_eq!(second.offset(), 16);
        release().unwrap();
    }

    #[test]
    fn nested_access_is_rejected() {
        init(ArenaConfig::new(1024)).unwrap();
        let inner = with_arena(|_| with_arena(|arena| arena.used())).unwrap();
        assert!(matches!(inner, Err(ArenaError::ContextUnavailable { .. })));
        release().unwrap();
    }

    #[test]
    fn release_allows_reinit() {
        init(ArenaConfig::new(1024)).unwrap();
        let released = release().unwrap().unwrap();
        assert_eq!(released.capacity(), 1024);
        assert!(!is_initialized());
        assert!(init(ArenaConfig::new(2048)).unwrap());
        assert_eq!(with_arena(|arena| arena.capacity()).unwrap(), 2048);
        release().unwrap();
    }

    #[test]
    fn release_without_init_is_none() {
        assert!(release().unwrap().is_none());
    }

    #[test]
    fn release_inside_with_arena_is_rejected() {
        init(ArenaConfig::new(1024)).unwrap();
        let inner = with_arena(|_| release()).unwrap();
        assert!(matches!(inner, Err(ArenaError::ContextUnavailable { .. })));
        assert!(is_initialized());
        release().unwrap();
    }

    #[test]
    fn init_failure_leaves_context_empty() {
        assert!(init(ArenaConfig::new(0)).is_err());
        assert!(!is_initialized());
    }
}
