//! Growable typed array backed by arena memory.
//!
//! [`DynArray`] keeps only a handle, a length and a capacity; the elements
//! live in an [`Arena`]. The arena is passed to every call, so the array
//! never holds a borrow and several arrays can share one arena.
//!
//! Capacity doubles when exhausted, through [`Arena::grow_in_place`]. While
//! the array's buffer is the arena's most recent allocation, growth only
//! moves the cursor. If something else was allocated in between, the buffer
//! is copied to a fresh block instead; slower, never incorrect.

use std::marker::PhantomData;
use std::mem::{align_of, size_of};

use crate::arena::Arena;
use crate::error::ArenaError;
use crate::handle::Allocation;
use crate::raw::{cast, cast_mut, Element};

/// A growable sequence of `T` stored in an [`Arena`].
///
/// ```
/// use burrow::{Arena, DynArray};
///
/// let mut arena = Arena::with_capacity(4096).unwrap();
/// let mut values = DynArray::<u32>::new(&mut arena).unwrap();
/// for v in [2, 4, 3, 5, 4] {
///     values.push(&mut arena, v).unwrap();
/// }
/// assert_eq!(values.len(), 5);
/// assert_eq!(values.capacity(), 8);
/// assert_eq!(values.get(&arena, 3).unwrap(), 5);
/// assert!(values.get(&arena, 5).is_err());
/// ```
#[derive(Debug)]
pub struct DynArray<T: Element> {
    allocation: Allocation,
    /// Live elements. Invariant: `count <= reserved`.
    count: usize,
    /// Elements the current allocation can hold. Never shrinks.
    reserved: usize,
    _marker: PhantomData<T>,
}

impl<T: Element> DynArray<T> {
    /// Create an empty array with room for one element.
    pub fn new(arena: &mut Arena) -> Result<Self, ArenaError> {
        Self::with_capacity(arena, 1)
    }

    /// Create an empty array with room for `capacity` elements (at least one).
    pub fn with_capacity(arena: &mut Arena, capacity: usize) -> Result<Self, ArenaError> {
        if size_of::<T>() == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "zero-sized element types cannot be stored",
            });
        }
        let reserved = capacity.max(1);
        let bytes = Self::byte_len(reserved, arena)?;
        let allocation = arena.alloc_aligned(bytes, Self::alignment(arena))?;
        Ok(Self {
            allocation,
            count: 0,
            reserved,
            _marker: PhantomData,
        })
    }

    /// Append `value`, doubling the capacity first if the array is full.
    ///
    /// On error the array is unchanged.
    pub fn push(&mut self, arena: &mut Arena, value: T) -> Result<(), ArenaError> {
        if self.count == self.reserved {
            self.grow(arena)?;
        }
        let slot = self.count;
        self.slots_mut(arena)?[slot] = value;
        self.count += 1;
        Ok(())
    }

    /// Append every element of `values`.
    pub fn extend_from_slice(&mut self, arena: &mut Arena, values: &[T]) -> Result<(), ArenaError> {
        for &value in values {
            self.push(arena, value)?;
        }
        Ok(())
    }

    /// Copy of the element at `index`.
    pub fn get(&self, arena: &Arena, index: usize) -> Result<T, ArenaError> {
        self.get_ref(arena, index).copied()
    }

    /// Reference to the element at `index`.
    ///
    /// Returns [`ArenaError::OutOfBounds`] unless `index < len`.
    pub fn get_ref<'a>(&self, arena: &'a Arena, index: usize) -> Result<&'a T, ArenaError> {
        self.check_index(index)?;
        Ok(&self.as_slice(arena)?[index])
    }

    /// Overwrite the element at `index`.
    pub fn set(&mut self, arena: &mut Arena, index: usize, value: T) -> Result<(), ArenaError> {
        self.check_index(index)?;
        self.slots_mut(arena)?[index] = value;
        Ok(())
    }

    /// The live elements as a slice.
    pub fn as_slice<'a>(&self, arena: &'a Arena) -> Result<&'a [T], ArenaError> {
        let bytes = arena.bytes(&self.allocation)?;
        Ok(&cast::<T>(bytes)[..self.count])
    }

    /// The live elements as a mutable slice.
    pub fn as_mut_slice<'a>(&self, arena: &'a mut Arena) -> Result<&'a mut [T], ArenaError> {
        let count = self.count;
        Ok(&mut self.slots_mut(arena)?[..count])
    }

    /// Iterate over copies of the live elements.
    pub fn iter<'a>(&self, arena: &'a Arena) -> Result<impl Iterator<Item = T> + 'a, ArenaError> {
        Ok(self.as_slice(arena)?.iter().copied())
    }

    /// Copy the live elements out of the arena.
    pub fn to_vec(&self, arena: &Arena) -> Result<Vec<T>, ArenaError> {
        Ok(self.as_slice(arena)?.to_vec())
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of elements the current buffer can hold.
    pub fn capacity(&self) -> usize {
        self.reserved
    }

    /// Handle to the backing buffer (`capacity() * size_of::<T>()` bytes).
    pub fn allocation(&self) -> Allocation {
        self.allocation
    }

    fn grow(&mut self, arena: &mut Arena) -> Result<(), ArenaError> {
        let reserved = self
            .reserved
            .checked_add(self.reserved)
            .ok_or(ArenaError::OutOfMemory {
                requested: usize::MAX,
                remaining: arena.remaining(),
            })?;
        let bytes = Self::byte_len(reserved, arena)?;
        self.allocation = arena.grow_in_place(self.allocation, bytes)?;
        self.reserved = reserved;
        Ok(())
    }

    /// Every reserved slot, live or not.
    fn slots_mut<'a>(&self, arena: &'a mut Arena) -> Result<&'a mut [T], ArenaError> {
        Ok(cast_mut::<T>(arena.bytes_mut(&self.allocation)?))
    }

    fn check_index(&self, index: usize) -> Result<(), ArenaError> {
        if index < self.count {
            Ok(())
        } else {
            Err(ArenaError::OutOfBounds {
                index,
                len: self.count,
            })
        }
    }

    fn byte_len(elements: usize, arena: &Arena) -> Result<usize, ArenaError> {
        elements
            .checked_mul(size_of::<T>())
            .ok_or(ArenaError::OutOfMemory {
                requested: usize::MAX,
                remaining: arena.remaining(),
            })
    }

    /// The arena's alignment when it also satisfies `T`, else `T`'s own.
    fn alignment(arena: &Arena) -> usize {
        let natural = align_of::<T>();
        if arena.alignment() % natural == 0 {
            arena.alignment()
        } else {
            natural
        }
    }
}
