//! Address rounding.
//!
//! Alignment here is plain modulo rounding: any positive value works, not
//! only powers of two. An alignment of 3 rounds 4 up to 6.

/// Round `address` up to the next multiple of `alignment`.
///
/// Returns the smallest `a >= address` with `a % alignment == 0`. An
/// alignment of 1 is a no-op.
///
/// # Panics
///
/// Panics if `alignment` is zero or the result overflows `usize`. The arena
/// uses [`checked_align`] instead.
pub fn align(address: usize, alignment: usize) -> usize {
    let rem = address % alignment;
    if rem == 0 {
        address
    } else {
        address + (alignment - rem)
    }
}

/// Like [`align`], but returns `None` for a zero alignment or on overflow.
pub fn checked_align(address: usize, alignment: usize) -> Option<usize> {
    let rem = address.checked_rem(alignment)?;
    if rem == 0 {
        Some(address)
    } else {
        address.checked_add(alignment - rem)
    }
}
