//! Low-level primitives: the reserved region and typed byte views.
//!
//! This is the only module permitted to contain `unsafe` code. Every
//! `unsafe` block carries a `// SAFETY:` comment, and everything exposed to
//! the rest of the crate is a safe, bounds-checked function.

#![allow(unsafe_code)]

use std::mem::{align_of, size_of};
use std::ptr::{self, NonNull};
use std::slice;

use crate::error::ArenaError;

/// One contiguous, read/write, process-private reservation.
///
/// On unix this is an anonymous `mmap`; pages are committed by the kernel on
/// first touch, so reserving gigabytes is cheap. On Windows the range is
/// reserved with `VirtualAlloc(MEM_RESERVE)` and committed page by page as
/// the arena cursor advances. The mapping is released when the region is
/// dropped.
///
/// `NonNull` keeps the region `!Send` and `!Sync`.
pub(crate) struct Region {
    ptr: NonNull<u8>,
    len: usize,
    /// Prefix that may be touched. Invariant: `committed <= len`.
    committed: usize,
}

impl Region {
    /// Reserve `capacity` bytes of zeroed address space.
    pub(crate) fn reserve(capacity: usize) -> Result<Self, ArenaError> {
        let (ptr, committed) = sys::reserve(capacity)?;
        debug!("reserved {} bytes at {:p}", capacity, ptr.as_ptr());
        Ok(Self {
            ptr,
            len: capacity,
            committed,
        })
    }

    /// Make the first `end` bytes accessible.
    ///
    /// Fails with [`ArenaError::ReservationFailed`] if the operating system
    /// refuses to back the pages. `end` must not exceed the reservation.
    pub(crate) fn commit(&mut self, end: usize) -> Result<(), ArenaError> {
        if end <= self.committed {
            return Ok(());
        }
        assert!(
            end <= self.len,
            "commit to {end} exceeds reservation of {} bytes",
            self.len
        );
        self.committed = sys::commit(self.ptr, self.committed, end, self.len)?;
        trace!("committed {} of {} bytes", self.committed, self.len);
        Ok(())
    }

    /// Length of the reservation in bytes.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Address of the first byte.
    pub(crate) fn base_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Shared view of `len` bytes at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range is not inside the committed prefix.
    pub(crate) fn bytes(&self, offset: usize, len: usize) -> &[u8] {
        self.check_range(offset, len);
        // SAFETY: the range is inside the committed mapping (checked above),
        // the mapping is readable and lives as long as `self`, and the returned
        // borrow ties the slice to `&self`.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr().add(offset), len) }
    }

    /// Mutable view of `len` bytes at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range is not inside the committed prefix.
    pub(crate) fn bytes_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        self.check_range(offset, len);
        // SAFETY: as in `bytes`; `&mut self` guarantees no other view into
        // the mapping is alive.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr().add(offset), len) }
    }

    /// Copy `len` bytes from `src` to `dst` within the region.
    ///
    /// The ranges may overlap.
    pub(crate) fn copy_within(&mut self, src: usize, dst: usize, len: usize) {
        self.check_range(src, len);
        self.check_range(dst, len);
        let base = self.ptr.as_ptr();
        // SAFETY: both ranges are inside the committed mapping (checked
        // above) and
        // `ptr::copy` tolerates overlap.
        unsafe { ptr::copy(base.add(src), base.add(dst), len) }
    }

    fn check_range(&self, offset: usize, len: usize) {
        let in_range = offset
            .checked_add(len)
            .is_some_and(|end| end <= self.committed);
        assert!(
            in_range,
            "region access {offset}+{len} exceeds committed {} bytes",
            self.committed
        );
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        debug!("releasing {} bytes at {:p}", self.len, self.ptr.as_ptr());
        // SAFETY: `ptr`/`len` came from `sys::reserve` and are released
        // exactly once, here.
        unsafe { sys::release(self.ptr, self.len) }
    }
}

#[cfg(unix)]
mod sys {
    use std::io;
    use std::ptr::{self, NonNull};

    use crate::error::ArenaError;

    #[cfg(any(target_os = "linux", target_os = "android"))]
    const EXTRA_FLAGS: libc::c_int = libc::MAP_NORESERVE;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    const EXTRA_FLAGS: libc::c_int = 0;

    /// Map the whole range. The kernel backs pages on first touch, so all of
    /// it counts as committed.
    pub(super) fn reserve(capacity: usize) -> Result<(NonNull<u8>, usize), ArenaError> {
        // SAFETY: an anonymous private mapping with no requested address
        // does not alias any existing memory; the kernel picks the range.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                capacity,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | EXTRA_FLAGS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(ArenaError::ReservationFailed {
                capacity,
                reason: io::Error::last_os_error().to_string(),
            });
        }
        let ptr = NonNull::new(ptr.cast::<u8>()).ok_or_else(|| ArenaError::ReservationFailed {
            capacity,
            reason: "mmap returned a null mapping".to_string(),
        })?;
        Ok((ptr, capacity))
    }

    pub(super) fn commit(_ptr: NonNull<u8>, _from: usize, _to: usize, len: usize) -> Result<usize, ArenaError> {
        Ok(len)
    }

    /// # Safety
    ///
    /// `ptr` and `len` must describe a live mapping returned by `reserve`.
    pub(super) unsafe fn release(ptr: NonNull<u8>, len: usize) {
        // SAFETY: guaranteed by the caller.
        unsafe {
            libc::munmap(ptr.as_ptr().cast(), len);
        }
    }
}

#[cfg(windows)]
mod sys {
    use std::ffi::c_void;
    use std::io;
    use std::mem;
    use std::ptr::{self, NonNull};

    use windows_sys::Win32::System::Memory::{
        VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE,
    };
    use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

    use crate::align::checked_align;
    use crate::error::ArenaError;

    fn os_error(capacity: usize) -> ArenaError {
        ArenaError::ReservationFailed {
            capacity,
            reason: io::Error::last_os_error().to_string(),
        }
    }

    fn page_size() -> usize {
        // SAFETY: `SYSTEM_INFO` is plain data, and `GetSystemInfo` only
        // writes into the struct it is given.
        let info = unsafe {
            let mut info: SYSTEM_INFO = mem::zeroed();
            GetSystemInfo(&mut info);
            info
        };
        (info.dwPageSize as usize).max(1)
    }

    /// Reserve address space only. Nothing is committed yet.
    pub(super) fn reserve(capacity: usize) -> Result<(NonNull<u8>, usize), ArenaError> {
        // SAFETY: reserving with no requested address does not alias any
        // existing memory.
        let ptr = unsafe { VirtualAlloc(ptr::null(), capacity, MEM_RESERVE, PAGE_READWRITE) };
        let ptr = NonNull::new(ptr.cast::<u8>()).ok_or_else(|| os_error(capacity))?;
        Ok((ptr, 0))
    }

    /// Commit `[from, to)` rounded up to whole pages, capped at `len`.
    /// Returns the new committed length.
    pub(super) fn commit(ptr: NonNull<u8>, from: usize, to: usize, len: usize) -> Result<usize, ArenaError> {
        let end = checked_align(to, page_size()).map_or(len, |end| end.min(len));
        // SAFETY: `from < end <= len`, so the range lies inside the
        // reservation made by `reserve`.
        let committed = unsafe {
            let start = ptr.as_ptr().add(from).cast::<c_void>();
            VirtualAlloc(start.cast_const(), end - from, MEM_COMMIT, PAGE_READWRITE)
        };
        if committed.is_null() {
            return Err(os_error(len));
        }
        Ok(end)
    }

    /// # Safety
    ///
    /// `ptr` must be the base of a live reservation returned by `reserve`.
    pub(super) unsafe fn release(ptr: NonNull<u8>, _len: usize) {
        // SAFETY: guaranteed by the caller; `MEM_RELEASE` takes a zero size
        // and frees the whole reservation.
        unsafe {
            VirtualFree(ptr.as_ptr().cast::<c_void>(), 0, MEM_RELEASE);
        }
    }
}

#[cfg(not(any(unix, windows)))]
mod sys {
    use std::ptr::NonNull;

    use crate::error::ArenaError;

    const UNSUPPORTED: &str = "no virtual memory reservation on this target";

    pub(super) fn reserve(capacity: usize) -> Result<(NonNull<u8>, usize), ArenaError> {
        Err(ArenaError::ReservationFailed {
            capacity,
            reason: UNSUPPORTED.to_string(),
        })
    }

    pub(super) fn commit(_ptr: NonNull<u8>, _from: usize, _to: usize, len: usize) -> Result<usize, ArenaError> {
        Err(ArenaError::ReservationFailed {
            capacity: len,
            reason: UNSUPPORTED.to_string(),
        })
    }

    /// # Safety
    ///
    /// Never reached: `reserve` cannot succeed on this target.
    pub(super) unsafe fn release(_ptr: NonNull<u8>, _len: usize) {}
}

/// Plain-old-data types that can live in arena memory.
///
/// Arena bytes are reinterpreted in place, never dropped, and may be
/// relocated by a byte copy, so elements must be `Copy`, carry no drop glue,
/// have no padding and accept every bit pattern.
///
/// # Safety
///
/// Implementors guarantee that any initialised byte sequence of
/// `size_of::<Self>()` bytes is a valid value of `Self`.
pub unsafe trait Element: Copy + 'static {}

macro_rules! impl_element {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: primitive numeric types accept every bit pattern.
            unsafe impl Element for $ty {}
        )*
    };
}

impl_element!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64);

// SAFETY: an array of padding-free POD elements is itself padding-free POD.
unsafe impl<T: Element, const N: usize> Element for [T; N] {}

/// Reinterpret a byte slice as a slice of `T`.
///
/// # Panics
///
/// Panics if `T` is zero-sized, or if `bytes` is misaligned for `T` or not
/// a whole number of elements long.
pub(crate) fn cast<T: Element>(bytes: &[u8]) -> &[T] {
    let count = check_cast::<T>(bytes.as_ptr(), bytes.len());
    // SAFETY: alignment and length are checked above, and `Element`
    // guarantees every bit pattern is a valid `T`.
    unsafe { slice::from_raw_parts(bytes.as_ptr().cast::<T>(), count) }
}

/// Mutable counterpart of [`cast`].
pub(crate) fn cast_mut<T: Element>(bytes: &mut [u8]) -> &mut [T] {
    let count = check_cast::<T>(bytes.as_ptr(), bytes.len());
    // SAFETY: as in `cast`; the exclusive borrow is carried over.
    unsafe { slice::from_raw_parts_mut(bytes.as_mut_ptr().cast::<T>(), count) }
}

fn check_cast<T>(ptr: *const u8, len: usize) -> usize {
    let size = size_of::<T>();
    assert!(size != 0, "zero-sized elements cannot be stored in an arena");
    assert_eq!(len % size, 0, "byte length {len} is not a multiple of {size}");
    assert_eq!(
        ptr as usize % align_of::<T>(),
        0,
        "byte view is not aligned to {}",
        align_of::<T>()
    );
    len / size
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed(len: usize) -> Region {
        let mut region = Region::reserve(len).unwrap();
        region.commit(len).unwrap();
        region
    }

    #[test]
    fn reserved_region_is_zeroed_and_writable() {
        let mut region = committed(4096);
        assert_eq!(region.len(), 4096);
        assert!(region.bytes(0, 4096).iter().all(|&b| b == 0));
        region.bytes_mut(100, 4).copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(region.bytes(100, 4), &[1, 2, 3, 4]);
    }

    #[test]
    fn region_base_is_page_aligned() {
        let region = Region::reserve(8192).unwrap();
        assert_eq!(region.base_ptr() as usize % 4096, 0);
    }

    #[test]
    fn copy_within_moves_bytes() {
        let mut region = committed(4096);
        region.bytes_mut(0, 3).copy_from_slice(&[7, 8, 9]);
        region.copy_within(0, 64, 3);
        assert_eq!(region.bytes(64, 3), &[7, 8, 9]);
    }

    #[test]
    fn commit_within_committed_prefix_is_noop() {
        let mut region = committed(8192);
        region.commit(100).unwrap();
        region.commit(8192).unwrap();
        assert_eq!(region.bytes(8000, 192).len(), 192);
    }

    #[test]
    #[should_panic(expected = "exceeds reservation")]
    fn commit_past_reservation_panics() {
        let mut region = Region::reserve(4096).unwrap();
        let _ = region.commit(4097);
    }

    #[test]
    #[should_panic(expected = "exceeds committed")]
    fn out_of_range_access_panics() {
        let region = committed(4096);
        let _ = region.bytes(4000, 200);
    }

    #[test]
    fn cast_round_trips_through_bytes() {
        let mut region = committed(4096);
        cast_mut::<u32>(region.bytes_mut(8, 8)).copy_from_slice(&[0xdead_beef, 42]);
        assert_eq!(cast::<u32>(region.bytes(8, 8)), &[0xdead_beef, 42]);
    }

    #[test]
    #[should_panic(expected = "not aligned")]
    fn misaligned_cast_panics() {
        let region = committed(4096);
        let _ = cast::<u64>(region.bytes(4, 8));
    }

    #[test]
    #[should_panic(expected = "not a multiple")]
    fn ragged_cast_panics() {
        let region = committed(4096);
        let _ = cast::<u32>(region.bytes(0, 6));
    }
}
