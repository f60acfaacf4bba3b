//! Workloads and utilities for benchmarking `burrow`.
//!
//! - [`request_sizes`]: deterministic allocation sizes from a seed
//! - [`run_wave`]: one wave of allocations inside a rolled-back scope
//! - [`fill_array`]: push `n` values into a fresh [`DynArray`]

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use burrow::{Arena, ArenaError, DynArray};

/// Arena size used by the benchmarks: 64 MiB.
pub const BENCH_CAPACITY: usize = 64 * 1024 * 1024;

/// Generate `count` allocation sizes in `1..=max_size`.
///
/// Uses a 64-bit LCG seeded by `seed`, so the same arguments always give
/// the same sizes.
pub fn request_sizes(seed: u64, count: usize, max_size: usize) -> Vec<usize> {
    let max_size = max_size.max(1) as u64;
    let mut state = seed;
    (0..count)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) % max_size + 1) as usize
        })
        .collect()
}

/// Allocate every size in `sizes` inside a scope, touching the first byte of
/// each, and return the bytes the wave used. The arena is back where it
/// started when this returns.
pub fn run_wave(arena: &mut Arena, sizes: &[usize]) -> Result<usize, ArenaError> {
    let mut scope = arena.scope();
    let start = scope.used();
    for &size in sizes {
        let allocation = scope.alloc(size)?;
        if let Some(first) = scope.bytes_mut(&allocation)?.first_mut() {
            *first = 1;
        }
    }
    Ok(scope.used() - start)
}

/// Push `0..n` into a new array.
pub fn fill_array(arena: &mut Arena, n: u64) -> Result<DynArray<u64>, ArenaError> {
    let mut array = DynArray::new(arena)?;
    for v in 0..n {
        array.push(arena, v)?;
    }
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_sizes_deterministic() {
        assert_eq!(request_sizes(42, 100, 512), request_sizes(42, 100, 512));
        assert_ne!(request_sizes(42, 100, 512), request_sizes(43, 100, 512));
    }

    #[test]
    fn request_sizes_in_range() {
        for size in request_sizes(7, 1000, 64) {
            assert!((1..=64).contains(&size), "size {size} out of range");
        }
    }

    #[test]
    fn run_wave_leaves_arena_unchanged() {
        let mut arena = Arena::with_capacity(1 << 20).unwrap();
        arena.alloc(10).unwrap();
        let used = run_wave(&mut arena, &request_sizes(1, 50, 256)).unwrap();
        assert!(used > 0);
        assert_eq!(arena.used(), 10);
    }

    #[test]
    fn fill_array_has_all_values() {
        let mut arena = Arena::with_capacity(1 << 20).unwrap();
        let array = fill_array(&mut arena, 1000).unwrap();
        assert_eq!(array.len(), 1000);
        assert_eq!(array.capacity(), 1024);
        assert_eq!(array.get(&arena, 999).unwrap(), 999);
    }
}
