//! Arena configuration parameters.

use crate::error::ArenaError;

/// Configuration for an [`Arena`](crate::Arena).
///
/// Capacity is fixed for the lifetime of the arena. Alignment is only the
/// starting value; the owner may change it between allocations with
/// [`Arena::set_alignment`](crate::Arena::set_alignment).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Size of the reserved address range in bytes.
    ///
    /// Default: 2 GiB. The reservation is lazily committed, so a large
    /// value only costs address space until pages are touched.
    pub capacity: usize,

    /// Alignment applied to the start of every allocation, in bytes.
    ///
    /// Default: 8. Any positive value is accepted.
    pub alignment: usize,
}

impl ArenaConfig {
    /// Default reservation size: 2 GiB.
    pub const DEFAULT_CAPACITY: usize = 2 * 1024 * 1024 * 1024;

    /// Default allocation alignment.
    pub const DEFAULT_ALIGNMENT: usize = 8;

    /// Create a config with the given capacity and the default alignment.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            alignment: Self::DEFAULT_ALIGNMENT,
        }
    }

    /// Replace the starting alignment.
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Check that the values can back an arena.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.capacity == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "capacity must be non-zero",
            });
        }
        if self.alignment == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "alignment must be non-zero",
            });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_is_2gib() {
        let config = ArenaConfig::default();
        assert_eq!(config.capacity, 1 << 31);
        assert_eq!(config.alignment, 8);
    }

    #[test]
    fn with_alignment_preserves_capacity() {
        let config = ArenaConfig::new(64).with_alignment(3);
        assert_eq!(config.capacity, 64);
        assert_eq!(config.alignment, 3);
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(matches!(
            ArenaConfig::new(0).validate(),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn zero_alignment_rejected() {
        assert!(matches!(
            ArenaConfig::new(64).with_alignment(0).validate(),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }
}
