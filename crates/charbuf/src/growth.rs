//! Storage-sizing policies.
//!
//! A [`GrowthPolicy`] decides how much storage a reallocation obtains. The
//! policy works in *storage* sizes (usable capacity plus the terminator
//! slot), so the arithmetic here never has to care about the slot
//! separately.

/// Computes the storage size a growing buffer reallocates to.
///
/// Selected at the type level and fixed for the buffer's lifetime.
pub trait GrowthPolicy {
    /// Returns the new storage size, in elements.
    ///
    /// `current` is the present storage size (`0` when nothing is
    /// allocated), `required` is the minimum storage that must be obtained,
    /// and `max` is the largest storage size the buffer may ever hold.
    /// Callers guarantee `current < required <= max`; the returned size is
    /// always within `required..=max`.
    fn next_storage_size(current: usize, required: usize, max: usize) -> usize;
}

/// Allocates precisely the storage requested.
///
/// Minimal memory, at the cost of reallocating on every growing `reserve`.
/// Suited to build-once buffers whose final size is known up front.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exact;

impl GrowthPolicy for Exact {
    #[inline]
    fn next_storage_size(current: usize, required: usize, max: usize) -> usize {
        debug_assert!(current < required && required <= max);
        required
    }
}

/// Rounds the storage size up to the next power of two.
///
/// Amortizes reallocation cost across repeated small reservations at the
/// expense of transient over-allocation. The doubling search starts from
/// the current storage size, so an already-large buffer never shrinks its
/// target, and saturates at `max` instead of wrapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct Doubling;

impl GrowthPolicy for Doubling {
    #[inline]
    fn next_storage_size(current: usize, required: usize, max: usize) -> usize {
        debug_assert!(current < required && required <= max);

        let mut next = current.max(1);
        while next < required {
            match next.checked_mul(2) {
                Some(doubled) => next = doubled,
                // Doubling overflowed before reaching `required`; `required`
                // itself fits, so saturate.
                None => return max,
            }
        }
        next.min(max)
    }
}
