//! Pool strategy: a linear strategy rounding every request up to a fixed
//! unit.
//!
//! Grounded on `anvil-memory/src/core/internal/allocators/
//! pool_allocator_internal.c`. The pool unit is fixed at arena-creation
//! time to the initial block capacity; this module only rounds the
//! requested size before delegating to the same growth and first-fit
//! traversal as `strategy::linear`.

use std::ptr::NonNull;

use crate::block::Block;
use crate::diagnostics::invariant;

/// Rounds `size` up to the nearest multiple of `pool_unit`.
#[inline]
fn round_to_pool_unit(size: usize, pool_unit: usize) -> usize {
    let units = size.div_ceil(pool_unit);
    units * pool_unit
}

/// Bump-allocates `ceil(size / pool_unit) * pool_unit` bytes, growing the
/// chain exactly as `strategy::linear::alloc` does.
pub fn alloc(head: NonNull<Block>, size: usize, alignment: usize, pool_unit: usize) -> NonNull<u8> {
    invariant!(size != 0, "cannot allocate memory of size zero");
    invariant!(pool_unit != 0, "pool unit must be nonzero");

    let effective_size = round_to_pool_unit(size, pool_unit);
    super::linear::alloc(head, effective_size, alignment)
}

/// Always true, for the same reason as `strategy::linear::verify`.
pub fn verify(head: NonNull<Block>, size: usize, alignment: usize) -> bool {
    super::linear::verify(head, size, alignment)
}

/// Identical to `strategy::linear::reset`.
///
/// # Safety
/// Every block reachable from `head.next` must be uniquely owned.
pub unsafe fn reset(head: NonNull<Block>) {
    super::linear::reset(head);
}

/// Identical to `strategy::linear::free`.
///
/// # Safety
/// Every block reachable from `head` must be uniquely owned.
pub unsafe fn free(head: NonNull<Block>) {
    super::linear::free(head);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_rounding() {
        // S3: alignment 16, capacity 64, pool_unit 64.
        let head = Block::allocate(64, 16);
        let pool_unit = 64;

        let p1 = alloc(head, 10, 16, pool_unit);
        let p2 = alloc(head, 65, 16, pool_unit);

        assert!(p2.as_ptr() as usize >= p1.as_ptr() as usize + 64);

        unsafe { free(head) };
    }

    #[test]
    fn test_round_to_pool_unit_exact_multiple() {
        assert_eq!(round_to_pool_unit(64, 64), 64);
        assert_eq!(round_to_pool_unit(65, 64), 128);
        assert_eq!(round_to_pool_unit(1, 64), 64);
    }
}
