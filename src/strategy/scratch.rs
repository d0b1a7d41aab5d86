//! Scratch strategy: a fixed, non-growing bump allocator.
//!
//! Grounded on `anvil-memory/src/core/internal/allocators/
//! scratch_allocator_internal.c`. Scratch is the only strategy that reports
//! out-of-space to the caller instead of treating it as fatal.

use std::ptr::NonNull;

use crate::block::{self, Block};
use crate::diagnostics::invariant;

/// Attempts to bump-allocate `size` bytes aligned to `alignment` from the
/// head block. Returns `None` on overflow — this is not fatal.
pub fn alloc(head: NonNull<Block>, size: usize, alignment: usize) -> Option<NonNull<u8>> {
    invariant!(size != 0, "cannot allocate memory of size zero");
    invariant!(
        alignment.is_power_of_two(),
        "memory alignment on allocation must be a power of two"
    );

    let block = unsafe { &mut *head.as_ptr() };
    block.bump(size, alignment)
}

/// Returns true if the head block could currently accept a bump of `size`
/// bytes at `alignment` without actually performing the allocation.
pub fn verify(head: NonNull<Block>, size: usize, alignment: usize) -> bool {
    invariant!(size != 0, "cannot verify allocation of size zero");
    invariant!(
        alignment.is_power_of_two(),
        "memory blocks must have a power of two alignment"
    );

    let block = unsafe { head.as_ref() };
    let current = block.base.as_ptr() as usize + block.used;
    let aligned = block::align_up(current, alignment);
    let pad = aligned - current;
    size + pad <= block.capacity - block.used
}

/// Zeroes the head block's `used` counter and releases any successors
/// (there should never be any, since scratch never grows).
///
/// # Safety
/// Every block reachable from `head.next` must be uniquely owned.
pub unsafe fn reset(head: NonNull<Block>) {
    block::reset_chain(head);
}

/// Releases the entire chain, including `head`.
///
/// # Safety
/// Every block reachable from `head` must be uniquely owned.
pub unsafe fn free(head: NonNull<Block>) {
    block::free_chain(head);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_exhaustion_returns_none() {
        // S2: alignment 8, capacity 32. alloc(20) succeeds; alloc(16) fails.
        let head = Block::allocate(32, 8);
        assert!(alloc(head, 20, 8).is_some());
        assert!(alloc(head, 16, 8).is_none());
        assert!(!verify(head, 16, 8));
        unsafe { free(head) };
    }

    #[test]
    fn test_scratch_never_grows() {
        let head = Block::allocate(16, 8);
        let _ = alloc(head, 8, 8);
        let _ = alloc(head, 8, 8);
        assert!(alloc(head, 8, 8).is_none());
        assert!(unsafe { head.as_ref() }.next.is_none());
        unsafe { free(head) };
    }
}
