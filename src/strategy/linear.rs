//! Linear strategy: a growing bump allocator.
//!
//! Grounded on `anvil-memory/src/core/internal/allocators/
//! linear_dynamic_allocator.c`. On exhaustion of the current block, a new
//! block with double the capacity is appended and the allocation retried
//! from there; linear therefore never reports out-of-space to the caller
//! (failure to grow is fatal, via `crate::backing::acquire`).

use std::ptr::NonNull;

use crate::block::{self, Block};
use crate::diagnostics::invariant;

/// Bump-allocates `size` bytes aligned to `alignment`, walking the chain
/// from `head` and appending a doubled-capacity block if none fits.
/// `head` is only ever read; successors are appended via their `next`
/// pointers, so the caller's `head` binding stays valid.
pub fn alloc(head: NonNull<Block>, size: usize, alignment: usize) -> NonNull<u8> {
    invariant!(size != 0, "cannot allocate memory of size zero");
    invariant!(
        alignment.is_power_of_two(),
        "memory alignment on allocation must be a power of two"
    );

    let mut current = head;
    loop {
        let block = unsafe { &mut *current.as_ptr() };
        if let Some(ptr) = block.bump(size, alignment) {
            return ptr;
        }

        if block.next.is_none() {
            let new_capacity = block.capacity.checked_mul(2).unwrap_or_else(|| {
                invariant!(false, "block capacity overflowed on growth");
                unreachable!()
            });
            block.next = Some(Block::allocate(new_capacity, alignment));
        }
        current = block.next.expect("just linked a successor");
    }
}

/// Always true: linear can always grow by appending a block; a real
/// shortage surfaces as a fatal allocation failure in [`alloc`], not as a
/// `false` here.
pub fn verify(_head: NonNull<Block>, size: usize, alignment: usize) -> bool {
    invariant!(size != 0, "cannot verify allocation of size zero");
    invariant!(
        alignment.is_power_of_two(),
        "memory blocks must have a power of two alignment"
    );
    true
}

/// Zeroes the head block's `used` counter and releases every successor.
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
