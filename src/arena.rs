//! The arena façade.
//!
//! `Arena` owns a block chain and strategy-specific state, and dispatches
//! its public operations to the matching `strategy::*` module by matching
//! on a `Strategy` tag rather than through a function-pointer vtable (see
//! DESIGN.md for why this departs from the vtable-based dispatch in
//! `anvil-memory/src/core/arena.c`).

use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use crate::block::Block;
use crate::diagnostics::invariant;
use crate::strategy::stack::SnapshotStack;
use crate::strategy::{linear, pool, scratch, stack, Strategy};

/// Strategy-specific state. The active variant always matches the owning
/// `Arena`'s `strategy` field; `Arena`'s public methods dispatch on
/// `strategy` first, so a mismatched variant is never observed and is
/// treated as an internal logic error rather than a caller-facing one.
enum ArenaState {
    Scratch,
    Linear,
    Stack {
        top: NonNull<Block>,
        snapshots: SnapshotStack,
    },
    Pool {
        pool_unit: usize,
    },
}

/// A region of memory managed under one of four allocation strategies.
///
/// `Arena` is deliberately `!Send` and `!Sync`: callers needing to share an
/// arena across threads must provide their own synchronization.
pub struct Arena {
    strategy: Strategy,
    alignment: usize,
    head: NonNull<Block>,
    state: ArenaState,
    _not_send_sync: PhantomData<*const ()>,
}

impl Arena {
    /// Creates a new arena of the given `strategy`, with blocks aligned to
    /// `alignment` and an initial block of `capacity` bytes.
    ///
    /// Fatal if `alignment` is not a power of two, is smaller than
    /// `mem::align_of::<usize>()`, or if `capacity` is zero.
    pub fn create(strategy: Strategy, alignment: usize, capacity: usize) -> Arena {
        invariant!(
            alignment.is_power_of_two(),
            "arena alignment must be a power of two but was {alignment}"
        );
        invariant!(
            alignment >= mem::align_of::<usize>(),
            "arena alignment must be >= {} but was {alignment}",
            mem::align_of::<usize>()
        );
        invariant!(capacity != 0, "arena capacity must be nonzero");

        let rounded = crate::block::align_up(capacity, alignment);
        let head = Block::allocate(rounded, alignment);

        let state = match strategy {
            Strategy::Scratch => ArenaState::Scratch,
            Strategy::Linear => ArenaState::Linear,
            Strategy::Stack => ArenaState::Stack {
                top: head,
                snapshots: SnapshotStack::new(),
            },
            Strategy::Pool => ArenaState::Pool { pool_unit: rounded },
        };

        Arena {
            strategy,
            alignment,
            head,
            state,
            _not_send_sync: PhantomData,
        }
    }

    /// Which strategy this arena was created with.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Consumes the arena, releasing every block and all strategy state.
    ///
    /// The Rust-idiomatic equivalent of the source API's double-pointer
    /// clear: the caller's binding is moved out here and can no longer be
    /// used, enforced at compile time rather than by nulling a handle.
    pub fn destroy(self) {
        drop(self)
    }

    /// Invalidates (but for non-scratch strategies, does not necessarily
    /// unmap) memory issued by this arena so far. Pointers returned before
    /// a reset must not be read afterward.
    pub fn reset(&mut self) {
        unsafe {
            match &mut self.state {
                ArenaState::Scratch => scratch::reset(self.head),
                ArenaState::Linear => linear::reset(self.head),
                ArenaState::Pool { .. } => pool::reset(self.head),
                ArenaState::Stack { top, snapshots } => {
                    *top = stack::reset(self.head, snapshots);
                }
            }
        }
    }

    /// Allocates `size` bytes from this arena. Every strategy but scratch
    /// always succeeds (growing the chain as needed); scratch returns a
    /// null pointer on overflow instead of growing.
    pub fn alloc(&mut self, size: usize) -> *mut u8 {
        match &mut self.state {
            ArenaState::Scratch => scratch::alloc(self.head, size, self.alignment)
                .map(|p| p.as_ptr())
                .unwrap_or(std::ptr::null_mut()),
            ArenaState::Linear => linear::alloc(self.head, size, self.alignment).as_ptr(),
            ArenaState::Pool { pool_unit } => {
                pool::alloc(self.head, size, self.alignment, *pool_unit).as_ptr()
            }
            ArenaState::Stack { top, .. } => stack::alloc(top, size, self.alignment).as_ptr(),
        }
    }

    /// Reports whether an allocation of `size` bytes would currently
    /// succeed without actually performing it. Every strategy but scratch
    /// always reports true (a real shortage there is a fatal OOM, not a
    /// `false` result).
    pub fn verify(&self, size: usize) -> bool {
        match &self.state {
            ArenaState::Scratch => scratch::verify(self.head, size, self.alignment),
            ArenaState::Linear => linear::verify(self.head, size, self.alignment),
            ArenaState::Pool { .. } => pool::verify(self.head, size, self.alignment),
            ArenaState::Stack { top, .. } => stack::verify(*top, size, self.alignment),
        }
    }

    /// Captures a rollback point. Fatal if this arena's strategy is not
    /// `Strategy::Stack`.
    pub fn record(&mut self) {
        match &mut self.state {
            ArenaState::Stack { top, snapshots } => stack::record(snapshots, *top),
            _ => invariant!(false, "record is only valid on a stack-strategy arena"),
        }
    }

    /// Rolls back to the most recent recorded snapshot, releasing every
    /// block allocated since. Fatal if this arena's strategy is not
    /// `Strategy::Stack`, or if no snapshot was recorded.
    pub fn unwind(&mut self) {
        match &mut self.state {
            ArenaState::Stack { top, snapshots } => unsafe { stack::unwind(snapshots, top) },
            _ => invariant!(false, "unwind is only valid on a stack-strategy arena"),
        }
    }

    /// Allocates `src.len()` bytes and copies `src` into them, returning the
    /// new pointer. `src` is left unmodified.
    pub fn copy(&mut self, src: &[u8]) -> *mut u8 {
        let dest = self.alloc(src.len());
        if !dest.is_null() {
            unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), dest, src.len()) };
        }
        dest
    }

    /// Allocates `size` bytes, copies `size` bytes from `*src` into them,
    /// invokes `releaser` on the original pointer, and clears `*src` to
    /// null. Returns the new pointer.
    ///
    /// # Safety
    /// `*src` must point to at least `size` readable bytes, and must be
    /// safe to pass to `releaser` exactly once.
    pub unsafe fn move_value(
        &mut self,
        src: &mut *mut u8,
        size: usize,
        releaser: impl FnOnce(*mut u8),
    ) -> *mut u8 {
        invariant!(!src.is_null(), "cannot move from a null source pointer");

        let dest = self.alloc(size);
        if !dest.is_null() {
            std::ptr::copy_nonoverlapping(*src, dest, size);
        }
        releaser(*src);
        *src = std::ptr::null_mut();
        dest
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe {
            match &mut self.state {
                ArenaState::Scratch => scratch::free(self.head),
                ArenaState::Linear => linear::free(self.head),
                ArenaState::Pool { .. } => pool::free(self.head),
                ArenaState::Stack { snapshots, .. } => {
                    let snapshots = std::mem::replace(snapshots, SnapshotStack::new());
                    stack::free(self.head, snapshots);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_alloc_and_exhaustion() {
        let mut arena = Arena::create(Strategy::Scratch, 8, 32);
        let p1 = arena.alloc(20);
        assert!(!p1.is_null());
        let p2 = arena.alloc(16);
        assert!(p2.is_null());
        assert!(!arena.verify(16));
        arena.destroy();
    }

    #[test]
    fn test_linear_grows_across_boundary() {
        // S1
        let mut arena = Arena::create(Strategy::Linear, 16, 64);
        let p1 = arena.alloc(48);
        let p2 = arena.alloc(48);
        assert!(!p1.is_null() && !p2.is_null());
        assert_ne!(p1, p2);
        arena.destroy();
    }

    #[test]
    fn test_pool_rounds_requests() {
        // S3
        let mut arena = Arena::create(Strategy::Pool, 16, 64);
        let p1 = arena.alloc(10);
        let p2 = arena.alloc(65);
        assert!(p2 as usize >= p1 as usize + 64);
        arena.destroy();
    }

    #[test]
    fn test_stack_record_unwind_round_trip() {
        // S4
        let mut arena = Arena::create(Strategy::Stack, 16, 128);
        arena.record();
        let p1 = arena.alloc(32);
        let _ = arena.alloc(32);
        arena.unwind();
        let p2 = arena.alloc(32);
        assert_eq!(p1, p2);
        arena.destroy();
    }

    #[test]
    fn test_reset_invalidates_allocations() {
        let mut arena = Arena::create(Strategy::Linear, 16, 64);
        let _ = arena.alloc(32);
        let _ = arena.alloc(48); // grows a successor
        arena.reset();
        assert!(arena.verify(64));
        arena.destroy();
    }

    #[test]
    fn test_copy_duplicates_bytes() {
        let mut arena = Arena::create(Strategy::Linear, 16, 64);
        let src = [1u8, 2, 3, 4];
        let dest = arena.copy(&src);
        assert!(!dest.is_null());
        unsafe {
            for i in 0..4 {
                assert_eq!(*dest.add(i), src[i]);
            }
        }
        arena.destroy();
    }

    #[test]
    fn test_move_value_clears_source_and_releases() {
        let mut arena = Arena::create(Strategy::Linear, 16, 64);
        let layout = std::alloc::Layout::from_size_align(4, 1).unwrap();
        let mut src = unsafe { std::alloc::alloc(layout) };
        unsafe {
            src.write_bytes(7, 4);
        }

        let mut released = false;
        let dest = unsafe {
            arena.move_value(&mut src, 4, |ptr| {
                std::alloc::dealloc(ptr, layout);
                released = true;
            })
        };

        assert!(released);
        assert!(src.is_null());
        assert!(!dest.is_null());
        unsafe {
            for i in 0..4 {
                assert_eq!(*dest.add(i), 7);
            }
        }
        arena.destroy();
    }

    #[test]
    fn test_arena_is_not_send_or_sync() {
        fn assert_not_send<T>() {}
        let _ = assert_not_send::<Arena>;
    }
}
