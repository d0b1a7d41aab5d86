//! Stack strategy: a LIFO bump allocator with record/unwind snapshots.
//!
//! The allocation half (bump at the top block, grow by linking a new top on
//! overflow) is grounded on `anvil-memory/src/core/internal/allocators/
//! stack_allocator_internal.c`. The snapshot array has no literal
//! counterpart there; it's implemented here as a hand-rolled growable raw
//! buffer with dynamic growth/shrink and an explicit floor, in the same
//! manual-allocation idiom `crate::backing` uses, since this is plain heap
//! bookkeeping rather than arena-owned user memory.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::block::{self, Block};
use crate::diagnostics::invariant;

/// A captured rollback point for a stack arena.
#[derive(Clone, Copy)]
pub struct Snapshot {
    pub top: NonNull<Block>,
    pub used_at_capture: usize,
    /// Restored onto `top` on unwind for fidelity with the source
    /// behavior; a no-op under this crate's semantics since block capacity
    /// never otherwise changes after creation.
    pub capacity_at_capture: usize,
}

/// A dynamically-sized LIFO array of [`Snapshot`]s.
///
/// Starts at capacity [`SnapshotStack::FLOOR`]; doubles on push when full;
/// halves after pop when `len < cap/4`, never below `FLOOR`.
pub struct SnapshotStack {
    buf: NonNull<Snapshot>,
    len: usize,
    cap: usize,
}

impl SnapshotStack {
    /// The starting capacity and the floor capacity never shrunk below.
    pub const FLOOR: usize = 5;

    /// Allocates a fresh snapshot array at the floor capacity.
    pub fn new() -> Self {
        Self {
            buf: Self::alloc_buf(Self::FLOOR),
            len: 0,
            cap: Self::FLOOR,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Pushes a snapshot, growing the backing buffer to `2 * cap` first if
    /// it is already full.
    pub fn push(&mut self, snapshot: Snapshot) {
        if self.len == self.cap {
            self.resize(self.cap * 2);
        }
        unsafe {
            self.buf.as_ptr().add(self.len).write(snapshot);
        }
        self.len += 1;
    }

    /// Pops the most recent snapshot. Fatal if the stack is empty.
    ///
    /// After popping, if `len < cap/4` and `cap > FLOOR`, halves the
    /// backing buffer's capacity (never below `FLOOR`).
    pub fn pop(&mut self) -> Snapshot {
        invariant!(self.len > 0, "cannot unwind with no recorded snapshots");

        self.len -= 1;
        let snapshot = unsafe { self.buf.as_ptr().add(self.len).read() };

        if self.cap > Self::FLOOR && self.len < self.cap / 4 {
            self.resize((self.cap / 2).max(Self::FLOOR));
        }

        snapshot
    }

    fn resize(&mut self, new_cap: usize) {
        let new_buf = Self::alloc_buf(new_cap);
        unsafe {
            std::ptr::copy_nonoverlapping(self.buf.as_ptr(), new_buf.as_ptr(), self.len);
            Self::dealloc_buf(self.buf, self.cap);
        }
        self.buf = new_buf;
        self.cap = new_cap;
    }

    fn layout_for(cap: usize) -> Layout {
        Layout::array::<Snapshot>(cap).expect("snapshot array layout must not overflow")
    }

    fn alloc_buf(cap: usize) -> NonNull<Snapshot> {
        let layout = Self::layout_for(cap);
        let ptr = unsafe { alloc::alloc(layout) } as *mut Snapshot;
        match NonNull::new(ptr) {
            Some(p) => p,
            None => {
                invariant!(false, "system out of memory growing snapshot array");
                unreachable!()
            }
        }
    }

    unsafe fn dealloc_buf(buf: NonNull<Snapshot>, cap: usize) {
        alloc::dealloc(buf.as_ptr() as *mut u8, Self::layout_for(cap));
    }
}

impl Default for SnapshotStack {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SnapshotStack {
    fn drop(&mut self) {
        unsafe { Self::dealloc_buf(self.buf, self.cap) };
    }
}

/// Bump-allocates from `*top`, linking a new doubled-capacity block and
/// advancing `*top` to it on overflow.
///
/// Invariant: `top`'s `next` must be absent at entry — allocation only
/// ever happens at the top of the stack.
pub fn alloc(top: &mut NonNull<Block>, size: usize, alignment: usize) -> NonNull<u8> {
    invariant!(size != 0, "cannot allocate memory of size zero");
    invariant!(
        alignment.is_power_of_two(),
        "memory alignment on allocation must be a power of two"
    );
    invariant!(
        unsafe { top.as_ref() }.next.is_none(),
        "stack allocation must happen at the top of the stack"
    );

    let block = unsafe { &mut *top.as_ptr() };
    if let Some(ptr) = block.bump(size, alignment) {
        return ptr;
    }

    let new_capacity = block.capacity.checked_mul(2).unwrap_or_else(|| {
        invariant!(false, "block capacity overflowed on growth");
        unreachable!()
    });
    let new_top = Block::allocate(new_capacity, alignment);
    block.next = Some(new_top);
    *top = new_top;

    unsafe { &mut *top.as_ptr() }
        .bump(size, alignment)
        .expect("freshly allocated block must fit the request")
}

/// Always true: stack can always grow by linking a new top block.
pub fn verify(_top: NonNull<Block>, size: usize, alignment: usize) -> bool {
    invariant!(size != 0, "cannot verify allocation of size zero");
    invariant!(
        alignment.is_power_of_two(),
        "memory blocks must have a power of two alignment"
    );
    true
}

/// Pushes a snapshot of `top`'s current state. Grows the snapshot array
/// first if it's full.
pub fn record(snapshots: &mut SnapshotStack, top: NonNull<Block>) {
    let block = unsafe { top.as_ref() };
    snapshots.push(Snapshot {
        top,
        used_at_capture: block.used,
        capacity_at_capture: block.capacity,
    });
}

/// Pops the most recent snapshot, releases every block beyond its `top`,
/// and restores `*top`'s `used`/`capacity` counters. Fatal if no snapshot
/// was recorded.
///
/// # Safety
/// Every block beyond the snapshot's `top` must be uniquely owned by this
/// chain.
pub unsafe fn unwind(snapshots: &mut SnapshotStack, top: &mut NonNull<Block>) {
    let snapshot = snapshots.pop();

    let mut restored = snapshot.top;
    let successor = restored.as_mut().next.take();
    if let Some(successor) = successor {
        block::free_chain(successor);
    }
    restored.as_mut().used = snapshot.used_at_capture;
    restored.as_mut().capacity = snapshot.capacity_at_capture;

    *top = restored;
}

/// Releases every successor of `head`, zeroes its `used` counter, and
/// clears `snapshots` back to empty (capacity is preserved, matching the
/// distilled spec's reset semantics). Returns the new `top`, which is
/// always `head`.
///
/// # Safety
/// Every block reachable from `head.next` must be uniquely owned.
pub unsafe fn reset(head: NonNull<Block>, snapshots: &mut SnapshotStack) -> NonNull<Block> {
    block::reset_chain(head);
    snapshots.len = 0;
    head
}

/// Releases the snapshot array, then the entire chain including `head`.
///
/// # Safety
/// Every block reachable from `head` must be uniquely owned; `snapshots`
/// must not be used afterward.
pub unsafe fn free(head: NonNull<Block>, snapshots: SnapshotStack) {
    drop(snapshots);
    block::free_chain(head);
}
