//! arenalloc: region-based memory arenas with pluggable allocation
//! strategies.
//!
//! Four strategies share one façade:
//!
//! - **Scratch**: fixed capacity, never grows, reports exhaustion to the
//!   caller instead of treating it as fatal.
//! - **Linear**: grows by linking doubled-capacity blocks on exhaustion;
//!   never reports exhaustion.
//! - **Pool**: linear, but every request is rounded up to a fixed unit.
//! - **Stack**: LIFO bump allocation with `record`/`unwind` snapshots.
//!
//! # Usage
//!
//! ```rust
//! use arenalloc::{Arena, Strategy};
//!
//! let mut arena = Arena::create(Strategy::Linear, 16, 4096);
//! let ptr = arena.alloc(256);
//! assert!(!ptr.is_null());
//! arena.reset();
//! arena.destroy();
//! ```
//!
//! Stack arenas additionally support rollback:
//!
//! ```rust
//! use arenalloc::{Arena, Strategy};
//!
//! let mut arena = Arena::create(Strategy::Stack, 16, 4096);
//! arena.record();
//! let _ = arena.alloc(128);
//! arena.unwind(); // reclaims the allocation above
//! arena.destroy();
//! ```

pub mod arena;
pub mod backing;
pub mod block;
pub mod diagnostics;
pub mod platform;
pub mod strategy;

pub use arena::Arena;
pub use strategy::Strategy;
