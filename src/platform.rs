//! Platform-specific virtual memory interface.
//!
//! This module provides an abstraction over the operating system's
//! anonymous-mapping APIs:
//! - **Linux**: `mmap`/`munmap` via `rustix`
//! - **macOS**: `mach_vm_allocate`/`mach_vm_deallocate` via `mach2`
//! - **Other Unix**: `mmap`/`munmap` via `libc`

use std::fmt;

/// Error type for system memory mapping failures.
#[derive(Debug, Clone, Copy)]
pub struct MapError;

impl std::error::Error for MapError {}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system memory mapping failed")
    }
}

/// Returns the system page size in bytes.
#[inline]
pub fn page_size() -> usize {
    #[cfg(unix)]
    {
        rustix::param::page_size()
    }
    #[cfg(not(unix))]
    {
        4096
    }
}

/// Platform-specific memory mapping functions.
pub mod sys {
    use super::MapError;

    /// Map `size` bytes of fresh, zeroed, read/write virtual memory from the
    /// OS, aligned to at least the system page size.
    #[cfg(target_os = "linux")]
    #[inline]
    pub fn map(size: usize) -> Result<*mut u8, MapError> {
        use rustix::mm::{mmap_anonymous, MapFlags, ProtFlags};
        use std::ptr;

        debug_assert!(size > 0);

        unsafe {
            match mmap_anonymous(
                ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::PRIVATE,
            ) {
                Ok(ptr) => Ok(ptr as *mut u8),
                Err(_) => Err(MapError),
            }
        }
    }

    /// Unmap a region previously returned by [`map`].
    ///
    /// # Safety
    /// `base` must be the exact pointer returned by `map`, and `size` must be
    /// the exact size passed to that call.
    #[cfg(target_os = "linux")]
    #[inline]
    pub unsafe fn unmap(base: *mut u8, size: usize) -> Result<(), MapError> {
        use rustix::mm::munmap;

        munmap(base as *mut std::ffi::c_void, size).map_err(|_| MapError)
    }

    #[cfg(target_vendor = "apple")]
    #[inline]
    pub fn map(size: usize) -> Result<*mut u8, MapError> {
        use mach2::kern_return::KERN_SUCCESS;
        use mach2::traps::mach_task_self;
        use mach2::vm::mach_vm_allocate;
        use mach2::vm_statistics::VM_FLAGS_ANYWHERE;
        use mach2::vm_types::{mach_vm_address_t, mach_vm_size_t};

        debug_assert!(size > 0);

        let task = unsafe { mach_task_self() };
        let mut address: mach_vm_address_t = 0;
        let vm_size: mach_vm_size_t = size as mach_vm_size_t;

        let retval = unsafe { mach_vm_allocate(task, &mut address, vm_size, VM_FLAGS_ANYWHERE) };

        if retval == KERN_SUCCESS {
            Ok(address as *mut u8)
        } else {
            Err(MapError)
        }
    }

    /// # Safety
    /// `base` must be the exact pointer returned by `map`, and `size` must be
    /// the exact size passed to that call.
    #[cfg(target_vendor = "apple")]
    #[inline]
    pub unsafe fn unmap(base: *mut u8, size: usize) -> Result<(), MapError> {
        use mach2::kern_return::KERN_SUCCESS;
        use mach2::traps::mach_task_self;
        use mach2::vm::mach_vm_deallocate;
        use mach2::vm_types::{mach_vm_address_t, mach_vm_size_t};

        let task = mach_task_self();
        let retval = mach_vm_deallocate(task, base as mach_vm_address_t, size as mach_vm_size_t);

        if retval == KERN_SUCCESS {
            Ok(())
        } else {
            Err(MapError)
        }
    }

    /// Fallback for other Unix-like systems.
    #[cfg(all(not(target_os = "linux"), not(target_vendor = "apple"), unix))]
    #[inline]
    pub fn map(size: usize) -> Result<*mut u8, MapError> {
        use libc::{mmap, MAP_ANON, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE};
        use std::ptr;

        debug_assert!(size > 0);

        let ptr = unsafe {
            mmap(
                ptr::null_mut(),
                size,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANON,
                -1,
                0,
            )
        };

        if ptr == MAP_FAILED {
            Err(MapError)
        } else {
            Ok(ptr as *mut u8)
        }
    }

    /// # Safety
    /// `base` must be the exact pointer returned by `map`, and `size` must be
    /// the exact size passed to that call.
    #[cfg(all(not(target_os = "linux"), not(target_vendor = "apple"), unix))]
    #[inline]
    pub unsafe fn unmap(base: *mut u8, size: usize) -> Result<(), MapError> {
        if libc::munmap(base as *mut libc::c_void, size) == 0 {
            Ok(())
        } else {
            Err(MapError)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_unmap_round_trip() {
        let size = page_size();
        let ptr = sys::map(size).expect("map should succeed");
        assert!(!ptr.is_null());
        unsafe {
            ptr.write(0xAB);
            assert_eq!(ptr.read(), 0xAB);
            sys::unmap(ptr, size).expect("unmap should succeed");
        }
    }

    #[test]
    fn test_page_size_is_power_of_two() {
        let p = page_size();
        assert!(p > 0);
        assert_eq!(p & (p - 1), 0);
    }
}
