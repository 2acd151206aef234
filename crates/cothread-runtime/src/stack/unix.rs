//! Unix stack implementation using mmap

use cothread_core::constants::FALLBACK_PAGE_SIZE;
use cothread_core::error::{CoroResult, MemoryError};
use cothread_core::kerror;
use nix::errno::Errno;
use std::ptr;
use std::sync::OnceLock;

/// mprotect lets us keep the lowest page inaccessible
pub(super) const SUPPORTS_GUARD: bool = true;

/// System page size, queried once
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 && (size as usize).is_power_of_two() {
            size as usize
        } else {
            FALLBACK_PAGE_SIZE
        }
    })
}

/// Reserve `len` bytes; everything above the first `guard` bytes is RW
///
/// The whole range is mapped PROT_NONE first, then the usable part is
/// opened up, so the guard page never becomes accessible.
pub(super) fn reserve(len: usize, guard: usize) -> CoroResult<*mut u8> {
    // OpenBSD requires MAP_STACK on anything that is used as a stack.
    cfg_if::cfg_if! {
        if #[cfg(target_os = "openbsd")] {
            let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_STACK;
        } else {
            let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
        }
    }

    let base = unsafe { libc::mmap(ptr::null_mut(), len, libc::PROT_NONE, flags, -1, 0) };
    if base == libc::MAP_FAILED {
        kerror!("stack mmap of {} bytes failed: {}", len, Errno::last());
        return Err(MemoryError::AllocationFailed.into());
    }
    let base = base as *mut u8;

    let ret = unsafe {
        libc::mprotect(
            base.add(guard) as *mut libc::c_void,
            len - guard,
            libc::PROT_READ | libc::PROT_WRITE,
        )
    };
    if ret != 0 {
        kerror!("stack mprotect failed: {}", Errno::last());
        unsafe { release(base, len) };
        return Err(MemoryError::ProtectionFailed.into());
    }

    Ok(base)
}

/// Unmap a reservation made by `reserve`
///
/// # Safety
///
/// `base`/`len` must come from a successful `reserve` and not be used after.
pub(super) unsafe fn release(base: *mut u8, len: usize) {
    let ret = libc::munmap(base as *mut libc::c_void, len);
    debug_assert_eq!(ret, 0, "munmap failed: {}", Errno::last());
}
