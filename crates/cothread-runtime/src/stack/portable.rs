//! Portable stack implementation on the global allocator
//!
//! No page protection is available here, so stacks carry no guard page.

use cothread_core::constants::FALLBACK_PAGE_SIZE;
use cothread_core::error::{CoroResult, MemoryError};
use cothread_core::kerror;
use std::alloc::{self, Layout};

pub(super) const SUPPORTS_GUARD: bool = false;

/// Page size used for rounding
pub fn page_size() -> usize {
    FALLBACK_PAGE_SIZE
}

fn layout(len: usize) -> CoroResult<Layout> {
    Layout::from_size_align(len, page_size()).map_err(|_| MemoryError::SizeOverflow.into())
}

pub(super) fn reserve(len: usize, _guard: usize) -> CoroResult<*mut u8> {
    let layout = layout(len)?;
    let base = unsafe { alloc::alloc(layout) };
    if base.is_null() {
        kerror!("stack allocation of {} bytes failed", len);
        return Err(MemoryError::AllocationFailed.into());
    }
    Ok(base)
}

/// # Safety
///
/// `base`/`len` must come from a successful `reserve` and not be used after.
pub(super) unsafe fn release(base: *mut u8, len: usize) {
    if let Ok(layout) = layout(len) {
        alloc::dealloc(base, layout);
    }
}
