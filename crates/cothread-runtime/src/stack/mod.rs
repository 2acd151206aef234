//! Coroutine stack allocation
//!
//! Each coroutine owns one [`Stack`]: a page-rounded region whose lowest
//! page is optionally left inaccessible so that overflow faults instead of
//! silently corrupting the neighbouring allocation.
//!
//! ```text
//! bottom()                                             top()
//!   │                                                    │
//!   ▼                                                    ▼
//! ┌───────────┬────────────────────────────────────────────┐
//! │ guard     │ usable (grows down from top)               │
//! │ PROT_NONE │ PROT_READ | PROT_WRITE                     │
//! └───────────┴────────────────────────────────────────────┘
//! ```

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        use unix as platform;
    } else {
        mod portable;
        use portable as platform;
    }
}

pub use platform::page_size;

use cothread_core::constants::{MIN_STACK_SIZE, STACK_ALIGNMENT};
use cothread_core::error::{CoroResult, MemoryError};
use cothread_core::ktrace;
use std::ptr;

/// Owned coroutine stack
pub struct Stack {
    /// Lowest address of the reservation (start of the guard, if any)
    base: *mut u8,

    /// Total reserved bytes, guard included
    len: usize,

    /// Bytes at the bottom left inaccessible
    guard: usize,
}

impl Stack {
    /// Reserve a stack with at least `size` usable bytes
    ///
    /// The size is raised to [`MIN_STACK_SIZE`] and rounded up to whole
    /// pages. With `guard_page` set (and supported by the platform), one
    /// extra page below the stack is kept inaccessible.
    pub fn allocate(size: usize, guard_page: bool) -> CoroResult<Self> {
        let page = page_size();
        let usable = round_up(size.max(MIN_STACK_SIZE), page)?;
        let guard = if guard_page && platform::SUPPORTS_GUARD { page } else { 0 };
        let len = usable.checked_add(guard).ok_or(MemoryError::SizeOverflow)?;

        let base = platform::reserve(len, guard)?;
        ktrace!("stack reserved: base={:p} len={} guard={}", base, len, guard);

        Ok(Self { base, len, guard })
    }

    /// A size-only stack that reserves no memory
    ///
    /// For contexts that execute on an OS thread's own stack: the size is
    /// checked and rounded exactly as `allocate` would, so `usable_size()`
    /// reports what the thread will get, but `is_empty()` stays true.
    pub fn unmapped(size: usize) -> CoroResult<Self> {
        let usable = round_up(size.max(MIN_STACK_SIZE), page_size())?;
        Ok(Self {
            base: ptr::null_mut(),
            len: usable,
            guard: 0,
        })
    }

    /// An empty stack owning no memory
    pub const fn empty() -> Self {
        Self {
            base: ptr::null_mut(),
            len: 0,
            guard: 0,
        }
    }

    /// Check if this stack owns memory
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.base.is_null()
    }

    /// Highest usable address, aligned to [`STACK_ALIGNMENT`]
    ///
    /// Stacks grow down, so this is where the first frame goes.
    #[inline]
    pub fn top(&self) -> *mut u8 {
        if self.is_empty() {
            return ptr::null_mut();
        }
        let top = self.base as usize + self.len;
        (top & !(STACK_ALIGNMENT - 1)) as *mut u8
    }

    /// Lowest usable address (just above the guard page)
    #[inline]
    pub fn bottom(&self) -> *mut u8 {
        if self.is_empty() {
            return ptr::null_mut();
        }
        // SAFETY: guard < len, both describe the same reservation
        unsafe { self.base.add(self.guard) }
    }

    /// Usable bytes between `bottom()` and `top()`
    #[inline]
    pub fn usable_size(&self) -> usize {
        self.len - self.guard
    }

    /// Check if overflow hits an inaccessible page
    #[inline]
    pub fn has_guard(&self) -> bool {
        self.guard != 0
    }

    /// Check if `addr` lies inside the usable region
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        !self.is_empty() && addr >= self.bottom() as usize && addr < self.top() as usize
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        if self.is_empty() {
            return;
        }
        // SAFETY: base/len describe the reservation made in allocate()
        unsafe { platform::release(self.base, self.len) };
        ktrace!("stack released: base={:p} len={}", self.base, self.len);
        self.base = ptr::null_mut();
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("bottom", &self.bottom())
            .field("top", &self.top())
            .field("usable", &self.usable_size())
            .field("guard", &self.has_guard())
            .finish()
    }
}

fn round_up(size: usize, page: usize) -> CoroResult<usize> {
    debug_assert!(page.is_power_of_two());
    Ok(size.checked_add(page - 1).ok_or(MemoryError::SizeOverflow)? & !(page - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cothread_core::error::CoroError;

    #[test]
    fn test_minimum_size_enforced() {
        let stack = Stack::allocate(1, false).unwrap();
        assert!(stack.usable_size() >= MIN_STACK_SIZE);
        assert_eq!(stack.usable_size() % page_size(), 0);
    }

    #[test]
    fn test_top_alignment_and_bounds() {
        let stack = Stack::allocate(64 * 1024, true).unwrap();
        let top = stack.top() as usize;
        let bottom = stack.bottom() as usize;
        assert_eq!(top % STACK_ALIGNMENT, 0);
        assert!(top > bottom);
        assert!(top - bottom >= 64 * 1024 - STACK_ALIGNMENT);
        assert!(stack.contains(top - 8));
        assert!(stack.contains(bottom));
        assert!(!stack.contains(top));
    }

    #[test]
    fn test_usable_region_is_writable() {
        let stack = Stack::allocate(MIN_STACK_SIZE, true).unwrap();
        // Touch both ends of the usable region
        unsafe {
            stack.bottom().write(0xAA);
            stack.top().sub(1).write(0x55);
            assert_eq!(stack.bottom().read(), 0xAA);
            assert_eq!(stack.top().sub(1).read(), 0x55);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_guard_page_flag() {
        let guarded = Stack::allocate(MIN_STACK_SIZE, true).unwrap();
        let bare = Stack::allocate(MIN_STACK_SIZE, false).unwrap();
        assert!(guarded.has_guard());
        assert!(!bare.has_guard());
        assert_eq!(guarded.usable_size(), bare.usable_size());
    }

    #[test]
    fn test_overflowing_size_is_an_error() {
        let err = Stack::allocate(usize::MAX, false).unwrap_err();
        assert_eq!(err, CoroError::from(MemoryError::SizeOverflow));
    }

    #[test]
    fn test_unmapped_reserves_nothing() {
        let stack = Stack::unmapped(100 * 1024 + 1).unwrap();
        assert!(stack.is_empty());
        assert!(stack.top().is_null());
        assert!(!stack.has_guard());
        assert!(stack.usable_size() > 100 * 1024);
        assert_eq!(stack.usable_size() % page_size(), 0);
        assert_eq!(Stack::unmapped(1).unwrap().usable_size(), round_up(MIN_STACK_SIZE, page_size()).unwrap());

        let err = Stack::unmapped(usize::MAX).unwrap_err();
        assert_eq!(err, CoroError::from(MemoryError::SizeOverflow));
        // Dropping a size-only stack releases nothing
        drop(stack);
    }

    #[test]
    fn test_empty_stack() {
        let stack = Stack::default();
        assert!(stack.is_empty());
        assert!(stack.top().is_null());
        assert_eq!(stack.usable_size(), 0);
        assert!(!stack.contains(0));
    }
}
