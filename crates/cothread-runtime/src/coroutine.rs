//! Coroutine handle and trampoline
//!
//! A [`Coroutine`] owns a stack, an execution context, a state and an id.
//! The owner drives it with [`Coroutine::join`]; the body gives control
//! back with [`yield_now`] (or the sleep functions in `timer`) and by
//! returning.
//!
//! ```text
//!   owner thread                      coroutine stack
//!   ────────────                      ───────────────
//!   join()  ── swap(caller, ctx) ──▶  coroutine_main / past last yield
//!                                      ...body...
//!           ◀─ swap(ctx, caller) ───  yield_now() / completion
//!   join() returns
//! ```

use crate::config::{self, CoroutineConfig};
use crate::context::{ExecutionContext, PlatformContext};
use crate::stack::Stack;
use crate::tls;

use cothread_core::constants::MIN_STACK_SIZE;
use cothread_core::error::CoroResult;
use cothread_core::id::CoroutineId;
use cothread_core::state::CoroutineState;
use cothread_core::{kdebug, kerror, kinfo, ktrace, kwarn};

use std::any::Any;
use std::cell::{Cell, UnsafeCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

type Body = Box<dyn FnOnce() + Send>;
type PanicPayload = Box<dyn Any + Send>;

/// Heap block shared by a handle and the code running on its stack
///
/// Only one side touches it at a time: the owner between swaps, the body
/// while it runs. Field order is drop order; the context goes first so a
/// thread-backed worker is joined before anything it could touch is freed.
pub(crate) struct CoroutineInner {
    context: UnsafeCell<PlatformContext>,
    caller: UnsafeCell<PlatformContext>,
    body: Cell<Option<Body>>,
    panic: Cell<Option<PanicPayload>>,
    deadline: Cell<Option<Instant>>,
    state: AtomicU8,
    id: CoroutineId,
    name: Option<String>,
    debug: bool,
    stack: Stack,
}

impl CoroutineInner {
    #[inline]
    pub(crate) fn id(&self) -> CoroutineId {
        self.id
    }

    #[inline]
    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub(crate) fn state(&self) -> CoroutineState {
        CoroutineState::from(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set_state(&self, next: CoroutineState) {
        debug_assert!(
            self.state().can_transition_to(next),
            "coroutine {}: illegal transition {} -> {}",
            self.id,
            self.state(),
            next
        );
        self.state.store(next as u8, Ordering::Release);
    }

    #[inline]
    pub(crate) fn set_deadline(&self, deadline: Option<Instant>) {
        self.deadline.set(deadline);
    }

    /// Switch from the owner into the coroutine
    ///
    /// # Safety
    ///
    /// Caller must be the owner and the coroutine must be resumable.
    #[inline]
    unsafe fn resume(&self) {
        PlatformContext::swap(self.caller.get(), self.context.get());
    }

    /// Switch from the coroutine back to whoever resumed it
    ///
    /// # Safety
    ///
    /// Must be called from the coroutine's own body.
    #[inline]
    pub(crate) unsafe fn suspend(&self) {
        if cfg!(debug_assertions) && PlatformContext::RUNS_ON_STACK {
            let marker = 0u8;
            debug_assert!(
                self.stack.contains(std::ptr::addr_of!(marker) as usize),
                "coroutine {} suspended from outside its own stack",
                self.id
            );
        }
        PlatformContext::swap(self.context.get(), self.caller.get());
    }
}

/// Fixed entry of every coroutine stack
///
/// Runs the bound closure, captures a panic if there is one, marks the
/// coroutine completed and switches back to the caller for the last time.
extern "C" fn coroutine_main(arg: usize) {
    let raw = arg as *const CoroutineInner;
    {
        // SAFETY: `arg` is the boxed block that owns this stack
        let inner = unsafe { &*raw };
        // Thread-backed contexts run on their own OS thread, which needs
        // its own registration. On a machine context this is a no-op.
        tls::enter(raw);

        if let Some(body) = inner.body.take() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(body)) {
                inner.panic.set(Some(payload));
            }
        }

        inner.set_deadline(None);
        inner.set_state(CoroutineState::Completed);
    }

    // SAFETY: still our own block; no reference is held across the switch
    unsafe { PlatformContext::swap((*raw).context.get(), (*raw).caller.get()) };

    // Reached only on a thread context, once the handle has been dropped
    // and the worker is released. Nothing here may touch the block.
}

/// Move-only handle to a stackful coroutine
///
/// The handle is `!Send`: a suspended body lives on a stack tied to the
/// thread that last joined it.
///
/// # Example
///
/// ```ignore
/// use cothread_runtime::{Coroutine, yield_now};
///
/// let mut co = Coroutine::new(|| {
///     println!("step 1");
///     yield_now();
///     println!("step 2");
/// });
/// co.join(); // step 1
/// co.join(); // step 2
/// assert!(!co.joinable());
/// ```
pub struct Coroutine {
    inner: Option<NonNull<CoroutineInner>>,
}

impl Coroutine {
    /// Create a coroutine that will run `f` on its own stack
    ///
    /// Nothing runs until the first [`join`](Self::join).
    ///
    /// # Panics
    ///
    /// Panics if the stack cannot be allocated. Use [`Builder::spawn`] to
    /// handle that case.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        match Builder::new().spawn(f) {
            Ok(co) => co,
            Err(e) => panic!("failed to create coroutine: {}", e),
        }
    }

    /// A handle with no function bound
    pub const fn empty() -> Self {
        Self { inner: None }
    }

    #[inline]
    fn inner(&self) -> Option<&CoroutineInner> {
        // SAFETY: the block lives until Drop takes it
        self.inner.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// Check if `join()` still has work to do
    #[inline]
    pub fn joinable(&self) -> bool {
        self.state().is_joinable()
    }

    /// Current lifecycle state
    #[inline]
    pub fn state(&self) -> CoroutineState {
        self.inner().map_or(CoroutineState::Empty, CoroutineInner::state)
    }

    /// This coroutine's id, `CoroutineId::NONE` if empty
    #[inline]
    pub fn id(&self) -> CoroutineId {
        self.inner().map_or(CoroutineId::NONE, CoroutineInner::id)
    }

    /// Name given through the `Builder`
    pub fn name(&self) -> Option<&str> {
        self.inner().and_then(CoroutineInner::name)
    }

    /// Usable bytes of this coroutine's stack (0 if empty)
    pub fn stack_size(&self) -> usize {
        self.inner().map_or(0, |inner| inner.stack.usable_size())
    }

    /// Deadline of the sleep the body is currently suspended in
    ///
    /// Lets an owner wait for the deadline instead of joining in a loop.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner().and_then(|inner| inner.deadline.get())
    }

    /// Resume the coroutine until it next suspends or completes
    ///
    /// No-op when empty or completed. Blocks the calling OS thread only
    /// while the body runs.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from the body, once, from the `join` during which
    /// the body panicked. Later joins are no-ops.
    pub fn join(&mut self) {
        let Some(ptr) = self.inner else {
            return;
        };
        // SAFETY: the block lives until Drop takes it
        let inner = unsafe { &*ptr.as_ptr() };

        match inner.state() {
            CoroutineState::Created | CoroutineState::Suspended => {}
            CoroutineState::Running => {
                kwarn!("join on running coroutine {} ignored", inner.id);
                return;
            }
            CoroutineState::Empty | CoroutineState::Completed => return,
        }

        let previous = tls::enter(ptr.as_ptr());
        inner.set_state(CoroutineState::Running);
        ktrace!("resume coroutine {}", inner.id);

        // SAFETY: we are the owner and the state was resumable
        unsafe { inner.resume() };

        tls::leave(previous);

        let state = inner.state();
        debug_assert!(
            matches!(state, CoroutineState::Suspended | CoroutineState::Completed),
            "coroutine {} returned control while {}",
            inner.id,
            state
        );
        ktrace!("coroutine {} -> {}", inner.id, state);

        if state == CoroutineState::Completed {
            if inner.debug {
                kinfo!("coroutine {} completed", inner.id);
            }
            if let Some(payload) = inner.panic.take() {
                kdebug!("coroutine {} panicked; re-raising in joiner", inner.id);
                panic::resume_unwind(payload);
            }
        }
    }
}

impl Default for Coroutine {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for Coroutine {
    fn drop(&mut self) {
        let Some(ptr) = self.inner.take() else {
            return;
        };
        // SAFETY: the block lives until here
        let inner = unsafe { &*ptr.as_ptr() };
        let state = inner.state();
        if !state.is_terminated() {
            kerror!(
                "coroutine {} dropped while {}; it must be joined to completion first",
                inner.id,
                state
            );
            std::process::abort();
        }
        if inner.debug {
            kinfo!("coroutine {} released", inner.id);
        }
        // SAFETY: allocated by Box::into_raw in Builder::spawn, freed once
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

impl fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coroutine")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

/// Coroutine factory, for configuring the stack and name
///
/// ```ignore
/// let co = Builder::new()
///     .name("parser")
///     .stack_size(256 * 1024)
///     .spawn(|| { /* ... */ })?;
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    name: Option<String>,
    config: CoroutineConfig,
}

impl Builder {
    /// Start from the process-wide configuration
    pub fn new() -> Self {
        Self::from_config(config::global().clone())
    }

    /// Start from an explicit configuration
    pub fn from_config(config: CoroutineConfig) -> Self {
        Self { name: None, config }
    }

    /// Name the coroutine (shown in logs and `Debug`)
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the usable stack size; raised to `MIN_STACK_SIZE` if smaller
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.config.stack_size = bytes;
        self
    }

    /// Enable or disable the guard page
    pub fn guard_page(mut self, enable: bool) -> Self {
        self.config.guard_page = enable;
        self
    }

    /// Create the coroutine, in state `Created`
    pub fn spawn<F>(self, f: F) -> CoroResult<Coroutine>
    where
        F: FnOnce() + Send + 'static,
    {
        let size = self.config.stack_size.max(MIN_STACK_SIZE);
        let stack = if PlatformContext::RUNS_ON_STACK {
            Stack::allocate(size, self.config.guard_page)?
        } else {
            // The worker thread brings its own stack of this size
            Stack::unmapped(size)?
        };

        let inner = Box::new(CoroutineInner {
            context: UnsafeCell::new(PlatformContext::default()),
            caller: UnsafeCell::new(PlatformContext::default()),
            body: Cell::new(Some(Box::new(f))),
            panic: Cell::new(None),
            deadline: Cell::new(None),
            state: AtomicU8::new(CoroutineState::Created as u8),
            id: CoroutineId::next(),
            name: self.name,
            debug: self.config.debug_logging,
            stack,
        });
        // From here on the block is only reached through this pointer.
        let ptr = NonNull::from(Box::leak(inner));

        // SAFETY: the stack is owned by the block the context lives in
        let initial = unsafe {
            let inner = &*ptr.as_ptr();
            PlatformContext::make_initial(&inner.stack, coroutine_main, ptr.as_ptr() as usize)
        };
        let initial = match initial {
            Ok(ctx) => ctx,
            Err(e) => {
                // SAFETY: never shared; reclaim and free
                drop(unsafe { Box::from_raw(ptr.as_ptr()) });
                return Err(e);
            }
        };
        // SAFETY: nothing runs on the context yet
        unsafe { *(*ptr.as_ptr()).context.get() = initial };

        let co = Coroutine { inner: Some(ptr) };
        if self.config.debug_logging {
            kinfo!(
                "coroutine {} created (name={:?}, stack={} bytes)",
                co.id(),
                co.name(),
                co.stack_size()
            );
        }
        Ok(co)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// Suspend the running coroutine and return control to its joiner
///
/// Execution continues after this call on the next `join()`. Outside a
/// coroutine this returns immediately.
pub fn yield_now() {
    let current = tls::current();
    if current.is_null() {
        return;
    }
    // SAFETY: a registered block outlives its registration
    let inner = unsafe { &*current };
    inner.set_state(CoroutineState::Suspended);
    // SAFETY: we are executing inside this coroutine's body
    unsafe { inner.suspend() };
}
