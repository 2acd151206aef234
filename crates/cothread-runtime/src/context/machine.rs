//! Register-switching context

use super::{EntryFn, ExecutionContext};
use crate::arch::{self, RegisterContext};
use crate::stack::Stack;
use cothread_core::error::CoroResult;
use std::ptr;

/// Callee-saved register snapshot, switched on the calling OS thread
#[derive(Debug, Default)]
pub struct MachineContext {
    regs: RegisterContext,
}

impl ExecutionContext for MachineContext {
    const RUNS_ON_STACK: bool = true;

    unsafe fn make_initial(stack: &Stack, entry: EntryFn, arg: usize) -> CoroResult<Self> {
        debug_assert!(!stack.is_empty(), "machine context needs a real stack");
        let mut ctx = Self::default();
        arch::init_context(&mut ctx.regs, stack.top(), entry as *const () as usize, arg);
        Ok(ctx)
    }

    #[inline]
    unsafe fn swap(current: *mut Self, target: *const Self) {
        arch::context_switch(
            ptr::addr_of_mut!((*current).regs),
            ptr::addr_of!((*target).regs),
        );
    }
}
