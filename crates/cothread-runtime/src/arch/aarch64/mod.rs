//! aarch64 (AAPCS64) context switching implementation
//!
//! Saves x19-x28, the frame pointer, the link register and the low halves
//! of v8-v15 (d8-d15), which is the full callee-saved set.

use std::arch::naked_asm;

/// Saved registers for one suspended execution point
///
/// Layout (offsets are used by the assembly below):
/// ```text
/// 0x00: sp    0x08: pc    0x10..0x58: x19-x28
/// 0x60: x29   0x68: x30   0x70..0xa8: d8-d15
/// ```
#[repr(C)]
#[derive(Debug, Default)]
pub struct RegisterContext {
    pub sp: u64,
    pub pc: u64,
    pub x19_x28: [u64; 10],
    pub fp: u64,
    pub lr: u64,
    pub d8_d15: [u64; 8],
}

/// Initialize a coroutine's context
///
/// # Safety
///
/// `stack_top` must be the 16-byte aligned top of a writable stack that
/// outlives every switch into `regs`.
#[inline]
pub unsafe fn init_context(
    regs: &mut RegisterContext,
    stack_top: *mut u8,
    entry_fn: usize,
    entry_arg: usize,
) {
    *regs = RegisterContext::default();
    regs.sp = ((stack_top as usize) & !0xF) as u64;
    regs.pc = coroutine_entry_trampoline as *const () as usize as u64;
    regs.x19_x28[0] = entry_fn as u64;  // x19
    regs.x19_x28[1] = entry_arg as u64; // x20
    // fp = lr = 0 terminates frame-pointer walks
}

/// First code executed on a fresh coroutine stack
#[unsafe(naked)]
unsafe extern "C" fn coroutine_entry_trampoline() {
    naked_asm!(
        "mov x0, x20",
        "blr x19",
        "brk #0x1",
    );
}

/// Perform a context switch
///
/// Saves callee-saved registers to `old_regs` and loads from `new_regs`.
///
/// # Safety
///
/// `new_regs` must hold a context produced by `init_context` or a previous
/// switch, whose stack is still alive.
#[unsafe(naked)]
pub unsafe extern "C" fn context_switch(
    _old_regs: *mut RegisterContext,
    _new_regs: *const RegisterContext,
) {
    naked_asm!(
        // Save to old_regs (x0)
        "mov x9, sp",
        "str x9, [x0, #0x00]",
        "adr x10, 2f",
        "str x10, [x0, #0x08]",
        "stp x19, x20, [x0, #0x10]",
        "stp x21, x22, [x0, #0x20]",
        "stp x23, x24, [x0, #0x30]",
        "stp x25, x26, [x0, #0x40]",
        "stp x27, x28, [x0, #0x50]",
        "stp x29, x30, [x0, #0x60]",
        "stp d8, d9, [x0, #0x70]",
        "stp d10, d11, [x0, #0x80]",
        "stp d12, d13, [x0, #0x90]",
        "stp d14, d15, [x0, #0xa0]",
        // Load from new_regs (x1)
        "ldr x9, [x1, #0x00]",
        "mov sp, x9",
        "ldr x10, [x1, #0x08]",
        "ldp x19, x20, [x1, #0x10]",
        "ldp x21, x22, [x1, #0x20]",
        "ldp x23, x24, [x1, #0x30]",
        "ldp x25, x26, [x1, #0x40]",
        "ldp x27, x28, [x1, #0x50]",
        "ldp x29, x30, [x1, #0x60]",
        "ldp d8, d9, [x1, #0x70]",
        "ldp d10, d11, [x1, #0x80]",
        "ldp d12, d13, [x1, #0x90]",
        "ldp d14, d15, [x1, #0xa0]",
        "br x10",
        // Resume point: x30 holds our original caller's return address
        "2:",
        "ret",
    );
}
