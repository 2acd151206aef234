//! x86_64 (System V) context switching implementation
//!
//! Only callee-saved state is stored: the switch is an ordinary function
//! call, so the compiler already treats every other register as clobbered.

use std::arch::naked_asm;

/// Default MXCSR: all exceptions masked, round-to-nearest
const MXCSR_DEFAULT: u32 = 0x1F80;

/// Default x87 control word: all exceptions masked, 64-bit precision
const FPUCW_DEFAULT: u16 = 0x037F;

/// Saved registers for one suspended execution point
///
/// Layout (offsets are used by the assembly below):
/// ```text
/// 0x00: rsp   0x08: rip   0x10: rbx   0x18: rbp
/// 0x20: r12   0x28: r13   0x30: r14   0x38: r15
/// 0x40: mxcsr (u32)   0x44: x87 control word (u16)
/// ```
#[repr(C)]
#[derive(Debug, Default)]
pub struct RegisterContext {
    pub rsp: u64,
    pub rip: u64,
    pub rbx: u64,
    pub rbp: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub mxcsr: u32,
    pub fpucw: u16,
    _pad: u16,
}

/// Initialize a coroutine's context
///
/// Sets up the registers so that the first switch into `regs` begins at
/// the trampoline, which calls `entry_fn(entry_arg)` on the new stack.
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
    // The trampoline issues a `call`, which needs rsp % 16 == 0 beforehand.
    let sp = (stack_top as usize) & !0xF;

    regs.rsp = sp as u64;
    regs.rip = coroutine_entry_trampoline as *const () as usize as u64;
    regs.rbx = 0;
    regs.rbp = 0; // terminates frame-pointer walks
    regs.r12 = entry_fn as u64;
    regs.r13 = entry_arg as u64;
    regs.r14 = 0;
    regs.r15 = 0;
    regs.mxcsr = MXCSR_DEFAULT;
    regs.fpucw = FPUCW_DEFAULT;
}

/// First code executed on a fresh coroutine stack
///
/// The entry function never returns here: it finishes by switching back to
/// its caller for good.
#[unsafe(naked)]
unsafe extern "C" fn coroutine_entry_trampoline() {
    naked_asm!(
        "mov rdi, r13",
        "call r12",
        "ud2",
    );
}

/// Perform a context switch
///
/// Saves callee-saved registers to `old_regs` and loads from `new_regs`.
/// Returns when some later switch loads `old_regs` again.
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
        // Save callee-saved registers to old_regs (RDI)
        "mov [rdi + 0x00], rsp",
        "lea rax, [rip + 2f]",
        "mov [rdi + 0x08], rax",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], rbp",
        "mov [rdi + 0x20], r12",
        "mov [rdi + 0x28], r13",
        "mov [rdi + 0x30], r14",
        "mov [rdi + 0x38], r15",
        "stmxcsr [rdi + 0x40]",
        "fnstcw [rdi + 0x44]",
        // Load callee-saved registers from new_regs (RSI)
        "mov rsp, [rsi + 0x00]",
        "mov rax, [rsi + 0x08]",
        "mov rbx, [rsi + 0x10]",
        "mov rbp, [rsi + 0x18]",
        "mov r12, [rsi + 0x20]",
        "mov r13, [rsi + 0x28]",
        "mov r14, [rsi + 0x30]",
        "mov r15, [rsi + 0x38]",
        "ldmxcsr [rsi + 0x40]",
        "fldcw [rsi + 0x44]",
        // Jump to new RIP
        "jmp rax",
        // Resume point for a saved context
        "2:",
        "ret",
    );
}
