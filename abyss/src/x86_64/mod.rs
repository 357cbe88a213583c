//! x86_64 registers used by the monitor.

bitflags::bitflags! {
    /// The RFLAGS register.
    pub struct Rflags: usize {
        /// Carry flag.
        const CF = 1 << 0;
        /// Reserved, always 1.
        const _1 = 1 << 1;
        /// Parity flag.
        const PF = 1 << 2;
        /// Auxiliary carry flag.
        const AF = 1 << 4;
        /// Zero flag.
        const ZF = 1 << 6;
        /// Sign flag.
        const SF = 1 << 7;
        /// Trap flag. Raises a debug exception after every instruction.
        const TF = 1 << 8;
        /// Interrupt enable flag.
        const IF = 1 << 9;
        /// Direction flag.
        const DF = 1 << 10;
        /// Overflow flag.
        const OF = 1 << 11;
        /// I/O privilege level, low bit.
        const IOPL0 = 1 << 12;
        /// I/O privilege level, high bit.
        const IOPL1 = 1 << 13;
        /// Nested task.
        const NT = 1 << 14;
        /// Resume flag.
        const RF = 1 << 16;
        /// Virtual-8086 mode.
        const VM = 1 << 17;
        /// Alignment check.
        const AC = 1 << 18;
        /// Virtual interrupt flag.
        const VIF = 1 << 19;
        /// Virtual interrupt pending.
        const VIP = 1 << 20;
        /// CPUID available.
        const ID = 1 << 21;
    }
}

/// Reads the frame pointer of the caller.
#[cfg(target_arch = "x86_64")]
#[inline(always)]
pub fn read_rbp() -> usize {
    let rbp: usize;
    unsafe {
        core::arch::asm!("mov {}, rbp", out(reg) rbp, options(nomem, nostack, preserves_flags));
    }
    rbp
}

/// Invalidates the TLB entry that caches the translation of `va`.
///
/// # Safety
/// Must run at CPL 0.
#[cfg(target_arch = "x86_64")]
#[inline]
pub unsafe fn invlpg(va: usize) {
    unsafe {
        core::arch::asm!("invlpg [{}]", in(reg) va, options(nostack, preserves_flags));
    }
}
