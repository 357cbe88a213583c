//! # kmon: the KeOS kernel monitor
//!
//! When the kernel traps into the debugger, every other context is halted and
//! the operator talks to the machine through this monitor. It can
//!
//! - dump words of kernel or physical memory (`dump`),
//! - list page mappings and patch their permission bits (`map`, `set`,
//!   `clear`, `change`),
//! - print a symbolized backtrace of the frame-pointer chain (`bt`),
//! - resume or single-step a suspended user process (`c`, `n`, `s`).
//!
//! ## Never fault the debugger
//!
//! The monitor runs on a system that may already be broken. Its one hard rule
//! is that **no command dereferences memory before the page table confirms the
//! address is present**. Every read goes through [`mm::access`], which walks
//! the active [`AddressSpace`] first; absent words are skipped instead of
//! faulting, and a frame-pointer chain that wanders into unmapped memory simply
//! ends the backtrace.
//!
//! ## Embedding
//!
//! The monitor owns nothing. The kernel hands it an output sink, its own
//! address space, a [`SymbolResolver`] and, when a user process is suspended,
//! an [`ExecutionContext`] borrowing that process's saved flags and page
//! table:
//!
//! ```ignore
//! let mut kernel = unsafe { PageTable::current() };
//! let mut mon = Monitor::new(&mut console, &mut kernel, &symbols)
//!     .with_context(ExecutionContext::new(&mut frame.rflags, &mut user_pt));
//! mon.run(&mut Readline::new(serial));
//! ```
//!
//! [`Monitor::run`] returns when a command asks to resume the suspended
//! execution.
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod command;
pub mod exec;
pub mod inspect;
pub mod mm;
pub mod monitor;
pub mod symbols;
pub mod teletype;
pub mod unwind;

pub use abyss::{addressing, x86_64::Rflags};
pub use exec::ExecutionContext;
pub use mm::AddressSpace;
pub use monitor::{Config, Monitor};
pub use symbols::SymbolResolver;

/// Errors reported by monitor commands.
///
/// None of these stop the monitor; the dispatcher prints them and prompts
/// again.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MonitorError {
    /// Wrong number of arguments for the command.
    ArgumentCount,
    /// An argument failed to parse, or names an address that cannot exist.
    InvalidArgument,
    /// The line holds more tokens than the dispatcher accepts.
    TooManyArguments,
    /// No command carries the given name.
    UnknownCommand,
    /// The address has no present mapping in the active address space.
    NotMapped(addressing::Va),
    /// An execution-control command ran while no process is suspended.
    NoActiveProcess,
    /// Writing to the console failed.
    IOError,
}

impl core::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ArgumentCount => write!(f, "invalid number of arguments"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::TooManyArguments => {
                write!(f, "Too many arguments (max {})", monitor::MAXARGS)
            }
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::NotMapped(va) => write!(f, "{va} is not mapped"),
            Self::NoActiveProcess => write!(f, "no process running"),
            Self::IOError => write!(f, "console write failed"),
        }
    }
}

impl From<core::fmt::Error> for MonitorError {
    fn from(_: core::fmt::Error) -> Self {
        Self::IOError
    }
}

/// What the command loop does after a command returns.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Status {
    /// Read the next command.
    Prompt,
    /// Leave the monitor and resume the suspended execution.
    Resume,
}

impl Status {
    /// Converts the status into the integer convention of the trap handler:
    /// `0` keeps prompting, a negative value leaves the monitor.
    pub const fn into_isize(self) -> isize {
        match self {
            Status::Prompt => 0,
            Status::Resume => -1,
        }
    }
}
