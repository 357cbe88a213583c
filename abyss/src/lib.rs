//! The abyss of the monitor that touches hardware.
//!
//! This crate collects the pieces of the monitor that talk to the machine
//! directly: address arithmetic for the kernel's direct map, the diagnostic
//! console behind the `print!` family of macros, and the x86_64 registers the
//! monitor reads or patches (`rflags`, `rbp`).
//!
//! The monitor crate (`kmon`) builds every command on top of these
//! primitives. Nothing here knows about commands, page-table walks or
//! symbols.
#![cfg_attr(not(test), no_std)]

use core::sync::atomic::AtomicBool;

#[doc(hidden)]
#[macro_use]
pub mod kprint;
pub mod addressing;
pub mod x86_64;

/// Suppresses `info!`, `warning!` and `debug!` output when set.
#[doc(hidden)]
pub static QUIET: AtomicBool = AtomicBool::new(false);
