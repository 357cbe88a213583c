//! Kernel print utilities.
//!
//! The monitor never owns the console device. The embedding kernel installs a
//! sink once at boot with [`install_console`]; until then every message is
//! dropped on the floor, which keeps the macros usable from host-side tests.

use core::fmt::Write;
use spin::Mutex;

type Sink = &'static mut (dyn Write + Send);

static CONSOLE: Mutex<Option<Sink>> = Mutex::new(None);

/// Installs the console that backs `print!` and friends.
///
/// Returns the previously installed console, if any.
pub fn install_console(sink: Sink) -> Option<Sink> {
    CONSOLE.lock().replace(sink)
}

/// Detaches the current console.
pub fn take_console() -> Option<Sink> {
    CONSOLE.lock().take()
}

#[doc(hidden)]
pub fn _print(fmt: core::fmt::Arguments<'_>) {
    if let Some(sink) = CONSOLE.lock().as_mut() {
        let _ = sink.write_fmt(fmt);
    }
}

/// Prints out the message.
///
/// Use the format! syntax to write data to the installed console.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::kprint::_print(format_args!($($arg)*)));
}

/// Prints out the message with a newline.
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

/// Display an information message.
#[macro_export]
macro_rules! info {
    () => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[INFO]\n") });
    ($($arg:tt)*) => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[INFO] {}\n", format_args!($($arg)*)) });
}

/// Display a warning message.
#[macro_export]
macro_rules! warning {
    () => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[WARN]\n") });
    ($($arg:tt)*) => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[WARN] {}\n", format_args!($($arg)*)) });
}

/// Display a debug message.
#[macro_export]
macro_rules! debug {
    () => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[DEBUG]\n") });
    ($($arg:tt)*) => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[DEBUG] {}\n", format_args!($($arg)*))} );
}
