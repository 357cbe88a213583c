//! Frame-pointer stack unwinding.
//!
//! The kernel is built with frame pointers, so every frame starts with the
//! caller's saved `rbp` followed by the return address:
//!
//! ```text
//!          +----------------+
//! fp + 48  |     arg 4      |
//!          |      ...       |
//! fp + 16  |     arg 0      |
//! fp + 8   | return address |
//! fp  ---> |   saved rbp    | ---> caller's frame
//!          +----------------+
//! ```
//!
//! [`Backtrace`] follows that chain one frame at a time. It checks each slot
//! against the address space before reading it: a frame pointer that points
//! at unmapped memory ends the walk, and an unreadable return address or
//! argument is reported as missing. Cycles in the chain are not detected.
use crate::{
    addressing::Va,
    mm::{AddressSpace, access},
    symbols::SymbolResolver,
};
use abyss::debug;
use core::fmt::{self, Write};

const WORD: usize = core::mem::size_of::<usize>();

/// Number of argument words shown per frame.
pub const NARGS: usize = 5;

/// A single frame of the call chain.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Frame {
    /// Frame pointer of this frame.
    pub fp: usize,
    /// Return address, if its slot is readable.
    pub ret: Option<usize>,
    /// Words above the return address, each present only if readable.
    pub args: [Option<usize>; NARGS],
}

/// Iterator over the frames of a frame-pointer chain.
pub struct Backtrace<'s> {
    space: &'s dyn AddressSpace,
    fp: usize,
}

impl<'s> Backtrace<'s> {
    /// Starts a walk at frame pointer `fp` in `space`.
    pub fn new(fp: usize, space: &'s dyn AddressSpace) -> Self {
        Self { space, fp }
    }

    fn slot(&self, fp: usize, index: usize) -> Option<usize> {
        let addr = fp.checked_add(index * WORD)?;
        access::peek_word(self.space, Va::new(addr)?)
    }
}

impl Iterator for Backtrace<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let fp = self.fp;
        if fp == 0 {
            return None;
        }
        let Some(saved) = self.slot(fp, 0) else {
            debug!("backtrace: frame pointer {:#x} is not mapped", fp);
            self.fp = 0;
            return None;
        };
        let mut args = [None; NARGS];
        for (i, arg) in args.iter_mut().enumerate() {
            *arg = self.slot(fp, i + 2);
        }
        self.fp = saved;
        Some(Frame {
            fp,
            ret: self.slot(fp, 1),
            args,
        })
    }
}

/// Prints the frame-pointer chain starting at `fp`.
///
/// Each frame produces two lines: the raw frame and a source annotation
/// for the instruction that made the call.
///
/// ```text
/// Stack backtrace:
///   rbp ffffff0000123f80  rip ffffff0000104a1b  args 0000000000000001 ...
///      kernel/src/main.rs:42: kmon::demo+59
/// ```
///
/// # Returns
/// The number of frames printed.
pub fn print_backtrace(
    space: &dyn AddressSpace,
    fp: usize,
    symbols: &dyn SymbolResolver,
    out: &mut dyn Write,
) -> Result<usize, fmt::Error> {
    writeln!(out, "Stack backtrace:")?;
    let mut depth = 0;
    for frame in Backtrace::new(fp, space) {
        write!(out, "  rbp {:016x}", frame.fp)?;
        if let Some(ret) = frame.ret {
            write!(out, "  rip {:016x}", ret)?;
        }
        let mut args = frame.args.iter().flatten().peekable();
        if args.peek().is_some() {
            write!(out, "  args")?;
            for arg in args {
                write!(out, " {:016x}", arg)?;
            }
        }
        writeln!(out)?;
        annotate(frame.ret, symbols, out)?;
        depth += 1;
    }
    Ok(depth)
}

fn annotate(ret: Option<usize>, symbols: &dyn SymbolResolver, out: &mut dyn Write) -> fmt::Result {
    // The return address may already belong to the next line or function,
    // so look up the call instruction before it.
    let info = ret.and_then(|ret| symbols.resolve(ret.wrapping_sub(1)));
    let (file, line, function, offset) = match (ret, info) {
        (Some(ret), Some(info)) => (
            info.file,
            info.line,
            info.function,
            info.function_start.map(|start| ret.wrapping_sub(start)),
        ),
        _ => (None, None, None, None),
    };
    writeln!(
        out,
        "     {}:{}: {}+{}",
        file.unwrap_or("<unknown>"),
        line.unwrap_or(0),
        function.unwrap_or("<unknown>"),
        offset.unwrap_or(0)
    )
}
