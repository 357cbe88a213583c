//! The commands of the monitor.
//!
//! Commands live in one static table, [`COMMANDS`]. A handler receives the
//! tokenized line (its first element is the command name) and the monitor,
//! and returns whether the monitor keeps prompting.
use crate::{
    MonitorError, Status,
    addressing::{Kva, Pa, Va},
    exec,
    inspect::{self, PermissionEdit, Space},
    monitor::Monitor,
    unwind,
};

/// A command handler.
pub type Handler = fn(&[&str], &mut Monitor<'_>) -> Result<Status, MonitorError>;

/// A monitor command.
pub struct Command {
    /// Name typed at the prompt.
    pub name: &'static str,
    /// One-line description shown by `help`.
    pub desc: &'static str,
    /// Argument synopsis shown on argument-count errors.
    pub usage: &'static str,
    /// The handler.
    pub func: Handler,
}

/// Every command the monitor knows, in `help` order.
pub static COMMANDS: [Command; 11] = [
    Command {
        name: "help",
        desc: "Display this list of commands",
        usage: "help",
        func: help,
    },
    Command {
        name: "kerninfo",
        desc: "Display information about the kernel",
        usage: "kerninfo",
        func: kerninfo,
    },
    Command {
        name: "map",
        desc: "Show mappings in detail",
        usage: "map <begin> <end>",
        func: map,
    },
    Command {
        name: "change",
        desc: "Change to new privilege bits",
        usage: "change <vaddr> <perm>",
        func: change,
    },
    Command {
        name: "set",
        desc: "Set some privilege bits",
        usage: "set <vaddr> <perm>",
        func: set,
    },
    Command {
        name: "clear",
        desc: "Remove certain privilege bits",
        usage: "clear <vaddr> <perm>",
        func: clear,
    },
    Command {
        name: "dump",
        desc: "Dump current content of specified memory",
        usage: "dump <begin> <end> <V|P>",
        func: dump,
    },
    Command {
        name: "bt",
        desc: "Backtrace the stack",
        usage: "bt",
        func: backtrace,
    },
    Command {
        name: "c",
        desc: "Continue the suspended process",
        usage: "c",
        func: cont,
    },
    Command {
        name: "n",
        desc: "Execute one instruction of the suspended process",
        usage: "n",
        func: next,
    },
    Command {
        name: "s",
        desc: "Step the suspended process",
        usage: "s",
        func: step,
    },
];

/// Finds the command called exactly `name`.
pub fn lookup(name: &str) -> Result<&'static Command, MonitorError> {
    COMMANDS
        .iter()
        .find(|cmd| cmd.name == name)
        .ok_or(MonitorError::UnknownCommand)
}

/// Parses a base-16 number with an optional `0x` prefix.
pub fn parse_hex(s: &str) -> Result<usize, MonitorError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(MonitorError::InvalidArgument);
    }
    usize::from_str_radix(digits, 16).map_err(|_| MonitorError::InvalidArgument)
}

/// Parses a base-10 number.
pub fn parse_dec(s: &str) -> Result<usize, MonitorError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MonitorError::InvalidArgument);
    }
    s.parse().map_err(|_| MonitorError::InvalidArgument)
}

fn parse_va(s: &str) -> Result<Va, MonitorError> {
    Va::new(parse_hex(s)?).ok_or(MonitorError::InvalidArgument)
}

fn expect_args(argv: &[&str], argc: usize) -> Result<(), MonitorError> {
    if argv.len() == argc {
        Ok(())
    } else {
        Err(MonitorError::ArgumentCount)
    }
}

/// Where the kernel image was loaded.
///
/// The linker script of the embedding kernel exports these symbols; the
/// monitor only reports them.
#[derive(Debug, Clone, Copy)]
pub struct KernelLayout {
    /// Physical load address (`_start`).
    pub start: Pa,
    /// Entry point.
    pub entry: Kva,
    /// End of the text section.
    pub etext: Kva,
    /// End of the initialized data.
    pub edata: Kva,
    /// End of the image.
    pub end: Kva,
}

impl KernelLayout {
    /// Memory the image occupies, in KB, rounded up.
    pub fn footprint_kb(&self) -> usize {
        self.end.into_usize().saturating_sub(self.entry.into_usize()).div_ceil(1024)
    }
}

fn help(_argv: &[&str], m: &mut Monitor<'_>) -> Result<Status, MonitorError> {
    for cmd in COMMANDS.iter() {
        writeln!(m.out, "{} - {}", cmd.name, cmd.desc)?;
    }
    Ok(Status::Prompt)
}

fn kerninfo(_argv: &[&str], m: &mut Monitor<'_>) -> Result<Status, MonitorError> {
    let Some(layout) = m.layout else {
        writeln!(m.out, "Kernel layout not available")?;
        return Ok(Status::Prompt);
    };
    writeln!(m.out, "Special kernel symbols:")?;
    writeln!(m.out, "  _start                  {:016x} (phys)", layout.start.into_usize())?;
    for (name, kva) in [
        ("entry", layout.entry),
        ("etext", layout.etext),
        ("edata", layout.edata),
        ("end", layout.end),
    ] {
        writeln!(
            m.out,
            "  {:<6} {:016x} (virt)  {:016x} (phys)",
            name,
            kva.into_usize(),
            kva.into_pa().into_usize()
        )?;
    }
    writeln!(m.out, "Kernel executable memory footprint: {}KB", layout.footprint_kb())?;
    Ok(Status::Prompt)
}

fn map(argv: &[&str], m: &mut Monitor<'_>) -> Result<Status, MonitorError> {
    expect_args(argv, 3)?;
    let (begin, end) = (parse_hex(argv[1])?, parse_hex(argv[2])?);
    let (out, space) = m.io();
    inspect::show_mappings(space, begin..end, out)?;
    Ok(Status::Prompt)
}

fn edit(argv: &[&str], m: &mut Monitor<'_>, edit: fn(usize) -> PermissionEdit) -> Result<Status, MonitorError> {
    expect_args(argv, 3)?;
    let va = parse_va(argv[1])?;
    let perm = parse_dec(argv[2])?;
    let (_, space) = m.io();
    inspect::edit_permissions(space, va, edit(perm))?;
    Ok(Status::Prompt)
}

fn change(argv: &[&str], m: &mut Monitor<'_>) -> Result<Status, MonitorError> {
    edit(argv, m, PermissionEdit::Replace)
}

fn set(argv: &[&str], m: &mut Monitor<'_>) -> Result<Status, MonitorError> {
    edit(argv, m, PermissionEdit::Set)
}

fn clear(argv: &[&str], m: &mut Monitor<'_>) -> Result<Status, MonitorError> {
    edit(argv, m, PermissionEdit::Clear)
}

fn dump(argv: &[&str], m: &mut Monitor<'_>) -> Result<Status, MonitorError> {
    expect_args(argv, 4)?;
    let (begin, end) = (parse_hex(argv[1])?, parse_hex(argv[2])?);
    let space_tag = Space::parse(argv[3])?;
    let range = space_tag.to_virtual(begin)?..space_tag.to_virtual(end)?;
    let (out, space) = m.io();
    inspect::dump(space, range, out)?;
    Ok(Status::Prompt)
}

fn backtrace(_argv: &[&str], m: &mut Monitor<'_>) -> Result<Status, MonitorError> {
    // Read here so the chain starts at a frame that is still live.
    let fp = match m.frame_pointer {
        Some(fp) => fp,
        #[cfg(target_arch = "x86_64")]
        None => abyss::x86_64::read_rbp(),
        #[cfg(not(target_arch = "x86_64"))]
        None => 0,
    };
    let symbols = m.symbols;
    let (out, space) = m.io();
    unwind::print_backtrace(space, fp, symbols, out)?;
    Ok(Status::Prompt)
}

fn cont(_argv: &[&str], m: &mut Monitor<'_>) -> Result<Status, MonitorError> {
    exec::cont(m.context.as_mut())
}

fn next(_argv: &[&str], m: &mut Monitor<'_>) -> Result<Status, MonitorError> {
    exec::next(m.context.as_mut())
}

fn step(_argv: &[&str], m: &mut Monitor<'_>) -> Result<Status, MonitorError> {
    exec::step(m.context.as_mut())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(parse_hex("0x400000"), Ok(0x40_0000));
        assert_eq!(parse_hex("0XfF"), Ok(0xff));
        assert_eq!(parse_hex("f0100000"), Ok(0xf010_0000));
        assert_eq!(parse_hex("0x"), Err(MonitorError::InvalidArgument));
        assert_eq!(parse_hex("+10"), Err(MonitorError::InvalidArgument));
        assert_eq!(parse_hex("0x1g"), Err(MonitorError::InvalidArgument));
        assert_eq!(parse_hex("1_0000_0000_0000_0000"), Err(MonitorError::InvalidArgument));
        assert_eq!(parse_hex("10000000000000000"), Err(MonitorError::InvalidArgument));
        assert_eq!(parse_dec("7"), Ok(7));
        assert_eq!(parse_dec("0x7"), Err(MonitorError::InvalidArgument));
        assert_eq!(parse_dec("-1"), Err(MonitorError::InvalidArgument));
    }

    #[test]
    fn lookup_is_exact() {
        assert_eq!(lookup("help").map(|c| c.name), Ok("help"));
        assert_eq!(lookup("bt").map(|c| c.name), Ok("bt"));
        assert!(matches!(lookup("Help"), Err(MonitorError::UnknownCommand)));
        assert!(matches!(lookup("he"), Err(MonitorError::UnknownCommand)));
        assert!(matches!(lookup(""), Err(MonitorError::UnknownCommand)));
    }

    #[test]
    fn footprint_rounds_up() {
        let layout = KernelLayout {
            start: Pa::new(0x10_0000).unwrap(),
            entry: Kva::new(0xffff_ff00_0010_0000).unwrap(),
            etext: Kva::new(0xffff_ff00_0010_8000).unwrap(),
            edata: Kva::new(0xffff_ff00_0011_0000).unwrap(),
            end: Kva::new(0xffff_ff00_0011_0001).unwrap(),
        };
        assert_eq!(layout.footprint_kb(), 65);
    }
}
