mod common;

use common::{SymbolTable, SyntheticSpace};
use kmon::{
    ExecutionContext, Monitor, MonitorError, Rflags, Status, exec, mm::PteFlags, symbols::NoSymbols,
};

/// Run `line` against a suspended process whose saved flags are `rflags`.
///
/// Returns the status of the command, the saved flags afterwards and the
/// output.
fn check_with_context(line: &str, rflags: Rflags) -> (Status, Rflags, String) {
    let mut kernel = SyntheticSpace::new();
    let mut user = SyntheticSpace::new();
    let mut rflags = rflags;
    let mut out = String::new();
    let mut mon = Monitor::new(&mut out, &mut kernel, &NoSymbols)
        .with_context(ExecutionContext::new(&mut rflags, &mut user));
    let status = mon.run_command(line);
    drop(mon);
    (status, rflags, out)
}

/// Run `line` with no suspended process.
///
/// It ensures that:
/// - The command is refused with a non-terminating status.
/// - No process appears as a side effect.
fn check_without_context(line: &str) {
    let mut kernel = SyntheticSpace::new();
    let mut out = String::new();
    let mut mon = Monitor::new(&mut out, &mut kernel, &NoSymbols);
    assert_eq!(mon.run_command(line), Status::Prompt);
    assert!(mon.context().is_none());
    drop(mon);
    assert_eq!(out, format!("{}: no process running\n", line));
}

#[test]
fn refused_without_context() {
    check_without_context("c");
    check_without_context("n");
    check_without_context("s");
    assert_eq!(exec::cont(None), Err(MonitorError::NoActiveProcess));
    assert_eq!(exec::next(None), Err(MonitorError::NoActiveProcess));
    assert_eq!(exec::step(None), Err(MonitorError::NoActiveProcess));
}

#[test]
fn continue_clears_trap_flag() {
    let (status, rflags, out) = check_with_context("c", Rflags::TF | Rflags::IF | Rflags::ZF);
    assert_eq!(status, Status::Resume);
    assert_eq!(rflags, Rflags::IF | Rflags::ZF);
    assert_eq!(out, "");

    let (status, rflags, _) = check_with_context("c", Rflags::IF);
    assert_eq!(status, Status::Resume);
    assert_eq!(rflags, Rflags::IF);
}

#[test]
fn next_sets_trap_flag() {
    let (status, rflags, _) = check_with_context("n", Rflags::IF);
    assert_eq!(status, Status::Resume);
    assert_eq!(rflags, Rflags::IF | Rflags::TF);

    let (status, rflags, _) = check_with_context("n", Rflags::TF);
    assert_eq!(status, Status::Resume);
    assert_eq!(rflags, Rflags::TF);
}

#[test]
fn step_leaves_flags_alone() {
    for flags in [Rflags::IF, Rflags::IF | Rflags::TF] {
        let (status, rflags, _) = check_with_context("s", flags);
        assert_eq!(status, Status::Resume);
        assert_eq!(rflags, flags);
    }
}

#[test]
fn other_commands_keep_process_suspended() {
    let (status, rflags, _) = check_with_context("help", Rflags::IF | Rflags::TF);
    assert_eq!(status, Status::Prompt);
    assert_eq!(rflags, Rflags::IF | Rflags::TF);
}

#[test]
fn commands_inspect_process_space() {
    let mut kernel = SyntheticSpace::new();
    kernel
        .map(0x40_0000, 0x1_0000, PteFlags::RW)
        .write_u32(0x40_0000, 0x1111);
    let mut user = SyntheticSpace::new();
    user.map(0x40_0000, 0x2_0000, PteFlags::US)
        .write_u32(0x40_0000, 0x2222)
        .map(0x7fff_f000, 0x3_0000, PteFlags::US | PteFlags::RW)
        .write_word(0x7fff_f100, 0)
        .write_word(0x7fff_f108, 0x40_0010);
    let symbols = SymbolTable(vec![(0x40_0000, 0x40_0100, "user/main.rs", 3, "main")]);
    let mut rflags = Rflags::IF;
    let mut out = String::new();
    let mut mon = Monitor::new(&mut out, &mut kernel, &symbols)
        .with_frame_pointer(0x7fff_f100)
        .with_context(ExecutionContext::new(&mut rflags, &mut user));
    assert_eq!(mon.context().map(|c| c.rflags()), Some(Rflags::IF));
    for line in ["dump 400000 400004 V", "map 400000 401000", "set 400000 2", "bt"] {
        assert_eq!(mon.run_command(line), Status::Prompt);
    }
    drop(mon);
    assert_eq!(
        out.lines().collect::<Vec<_>>(),
        [
            "[0x400000]:0x2222",
            " [0x400000-0x400fff]: [0x20000-0x20fff] UR-",
            "Stack backtrace:",
            "  rbp 000000007ffff100  rip 0000000000400010  args 0000000000000000 0000000000000000 0000000000000000 0000000000000000 0000000000000000",
            "     user/main.rs:3: main+16",
        ]
    );
    assert_eq!(user.entry(0x40_0000).unwrap().permission_bits(), 0x7);
    assert_eq!(kernel.entry(0x40_0000).unwrap().permission_bits(), 0x3);
    assert!(kernel.reads.borrow().is_empty());
}

#[test]
fn status_convention() {
    assert_eq!(Status::Prompt.into_isize(), 0);
    assert_eq!(Status::Resume.into_isize(), -1);
}
