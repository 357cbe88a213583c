//! Execution control over a suspended process.
//!
//! When a user process traps into the monitor, the trap handler lends the
//! monitor the saved `rflags` of the trap frame and the page table of the
//! process. Resuming with the trap flag (`TF`) set makes the CPU raise a
//! debug exception after the next instruction, which re-enters the monitor.
use crate::{AddressSpace, MonitorError, Rflags, Status};
use abyss::info;

/// The suspended execution the monitor controls.
///
/// Both fields are borrowed from the trap subsystem and only live as long as
/// the monitor session.
pub struct ExecutionContext<'a> {
    rflags: &'a mut Rflags,
    pub(crate) space: &'a mut dyn AddressSpace,
}

impl<'a> ExecutionContext<'a> {
    /// Borrows the saved flags register and the address space of a
    /// suspended process.
    pub fn new(rflags: &'a mut Rflags, space: &'a mut dyn AddressSpace) -> Self {
        Self { rflags, space }
    }

    /// The saved flags register.
    pub fn rflags(&self) -> Rflags {
        *self.rflags
    }
}

/// Resumes the suspended process with single-stepping turned off.
pub fn cont(context: Option<&mut ExecutionContext<'_>>) -> Result<Status, MonitorError> {
    let context = context.ok_or(MonitorError::NoActiveProcess)?;
    context.rflags.remove(Rflags::TF);
    info!("monitor: continuing");
    Ok(Status::Resume)
}

/// Resumes the suspended process for exactly one instruction.
pub fn next(context: Option<&mut ExecutionContext<'_>>) -> Result<Status, MonitorError> {
    let context = context.ok_or(MonitorError::NoActiveProcess)?;
    context.rflags.insert(Rflags::TF);
    info!("monitor: stepping one instruction");
    Ok(Status::Resume)
}

/// Resumes the suspended process, leaving the trap flag as it is.
// TODO: step over whole source lines with the line table of the symbol
// resolver instead of resuming unchanged.
pub fn step(context: Option<&mut ExecutionContext<'_>>) -> Result<Status, MonitorError> {
    context.ok_or(MonitorError::NoActiveProcess)?;
    Ok(Status::Resume)
}
