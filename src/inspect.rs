//! Memory inspection and permission edits.
//!
//! Every function here takes the address space to inspect explicitly. The
//! dispatcher passes the active one: the suspended process's page table when
//! a process is trapped, the kernel's otherwise.
//!
//! Reads go through [`access`], so a word whose page is absent is skipped
//! rather than touched. Only [`edit_permissions`] writes, and it only ever
//! rewrites the low 12 flag bits of an entry that already exists.
use crate::{
    MonitorError,
    addressing::{Kva, PAGE_MASK, PAGE_SIZE, Pa, Va},
    mm::{AddressSpace, PS, Pte, access},
};
use abyss::debug;
use core::{
    fmt::{self, Write},
    ops::Range,
};
use num_enum::TryFromPrimitive;

/// Address space tag of a `dump` range.
#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum Space {
    /// `V`: the range is given as virtual addresses.
    Virtual = 0x56,
    /// `P`: the range is given as physical addresses and is reached through
    /// the kernel direct map.
    Physical = 0x50,
}

impl Space {
    /// Parses the one-character space tag of a `dump` command.
    pub fn parse(tag: &str) -> Result<Self, MonitorError> {
        match tag.as_bytes() {
            [b] => Self::try_from(*b).map_err(|_| MonitorError::InvalidArgument),
            _ => Err(MonitorError::InvalidArgument),
        }
    }

    /// Maps an operator-supplied address in this space to the virtual
    /// address the monitor walks.
    ///
    /// Physical addresses are moved into the direct map by adding the kernel
    /// base to the parsed integer.
    pub fn to_virtual(self, addr: usize) -> Result<usize, MonitorError> {
        match self {
            Space::Virtual => Ok(addr),
            Space::Physical => Pa::new(addr)
                .and_then(Pa::checked_into_kva)
                .map(Kva::into_usize)
                .ok_or(MonitorError::InvalidArgument),
        }
    }
}

/// First address of the upper half of the canonical address space.
const UPPER_HALF: usize = 0xffff_8000_0000_0000;

/// Prints every present 32-bit word of `range` as `[0x<addr>]:0x<value>`.
///
/// The start is rounded up to a multiple of 4 and the end is exclusive.
/// Words whose page is not present produce no output. An aligned word never
/// crosses a page, so the rest of an absent page and the non-canonical hole
/// are skipped without being looked up.
///
/// # Returns
/// The number of words printed.
pub fn dump(space: &dyn AddressSpace, range: Range<usize>, out: &mut dyn Write) -> Result<usize, fmt::Error> {
    let Some(mut addr) = range.start.checked_next_multiple_of(4) else {
        return Ok(0);
    };
    let mut printed = 0;
    while addr < range.end {
        let next = match Va::new(addr) {
            Some(va) => match access::peek_u32(space, va) {
                Some(value) => {
                    writeln!(out, "[{:#x}]:{:#x}", addr, value)?;
                    printed += 1;
                    addr.checked_add(4)
                }
                None => (addr | PAGE_MASK).checked_add(1),
            },
            None => Some(UPPER_HALF),
        };
        addr = match next {
            Some(next) => next,
            None => break,
        };
    }
    Ok(printed)
}

/// Formats the three-character permission column of a mapping.
struct Permission(Pte);

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use crate::mm::PteFlags;
        let flags = self.0.flags();
        f.write_char(if flags.contains(PteFlags::US) { 'U' } else { '-' })?;
        f.write_char('R')?;
        f.write_char(if flags.contains(PteFlags::RW) { 'W' } else { '-' })
    }
}

/// Prints one line per present page overlapping `range`.
///
/// `range.start` is aligned down to its page. Each line reads
/// ` [0x<va>-0x<va_last>]: [0x<pa>-0x<pa_last>] <perm>`. Pages inside a
/// 2-MByte or 1-GByte mapping are listed one by one, at their offset from the
/// large page's frame.
///
/// # Returns
/// The number of mappings printed.
pub fn show_mappings(space: &dyn AddressSpace, range: Range<usize>, out: &mut dyn Write) -> Result<usize, fmt::Error> {
    let mut page = range.start & !PAGE_MASK;
    let mut printed = 0;
    while page < range.end {
        let entry = Va::new(page).and_then(|va| space.walk_sized(va).ok());
        if let Some((pte, size)) = entry.filter(|(pte, _)| pte.is_present()) {
            if let Some(base) = pte.frame(size) {
                let pa = base.into_usize() + (page & (size - 1));
                writeln!(
                    out,
                    " [{:#x}-{:#x}]: [{:#x}-{:#x}] {}",
                    page,
                    page + (PAGE_SIZE - 1),
                    pa,
                    pa + (PAGE_SIZE - 1),
                    Permission(*pte)
                )?;
                printed += 1;
            }
        }
        page = match page.checked_add(PAGE_SIZE) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(printed)
}

/// A change to the permission bits of a page-table entry.
///
/// The value is always masked to the low 12 bits, so an edit can never reach
/// the physical base or the execute-disable bit.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PermissionEdit {
    /// OR the value into the flag bits.
    Set(usize),
    /// Clear the bits of the value.
    Clear(usize),
    /// Replace all 12 flag bits with the value.
    Replace(usize),
}

impl PermissionEdit {
    /// Applies the edit to a raw entry.
    pub const fn apply(self, entry: usize) -> usize {
        match self {
            PermissionEdit::Set(v) => entry | (v & PAGE_MASK),
            PermissionEdit::Clear(v) => entry & !(v & PAGE_MASK),
            PermissionEdit::Replace(v) => (entry & !PAGE_MASK) | (v & PAGE_MASK),
        }
    }
}

/// Edits the permission bits of the entry mapping `va`.
///
/// The entry is rewritten in place and its cached translation is
/// invalidated afterwards. The page-size bit of a 2-MByte or 1-GByte entry
/// is kept whatever the edit says.
///
/// # Returns
/// The entry after the edit, or [`MonitorError::NotMapped`] if no present
/// entry maps `va`, in which case nothing is changed.
pub fn edit_permissions(space: &mut dyn AddressSpace, va: Va, edit: PermissionEdit) -> Result<Pte, MonitorError> {
    let keep = match space.walk_sized(va) {
        Ok((_, size)) if size > PAGE_SIZE => PS.bits(),
        _ => 0,
    };
    let pte = match space.walk_mut(va) {
        Ok(pte) if pte.is_present() => pte,
        _ => return Err(MonitorError::NotMapped(va)),
    };
    let before = *pte;
    pte.0 = (edit.apply(pte.0) & !keep) | (before.0 & keep);
    let after = *pte;
    space.invalidate(va);
    debug!("{:?} at {}: {:?} -> {:?}", edit, va, before, after);
    Ok(after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_touch_only_flag_bits() {
        let entry = 0x8000_0000_0012_3007;
        assert_eq!(PermissionEdit::Set(2).apply(entry), 0x8000_0000_0012_3007);
        assert_eq!(PermissionEdit::Clear(2).apply(entry), 0x8000_0000_0012_3005);
        assert_eq!(PermissionEdit::Replace(1).apply(entry), 0x8000_0000_0012_3001);
        assert_eq!(PermissionEdit::Set(0x1000).apply(entry), entry);
        assert_eq!(PermissionEdit::Clear(usize::MAX).apply(entry), 0x8000_0000_0012_3000);
    }

    #[test]
    fn space_tags() {
        assert_eq!(Space::parse("V"), Ok(Space::Virtual));
        assert_eq!(Space::parse("P"), Ok(Space::Physical));
        assert_eq!(Space::parse("v"), Err(MonitorError::InvalidArgument));
        assert_eq!(Space::parse("VP"), Err(MonitorError::InvalidArgument));
        assert_eq!(Space::parse(""), Err(MonitorError::InvalidArgument));
        assert_eq!(Space::Physical.to_virtual(0x1000), Ok(0xffff_ff00_0000_1000));
        assert_eq!(Space::Virtual.to_virtual(0x1000), Ok(0x1000));
        assert_eq!(Space::Physical.to_virtual(usize::MAX), Err(MonitorError::InvalidArgument));
    }
}
