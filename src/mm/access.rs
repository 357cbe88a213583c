//! Presence-checked memory reads.
//!
//! This is the only place the monitor reads debuggee memory. Each read first
//! confirms that every page it touches is mapped by a present entry of the
//! given [`AddressSpace`], and returns `None` instead of touching the memory
//! otherwise. A broken page table or a corrupt pointer therefore shows up as a
//! missing value, never as a fault inside the monitor.
use super::AddressSpace;
use crate::addressing::{PAGE_SIZE, Va};

/// Whether `va` is mapped by a present entry.
pub fn is_present(space: &dyn AddressSpace, va: Va) -> bool {
    space.walk(va).map(|pte| pte.is_present()).unwrap_or(false)
}

/// Whether every page overlapping `va..va + len` is present.
pub fn is_range_present(space: &dyn AddressSpace, va: Va, len: usize) -> bool {
    if len == 0 {
        return true;
    }
    let Some(last) = va.checked_add(len - 1) else {
        return false;
    };
    let mut page = va.page_down();
    loop {
        if !is_present(space, page) {
            return false;
        }
        if page == last.page_down() {
            return true;
        }
        page = match page.checked_add(PAGE_SIZE) {
            Some(next) => next,
            None => return false,
        };
    }
}

/// Reads `N` bytes at `va` if all of them are present.
pub fn peek_bytes<const N: usize>(space: &dyn AddressSpace, va: Va) -> Option<[u8; N]> {
    if !is_range_present(space, va, N) {
        return None;
    }
    let mut buf = [0u8; N];
    // Safety: every page of the range was just confirmed present.
    unsafe { space.read_bytes(va, &mut buf) };
    Some(buf)
}

/// Reads a little-endian `u32` at `va`.
pub fn peek_u32(space: &dyn AddressSpace, va: Va) -> Option<u32> {
    peek_bytes::<4>(space, va).map(u32::from_le_bytes)
}

/// Reads a machine word at `va`.
pub fn peek_word(space: &dyn AddressSpace, va: Va) -> Option<usize> {
    peek_bytes::<{ core::mem::size_of::<usize>() }>(space, va).map(usize::from_le_bytes)
}
