//! The x86_64 four-level page table as an [`AddressSpace`].
//!
//! ```text
//! 63          48 47            39 38            30 29            21 20         12 11         0
//! +-------------+----------------+----------------+----------------+-------------+------------+
//! | Sign Extend |    Page-Map    | Page-Directory | Page-directory |  Page-Table |    Page    |
//! |             | Level-4 Offset |    Pointer     |     Offset     |   Offset    |   Offset   |
//! +-------------+----------------+----------------+----------------+-------------+------------+
//! ```
//!
//! Intermediate tables are reached through the kernel's direct map. The walk
//! stops early at 1-GByte and 2-MByte pages, whose directory entry then plays
//! the role of the leaf [`Pte`].
use super::{AddressSpace, PS, PageTableMappingError, Pte};
use crate::addressing::{Kva, Pa, Va};

/// Bytes mapped by one entry at each level, from PML4 down to PT.
const LEVEL_SIZE: [usize; 4] = [1 << 39, 1 << 30, 1 << 21, 1 << 12];

/// Page table indices for a given virtual address.
struct PtIndices([usize; 4]);

impl PtIndices {
    fn from_va(va: Va) -> Self {
        let va = va.into_usize();
        Self([
            (va >> 39) & 0x1ff,
            (va >> 30) & 0x1ff,
            (va >> 21) & 0x1ff,
            (va >> 12) & 0x1ff,
        ])
    }
}

/// A page table root.
#[repr(align(4096))]
#[derive(Debug)]
pub struct PageTableRoot(pub [Pte; 512]);

/// A hardware page table, borrowed for the lifetime of a monitor session.
pub struct PageTable<'a> {
    root: &'a mut PageTableRoot,
}

impl<'a> PageTable<'a> {
    /// Wraps the page table rooted at `root`.
    ///
    /// # Safety
    /// `root` and every table it references must be well-formed x86_64 page
    /// tables reachable through the kernel direct map.
    pub unsafe fn new(root: &'a mut PageTableRoot) -> Self {
        Self { root }
    }

    /// Wraps the page table currently loaded in CR3.
    ///
    /// # Safety
    /// Same as [`PageTable::new`]; additionally nothing else may modify the
    /// active page table while the returned value is alive.
    #[cfg(target_arch = "x86_64")]
    pub unsafe fn current() -> PageTable<'static> {
        let cr3: usize;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        let root = Pa::new(cr3 & !0xfff)
            .unwrap_or(Pa::ZERO)
            .into_kva()
            .into_usize() as *mut PageTableRoot;
        PageTable {
            root: unsafe { &mut *root },
        }
    }

    /// Finds the entry mapping `va` and the size of the page it maps.
    fn lookup(root: *mut Pte, va: Va) -> Result<(*mut Pte, usize), PageTableMappingError> {
        let indices = PtIndices::from_va(va);
        let mut table = root;
        for (level, index) in indices.0.into_iter().enumerate() {
            // Safety: `table` points at a 512-entry table and `index < 512`.
            let entry = unsafe { table.add(index) };
            let pte = unsafe { *entry };
            if !pte.is_present() {
                return Err(PageTableMappingError::NotExist);
            }
            if level == 3 || (level > 0 && pte.flags().contains(PS)) {
                return Ok((entry, LEVEL_SIZE[level]));
            }
            let next = pte.pa().ok_or(PageTableMappingError::NotExist)?;
            table = next.into_kva().into_usize() as *mut Pte;
        }
        Err(PageTableMappingError::NotExist)
    }

    /// Translates `va` to the kernel alias of its physical byte.
    fn translate(&self, va: Va) -> Option<Kva> {
        let (entry, size) = Self::lookup(self.root.0.as_ptr() as *mut Pte, va).ok()?;
        let base = unsafe { *entry }.frame(size)?.into_usize();
        let pa = Pa::new(base + (va.into_usize() & (size - 1)))?;
        pa.checked_into_kva()
    }
}

impl AddressSpace for PageTable<'_> {
    fn walk(&self, va: Va) -> Result<&Pte, PageTableMappingError> {
        self.walk_sized(va).map(|(pte, _)| pte)
    }

    fn walk_sized(&self, va: Va) -> Result<(&Pte, usize), PageTableMappingError> {
        let (entry, size) = Self::lookup(self.root.0.as_ptr() as *mut Pte, va)?;
        Ok((unsafe { &*entry }, size))
    }

    fn walk_mut(&mut self, va: Va) -> Result<&mut Pte, PageTableMappingError> {
        let (entry, _) = Self::lookup(self.root.0.as_mut_ptr(), va)?;
        Ok(unsafe { &mut *entry })
    }

    unsafe fn read_bytes(&self, va: Va, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            if let Some(kva) = va.checked_add(i).and_then(|va| self.translate(va)) {
                *byte = unsafe { core::ptr::read_volatile(kva.into_usize() as *const u8) };
            }
        }
    }

    fn invalidate(&self, va: Va) {
        #[cfg(target_arch = "x86_64")]
        unsafe {
            abyss::x86_64::invlpg(va.into_usize());
        }
        #[cfg(not(target_arch = "x86_64"))]
        let _ = va;
    }
}
