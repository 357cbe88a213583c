//! Page-table entries and the address-space abstraction the monitor inspects.
//!
//! The monitor never allocates or removes mappings. It only needs to ask
//! whether an address is backed by a present leaf entry, read memory that was
//! confirmed present, and patch the flag bits of an existing entry. Those three
//! capabilities make up [`AddressSpace`]; [`page_table::PageTable`] provides
//! them for the hardware four-level page table, and tests provide them for
//! synthetic address spaces.
pub mod access;
pub mod page_table;

use crate::addressing::{PAGE_MASK, PAGE_SIZE, Pa, Va};

bitflags::bitflags! {
    /// Flags for pte.
    pub struct PteFlags: usize {
        /// Present; must be 1 to map a 4-KByte page.
        const P = 1 << 0;
        /// Read/write; if 0, writes may not be allowed to the page.
        const RW = 1 << 1;
        /// User/supervisor; if 0, user-mode accesses are not allowed to the page.
        const US = 1 << 2;
        /// Page-level write-through.
        const PWT = 1 << 3;
        /// Page-level cache disable.
        const PCD = 1 << 4;
        /// Accessed; software has accessed the page.
        const A = 1 << 5;
        /// Dirty; software has written to the page.
        const D = 1 << 6;
        /// Memory type of a 4-KByte page. Page size bit in a directory entry.
        const PAT = 1 << 7;
        /// Global; the translation survives a CR3 reload if CR4.PGE = 1.
        const G = 1 << 8;
        #[doc(hidden)] const _IGN_9 = 1 << 9;
        #[doc(hidden)] const _IGN_10 = 1 << 10;
        /// Restart for HLAT paging; ignored otherwise.
        const R = 1 << 11;
        /// Execute-disable, if IA32_EFER.NXE = 1.
        const XD = 1 << 63;
    }
}

/// Page size bit of a directory entry. It shares bit 7 with [`PteFlags::PAT`].
pub const PS: PteFlags = PteFlags::PAT;

/// Bits 12..=51 of an entry hold the physical frame.
const ADDRESS_MASK: usize = 0x000f_ffff_ffff_f000;

/// Page Table Entry.
///
/// The low 12 bits are flags, bits 12..=51 hold the physical base and the top
/// bit is execute-disable. The monitor treats entries as read-only except for
/// the explicit permission edit, which only ever rewrites the low 12 bits.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Pte(pub usize);

impl core::fmt::Debug for Pte {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(pa) = self.pa() {
            write!(f, "Pte({:016x}, {:?})", pa.into_usize(), self.flags())
        } else {
            write!(f, ".")
        }
    }
}

impl Pte {
    /// Get the physical address pointed to by this entry, or `None` if the
    /// entry is not present.
    #[inline]
    pub const fn pa(&self) -> Option<Pa> {
        self.frame(PAGE_SIZE)
    }

    /// Get the base of the `size`-byte page this entry maps, or `None` if the
    /// entry is not present.
    ///
    /// In a 2-MByte or 1-GByte entry, bit 12 selects the memory type and the
    /// bits below `size` are not part of the address.
    #[inline]
    pub const fn frame(&self, size: usize) -> Option<Pa> {
        if self.is_present() {
            Pa::new(self.0 & ADDRESS_MASK & !(size - 1))
        } else {
            None
        }
    }

    /// Get the flags associated with this page table entry.
    #[inline]
    pub const fn flags(&self) -> PteFlags {
        PteFlags::from_bits_truncate(self.0)
    }

    /// Whether the entry maps a page.
    #[inline]
    pub const fn is_present(&self) -> bool {
        self.0 & PteFlags::P.bits() != 0
    }

    /// The low 12 flag bits, as the permission-edit commands see them.
    #[inline]
    pub const fn permission_bits(&self) -> usize {
        self.0 & PAGE_MASK
    }
}

/// Page Table Mapping Error.
#[derive(Debug, PartialEq, Eq)]
pub enum PageTableMappingError {
    /// No present entry maps the address.
    NotExist,
}

/// An address space the monitor can inspect.
///
/// This is the address translator of the monitor: the kernel's own page table
/// or the page table of a suspended process. Lookups never create
/// intermediate tables.
pub trait AddressSpace {
    /// Finds the leaf entry that maps `va`.
    ///
    /// # Returns
    /// - `Ok(&Pte)` if every level down to the leaf is present.
    /// - `Err(PageTableMappingError::NotExist)` otherwise.
    fn walk(&self, va: Va) -> Result<&Pte, PageTableMappingError>;

    /// Finds the leaf entry that maps `va` and the size of the page it maps.
    ///
    /// Address spaces built from 4-KByte pages only can keep the default.
    fn walk_sized(&self, va: Va) -> Result<(&Pte, usize), PageTableMappingError> {
        self.walk(va).map(|pte| (pte, PAGE_SIZE))
    }

    /// Finds the leaf entry that maps `va` for modification.
    fn walk_mut(&mut self, va: Va) -> Result<&mut Pte, PageTableMappingError>;

    /// Copies `buf.len()` bytes starting at `va` into `buf`.
    ///
    /// # Safety
    /// Every page overlapping `va..va + buf.len()` must have been confirmed
    /// present through [`AddressSpace::walk`]. Use [`access`] instead of
    /// calling this directly.
    unsafe fn read_bytes(&self, va: Va, buf: &mut [u8]);

    /// Drops any cached translation of `va` after its entry changed.
    fn invalidate(&self, _va: Va) {}
}
