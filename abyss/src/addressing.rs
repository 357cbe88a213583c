//! Physical and virtual addressing.
//!
//! Kernel virtual memory directly maps physical memory: the first page above
//! [`KERNEL_BASE`] maps the first physical frame, the second page maps the
//! second frame, and so on. Physical memory is therefore only reachable
//! through this window, and converting between a [`Pa`] and a [`Kva`] is a
//! matter of adding or subtracting [`KERNEL_BASE`].
//!
//! [`Va`] is any canonical virtual address, user or kernel. The monitor takes
//! addresses from the operator, so every constructor validates its input and
//! returns `None` instead of producing an address the hardware would reject.

/// Base of the kernel's direct map of physical memory.
pub const KERNEL_BASE: usize = 0xffff_0000_0000_0000 | (510 << 39);

/// The size of a single page in memory, in bytes.
pub const PAGE_SIZE: usize = 0x1000;

/// A mask for extracting the offset within a page from a given address.
pub const PAGE_MASK: usize = 0xfff;

/// Represents a physical address.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub struct Pa(usize);

impl Pa {
    /// The physical address `0`.
    pub const ZERO: Self = Self(0);

    /// Creates a new physical address if it lies below the direct-map limit.
    #[inline]
    pub const fn new(addr: usize) -> Option<Self> {
        if addr < 0xffff_0000_0000_0000 {
            Some(Self(addr))
        } else {
            None
        }
    }

    /// Cast the physical address into a raw `usize`.
    #[inline]
    pub const fn into_usize(self) -> usize {
        self.0
    }

    /// Converts the physical address to its kernel direct-map alias.
    ///
    /// Physical addresses beyond the direct map wrap around; callers that
    /// take addresses from the operator use [`Pa::checked_into_kva`].
    #[inline]
    pub const fn into_kva(self) -> Kva {
        Kva(self.0.wrapping_add(KERNEL_BASE))
    }

    /// Converts the physical address to its kernel direct-map alias, or
    /// `None` if the alias would leave the address space.
    #[inline]
    pub const fn checked_into_kva(self) -> Option<Kva> {
        match self.0.checked_add(KERNEL_BASE) {
            Some(addr) => Some(Kva(addr)),
            None => None,
        }
    }
}

/// Represents a kernel virtual address.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub struct Kva(usize);

impl Kva {
    /// Creates a new kernel virtual address if `addr` lies in the upper half.
    #[inline(always)]
    pub const fn new(addr: usize) -> Option<Self> {
        match addr & 0xffff_8000_0000_0000 {
            0xffff_8000_0000_0000 => Some(Self(addr)),
            _ => None,
        }
    }

    /// Returns the raw `usize` representation of the virtual address.
    #[inline]
    pub const fn into_usize(self) -> usize {
        self.0
    }

    /// Converts a direct-map address back to the physical address.
    #[inline]
    pub const fn into_pa(self) -> Pa {
        Pa(self.0.wrapping_sub(KERNEL_BASE))
    }
}

/// Represents a canonical virtual address.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub struct Va(usize);

impl Va {
    /// Creates a new virtual address if `addr` is canonical.
    ///
    /// ```
    /// assert!(Va::new(0xffff_8000_1234_5678).is_some());
    /// assert!(Va::new(0xffff_7000_1234_5678).is_none());
    /// ```
    #[inline(always)]
    pub const fn new(addr: usize) -> Option<Self> {
        match addr & 0xffff_8000_0000_0000 {
            m if m == 0xffff_8000_0000_0000 || m == 0 => Some(Self(addr)),
            _ => None,
        }
    }

    /// Returns the raw `usize` representation of the virtual address.
    #[inline]
    pub const fn into_usize(self) -> usize {
        self.0
    }

    /// Aligns the virtual address down to the nearest page boundary.
    #[inline]
    pub const fn page_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Adds `bytes`, returning `None` if the result overflows or leaves the
    /// canonical range.
    #[inline]
    pub const fn checked_add(self, bytes: usize) -> Option<Self> {
        match self.0.checked_add(bytes) {
            Some(addr) => Self::new(addr),
            None => None,
        }
    }
}

macro_rules! impl_fmt {
    ($t: ty, $name: literal) => {
        impl core::fmt::Debug for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, concat!($name, "(0x{:x})"), self.0)
            }
        }
        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "0x{:x}", self.0)
            }
        }
    };
}

impl_fmt!(Kva, "Kva");
impl_fmt!(Va, "Va");
impl_fmt!(Pa, "Pa");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_map_round_trip() {
        let pa = Pa::new(0x1234_5000).unwrap();
        let kva = pa.into_kva();
        assert_eq!(kva.into_usize(), 0xffff_ff00_1234_5000);
        assert_eq!(kva.into_pa(), pa);
        assert!(Kva::new(kva.into_usize()).is_some());
    }

    #[test]
    fn canonical_checks() {
        assert!(Va::new(0x40_0000).is_some());
        assert!(Va::new(0x0000_8000_0000_0000).is_none());
        assert_eq!(Va::new(usize::MAX - 1).and_then(|va| va.checked_add(4)), None);
        assert_eq!(Va::new(0x1fff).unwrap().page_down(), Va::new(0x1000).unwrap());
    }
}
