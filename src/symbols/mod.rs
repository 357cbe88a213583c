//! Instruction address to source location.
//!
//! The backtrace annotates every return address with the file, line and
//! function it belongs to. Where that information comes from is up to the
//! embedding kernel: [`DwarfResolver`] reads it from the kernel's own ELF
//! image, [`NoSymbols`] leaves every frame unresolved.
#[cfg(feature = "dwarf")]
mod dwarf;

#[cfg(feature = "dwarf")]
pub use dwarf::DwarfResolver;

/// What is known about an instruction address.
///
/// Every field may be missing; the backtrace prints placeholders for the
/// missing ones.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct SymbolInfo<'a> {
    /// Source file.
    pub file: Option<&'a str>,
    /// Source line.
    pub line: Option<u32>,
    /// Name of the enclosing function.
    pub function: Option<&'a str>,
    /// Address of the first instruction of the enclosing function.
    pub function_start: Option<usize>,
}

/// Maps an instruction address to its [`SymbolInfo`].
pub trait SymbolResolver {
    /// Looks up `pc`.
    fn resolve(&self, pc: usize) -> Option<SymbolInfo<'_>>;
}

/// A resolver that knows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSymbols;

impl SymbolResolver for NoSymbols {
    fn resolve(&self, _pc: usize) -> Option<SymbolInfo<'_>> {
        None
    }
}
