//! Symbols from the kernel's ELF image.
use super::{SymbolInfo, SymbolResolver};
use abyss::{info, warning};
use addr2line::Context;
use alloc::{borrow::Cow, string::String, sync::Arc, vec::Vec};
use object::{Object, ObjectSection, ObjectSymbol, SymbolKind};

struct FunctionSymbol {
    start: usize,
    size: usize,
    name: String,
}

/// Resolves addresses with the DWARF line tables and the function symbols of
/// an ELF image.
pub struct DwarfResolver {
    context: Context<gimli::EndianArcSlice<gimli::LittleEndian>>,
    /// Sorted by start address.
    functions: Vec<FunctionSymbol>,
}

impl DwarfResolver {
    /// Parses `image`, usually the kernel binary read from the boot disk.
    ///
    /// Returns `None` if the image is not an ELF file or its debug sections
    /// cannot be parsed. An image without function symbols still resolves
    /// file and line.
    pub fn load(image: &[u8]) -> Option<Self> {
        let Ok(kernel) = object::File::parse(image) else {
            warning!("symbols: not an ELF image");
            return None;
        };
        let Ok(dwarf): Result<_, ()> = gimli::Dwarf::load(|id| {
            let data = kernel
                .section_by_name(id.name())
                .and_then(|section| section.uncompressed_data().ok())
                .unwrap_or(Cow::Borrowed(&[]));
            let data: Arc<[u8]> = Arc::from(data.as_ref());
            Ok(gimli::EndianArcSlice::new(data, gimli::LittleEndian))
        }) else {
            return None;
        };
        let Ok(context) = Context::from_dwarf(dwarf) else {
            warning!("symbols: malformed debug information");
            return None;
        };

        let mut functions: Vec<_> = kernel
            .symbols()
            .filter(|sym| sym.kind() == SymbolKind::Text && sym.address() != 0)
            .filter_map(|sym| {
                let name = sym.name().ok()?;
                Some(FunctionSymbol {
                    start: sym.address() as usize,
                    size: sym.size() as usize,
                    name: addr2line::demangle_auto(Cow::Borrowed(name), None).into_owned(),
                })
            })
            .collect();
        functions.sort_unstable_by_key(|f| f.start);
        info!("symbols: {} functions loaded", functions.len());
        Some(Self { context, functions })
    }

    fn function(&self, pc: usize) -> Option<&FunctionSymbol> {
        let idx = self.functions.partition_point(|f| f.start <= pc);
        let f = self.functions.get(idx.checked_sub(1)?)?;
        (f.size == 0 || pc < f.start + f.size).then_some(f)
    }
}

impl SymbolResolver for DwarfResolver {
    fn resolve(&self, pc: usize) -> Option<SymbolInfo<'_>> {
        let location = self.context.find_location(pc as u64).ok().flatten();
        let function = self.function(pc);
        if location.is_none() && function.is_none() {
            return None;
        }
        Some(SymbolInfo {
            file: location.as_ref().and_then(|l| l.file),
            line: location.as_ref().and_then(|l| l.line),
            function: function.map(|f| f.name.as_str()),
            function_start: function.map(|f| f.start),
        })
    }
}
