//! Fixtures shared by the integration suites.
#![allow(dead_code)]

use kmon::{
    AddressSpace, MonitorError,
    addressing::{PAGE_MASK, PAGE_SIZE, Va},
    mm::{PageTableMappingError, Pte, PteFlags},
    symbols::{SymbolInfo, SymbolResolver},
    teletype::{LineReader, Teletype},
};
use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, VecDeque},
};

struct Page {
    pte: Pte,
    data: Box<[u8; PAGE_SIZE]>,
}

/// Bytes mapped by one directory entry with the page-size bit set.
pub const LARGE_PAGE_SIZE: usize = 0x20_0000;

/// An address space made of individually mapped 4-KByte pages and optional
/// 2-MByte pages.
///
/// Reading a byte whose page is absent panics, so a test fails as soon as
/// the monitor dereferences memory it did not validate first. Large pages
/// read as zeros.
#[derive(Default)]
pub struct SyntheticSpace {
    pages: BTreeMap<usize, Page>,
    large: BTreeMap<usize, Pte>,
    /// Number of entry lookups.
    pub walks: Cell<usize>,
    /// Start address and length of every read.
    pub reads: RefCell<Vec<(usize, usize)>>,
    /// Every address whose translation was invalidated.
    pub invalidated: RefCell<Vec<Va>>,
}

impl SyntheticSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps the page containing `va` to the frame at `pa` with `flags`.
    pub fn map(&mut self, va: usize, pa: usize, flags: PteFlags) -> &mut Self {
        assert_eq!(pa & PAGE_MASK, 0);
        self.pages.insert(
            va & !PAGE_MASK,
            Page {
                pte: Pte(pa | (flags | PteFlags::P).bits()),
                data: Box::new([0; PAGE_SIZE]),
            },
        );
        self
    }

    /// Maps the 2-MByte page containing `va` to the frame at `pa` with one
    /// directory entry, the way the hardware walker reports it.
    pub fn map_large(&mut self, va: usize, pa: usize, flags: PteFlags) -> &mut Self {
        assert_eq!(pa & (LARGE_PAGE_SIZE - 1), 0);
        self.large.insert(
            va & !(LARGE_PAGE_SIZE - 1),
            Pte(pa | (flags | PteFlags::P | PteFlags::PAT).bits()),
        );
        self
    }

    /// Installs an entry for the page containing `va` whose present bit is
    /// clear.
    pub fn map_absent(&mut self, va: usize) -> &mut Self {
        self.pages.insert(
            va & !PAGE_MASK,
            Page {
                pte: Pte(0x0bad_0000 | PteFlags::RW.bits()),
                data: Box::new([0; PAGE_SIZE]),
            },
        );
        self
    }

    pub fn write_bytes(&mut self, va: usize, bytes: &[u8]) -> &mut Self {
        for (i, b) in bytes.iter().enumerate() {
            let addr = va + i;
            let page = self
                .pages
                .get_mut(&(addr & !PAGE_MASK))
                .expect("write to a page that was never mapped");
            page.data[addr & PAGE_MASK] = *b;
        }
        self
    }

    pub fn write_u32(&mut self, va: usize, value: u32) -> &mut Self {
        self.write_bytes(va, &value.to_le_bytes())
    }

    pub fn write_word(&mut self, va: usize, value: usize) -> &mut Self {
        self.write_bytes(va, &value.to_le_bytes())
    }

    /// The raw entry of the page containing `va`.
    pub fn entry(&self, va: usize) -> Option<Pte> {
        self.pages
            .get(&(va & !PAGE_MASK))
            .map(|p| p.pte)
            .or_else(|| self.large.get(&(va & !(LARGE_PAGE_SIZE - 1))).copied())
    }

    /// Whether any read touched `va`.
    pub fn was_read(&self, va: usize) -> bool {
        self.reads
            .borrow()
            .iter()
            .any(|&(start, len)| start <= va && va < start + len)
    }
}

impl AddressSpace for SyntheticSpace {
    fn walk(&self, va: Va) -> Result<&Pte, PageTableMappingError> {
        self.walk_sized(va).map(|(pte, _)| pte)
    }

    fn walk_sized(&self, va: Va) -> Result<(&Pte, usize), PageTableMappingError> {
        self.walks.set(self.walks.get() + 1);
        let va = va.into_usize();
        if let Some(page) = self.pages.get(&(va & !PAGE_MASK)) {
            return Ok((&page.pte, PAGE_SIZE));
        }
        self.large
            .get(&(va & !(LARGE_PAGE_SIZE - 1)))
            .map(|pte| (pte, LARGE_PAGE_SIZE))
            .ok_or(PageTableMappingError::NotExist)
    }

    fn walk_mut(&mut self, va: Va) -> Result<&mut Pte, PageTableMappingError> {
        let va = va.into_usize();
        if let Some(page) = self.pages.get_mut(&(va & !PAGE_MASK)) {
            return Ok(&mut page.pte);
        }
        self.large
            .get_mut(&(va & !(LARGE_PAGE_SIZE - 1)))
            .ok_or(PageTableMappingError::NotExist)
    }

    unsafe fn read_bytes(&self, va: Va, buf: &mut [u8]) {
        let start = va.into_usize();
        self.reads.borrow_mut().push((start, buf.len()));
        for (i, b) in buf.iter_mut().enumerate() {
            let addr = start + i;
            match self.pages.get(&(addr & !PAGE_MASK)) {
                Some(page) if page.pte.is_present() => *b = page.data[addr & PAGE_MASK],
                None if self.entry(addr).is_some_and(|pte| pte.is_present()) => *b = 0,
                _ => panic!("read of unmapped memory at {addr:#x}"),
            }
        }
    }

    fn invalidate(&self, va: Va) {
        self.invalidated.borrow_mut().push(va);
    }
}

/// Feeds the monitor a fixed list of lines.
///
/// Running out of lines panics instead of blocking forever.
pub struct Script {
    lines: VecDeque<Option<String>>,
    current: String,
    pub prompts: usize,
}

impl Script {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| Some(l.to_string())).collect(),
            current: String::new(),
            prompts: 0,
        }
    }

    /// Inserts an end-of-input event before the remaining lines.
    pub fn with_eof_first(mut self) -> Self {
        self.lines.push_front(None);
        self
    }
}

impl LineReader for Script {
    fn read_line(&mut self, _prompt: &str) -> Option<&str> {
        self.prompts += 1;
        match self.lines.pop_front().expect("script exhausted") {
            Some(line) => {
                self.current = line;
                Some(self.current.as_str())
            }
            None => None,
        }
    }
}

/// A byte device with canned input that records everything written to it.
#[derive(Default)]
pub struct FakeTty {
    pub input: VecDeque<Result<u8, MonitorError>>,
    pub output: Vec<u8>,
}

impl FakeTty {
    pub fn typing(s: &[u8]) -> Self {
        Self {
            input: s.iter().map(|b| Ok(*b)).collect(),
            output: Vec::new(),
        }
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Teletype for &mut FakeTty {
    fn write(&mut self, data: &[u8]) -> Result<usize, MonitorError> {
        self.output.extend_from_slice(data);
        Ok(data.len())
    }

    fn read(&mut self, data: &mut [u8]) -> Result<usize, MonitorError> {
        match self.input.pop_front() {
            None => Ok(0),
            Some(Err(e)) => Err(e),
            Some(Ok(b)) => {
                data[0] = b;
                Ok(1)
            }
        }
    }
}

/// Resolves addresses against a fixed list of functions.
pub struct SymbolTable(pub Vec<(usize, usize, &'static str, u32, &'static str)>);

impl SymbolResolver for SymbolTable {
    fn resolve(&self, pc: usize) -> Option<SymbolInfo<'_>> {
        self.0
            .iter()
            .find(|&&(start, end, ..)| start <= pc && pc < end)
            .map(|&(start, _, file, line, function)| SymbolInfo {
                file: Some(file),
                line: Some(line),
                function: Some(function),
                function_start: Some(start),
            })
    }
}

/// Runs `lines` through a monitor over `kernel` with no process attached and
/// returns everything it printed.
pub fn run_lines(kernel: &mut SyntheticSpace, lines: &[&str]) -> String {
    let mut out = String::new();
    let symbols = kmon::symbols::NoSymbols;
    let mut mon = kmon::Monitor::new(&mut out, kernel, &symbols).with_frame_pointer(0);
    for line in lines {
        mon.run_command(line);
    }
    drop(mon);
    out
}
