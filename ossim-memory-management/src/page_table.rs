//! Single-level page table and address translation

extern crate alloc;

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Write as _;

use log::warn;
use ossim_api::error::{out_of_range, swap_fault, unmapped};
use ossim_api::{Addr, FrameNum, PageNum, Result};

use crate::layout::{MAX_PAGE_NUM, page_base, page_number, page_offset};
use crate::pte::Pte;

/// Per-process array of packed page-table entries
///
/// Indexed directly by page number over the whole simulated address space;
/// there is no directory hierarchy (see [`directory_levels`]).
pub struct PageTable {
    entries: Vec<Pte>,
}

impl PageTable {
    /// Creates a table with every page unmapped
    pub fn new() -> Self {
        Self {
            entries: vec![Pte::empty(); MAX_PAGE_NUM],
        }
    }

    /// Number of entries (one past the largest valid page number)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `pgn`
    pub fn entry(&self, pgn: PageNum) -> Result<Pte> {
        self.entries
            .get(pgn)
            .copied()
            .ok_or_else(|| out_of_range(page_base(pgn)))
    }

    /// Overwrites the entry at `pgn`
    pub fn set_entry(&mut self, pgn: PageNum, pte: Pte) -> Result<()> {
        match self.entries.get_mut(pgn) {
            Some(slot) => {
                *slot = pte;
                Ok(())
            }
            None => Err(out_of_range(page_base(pgn))),
        }
    }

    /// Maps `pgn` as resident in frame `fpn`
    pub fn set_mapped(&mut self, pgn: PageNum, fpn: FrameNum) -> Result<()> {
        self.set_entry(pgn, Pte::mapped(fpn))
    }

    /// Marks `pgn` as evicted to `(swap_type, swap_offset)`
    pub fn set_swapped(&mut self, pgn: PageNum, swap_type: u32, swap_offset: usize) -> Result<()> {
        self.set_entry(pgn, Pte::swapped(swap_type, swap_offset))
    }

    /// Sets the dirty bit of a present entry
    pub fn mark_dirty(&mut self, pgn: PageNum) -> Result<()> {
        match self.entries.get_mut(pgn) {
            Some(slot) if slot.is_present() => {
                slot.set_dirty();
                Ok(())
            }
            Some(_) => Err(unmapped(pgn)),
            None => Err(out_of_range(page_base(pgn))),
        }
    }

    /// Translates a virtual address to a physical address
    ///
    /// Deterministic for a resident mapping: repeated calls return the same
    /// physical address until a swap or remap intervenes.
    pub fn translate(&self, addr: Addr) -> Result<Addr> {
        let pgn = page_number(addr);
        let pte = self.entry(pgn)?;
        match pte.frame_number() {
            Some(fpn) => Ok(page_base(fpn) + page_offset(addr)),
            None if pte.is_swapped() => Err(swap_fault(pgn)),
            None => Err(unmapped(pgn)),
        }
    }

    /// Lowest-numbered resident page, if any
    pub fn lowest_resident(&self) -> Option<PageNum> {
        self.entries.iter().position(|pte| pte.is_resident())
    }

    /// Number of resident pages
    pub fn resident_count(&self) -> usize {
        self.entries.iter().filter(|pte| pte.is_resident()).count()
    }

    /// Human-readable listing of all present entries (debugging aid)
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (pgn, pte) in self.entries.iter().enumerate() {
            if pte.is_present() {
                let _ = writeln!(out, "page {:05}: {:08x} {:?}", pgn, pte.raw(), pte);
            }
        }
        out
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Hierarchical directory decomposition of a page number
///
/// The original design reserved a five-level directory walk for a later
/// large-address-space mode. Single-level paging never uses it.
#[deprecated(note = "single-level paging only; the directory walk is a compatibility stub")]
pub fn directory_levels(_pgn: PageNum) -> Option<[usize; 5]> {
    warn!("page_table: hierarchical directory decomposition is deprecated");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PAGE_SIZE;

    #[test]
    fn test_translate_resident() {
        let mut table = PageTable::new();
        table.set_mapped(3, 9).unwrap();
        let vaddr = 3 * PAGE_SIZE + 0x21;
        let paddr = table.translate(vaddr).unwrap();
        assert_eq!(paddr, 9 * PAGE_SIZE + 0x21);
        // Idempotent until remapped.
        assert_eq!(table.translate(vaddr).unwrap(), paddr);
    }

    #[test]
    fn test_translate_unmapped() {
        let table = PageTable::new();
        assert_eq!(table.translate(0x100), Err(ossim_api::error::unmapped(1)));
    }

    #[test]
    fn test_translate_swapped() {
        let mut table = PageTable::new();
        table.set_swapped(2, 0, 5).unwrap();
        assert_eq!(
            table.translate(2 * PAGE_SIZE),
            Err(ossim_api::error::swap_fault(2))
        );
    }

    #[test]
    fn test_max_page_number_out_of_range() {
        let table = PageTable::new();
        let addr = MAX_PAGE_NUM * PAGE_SIZE;
        assert!(matches!(
            table.translate(addr),
            Err(ossim_api::Error::OutOfRange(_))
        ));
        assert!(table.entry(MAX_PAGE_NUM).is_err());
    }

    #[test]
    fn test_mark_dirty_requires_presence() {
        let mut table = PageTable::new();
        assert!(table.mark_dirty(0).is_err());
        table.set_mapped(0, 1).unwrap();
        table.mark_dirty(0).unwrap();
        assert!(table.entry(0).unwrap().is_dirty());
    }

    #[test]
    fn test_lowest_resident_skips_swapped() {
        let mut table = PageTable::new();
        table.set_swapped(1, 0, 0).unwrap();
        table.set_mapped(4, 2).unwrap();
        assert_eq!(table.lowest_resident(), Some(4));
        assert_eq!(table.resident_count(), 1);
    }

    #[test]
    #[allow(deprecated)]
    fn test_directory_stub() {
        assert_eq!(directory_levels(123), None);
    }
}
