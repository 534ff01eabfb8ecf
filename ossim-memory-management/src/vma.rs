//! Virtual memory areas and free-sub-region accounting
//!
//! A [`VirtualMemoryArea`] is one contiguous logical segment of a process's
//! address space (heap-style). Sub-allocation inside the segment goes
//! through an ordered list of free regions (first-fit); growth past the
//! segment's high-water mark is handled by the owning context, which also
//! reserves the backing frames.
//!
//! The lists here are plain `Vec`s of `MemoryRegion` values rather than the
//! pointer-linked nodes of the modeled design; indices avoid the dangling
//! reference problems a hand-rolled list would bring.

extern crate alloc;

use alloc::vec::Vec;

use ossim_api::error::invalid_layout;
use ossim_api::{Addr, MemoryRegion, Result, Size};

/// One contiguous logical segment with its own free-sub-region list
#[derive(Debug, Clone)]
pub struct VirtualMemoryArea {
    id: u32,
    start: Addr,
    /// Page-granular high-water mark
    end: Addr,
    /// Byte-granular break: logical usage inside the segment
    sbrk: Addr,
    /// Non-overlapping free ranges inside `[start, end)`, ordered by start
    free_regions: Vec<MemoryRegion>,
}

impl VirtualMemoryArea {
    /// Creates an empty segment anchored at `start`
    pub fn new(id: u32, start: Addr) -> Self {
        Self {
            id,
            start,
            end: start,
            sbrk: start,
            free_regions: Vec::new(),
        }
    }

    /// Segment id
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Segment start address
    pub fn start(&self) -> Addr {
        self.start
    }

    /// Current page-granular high-water mark
    pub fn end(&self) -> Addr {
        self.end
    }

    /// Current byte-granular break
    pub fn sbrk(&self) -> Addr {
        self.sbrk
    }

    /// The segment's `[start, end)` extent
    pub fn range(&self) -> MemoryRegion {
        MemoryRegion::new(self.start, self.end)
    }

    /// Read-only view of the free-sub-region list
    pub fn free_regions(&self) -> &[MemoryRegion] {
        &self.free_regions
    }

    /// First-fit carve of `size` bytes from the free-sub-region list
    ///
    /// Walks the list in order and takes the first region large enough:
    /// an exact fit removes the node, a larger one is shrunk by advancing
    /// its start. Returns `None` when nothing fits; the caller then grows
    /// the watermark instead.
    pub fn first_fit(&mut self, size: Size) -> Option<MemoryRegion> {
        let pos = self
            .free_regions
            .iter()
            .position(|rg| rg.len() >= size)?;
        let node = self.free_regions[pos];
        let carved = MemoryRegion::new(node.start, node.start + size);
        if node.len() == size {
            self.free_regions.remove(pos);
        } else {
            self.free_regions[pos].start += size;
        }
        Some(carved)
    }

    /// Records a free sub-region inside the segment
    ///
    /// Hook for a future release policy; today only the initial carve-out
    /// and tests populate the list. The region must lie inside
    /// `[start, end)` and must not overlap an existing free region.
    pub fn insert_free_region(&mut self, region: MemoryRegion) -> Result<()> {
        if region.is_empty() {
            return Ok(());
        }
        let in_bounds = region.start >= self.start && region.end <= self.end;
        let disjoint = self.free_regions.iter().all(|rg| !rg.overlaps(&region));
        if !in_bounds || !disjoint {
            return Err(invalid_layout(region.start, region.end));
        }
        let pos = self
            .free_regions
            .iter()
            .position(|rg| rg.start > region.start)
            .unwrap_or(self.free_regions.len());
        self.free_regions.insert(pos, region);
        Ok(())
    }

    /// Advances the watermarks after a successful growth mapping
    ///
    /// `aligned` is the page-rounded growth, `raw` the requested byte count;
    /// the two differ when the request is not page-aligned.
    pub(crate) fn advance(&mut self, aligned: Size, raw: Size) {
        self.end += aligned;
        self.sbrk += raw;
    }
}
