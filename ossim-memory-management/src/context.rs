//! Per-process memory context
//!
//! A [`MemoryContext`] is the unit of isolation: one page table, a list of
//! virtual memory areas ordered by id, a handle to the RAM device shared by
//! every context, and the context's swap devices. The context layer is also
//! where eviction orchestration lives: the frame allocator below it fails
//! fast, and [`MemoryContext::reclaim_frames`] is the explicit retry hook
//! callers use before re-issuing an allocation.
//!
//! Contexts are never torn down and their memory is never reclaimed on
//! exit; [`MemoryContext::release`] exists so a reclamation policy can be
//! added later without changing callers.

extern crate alloc;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::Write as _;

use log::debug;
use ossim_api::error::{invalid_context, invalid_layout, out_of_range, unmapped, vma_not_found};
use ossim_api::{Addr, MemoryRegion, PageNum, Pid, Result, Size};

use crate::frame;
use crate::layout::{ADDRESS_SPACE, PAGE_SIZE, page_count, page_number, page_offset, page_round_up};
use crate::memphy::PhysicalDevice;
use crate::page_table::PageTable;
use crate::swap::{self, VictimQueue};
use crate::vma::VirtualMemoryArea;

/// Default segment id created with every context
pub const DEFAULT_VMA: u32 = 0;

/// Memory-management state of one simulated process
pub struct MemoryContext {
    pid: Pid,
    page_table: PageTable,
    vmas: Vec<VirtualMemoryArea>,
    mapped_regions: Vec<MemoryRegion>,
    ram: Arc<PhysicalDevice>,
    swap_devices: Vec<Arc<PhysicalDevice>>,
    active_swap: usize,
    victims: VictimQueue,
    /// Legacy bump pointer over the whole address space
    brk: Addr,
}

impl MemoryContext {
    /// Creates a context with one empty segment ([`DEFAULT_VMA`]) at 0
    ///
    /// `ram` is the device shared by all contexts; `swap_devices` are this
    /// context's eviction targets (the first is active). A context without
    /// swap devices works until the first `swap_out`.
    pub fn new(pid: Pid, ram: Arc<PhysicalDevice>, swap_devices: Vec<Arc<PhysicalDevice>>) -> Self {
        Self {
            pid,
            page_table: PageTable::new(),
            vmas: alloc::vec![VirtualMemoryArea::new(DEFAULT_VMA, 0)],
            mapped_regions: Vec::new(),
            ram,
            swap_devices,
            active_swap: 0,
            victims: VictimQueue::new(),
            brk: 0,
        }
    }

    /// Owning process id
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// The context's page table
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    /// The shared RAM device
    pub fn ram(&self) -> &Arc<PhysicalDevice> {
        &self.ram
    }

    /// Current legacy break pointer
    pub fn brk(&self) -> Addr {
        self.brk
    }

    /// Mapped regions recorded so far, in mapping order
    pub fn mapped_regions(&self) -> &[MemoryRegion] {
        &self.mapped_regions
    }

    /// Adds a segment with a fresh id anchored at `start`
    ///
    /// Ids must be strictly increasing; a duplicate or out-of-order id is a
    /// layout error, as is an anchor off a page boundary. A page-aligned
    /// anchor keeps `end` page-aligned, so growth always maps whole pages.
    /// The segment itself starts empty, so it cannot overlap anything until
    /// it grows.
    pub fn add_vma(&mut self, id: u32, start: Addr) -> Result<()> {
        if page_offset(start) != 0 {
            return Err(invalid_layout(start, start));
        }
        if self.vmas.last().is_some_and(|last| last.id() >= id) {
            return Err(invalid_layout(start, start));
        }
        self.vmas.push(VirtualMemoryArea::new(id, start));
        Ok(())
    }

    /// Looks up a segment by id (linear, ascending)
    pub fn get_vma(&self, id: u32) -> Result<&VirtualMemoryArea> {
        self.vmas
            .iter()
            .find(|vma| vma.id() == id)
            .ok_or_else(|| vma_not_found(id))
    }

    fn vma_index(&self, id: u32) -> Result<usize> {
        self.vmas
            .iter()
            .position(|vma| vma.id() == id)
            .ok_or_else(|| vma_not_found(id))
    }

    /// Translates a virtual address through this context's page table
    pub fn translate(&self, addr: Addr) -> Result<Addr> {
        self.page_table.translate(addr)
    }

    /// Reads one byte at a virtual address
    pub fn read_byte(&self, addr: Addr) -> Result<u8> {
        let paddr = self.translate(addr)?;
        self.ram.read(paddr)
    }

    /// Writes one byte at a virtual address and marks the page dirty
    ///
    /// Fails atomically: a translation fault writes nothing.
    pub fn write_byte(&mut self, addr: Addr, data: u8) -> Result<()> {
        let paddr = self.translate(addr)?;
        self.ram.write(paddr, data)?;
        self.page_table.mark_dirty(page_number(addr))
    }

    /// Grows segment `vma_id` by `size` bytes and returns the new region
    ///
    /// Sub-allocation from the segment's free-region list is tried first;
    /// otherwise the high-water mark is extended by the page-rounded size,
    /// backed by freshly reserved frames. All-or-nothing: on any failure
    /// the watermarks, page table, and region list are untouched.
    pub fn grow_segment(&mut self, vma_id: u32, size: Size) -> Result<MemoryRegion> {
        let idx = self.vma_index(vma_id)?;
        if size == 0 {
            return Ok(MemoryRegion::empty_at(self.vmas[idx].sbrk()));
        }
        if let Some(region) = self.vmas[idx].first_fit(size) {
            debug!("mm: pid {} vma {} sub-allocated {:?}", self.pid, vma_id, region);
            return Ok(region);
        }

        let (old_end, old_sbrk) = {
            let vma = &self.vmas[idx];
            (vma.end(), vma.sbrk())
        };
        let aligned = page_round_up(size);
        let mapped = MemoryRegion::new(old_end, old_end + aligned);
        if mapped.end > ADDRESS_SPACE {
            return Err(out_of_range(mapped.end));
        }
        // Pages already mapped through either allocator are off limits; the
        // growing segment's own regions all lie below its watermark.
        if self
            .vmas
            .iter()
            .any(|vma| vma.id() != vma_id && vma.range().overlaps(&mapped))
            || self.mapped_regions.iter().any(|rg| rg.overlaps(&mapped))
        {
            return Err(invalid_layout(mapped.start, mapped.end));
        }

        let frames = frame::allocate_frames(&self.ram, self.pid, page_count(size))?;
        let base_pgn = page_number(old_end);
        for (i, mapping) in frames.iter().enumerate() {
            // Increasing page order, matching frame reservation order.
            self.page_table.set_mapped(base_pgn + i, mapping.fpn)?;
            self.victims.push_resident(base_pgn + i);
        }
        self.mapped_regions.push(mapped);
        self.vmas[idx].advance(aligned, size);
        debug!(
            "mm: pid {} vma {} grew to end={:#x} sbrk={:#x}",
            self.pid,
            vma_id,
            self.vmas[idx].end(),
            self.vmas[idx].sbrk()
        );
        Ok(MemoryRegion::new(old_sbrk, old_sbrk + size))
    }

    /// Legacy coarse allocator: `count` whole pages at the break pointer
    ///
    /// Predates the segment allocator; kept for callers that address the
    /// whole space as one heap. The break never drops below a segment
    /// watermark or a mapped region, so the two allocators cannot hand out
    /// the same page. The page table is populated the same way
    /// `grow_segment` does, so translation and eviction treat both paths
    /// uniformly. Returns the virtual base of the new pages.
    pub fn alloc_pages(&mut self, count: usize) -> Result<Addr> {
        if count == 0 {
            return Ok(self.brk);
        }
        let bytes = count * PAGE_SIZE;
        let base = self
            .vmas
            .iter()
            .map(|vma| vma.end())
            .chain(self.mapped_regions.iter().map(|rg| rg.end))
            .fold(self.brk, Addr::max);
        if base + bytes > ADDRESS_SPACE {
            return Err(out_of_range(base + bytes));
        }
        let frames = frame::allocate_frames(&self.ram, self.pid, count)?;
        let base_pgn = page_number(base);
        for (i, mapping) in frames.iter().enumerate() {
            self.page_table.set_mapped(base_pgn + i, mapping.fpn)?;
            self.victims.push_resident(base_pgn + i);
        }
        self.mapped_regions.push(MemoryRegion::new(base, base + bytes));
        self.brk = base + bytes;
        debug!("mm: pid {} alloc_pages({}) at {:#x}", self.pid, count, base);
        Ok(base)
    }

    /// Releases previously allocated memory
    ///
    /// Intentionally a no-op: address-space reclamation is out of scope for
    /// the simulation. The entry point stays so a policy can land here
    /// without breaking callers.
    pub fn release(&mut self, _addr: Addr) -> Result<()> {
        Ok(())
    }

    /// Selects and dequeues the next eviction victim
    pub fn select_victim(&mut self) -> Result<PageNum> {
        swap::select_victim(&mut self.victims, &self.page_table)
    }

    /// Evicts `victim` to the active swap device
    ///
    /// Copies the frame content, rewrites the PTE to its swap location, and
    /// only then returns the RAM frame to the free pool. A copy failure
    /// leaves the PTE and the RAM frame untouched.
    pub fn swap_out(&mut self, victim: PageNum) -> Result<()> {
        let pte = self.page_table.entry(victim)?;
        let fpn = pte.frame_number().ok_or_else(|| unmapped(victim))?;
        let swap_dev = self
            .swap_devices
            .get(self.active_swap)
            .ok_or_else(|| invalid_context(self.pid))?
            .clone();

        let slot = match frame::allocate_frames(&swap_dev, self.pid, 1) {
            Ok(frames) => frames[0].fpn,
            Err(err) => return Err(err),
        };
        if let Err(err) = swap::copy_page(&self.ram, fpn, &swap_dev, slot) {
            frame::release_frames(&swap_dev, &[slot]);
            return Err(err);
        }

        self.page_table
            .set_swapped(victim, self.active_swap as u32, slot)?;
        self.victims.remove(victim);
        self.ram.put_free_frame(fpn)?;
        debug!(
            "mm: pid {} swapped out page {} to slot {} (freed frame {})",
            self.pid, victim, slot, fpn
        );
        Ok(())
    }

    /// Brings a swapped-out page back into RAM
    ///
    /// Mirror of [`swap_out`](Self::swap_out): reserves a RAM frame (not
    /// necessarily the original one), copies the content back, rewrites the
    /// PTE, and releases the swap slot. A no-op for pages already resident.
    pub fn swap_in(&mut self, pgn: PageNum) -> Result<()> {
        let pte = self.page_table.entry(pgn)?;
        if pte.is_resident() {
            return Ok(());
        }
        let (swap_type, slot) = pte.swap_location().ok_or_else(|| unmapped(pgn))?;
        let swap_dev = self
            .swap_devices
            .get(swap_type as usize)
            .ok_or_else(|| invalid_context(self.pid))?
            .clone();

        let frames = frame::allocate_frames(&self.ram, self.pid, 1)?;
        let fpn = frames[0].fpn;
        if let Err(err) = swap::copy_page(&swap_dev, slot, &self.ram, fpn) {
            frame::release_frames(&self.ram, &[fpn]);
            return Err(err);
        }

        self.page_table.set_mapped(pgn, fpn)?;
        self.victims.push_resident(pgn);
        swap_dev.put_free_frame(slot)?;
        debug!(
            "mm: pid {} swapped in page {} from slot {} into frame {}",
            self.pid, pgn, slot, fpn
        );
        Ok(())
    }

    /// Evicts `count` victims to replenish the RAM free pool
    ///
    /// The explicit retry hook for `OutOfMemory`: callers evict, then
    /// re-issue the failed allocation.
    pub fn reclaim_frames(&mut self, count: usize) -> Result<usize> {
        for _ in 0..count {
            let victim = self.select_victim()?;
            self.swap_out(victim)?;
        }
        Ok(count)
    }

    /// Human-readable listing of regions, page table, and RAM content
    ///
    /// Debugging aid only; never fails.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "pid {:02} brk {:#x}", self.pid, self.brk);
        for vma in &self.vmas {
            let _ = writeln!(
                out,
                "vma {:02}: {:05x}-{:05x} sbrk {:05x}",
                vma.id(),
                vma.start(),
                vma.end(),
                vma.sbrk()
            );
        }
        for region in &self.mapped_regions {
            let _ = writeln!(out, "region {:05x}-{:05x}", region.start, region.end);
        }
        out.push_str(&self.page_table.dump());
        out.push_str(&self.ram.dump());
        out
    }
}
