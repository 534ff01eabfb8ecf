//! End-to-end tests over shared devices and multiple contexts

use std::sync::Arc;
use std::thread;

use ossim_memory_management::{
    DEFAULT_VMA, Error, MemoryContext, MemoryRegion, PAGE_SIZE, PageFaultKind, PhysicalDevice,
};

fn ram(frames: usize) -> Arc<PhysicalDevice> {
    Arc::new(PhysicalDevice::new(frames * PAGE_SIZE, true))
}

fn swap(frames: usize) -> Arc<PhysicalDevice> {
    Arc::new(PhysicalDevice::new(frames * PAGE_SIZE, false))
}

#[test]
fn eviction_frees_frames_for_another_context() {
    let ram = ram(4);
    let swap = swap(8);
    let mut a = MemoryContext::new(1, ram.clone(), vec![swap.clone()]);
    let mut b = MemoryContext::new(2, ram.clone(), vec![swap.clone()]);

    a.grow_segment(DEFAULT_VMA, 4 * PAGE_SIZE).unwrap();
    assert_eq!(ram.free_frame_count(), 0);

    // RAM is exhausted; the allocator fails fast.
    assert_eq!(b.grow_segment(DEFAULT_VMA, PAGE_SIZE), Err(Error::OutOfMemory));

    // Explicit reclaim on the hoarding context, then retry.
    assert_eq!(a.reclaim_frames(1).unwrap(), 1);
    assert_eq!(ram.free_frame_count(), 1);
    b.grow_segment(DEFAULT_VMA, PAGE_SIZE).unwrap();

    // A's oldest page went out, the rest stayed resident.
    assert!(a.page_table().entry(0).unwrap().is_swapped());
    assert_eq!(a.page_table().resident_count(), 3);
    assert_eq!(b.page_table().resident_count(), 1);
}

#[test]
fn evicted_page_round_trips_byte_identical() {
    let mut ctx = MemoryContext::new(7, ram(2), vec![swap(4)]);
    ctx.grow_segment(DEFAULT_VMA, 2 * PAGE_SIZE).unwrap();
    for i in 0..2 * PAGE_SIZE {
        ctx.write_byte(i, (i * 7 % 251) as u8).unwrap();
    }

    ctx.reclaim_frames(2).unwrap();
    assert_eq!(ctx.ram().free_frame_count(), 2);
    assert_eq!(
        ctx.read_byte(0),
        Err(Error::PageFault(PageFaultKind::SwapFault, 0))
    );

    ctx.swap_in(0).unwrap();
    ctx.swap_in(1).unwrap();
    for i in 0..2 * PAGE_SIZE {
        assert_eq!(ctx.read_byte(i).unwrap(), (i * 7 % 251) as u8);
    }
    let pte = ctx.page_table().entry(0).unwrap();
    assert!(pte.is_present());
    assert!(!pte.is_swapped());
}

#[test]
fn fifo_eviction_order_follows_residency_order() {
    let mut ctx = MemoryContext::new(4, ram(3), vec![swap(8)]);
    ctx.grow_segment(DEFAULT_VMA, 3 * PAGE_SIZE).unwrap();

    ctx.reclaim_frames(1).unwrap();
    assert!(ctx.page_table().entry(0).unwrap().is_swapped());

    // A page brought back in re-enters at the tail of the queue.
    ctx.swap_in(0).unwrap();
    ctx.reclaim_frames(1).unwrap();
    assert!(ctx.page_table().entry(1).unwrap().is_swapped());
    assert!(ctx.page_table().entry(0).unwrap().is_resident());
}

#[test]
fn failed_growth_changes_nothing() {
    let mut ctx = MemoryContext::new(5, ram(2), vec![swap(1)]);
    ctx.grow_segment(DEFAULT_VMA, PAGE_SIZE).unwrap();
    let end_before = ctx.get_vma(DEFAULT_VMA).unwrap().end();
    let regions_before = ctx.mapped_regions().len();

    assert_eq!(
        ctx.grow_segment(DEFAULT_VMA, 4 * PAGE_SIZE),
        Err(Error::OutOfMemory)
    );
    let vma = ctx.get_vma(DEFAULT_VMA).unwrap();
    assert_eq!(vma.end(), end_before);
    assert_eq!(ctx.mapped_regions().len(), regions_before);
    assert_eq!(ctx.ram().free_frame_count(), 1);
}

#[test]
fn zero_byte_requests_allocate_nothing() {
    let mut ctx = MemoryContext::new(6, ram(1), vec![swap(1)]);
    let region = ctx.grow_segment(DEFAULT_VMA, 0).unwrap();
    assert!(region.is_empty());
    assert_eq!(ctx.alloc_pages(0).unwrap(), 0);
    assert_eq!(ctx.ram().free_frame_count(), 1);
    assert!(ctx.mapped_regions().is_empty());
}

#[test]
fn growth_past_the_address_space_is_rejected() {
    // One frame of RAM but a request past the 22-bit bus.
    let mut ctx = MemoryContext::new(8, ram(1), vec![swap(1)]);
    let too_big = ossim_memory_management::ADDRESS_SPACE + PAGE_SIZE;
    assert!(matches!(
        ctx.grow_segment(DEFAULT_VMA, too_big),
        Err(Error::OutOfRange(_))
    ));
}

#[test]
fn concurrent_contexts_never_share_a_frame() {
    let ram = ram(64);
    let mut handles = Vec::new();
    for pid in 0..8u32 {
        let ram = ram.clone();
        handles.push(thread::spawn(move || {
            let mut ctx = MemoryContext::new(pid, ram, vec![swap(4)]);
            ctx.grow_segment(DEFAULT_VMA, 8 * PAGE_SIZE).unwrap();
            // Frame numbers this context got to use.
            (0..8)
                .map(|pgn| ctx.page_table().entry(pgn).unwrap().frame_number().unwrap())
                .collect::<Vec<_>>()
        }));
    }

    let mut seen = Vec::new();
    for handle in handles {
        seen.extend(handle.join().unwrap());
    }
    seen.sort_unstable();
    let before = seen.len();
    seen.dedup();
    assert_eq!(seen.len(), before);
    assert_eq!(before, 64);
    assert_eq!(ram.free_frame_count(), 0);
}

#[test]
fn sub_allocation_reuses_freed_ranges() {
    let mut ctx = MemoryContext::new(9, ram(4), vec![swap(1)]);
    ctx.grow_segment(DEFAULT_VMA, 2 * PAGE_SIZE).unwrap();
    let free_before = ctx.ram().free_frame_count();

    // Hand a hole back to the segment, then allocate out of it.
    let mut vma = ctx.get_vma(DEFAULT_VMA).unwrap().clone();
    vma.insert_free_region(MemoryRegion::new(0x80, 0x100)).unwrap();
    assert_eq!(
        vma.first_fit(0x40).unwrap(),
        MemoryRegion::new(0x80, 0xc0)
    );

    // Sub-allocation consumes no frames.
    assert_eq!(ctx.ram().free_frame_count(), free_before);
}

#[test]
fn mixed_allocators_preserve_each_others_data() {
    let mut ctx = MemoryContext::new(11, ram(4), vec![swap(2)]);
    ctx.grow_segment(DEFAULT_VMA, PAGE_SIZE).unwrap();
    ctx.write_byte(0, 0xaa).unwrap();

    let base = ctx.alloc_pages(1).unwrap();
    assert_eq!(base, PAGE_SIZE);
    ctx.write_byte(base, 0xbb).unwrap();

    // Neither allocator disturbed the other's mapping.
    assert_eq!(ctx.read_byte(0).unwrap(), 0xaa);
    assert_eq!(ctx.read_byte(base).unwrap(), 0xbb);
    assert_eq!(ctx.page_table().resident_count(), 2);
}

#[test]
fn legacy_page_allocator_translates_and_dumps() {
    let mut ctx = MemoryContext::new(10, ram(4), vec![swap(1)]);
    let base = ctx.alloc_pages(2).unwrap();
    ctx.write_byte(base + 1, 0xab).unwrap();

    let paddr = ctx.translate(base + 1).unwrap();
    assert_eq!(ctx.ram().read(paddr).unwrap(), 0xab);

    let dump = ctx.dump();
    assert!(dump.contains("ab"));
    assert!(dump.contains("pid 10"));
}
