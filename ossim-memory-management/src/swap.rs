//! Victim selection and page copies between physical devices
//!
//! Eviction policy is FIFO over residency: page numbers are enqueued when
//! they become resident and dequeued when selected, so a victim is never
//! offered twice. When the queue is empty the page table is scanned for the
//! lowest-numbered resident page instead.

extern crate alloc;

use alloc::collections::VecDeque;

use log::trace;
use ossim_api::error::no_victim;
use ossim_api::{FrameNum, PageNum, Result};

use crate::layout::{PAGE_SIZE, page_base};
use crate::memphy::PhysicalDevice;
use crate::page_table::PageTable;

/// FIFO queue of currently-resident page numbers
#[derive(Debug, Default)]
pub struct VictimQueue {
    queue: VecDeque<PageNum>,
}

impl VictimQueue {
    /// Creates an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `pgn` just became resident
    pub fn push_resident(&mut self, pgn: PageNum) {
        self.queue.push_back(pgn);
    }

    /// Drops `pgn` from the queue when it leaves residency out of band
    pub fn remove(&mut self, pgn: PageNum) {
        self.queue.retain(|&p| p != pgn);
    }

    /// Number of queued pages
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if no page is queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn pop_front(&mut self) -> Option<PageNum> {
        self.queue.pop_front()
    }
}

/// Selects and dequeues the page that has been resident longest
///
/// Selection removes the page from the queue; the caller is expected to
/// evict it. Queue entries whose page is no longer resident are skipped.
/// With an empty queue the page table is scanned for the lowest resident
/// page number; `NoVictimAvailable` if nothing is resident at all.
pub fn select_victim(queue: &mut VictimQueue, table: &PageTable) -> Result<PageNum> {
    while let Some(pgn) = queue.pop_front() {
        if table.entry(pgn).map(|pte| pte.is_resident()).unwrap_or(false) {
            trace!("swap: victim page {} (fifo)", pgn);
            return Ok(pgn);
        }
    }
    match table.lowest_resident() {
        Some(pgn) => {
            trace!("swap: victim page {} (table scan)", pgn);
            Ok(pgn)
        }
        None => Err(no_victim()),
    }
}

/// Copies exactly one page of content between two devices
///
/// All-or-nothing with respect to the source: the whole page is read into
/// a buffer before the first destination write, so a source failure aborts
/// without touching the destination. Callers only update page-table state
/// after this returns `Ok`.
pub fn copy_page(
    src: &PhysicalDevice,
    src_fpn: FrameNum,
    dst: &PhysicalDevice,
    dst_fpn: FrameNum,
) -> Result<()> {
    let src_base = page_base(src_fpn);
    let dst_base = page_base(dst_fpn);
    let mut buf = [0u8; PAGE_SIZE];
    for (i, slot) in buf.iter_mut().enumerate() {
        *slot = src.read(src_base + i)?;
    }
    for (i, &byte) in buf.iter().enumerate() {
        dst.write(dst_base + i, byte)?;
    }
    Ok(())
}
