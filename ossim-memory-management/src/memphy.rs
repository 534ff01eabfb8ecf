//! Physical device simulation
//!
//! A [`PhysicalDevice`] models both RAM and swap backing store: a fixed-size
//! byte array carved into frames, a free-frame pool, and a per-frame owner
//! accounting table. One `spin::Mutex` guards all three so the free-count
//! check and the actual pops happen atomically; no two requesters are ever
//! handed the same frame.
//!
//! The pool hands frames out in ascending numeric order after a format and
//! reuses released frames LIFO, matching the free-list discipline of the
//! modeled hardware.

extern crate alloc;

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Write as _;

use log::debug;
use ossim_api::error::{no_free_frame, out_of_memory, out_of_range};
use ossim_api::{Addr, FrameNum, Pid, Result};
use spin::Mutex;

use crate::layout::{PAGE_SIZE, page_base};

/// Owner record of an assigned frame
///
/// Bookkeeping only: the pid is a lookup key for diagnostics and eviction
/// accounting, never a reference that keeps the owning context alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOwner {
    /// Process the frame is assigned to
    pub pid: Pid,
    /// Position of the frame within the request that took it
    pub index: usize,
    /// Next frame of the same request, if any
    pub next: Option<FrameNum>,
}

struct DeviceInner {
    storage: Vec<u8>,
    /// Free pool as a stack; the top entry is handed out next
    free_frames: Vec<FrameNum>,
    owners: Vec<Option<FrameOwner>>,
    cursor: usize,
}

/// A fixed-capacity physical storage device
pub struct PhysicalDevice {
    capacity: usize,
    random_access: bool,
    inner: Mutex<DeviceInner>,
}

impl PhysicalDevice {
    /// Creates and formats a device of `capacity` bytes
    ///
    /// `random_access` distinguishes RAM-like devices from serial ones; the
    /// sequential-cursor path works on either, the flag is advisory.
    pub fn new(capacity: usize, random_access: bool) -> Self {
        let device = Self {
            capacity,
            random_access,
            inner: Mutex::new(DeviceInner {
                storage: vec![0; capacity],
                free_frames: Vec::new(),
                owners: Vec::new(),
                cursor: 0,
            }),
        };
        device.format();
        device
    }

    /// Device capacity in bytes
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of frames the device is carved into
    pub const fn total_frames(&self) -> usize {
        self.capacity / PAGE_SIZE
    }

    /// True for RAM-like devices
    pub const fn is_random_access(&self) -> bool {
        self.random_access
    }

    /// Rebuilds the free-frame pool and zeroes the storage
    ///
    /// Frames are numbered `0..total_frames()` and handed out in ascending
    /// order until releases start interleaving.
    pub fn format(&self) {
        let total = self.total_frames();
        let mut inner = self.inner.lock();
        inner.storage.fill(0);
        inner.owners = vec![None; total];
        // Reverse so that popping the stack yields frame 0 first.
        inner.free_frames = (0..total).rev().collect();
        inner.cursor = 0;
        debug!("memphy: formatted {} frames of {} bytes", total, PAGE_SIZE);
    }

    /// Number of frames currently in the free pool
    pub fn free_frame_count(&self) -> usize {
        self.inner.lock().free_frames.len()
    }

    /// Pops one frame from the free pool
    pub fn get_free_frame(&self) -> Result<FrameNum> {
        self.inner
            .lock()
            .free_frames
            .pop()
            .ok_or_else(no_free_frame)
    }

    /// Pushes a frame back at the front of the free pool
    pub fn put_free_frame(&self, fpn: FrameNum) -> Result<()> {
        if fpn >= self.total_frames() {
            return Err(out_of_range(page_base(fpn)));
        }
        let mut inner = self.inner.lock();
        inner.owners[fpn] = None;
        inner.free_frames.push(fpn);
        Ok(())
    }

    /// Takes `count` frames in one atomic step, tagged with their owner
    ///
    /// Fails with `OutOfMemory` and takes nothing when the pool holds fewer
    /// than `count` frames. Taken frames are chained in the accounting table
    /// in request order.
    pub fn take_frames(&self, count: usize, owner: Pid) -> Result<Vec<FrameNum>> {
        let mut inner = self.inner.lock();
        if inner.free_frames.len() < count {
            return Err(out_of_memory());
        }
        let mut frames = Vec::with_capacity(count);
        for _ in 0..count {
            // Cannot fail: length was checked under this same lock.
            if let Some(fpn) = inner.free_frames.pop() {
                frames.push(fpn);
            }
        }
        for (index, &fpn) in frames.iter().enumerate() {
            inner.owners[fpn] = Some(FrameOwner {
                pid: owner,
                index,
                next: frames.get(index + 1).copied(),
            });
        }
        Ok(frames)
    }

    /// Returns frames to the front of the free pool (LIFO reuse order)
    pub fn give_frames(&self, frames: &[FrameNum]) {
        let mut inner = self.inner.lock();
        for &fpn in frames {
            if fpn < inner.owners.len() {
                inner.owners[fpn] = None;
                inner.free_frames.push(fpn);
            }
        }
    }

    /// Owner record of a frame, if assigned
    pub fn owner_of(&self, fpn: FrameNum) -> Option<FrameOwner> {
        self.inner.lock().owners.get(fpn).copied().flatten()
    }

    /// Random-access read of one byte
    pub fn read(&self, addr: Addr) -> Result<u8> {
        if addr >= self.capacity {
            return Err(out_of_range(addr));
        }
        Ok(self.inner.lock().storage[addr])
    }

    /// Random-access write of one byte
    pub fn write(&self, addr: Addr, data: u8) -> Result<()> {
        if addr >= self.capacity {
            return Err(out_of_range(addr));
        }
        self.inner.lock().storage[addr] = data;
        Ok(())
    }

    /// Positions the sequential cursor at `offset`, wrapping at capacity
    pub fn move_cursor(&self, offset: usize) -> Result<()> {
        if self.capacity == 0 {
            return Err(out_of_range(offset));
        }
        self.inner.lock().cursor = offset % self.capacity;
        Ok(())
    }

    /// Reads the byte under the cursor and advances it, wrapping at capacity
    pub fn sequential_read(&self) -> Result<u8> {
        if self.capacity == 0 {
            return Err(out_of_range(0));
        }
        let mut inner = self.inner.lock();
        let data = inner.storage[inner.cursor];
        inner.cursor = (inner.cursor + 1) % self.capacity;
        Ok(data)
    }

    /// Human-readable listing of assigned frames and their non-zero bytes
    ///
    /// Debugging aid only, not a stability contract.
    pub fn dump(&self) -> String {
        let inner = self.inner.lock();
        let mut out = String::new();
        for fpn in 0..self.total_frames() {
            let base = page_base(fpn);
            let bytes = &inner.storage[base..base + PAGE_SIZE];
            let owner = inner.owners[fpn];
            if owner.is_none() && bytes.iter().all(|&b| b == 0) {
                continue;
            }
            match owner {
                Some(o) => {
                    let _ = writeln!(
                        out,
                        "frame {:03}: {:05x}-{:05x} pid {:02} (idx {:03}, nxt {})",
                        fpn,
                        base,
                        base + PAGE_SIZE - 1,
                        o.pid,
                        o.index,
                        o.next.map_or(-1i64, |n| n as i64),
                    );
                }
                None => {
                    let _ = writeln!(
                        out,
                        "frame {:03}: {:05x}-{:05x} free",
                        fpn,
                        base,
                        base + PAGE_SIZE - 1
                    );
                }
            }
            for (off, &b) in bytes.iter().enumerate() {
                if b != 0 {
                    let _ = writeln!(out, "\t{:05x}: {:02x}", base + off, b);
                }
            }
        }
        out
    }
}
