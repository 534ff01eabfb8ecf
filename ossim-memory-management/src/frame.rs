//! Frame allocation over a physical device's free pool
//!
//! Thin layer between a [`PhysicalDevice`] pool and the mapping code: it
//! turns raw frame numbers into owner-tagged [`FrameMapping`]s in the order
//! the pool produced them, so page-table population can walk request order.
//! Exclusivity comes from the pool itself, not the owner tag.

extern crate alloc;

use alloc::vec::Vec;

use log::{debug, trace};
use ossim_api::{FrameNum, Pid, Result};

use crate::memphy::PhysicalDevice;

/// One reserved frame, tagged with the context that requested it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMapping {
    /// The reserved frame number
    pub fpn: FrameNum,
    /// Requesting process (bookkeeping only)
    pub owner: Pid,
}

/// Reserves `count` frames from `device` for `owner`
///
/// All-or-nothing: fails with `OutOfMemory` and leaves the pool untouched
/// when fewer than `count` frames are free. Eviction and retry belong to
/// the caller, layered above this function.
pub fn allocate_frames(
    device: &PhysicalDevice,
    owner: Pid,
    count: usize,
) -> Result<Vec<FrameMapping>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let frames = device.take_frames(count, owner)?;
    debug!("frame: pid {} reserved {:?}", owner, frames);
    Ok(frames
        .into_iter()
        .map(|fpn| FrameMapping { fpn, owner })
        .collect())
}

/// Returns frames to the front of the device's free pool
pub fn release_frames(device: &PhysicalDevice, frames: &[FrameNum]) {
    trace!("frame: releasing {:?}", frames);
    device.give_frames(frames);
}
