//! Memory-management simulation: paging, virtual memory areas, and swap
//!
//! Models the memory subsystem of a small operating system over byte-array
//! devices. The pieces compose bottom-up:
//!
//! - [`memphy`]: physical devices (RAM and swap) with a free-frame pool and
//!   per-frame owner accounting
//! - [`frame`]: owner-tagged frame reservation over a device pool
//! - [`pte`] / [`page_table`]: packed 32-bit entries and single-level
//!   address translation
//! - [`vma`]: logical segments with first-fit sub-allocation
//! - [`swap`]: FIFO victim selection and page copies between devices
//! - [`context`]: the per-process [`MemoryContext`] tying it all together
//!
//! Addresses are 22-bit, pages 256 bytes ([`layout`]). The crate is
//! `no_std` + `alloc`; device state is shared through `Arc` and guarded by
//! a single spin lock per device.
//!
//! ```
//! use std::sync::Arc;
//! use ossim_memory_management::{MemoryContext, PhysicalDevice, DEFAULT_VMA, PAGE_SIZE};
//!
//! # fn main() -> ossim_api::Result<()> {
//! let ram = Arc::new(PhysicalDevice::new(4 * PAGE_SIZE, true));
//! let swap = Arc::new(PhysicalDevice::new(16 * PAGE_SIZE, false));
//! let mut ctx = MemoryContext::new(1, ram, vec![swap]);
//!
//! let region = ctx.grow_segment(DEFAULT_VMA, 300)?;
//! ctx.write_byte(region.start, 42)?;
//! assert_eq!(ctx.read_byte(region.start)?, 42);
//! # Ok(())
//! # }
//! ```

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod context;
pub mod frame;
pub mod layout;
pub mod memphy;
pub mod page_table;
pub mod pte;
pub mod swap;
pub mod vma;

pub use context::{DEFAULT_VMA, MemoryContext};
pub use frame::FrameMapping;
pub use layout::{ADDRESS_SPACE, MAX_PAGE_NUM, PAGE_SHIFT, PAGE_SIZE};
pub use memphy::{FrameOwner, PhysicalDevice};
pub use page_table::PageTable;
pub use pte::Pte;
pub use swap::VictimQueue;
pub use vma::VirtualMemoryArea;

pub use ossim_api::{
    Addr, Error, FrameNum, MemoryRegion, PageFaultKind, PageNum, Pid, Result, Size,
};
