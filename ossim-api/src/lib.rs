//! ossim API - Core types and error handling for the ossim memory simulator
//!
//! This crate provides the types shared between the memory-management crate
//! and its callers (a scheduler, a loader, a trace driver): process ids,
//! address/page/frame aliases, the `MemoryRegion` interval type, and the
//! common error type with its `Result` alias.
//!
//! # Usage
//!
//! ```rust
//! use ossim_api::{MemoryRegion, Result};
//! use ossim_api::error::out_of_memory;
//!
//! fn reserve(budget: usize, need: usize) -> Result<MemoryRegion> {
//!     if need > budget {
//!         return Err(out_of_memory());
//!     }
//!     Ok(MemoryRegion::new(0, need))
//! }
//! ```

#![no_std]
#![warn(missing_docs)]

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{Error, PageFaultKind, Result};
pub use types::{Addr, FrameNum, MemoryRegion, PageNum, Pid, Size};
