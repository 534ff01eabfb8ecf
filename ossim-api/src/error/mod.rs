//! Error handling module for the ossim simulator
//!
//! Every fallible operation in the memory subsystem returns [`Result`].
//! Failures carry structured payloads (page number, address, range) rather
//! than formatted strings so callers can branch on them.

use core::fmt;

use crate::types::{Addr, PageNum, Pid};

/// The two flavors of page fault a translation can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFaultKind {
    /// The page has never been mapped
    Unmapped,
    /// The page is mapped but its content lives on a swap device
    SwapFault,
}

/// Common error type used throughout the memory subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The process has no usable memory context (or it is misconfigured)
    InvalidContext(Pid),
    /// Address or page number exceeds the configured bounds
    OutOfRange(Addr),
    /// Translation hit a page that is unmapped or swapped out
    PageFault(PageFaultKind, PageNum),
    /// Frame or region allocation exhausted
    OutOfMemory,
    /// A grow request would overlap another virtual memory area
    InvalidLayout {
        /// Start of the offending range
        start: Addr,
        /// End of the offending range
        end: Addr,
    },
    /// The device free-frame pool is empty
    NoFreeFrame,
    /// No resident page exists to evict
    NoVictimAvailable,
    /// No virtual memory area carries the requested id
    VmaNotFound(u32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidContext(pid) => write!(f, "invalid memory context for pid {}", pid),
            Error::OutOfRange(addr) => write!(f, "address {:#x} out of range", addr),
            Error::PageFault(PageFaultKind::Unmapped, pgn) => {
                write!(f, "page fault: page {} unmapped", pgn)
            }
            Error::PageFault(PageFaultKind::SwapFault, pgn) => {
                write!(f, "page fault: page {} swapped out", pgn)
            }
            Error::OutOfMemory => write!(f, "out of memory"),
            Error::InvalidLayout { start, end } => {
                write!(f, "layout conflict: range {:#x}..{:#x} overlaps", start, end)
            }
            Error::NoFreeFrame => write!(f, "no free frame"),
            Error::NoVictimAvailable => write!(f, "no victim page available"),
            Error::VmaNotFound(id) => write!(f, "no virtual memory area with id {}", id),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type for operations that can fail
pub type Result<T> = core::result::Result<T, Error>;

/// Creates a new invalid context error
pub fn invalid_context(pid: Pid) -> Error {
    Error::InvalidContext(pid)
}

/// Creates a new out of range error
pub fn out_of_range(addr: Addr) -> Error {
    Error::OutOfRange(addr)
}

/// Creates a page fault for a page that was never mapped
pub fn unmapped(pgn: PageNum) -> Error {
    Error::PageFault(PageFaultKind::Unmapped, pgn)
}

/// Creates a page fault for a page whose content is on swap
pub fn swap_fault(pgn: PageNum) -> Error {
    Error::PageFault(PageFaultKind::SwapFault, pgn)
}

/// Creates a new out of memory error
pub fn out_of_memory() -> Error {
    Error::OutOfMemory
}

/// Creates a new layout conflict error
pub fn invalid_layout(start: Addr, end: Addr) -> Error {
    Error::InvalidLayout { start, end }
}

/// Creates a new empty-pool error
pub fn no_free_frame() -> Error {
    Error::NoFreeFrame
}

/// Creates a new no-victim error
pub fn no_victim() -> Error {
    Error::NoVictimAvailable
}

/// Creates a new missing-VMA error
pub fn vma_not_found(id: u32) -> Error {
    Error::VmaNotFound(id)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::string::ToString;

    #[test]
    fn test_error_display() {
        assert_eq!(out_of_memory().to_string(), "out of memory");
        assert_eq!(unmapped(7).to_string(), "page fault: page 7 unmapped");
        assert_eq!(swap_fault(7).to_string(), "page fault: page 7 swapped out");
        assert_eq!(out_of_range(0x400000).to_string(), "address 0x400000 out of range");
    }

    #[test]
    fn test_fault_kinds_distinct() {
        assert_ne!(unmapped(3), swap_fault(3));
        assert_eq!(unmapped(3), unmapped(3));
    }
}
