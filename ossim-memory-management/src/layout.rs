//! Simulated address-space layout
//!
//! The simulator models a 22-bit address bus with 256-byte pages, the
//! geometry of the original machine. All address decomposition goes through
//! the helpers here; nothing else in the crate hardcodes the page size.

use ossim_api::{Addr, PageNum, Size};
use static_assertions::{const_assert, const_assert_eq};

/// Page shift (log2 of PAGE_SIZE)
pub const PAGE_SHIFT: usize = 8;
/// Page size (256 bytes)
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
/// Width of the simulated address bus in bits
pub const BUS_WIDTH: usize = 22;
/// Size of the simulated virtual address space
pub const ADDRESS_SPACE: usize = 1 << BUS_WIDTH;
/// One past the largest valid page number
pub const MAX_PAGE_NUM: usize = ADDRESS_SPACE >> PAGE_SHIFT;

const_assert!(PAGE_SIZE.is_power_of_two());
const_assert_eq!(MAX_PAGE_NUM * PAGE_SIZE, ADDRESS_SPACE);

/// Align address down to page boundary
#[inline]
pub const fn page_round_down(addr: Addr) -> Addr {
    addr & !(PAGE_SIZE - 1)
}

/// Align address up to page boundary
#[inline]
pub const fn page_round_up(addr: Addr) -> Addr {
    (addr + PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

/// Page number of an address
#[inline]
pub const fn page_number(addr: Addr) -> PageNum {
    addr >> PAGE_SHIFT
}

/// Offset of an address within its page
#[inline]
pub const fn page_offset(addr: Addr) -> usize {
    addr & (PAGE_SIZE - 1)
}

/// Number of whole pages needed to cover `size` bytes
#[inline]
pub const fn page_count(size: Size) -> usize {
    page_round_up(size) >> PAGE_SHIFT
}

/// First byte address of a page
#[inline]
pub const fn page_base(pgn: PageNum) -> Addr {
    pgn << PAGE_SHIFT
}
