//! Core types shared across the simulator

/// Process identifier
pub type Pid = u32;

/// A simulated address (virtual or physical depending on context)
pub type Addr = usize;

/// Virtual page number
pub type PageNum = usize;

/// Physical frame number
pub type FrameNum = usize;

/// Size in bytes
pub type Size = usize;

/// A half-open `[start, end)` range of simulated address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryRegion {
    /// Start address (inclusive)
    pub start: Addr,
    /// End address (exclusive)
    pub end: Addr,
}

impl MemoryRegion {
    /// Creates a new memory region
    pub const fn new(start: Addr, end: Addr) -> Self {
        Self { start, end }
    }

    /// Creates an empty region anchored at `addr`
    pub const fn empty_at(addr: Addr) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Returns the size of the region in bytes
    pub const fn len(&self) -> Size {
        self.end - self.start
    }

    /// Returns true if the region covers no bytes
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if address is in region
    pub const fn contains(&self, addr: Addr) -> bool {
        addr >= self.start && addr < self.end
    }

    /// Returns true if region overlaps with another region
    pub const fn overlaps(&self, other: &MemoryRegion) -> bool {
        self.start < other.end && other.start < self.end
    }
}
