//! Packed page-table entry
//!
//! A PTE is one 32-bit word. The top three bits are flags; the low bits are
//! a payload whose meaning depends on the flags:
//!
//! - `PRESENT` clear: the page was never mapped, the word is zero.
//! - `PRESENT` set, `SWAPPED` clear: payload holds the frame number.
//! - `PRESENT` set, `SWAPPED` set: payload holds `(swap_type, swap_offset)`,
//!   the device and slot the page content was evicted to.
//!
//! An entry never simultaneously carries a valid frame and a swap location.

use bitflags::bitflags;
use core::fmt;
use ossim_api::FrameNum;
use static_assertions::const_assert_eq;

bitflags! {
    /// Flag bits of a [`Pte`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PteFlags: u32 {
        /// The page has been mapped at least once
        const PRESENT = 1 << 31;
        /// The page content lives on a swap device
        const SWAPPED = 1 << 30;
        /// The page was written to while resident
        const DIRTY = 1 << 29;
    }
}

/// Frame number field: bits 0..=20
const FPN_MASK: u32 = 0x001F_FFFF;
/// Swap type field: bits 0..=4
const SWPTYP_MASK: u32 = 0x0000_001F;
const SWPTYP_SHIFT: u32 = 0;
/// Swap offset field: bits 5..=25
const SWPOFF_MASK: u32 = 0x03FF_FFE0;
const SWPOFF_SHIFT: u32 = 5;

// Payload fields must stay clear of the flag bits.
const_assert_eq!(PteFlags::all().bits() & FPN_MASK, 0);
const_assert_eq!(PteFlags::all().bits() & (SWPTYP_MASK | SWPOFF_MASK), 0);
const_assert_eq!(SWPTYP_MASK & SWPOFF_MASK, 0);

/// Page Table Entry
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct Pte(u32);

impl Pte {
    /// An entry that was never mapped
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Entry for a resident page backed by frame `fpn`
    pub fn mapped(fpn: FrameNum) -> Self {
        Self(PteFlags::PRESENT.bits() | (fpn as u32 & FPN_MASK))
    }

    /// Entry for a page evicted to `(swap_type, swap_offset)`
    ///
    /// Values past the field widths would alias another slot once masked.
    pub fn swapped(swap_type: u32, swap_offset: usize) -> Self {
        debug_assert!(
            swap_type <= SWPTYP_MASK >> SWPTYP_SHIFT,
            "swap_type {} exceeds field width",
            swap_type
        );
        debug_assert!(
            swap_offset <= (SWPOFF_MASK >> SWPOFF_SHIFT) as usize,
            "swap_offset {} exceeds field width",
            swap_offset
        );
        let typ = (swap_type << SWPTYP_SHIFT) & SWPTYP_MASK;
        let off = ((swap_offset as u32) << SWPOFF_SHIFT) & SWPOFF_MASK;
        Self(PteFlags::PRESENT.bits() | PteFlags::SWAPPED.bits() | typ | off)
    }

    /// Raw packed word
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Rebuilds an entry from a raw packed word
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    fn flags(self) -> PteFlags {
        PteFlags::from_bits_truncate(self.0)
    }

    /// True once the page has been mapped
    pub fn is_present(self) -> bool {
        self.flags().contains(PteFlags::PRESENT)
    }

    /// True while the page content lives on a swap device
    pub fn is_swapped(self) -> bool {
        self.flags().contains(PteFlags::SWAPPED)
    }

    /// True if the page was written to while resident
    pub fn is_dirty(self) -> bool {
        self.flags().contains(PteFlags::DIRTY)
    }

    /// True if the entry references a RAM frame right now
    pub fn is_resident(self) -> bool {
        self.is_present() && !self.is_swapped()
    }

    /// Marks the page as written
    pub fn set_dirty(&mut self) {
        self.0 |= PteFlags::DIRTY.bits();
    }

    /// Frame number, if the page is resident
    pub fn frame_number(self) -> Option<FrameNum> {
        if self.is_resident() {
            Some((self.0 & FPN_MASK) as FrameNum)
        } else {
            None
        }
    }

    /// `(swap_type, swap_offset)`, if the page is swapped out
    pub fn swap_location(self) -> Option<(u32, usize)> {
        if self.is_present() && self.is_swapped() {
            let typ = (self.0 & SWPTYP_MASK) >> SWPTYP_SHIFT;
            let off = ((self.0 & SWPOFF_MASK) >> SWPOFF_SHIFT) as usize;
            Some((typ, off))
        } else {
            None
        }
    }
}

impl fmt::Debug for Pte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_present() {
            return write!(f, "Pte(unmapped)");
        }
        if let Some((typ, off)) = self.swap_location() {
            write!(f, "Pte(swap type={} offset={})", typ, off)
        } else {
            write!(
                f,
                "Pte(frame={}{})",
                (self.0 & FPN_MASK),
                if self.is_dirty() { " dirty" } else { "" }
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_entry() {
        let pte = Pte::empty();
        assert!(!pte.is_present());
        assert!(!pte.is_swapped());
        assert_eq!(pte.frame_number(), None);
        assert_eq!(pte.swap_location(), None);
        assert_eq!(pte.raw(), 0);
    }

    #[test]
    fn test_mapped_entry() {
        let pte = Pte::mapped(42);
        assert!(pte.is_resident());
        assert_eq!(pte.frame_number(), Some(42));
        // A resident entry never reports a swap location.
        assert_eq!(pte.swap_location(), None);
    }

    #[test]
    fn test_swapped_entry() {
        let pte = Pte::swapped(1, 37);
        assert!(pte.is_present());
        assert!(pte.is_swapped());
        assert!(!pte.is_resident());
        assert_eq!(pte.swap_location(), Some((1, 37)));
        // A swapped entry never reports a valid frame.
        assert_eq!(pte.frame_number(), None);
    }

    #[test]
    fn test_dirty_bit() {
        let mut pte = Pte::mapped(3);
        assert!(!pte.is_dirty());
        pte.set_dirty();
        assert!(pte.is_dirty());
        assert_eq!(pte.frame_number(), Some(3));
        // Re-mapping after a swap cycle yields a clean entry.
        assert!(!Pte::mapped(3).is_dirty());
    }

    #[test]
    fn test_swapped_accepts_full_field_widths() {
        let pte = Pte::swapped(31, (1 << 21) - 1);
        assert_eq!(pte.swap_location(), Some((31, (1 << 21) - 1)));
    }

    #[test]
    #[should_panic(expected = "swap_type")]
    fn test_swapped_rejects_oversized_type() {
        let _ = Pte::swapped(32, 0);
    }

    #[test]
    #[should_panic(expected = "swap_offset")]
    fn test_swapped_rejects_oversized_offset() {
        let _ = Pte::swapped(0, 1 << 21);
    }

    #[test]
    fn test_raw_roundtrip() {
        let pte = Pte::swapped(0, 511);
        let back = Pte::from_raw(pte.raw());
        assert_eq!(back, pte);
        assert_eq!(back.swap_location(), Some((0, 511)));
    }
}
