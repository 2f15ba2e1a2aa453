// ============ GC Header ============

use crate::GcId;

// Color bit positions in marked field
pub const WHITE0BIT: u8 = 3; // Object is white (type 0)
pub const WHITE1BIT: u8 = 4; // Object is white (type 1)
pub const BLACKBIT: u8 = 5; // Object is black
pub const FIXEDBIT: u8 = 7; // Object is never collected

// Bit masks
pub const WHITEBITS: u8 = (1 << WHITE0BIT) | (1 << WHITE1BIT);
pub const MASKCOLORS: u8 = (1 << BLACKBIT) | WHITEBITS;

/// GC object header - embedded in every GC-managed object
/// Port of Lua's CommonHeader (lobject.h)
///
/// - `next`: link in the allocator's list of all objects (an id, not a pointer)
/// - `tt`: type tag of the object, the value tag without the collectable bit
/// - `marked`: collector bits
///
/// Bit layout of `marked` field:
/// - Bit 3: WHITE0 (white type 0)
/// - Bit 4: WHITE1 (white type 1)
/// - Bit 5: BLACK (fully marked)
/// - Bit 7: FIXED (never collected)
///
/// Gray is implicit: an object is gray iff it has no white bits AND no black bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcHeader {
    pub next: Option<GcId>,
    pub tt: u8,
    pub marked: u8,
}

impl GcHeader {
    /// Create a header colored with the collector's current white.
    /// Port of lgc.c: luaC_newobj, which sets `marked = luaC_white(g)`
    #[inline(always)]
    pub fn with_white(tt: u8, current_white: u8, next: Option<GcId>) -> Self {
        debug_assert!(
            current_white == 0 || current_white == 1,
            "current_white must be 0 or 1"
        );
        GcHeader {
            next,
            tt,
            marked: 1 << (WHITE0BIT + current_white),
        }
    }

    // ============ Color Operations ============

    #[inline(always)]
    pub fn is_white(&self) -> bool {
        (self.marked & WHITEBITS) != 0
    }

    #[inline(always)]
    pub fn is_black(&self) -> bool {
        (self.marked & (1 << BLACKBIT)) != 0
    }

    #[inline(always)]
    pub fn is_gray(&self) -> bool {
        (self.marked & MASKCOLORS) == 0
    }

    /// Check if object is fixed (never collected)
    #[inline(always)]
    pub fn is_fixed(&self) -> bool {
        (self.marked & (1 << FIXEDBIT)) != 0
    }

    /// Port of lgc.c: luaC_fix, which also paints the object gray so the
    /// sweeper never sees it white
    #[inline(always)]
    pub fn set_fixed(&mut self) {
        self.make_gray();
        self.marked |= 1 << FIXEDBIT;
    }

    // ============ Color Transitions ============

    #[inline(always)]
    pub fn make_white(&mut self, current_white: u8) {
        debug_assert!(
            current_white == 0 || current_white == 1,
            "current_white must be 0 or 1"
        );
        self.marked = (self.marked & !MASKCOLORS) | (1 << (WHITE0BIT + current_white));
    }

    #[inline(always)]
    pub fn make_gray(&mut self) {
        self.marked &= !MASKCOLORS;
    }

    #[inline(always)]
    pub fn make_black(&mut self) {
        self.marked = (self.marked & !WHITEBITS) | (1 << BLACKBIT);
    }

    // ============ Death Detection ============

    /// Check if object is dead (carries the "other" white bit).
    /// Port of lgc.h: isdeadm(ow,m)
    #[inline(always)]
    pub fn is_dead(&self, other_white: u8) -> bool {
        debug_assert!(
            other_white == 0 || other_white == 1,
            "other_white must be 0 or 1"
        );
        (self.marked & (1 << (WHITE0BIT + other_white))) != 0
    }

    #[inline(always)]
    pub fn otherwhite(current_white: u8) -> u8 {
        current_white ^ 1
    }

    /// Flip between WHITE0 and WHITE1.
    /// Port of lgc.h: changewhite(x), used to resurrect a condemned string
    #[inline(always)]
    pub fn change_white(&mut self) {
        self.marked ^= WHITEBITS;
    }
}

/// Every heap object embeds a `GcHeader`; the collector only ever looks at
/// objects through this trait.
pub trait GcObject {
    fn header(&self) -> &GcHeader;

    fn header_mut(&mut self) -> &mut GcHeader;

    /// Bytes charged to the allocator for this object
    fn size_in_bytes(&self) -> usize;
}
