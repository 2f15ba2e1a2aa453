//! Limits and sizing constants of the value core.
//!
//! Mirrors Lua's `luaconf.h` / `llimits.h` design: every magic number that
//! controls string interning or table sizing is collected here.

// ===== Strings =====

/// Maximum length for "short" strings (interned in the string pool).
/// Matches Lua's LUAI_MAXSHORTLEN.
pub const LUAI_MAXSHORTLEN: usize = 40;

/// Minimum size for the string pool's bucket array.
/// Matches Lua's MINSTRTABSIZE.
pub const MINSTRTABSIZE: usize = 128;

/// The bucket array stops doubling past this many buckets.
pub const MAX_STRTAB_SIZE: usize = (i32::MAX / 2) as usize;

/// Strings longer than `2^LUAI_HASHLIMIT` bytes are hashed by sampling.
/// Matches Lua's LUAI_HASHLIMIT.
pub const LUAI_HASHLIMIT: u32 = 5;

/// Message of the memory error, preallocated so it can be raised without
/// allocating.
pub const MEMERRMSG: &str = "not enough memory";

// ===== Tables =====

/// Largest `n` such that an array part of size `2^n` is allowed.
/// Matches Lua's MAXABITS.
pub const MAXABITS: usize = 31;

/// Maximum size of the array part.
pub const MAXASIZE: usize = 1 << MAXABITS;

/// Largest `n` such that a hash part of size `2^n` is allowed.
/// Matches Lua's MAXHBITS.
pub const MAXHBITS: u8 = 30;
