use std::cell::Cell;

use crate::gc::{GcHeader, GcObject, StringId};
use crate::lua_value::{LUA_VLNGSTR, LUA_VSHRSTR, withvariant};

/// Heap string object.
///
/// Short strings are interned by the `StringPool`: their hash is computed on
/// creation and `hnext` chains them inside a pool bucket. Long strings are
/// never deduplicated; `hash` holds the pool seed until the real hash is
/// needed, then the result is cached and `has_hash` is set.
pub struct LuaString {
    pub(crate) header: GcHeader,
    data: Box<[u8]>,
    pub(crate) hash: Cell<u32>,
    pub(crate) has_hash: Cell<bool>,
    /// Reserved-word index for short strings (0 = not reserved)
    pub(crate) extra: u8,
    /// Next string in the same pool bucket
    pub(crate) hnext: Option<StringId>,
}

impl LuaString {
    pub(crate) fn new_short(header: GcHeader, data: Box<[u8]>, hash: u32) -> Self {
        debug_assert_eq!(header.tt, withvariant(LUA_VSHRSTR));
        Self {
            header,
            data,
            hash: Cell::new(hash),
            has_hash: Cell::new(true),
            extra: 0,
            hnext: None,
        }
    }

    pub(crate) fn new_long(header: GcHeader, data: Box<[u8]>, seed: u32) -> Self {
        debug_assert_eq!(header.tt, withvariant(LUA_VLNGSTR));
        Self {
            header,
            data,
            hash: Cell::new(seed),
            has_hash: Cell::new(false),
            extra: 0,
            hnext: None,
        }
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Content as UTF-8, if it is valid UTF-8
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline(always)]
    pub fn is_short(&self) -> bool {
        self.header.tt == withvariant(LUA_VSHRSTR)
    }

    /// Whether the hash is already known (always true for short strings)
    #[inline(always)]
    pub fn has_hash(&self) -> bool {
        self.has_hash.get()
    }

    /// Reserved-word index, 0 when the string is not a reserved word
    #[inline(always)]
    pub fn reserved(&self) -> u8 {
        self.extra
    }

    /// Tagged value referring to this string under `id`
    #[inline]
    pub fn to_value(&self, id: StringId) -> crate::LuaValue {
        if self.is_short() {
            crate::LuaValue::shortstring(id)
        } else {
            crate::LuaValue::longstring(id)
        }
    }
}

impl GcObject for LuaString {
    fn header(&self) -> &GcHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut GcHeader {
        &mut self.header
    }

    fn size_in_bytes(&self) -> usize {
        std::mem::size_of::<LuaString>() + self.data.len()
    }
}

impl std::fmt::Debug for LuaString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.data))
    }
}
