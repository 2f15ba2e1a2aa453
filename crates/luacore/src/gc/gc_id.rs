// ============ Object IDs ============
// All IDs are simple u32 indices into the owning arena

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[repr(transparent)]
pub struct StringId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[repr(transparent)]
pub struct TableId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[repr(transparent)]
pub struct FunctionId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[repr(transparent)]
pub struct UserdataId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[repr(transparent)]
pub struct ThreadId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[repr(transparent)]
pub struct ProtoId(pub u32);

/// Unified GC object identifier.
/// Strings and tables live in this crate's arenas; the other kinds are
/// owned by the interpreter and only travel through values.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum GcId {
    StringId(StringId),
    TableId(TableId),
    FunctionId(FunctionId),
    UserdataId(UserdataId),
    ThreadId(ThreadId),
    ProtoId(ProtoId),
}

impl GcId {
    #[inline(always)]
    pub fn index(self) -> u32 {
        match self {
            GcId::StringId(StringId(id)) => id,
            GcId::TableId(TableId(id)) => id,
            GcId::FunctionId(FunctionId(id)) => id,
            GcId::UserdataId(UserdataId(id)) => id,
            GcId::ThreadId(ThreadId(id)) => id,
            GcId::ProtoId(ProtoId(id)) => id,
        }
    }

    /// Basic type tag (`LUA_T*`) of the object this id refers to
    #[inline]
    pub fn type_tag(self) -> u8 {
        use crate::lua_value::*;
        match self {
            GcId::StringId(_) => LUA_TSTRING,
            GcId::TableId(_) => LUA_TTABLE,
            GcId::FunctionId(_) => LUA_TFUNCTION,
            GcId::UserdataId(_) => LUA_TUSERDATA,
            GcId::ThreadId(_) => LUA_TTHREAD,
            GcId::ProtoId(_) => LUA_TPROTO,
        }
    }
}

impl From<StringId> for GcId {
    fn from(id: StringId) -> Self {
        GcId::StringId(id)
    }
}

impl From<TableId> for GcId {
    fn from(id: TableId) -> Self {
        GcId::TableId(id)
    }
}
