/// Lightweight error enum - only 1 byte!
/// Every failure of the value core maps to one fixed Lua message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LuaError {
    /// Store with a nil key
    NilIndex,
    /// Store with a NaN key
    NaNIndex,
    /// Hash part would exceed the configured maximum size
    TableOverflow,
    /// Allocation refused by the allocator
    MemoryError,
    /// `next` called with a key that is not in the table
    InvalidNextKey,
    /// Id that does not name a live object of the expected kind
    InvalidObject,
}

impl std::fmt::Display for LuaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LuaError::NilIndex => write!(f, "table index is nil"),
            LuaError::NaNIndex => write!(f, "table index is NaN"),
            LuaError::TableOverflow => write!(f, "table overflow"),
            LuaError::MemoryError => write!(f, "{}", super::lua_limits::MEMERRMSG),
            LuaError::InvalidNextKey => write!(f, "invalid key to 'next'"),
            LuaError::InvalidObject => write!(f, "invalid object reference"),
        }
    }
}

impl std::error::Error for LuaError {}

pub type LuaResult<T> = Result<T, LuaError>;
