// Lua Core
// Tagged values, the string pool and the hybrid array/hash table that the
// interpreter, collector and standard library are built on.

#[cfg(test)]
mod test;

pub mod gc;
pub mod lua_value;
pub mod lua_vm;

pub use gc::*;
pub use lua_value::{LuaString, LuaTable, LuaValue, LuaValueKind, LuaValueRef, TableEnv};
pub use lua_vm::{GlobalState, LuaError, LuaResult, SafeOption};
