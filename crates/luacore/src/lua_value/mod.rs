mod lua_string;
mod lua_table;
#[allow(clippy::module_inception)]
mod lua_value;

pub use lua_string::LuaString;
pub use lua_table::{LuaTable, TableEnv, TableIter};
pub use lua_value::*;
