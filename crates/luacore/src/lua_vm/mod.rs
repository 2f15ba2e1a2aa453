mod global_state;
mod lua_error;
pub mod lua_limits;
mod safe_option;

pub use global_state::GlobalState;
pub use lua_error::{LuaError, LuaResult};
pub use safe_option::SafeOption;
