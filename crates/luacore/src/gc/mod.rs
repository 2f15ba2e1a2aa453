mod gc_id;
mod gc_object;
mod gc_pool;
mod object_allocator;
mod string_interner;

pub use gc_id::*;
pub use gc_object::*;
pub use gc_pool::GcPool;
pub use object_allocator::{NoBarrier, ObjectAllocator, WriteBarrier};
pub use string_interner::{StringPool, lua_hash};
