// Object allocator
//
// Every heap allocation of the core goes through here:
// 1. The byte count is charged against the memory limit BEFORE the caller
//    touches any state, so a refused allocation leaves everything as it was
// 2. New objects are colored with the current white and pushed at the head
//    of the all-objects list (the `next` link lives in each object's header)
// 3. Stores of collectable references into tables are reported to the
//    collector's write barrier

use crate::{GcHeader, GcId, LuaError, LuaResult, LuaValue};

/// Hook the collector installs to keep its tri-color invariant.
/// Called with the object written into and the reference stored in it.
pub trait WriteBarrier {
    fn on_reference_written(&mut self, owner: GcId, value: &LuaValue);
}

/// Barrier for states without an incremental collector
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBarrier;

impl WriteBarrier for NoBarrier {
    #[inline(always)]
    fn on_reference_written(&mut self, _owner: GcId, _value: &LuaValue) {}
}

pub struct ObjectAllocator {
    /// Head of the list of all collectable objects
    pub(crate) all_gc: Option<GcId>,
    /// Head of the list of objects that are never collected
    pub(crate) fixed_gc: Option<GcId>,
    /// current white color (0 or 1, flips each cycle)
    current_white: u8,
    total_bytes: usize,
    max_memory: usize,
    barrier: Box<dyn WriteBarrier>,
}

impl ObjectAllocator {
    pub fn new(max_memory: usize) -> Self {
        Self::with_barrier(max_memory, Box::new(NoBarrier))
    }

    pub fn with_barrier(max_memory: usize, barrier: Box<dyn WriteBarrier>) -> Self {
        Self {
            all_gc: None,
            fixed_gc: None,
            current_white: 0,
            total_bytes: 0,
            max_memory,
            barrier,
        }
    }

    pub fn set_barrier(&mut self, barrier: Box<dyn WriteBarrier>) {
        self.barrier = barrier;
    }

    #[inline]
    pub fn current_white(&self) -> u8 {
        self.current_white
    }

    #[inline]
    pub fn other_white(&self) -> u8 {
        GcHeader::otherwhite(self.current_white)
    }

    /// Start a new collection cycle: everything still wearing the old white
    /// is condemned from now on.
    pub fn flip_white(&mut self) {
        self.current_white = self.other_white();
    }

    #[inline]
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    #[inline]
    pub fn max_memory(&self) -> usize {
        self.max_memory
    }

    pub fn set_max_memory(&mut self, max_memory: usize) {
        self.max_memory = max_memory;
    }

    /// Port of lgc.c: luaC_newobj.
    /// Charges `size` bytes and threads the object `id` onto the all-objects
    /// list. The returned header must be stored in the object under `id`.
    pub fn allocate(&mut self, id: GcId, tt: u8, size: usize) -> LuaResult<GcHeader> {
        self.charge(size)?;
        let header = GcHeader::with_white(tt, self.current_white, self.all_gc);
        self.all_gc = Some(id);
        Ok(header)
    }

    /// Account for a buffer changing size from `old_size` to `new_size` bytes
    pub fn reallocate(&mut self, old_size: usize, new_size: usize) -> LuaResult<()> {
        if new_size > old_size {
            self.charge(new_size - old_size)
        } else {
            self.release(old_size - new_size);
            Ok(())
        }
    }

    /// Give back bytes of a freed object or a shrunk buffer
    #[inline]
    pub fn release(&mut self, size: usize) {
        debug_assert!(size <= self.total_bytes, "releasing more than allocated");
        self.total_bytes = self.total_bytes.saturating_sub(size);
    }

    fn charge(&mut self, size: usize) -> LuaResult<()> {
        match self.total_bytes.checked_add(size) {
            Some(total) if total <= self.max_memory => {
                self.total_bytes = total;
                Ok(())
            }
            _ => {
                log::debug!(
                    "allocation of {} bytes refused: {} in use, limit {}",
                    size,
                    self.total_bytes,
                    self.max_memory
                );
                Err(LuaError::MemoryError)
            }
        }
    }

    /// Forward a stored reference to the collector.
    /// Port of lgc.h: luaC_barrierback, only collectable values matter
    #[inline]
    pub fn barrier(&mut self, owner: GcId, value: &LuaValue) {
        if value.iscollectable() {
            self.barrier.on_reference_written(owner, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StringId;

    #[test]
    fn test_allocate_links_objects() {
        let mut gc = ObjectAllocator::new(usize::MAX);
        let a = GcId::StringId(StringId(0));
        let b = GcId::StringId(StringId(1));
        let ha = gc.allocate(a, 4, 10).unwrap();
        let hb = gc.allocate(b, 4, 20).unwrap();
        assert_eq!(ha.next, None);
        assert_eq!(hb.next, Some(a));
        assert_eq!(gc.all_gc, Some(b));
        assert_eq!(gc.total_bytes(), 30);
    }

    #[test]
    fn test_memory_limit() {
        let mut gc = ObjectAllocator::new(100);
        assert!(gc.reallocate(0, 80).is_ok());
        assert_eq!(gc.reallocate(80, 120), Err(LuaError::MemoryError));
        assert_eq!(gc.total_bytes(), 80);
        let id = GcId::StringId(StringId(0));
        assert_eq!(gc.allocate(id, 4, 30), Err(LuaError::MemoryError));
        assert_eq!(gc.all_gc, None);
        gc.reallocate(80, 10).unwrap();
        assert_eq!(gc.total_bytes(), 10);
    }
}
