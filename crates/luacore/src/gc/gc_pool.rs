use crate::{LuaError, LuaResult};

/// Slot arena for GC objects of one kind
/// - O(1) lookup by index
/// - Free list for ID reuse to prevent unbounded growth
/// - Capacity is reserved up front so that storing never fails halfway
pub struct GcPool<T> {
    slots: Vec<Option<T>>,
    free_list: Vec<u32>,
    len: usize,
}

impl<T> GcPool<T> {
    #[inline]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Make room for one more object and return the index it will get.
    /// A following `alloc` is guaranteed to land on that index.
    pub fn reserve_slot(&mut self) -> LuaResult<u32> {
        if let Some(&free_id) = self.free_list.last() {
            return Ok(free_id);
        }
        if self.slots.len() >= u32::MAX as usize {
            return Err(LuaError::MemoryError);
        }
        self.slots
            .try_reserve(1)
            .map_err(|_| LuaError::MemoryError)?;
        Ok(self.slots.len() as u32)
    }

    /// Store a new object and return its index
    #[inline]
    pub fn alloc(&mut self, value: T) -> u32 {
        self.len += 1;
        if let Some(free_id) = self.free_list.pop() {
            self.slots[free_id as usize] = Some(value);
            free_id
        } else {
            let id = self.slots.len() as u32;
            self.slots.push(Some(value));
            id
        }
    }

    #[inline(always)]
    pub fn get(&self, id: u32) -> Option<&T> {
        self.slots.get(id as usize).and_then(|slot| slot.as_ref())
    }

    #[inline(always)]
    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.slots.get_mut(id as usize).and_then(|slot| slot.as_mut())
    }

    /// Free a slot (mark for reuse) and hand back the object
    pub fn free(&mut self, id: u32) -> Option<T> {
        let value = self.slots.get_mut(id as usize)?.take()?;
        self.len -= 1;
        // a failed push only loses the recycling of this index
        if self.free_list.try_reserve(1).is_ok() {
            self.free_list.push(id);
        }
        Some(value)
    }

    #[inline(always)]
    pub fn is_valid(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    /// Current number of live objects
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over all live objects
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i as u32, v)))
    }
}

impl<T> Default for GcPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_matches_alloc() {
        let mut pool = GcPool::new();
        let a = pool.reserve_slot().unwrap();
        assert_eq!(pool.alloc("a"), a);
        let b = pool.reserve_slot().unwrap();
        assert_eq!(pool.alloc("b"), b);
        assert_eq!(pool.free(a), Some("a"));
        let c = pool.reserve_slot().unwrap();
        assert_eq!(c, a);
        assert_eq!(pool.alloc("c"), c);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(c), Some(&"c"));
    }

    #[test]
    fn test_free_twice() {
        let mut pool = GcPool::new();
        let a = pool.alloc(1);
        assert_eq!(pool.free(a), Some(1));
        assert_eq!(pool.free(a), None);
        assert!(!pool.is_valid(a));
        assert!(pool.is_empty());
    }
}
