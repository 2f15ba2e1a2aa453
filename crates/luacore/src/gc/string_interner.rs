use std::cell::Cell;

use crate::lua_value::{LUA_VLNGSTR, LUA_VSHRSTR, LuaString, withvariant};
use crate::lua_vm::lua_limits::{LUAI_HASHLIMIT, MAX_STRTAB_SIZE};
use crate::{GcId, GcPool, LuaError, LuaResult, LuaValue, ObjectAllocator, SafeOption, StringId};

const BUCKET_SIZE: usize = std::mem::size_of::<Option<StringId>>();

/// Seeded string hash. Port of lstring.c: luaS_hash.
/// Long inputs are sampled: only every `step`-th byte (from the end) is mixed in.
pub fn lua_hash(bytes: &[u8], seed: u32) -> u32 {
    let mut h = seed ^ (bytes.len() as u32);
    let step = (bytes.len() >> LUAI_HASHLIMIT) + 1;
    let mut l = bytes.len();
    while l >= step {
        h ^= (h << 5)
            .wrapping_add(h >> 2)
            .wrapping_add(bytes[l - 1] as u32);
        l -= step;
    }
    h
}

/// String pool - single source of string identity
/// - Short strings are interned in a chained hash table (`buckets` + `hnext`),
///   so two equal short strings are always the same object
/// - Long strings are stored once per creation and hashed on first use
/// - The bucket array doubles when it is full and is shrunk by the collector
pub struct StringPool {
    strings: GcPool<LuaString>,
    buckets: Vec<Option<StringId>>,
    /// Number of interned short strings
    nuse: usize,
    seed: u32,
    short_limit: usize,
    min_size: usize,
    long_hash_count: Cell<u64>,
}

impl StringPool {
    /// Port of lstring.c: luaS_init (without the API string cache)
    pub fn new(gc: &mut ObjectAllocator, option: &SafeOption) -> LuaResult<Self> {
        let mut pool = Self {
            strings: GcPool::new(),
            buckets: Vec::new(),
            nuse: 0,
            seed: option.seed(),
            short_limit: option.short_string_limit,
            min_size: option.min_string_table_size.max(1).next_power_of_two(),
            long_hash_count: Cell::new(0),
        };
        pool.resize(gc, pool.min_size)?;
        Ok(pool)
    }

    #[inline]
    pub fn seed(&self) -> u32 {
        self.seed
    }

    #[inline]
    pub fn short_limit(&self) -> usize {
        self.short_limit
    }

    /// Number of interned short strings
    #[inline]
    pub fn nuse(&self) -> usize {
        self.nuse
    }

    /// Number of live strings, short and long
    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Current size of the bucket array
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[inline(always)]
    pub fn get(&self, id: StringId) -> Option<&LuaString> {
        self.strings.get(id.0)
    }

    #[inline(always)]
    pub(crate) fn get_mut(&mut self, id: StringId) -> Option<&mut LuaString> {
        self.strings.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StringId, &LuaString)> + '_ {
        self.strings.iter().map(|(i, s)| (StringId(i), s))
    }

    /// Create or find a string with the given content.
    /// Short strings are deduplicated; long strings always get a new object.
    pub fn intern(&mut self, gc: &mut ObjectAllocator, bytes: &[u8]) -> LuaResult<LuaValue> {
        if bytes.len() <= self.short_limit {
            self.intern_short(gc, bytes).map(LuaValue::shortstring)
        } else {
            let id = self.create_object(gc, bytes, LUA_VLNGSTR, self.seed)?;
            Ok(LuaValue::longstring(id))
        }
    }

    /// Port of lstring.c: internshrstr
    fn intern_short(&mut self, gc: &mut ObjectAllocator, bytes: &[u8]) -> LuaResult<StringId> {
        let h = lua_hash(bytes, self.seed);
        let mut cursor = self.buckets[self.bucket_of(h)];
        while let Some(id) = cursor {
            let Some(s) = self.strings.get_mut(id.0) else {
                debug_assert!(false, "dangling string in bucket chain");
                break;
            };
            if s.as_bytes() == bytes {
                // condemned by the collector but not swept yet
                if s.header.is_dead(gc.other_white()) {
                    s.header.change_white();
                }
                return Ok(id);
            }
            cursor = s.hnext;
        }

        if self.nuse >= self.buckets.len() && self.buckets.len() <= MAX_STRTAB_SIZE {
            self.resize(gc, self.buckets.len() * 2)?;
        }
        let id = self.create_object(gc, bytes, LUA_VSHRSTR, h)?;
        let bucket = self.bucket_of(h);
        if let Some(s) = self.strings.get_mut(id.0) {
            s.hnext = self.buckets[bucket];
        }
        self.buckets[bucket] = Some(id);
        self.nuse += 1;
        Ok(id)
    }

    /// Allocate a string object. `hash` is the final hash for short strings
    /// and the seed for long ones.
    fn create_object(
        &mut self,
        gc: &mut ObjectAllocator,
        bytes: &[u8],
        tt: u8,
        hash: u32,
    ) -> LuaResult<StringId> {
        let id = StringId(self.strings.reserve_slot()?);
        let mut data = Vec::new();
        data.try_reserve_exact(bytes.len())
            .map_err(|_| LuaError::MemoryError)?;
        data.extend_from_slice(bytes);
        let data = data.into_boxed_slice();

        let size = std::mem::size_of::<LuaString>() + bytes.len();
        let header = gc.allocate(GcId::StringId(id), withvariant(tt), size)?;
        let s = if tt == LUA_VSHRSTR {
            LuaString::new_short(header, data, hash)
        } else {
            LuaString::new_long(header, data, hash)
        };
        let index = self.strings.alloc(s);
        debug_assert_eq!(index, id.0);
        Ok(id)
    }

    #[inline(always)]
    fn bucket_of(&self, h: u32) -> usize {
        (h as usize) & (self.buckets.len() - 1)
    }

    /// Hash of a string: precomputed for short strings, computed on first
    /// use and cached for long ones.
    pub fn hash(&self, id: StringId) -> u32 {
        let Some(s) = self.strings.get(id.0) else {
            debug_assert!(false, "hash of a freed string {:?}", id);
            return 0;
        };
        if !s.has_hash.get() {
            // `hash` still holds the seed
            s.hash.set(lua_hash(s.as_bytes(), s.hash.get()));
            s.has_hash.set(true);
            self.long_hash_count.set(self.long_hash_count.get() + 1);
        }
        s.hash.get()
    }

    /// How many long-string hashes have been computed so far
    pub fn long_hash_computations(&self) -> u64 {
        self.long_hash_count.get()
    }

    /// String equality: identity for short strings, content for long ones
    pub fn equals(&self, a: StringId, b: StringId) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Some(sa), Some(sb)) if !sa.is_short() && !sb.is_short() => {
                sa.len() == sb.len() && sa.as_bytes() == sb.as_bytes()
            }
            _ => false,
        }
    }

    /// Resize the bucket array and re-bucket every interned string.
    /// Port of lstring.c: luaS_resize. `new_size` is raised to the minimum
    /// size and rounded up to a power of two.
    pub fn resize(&mut self, gc: &mut ObjectAllocator, new_size: usize) -> LuaResult<()> {
        let new_size = new_size
            .max(self.min_size)
            .checked_next_power_of_two()
            .ok_or(LuaError::MemoryError)?;
        let old_size = self.buckets.len();
        let mut new_buckets: Vec<Option<StringId>> = Vec::new();
        new_buckets
            .try_reserve_exact(new_size)
            .map_err(|_| LuaError::MemoryError)?;
        new_buckets.resize(new_size, None);
        gc.reallocate(old_size * BUCKET_SIZE, new_size * BUCKET_SIZE)?;

        for head in std::mem::take(&mut self.buckets) {
            let mut cursor = head;
            while let Some(id) = cursor {
                let Some(s) = self.strings.get_mut(id.0) else {
                    break;
                };
                cursor = s.hnext;
                let bucket = (s.hash.get() as usize) & (new_size - 1);
                s.hnext = new_buckets[bucket];
                new_buckets[bucket] = Some(id);
            }
        }
        self.buckets = new_buckets;
        log::trace!(
            "string table resized {} -> {} ({} strings)",
            old_size,
            new_size,
            self.nuse
        );
        Ok(())
    }

    /// Shrink the bucket array when it is mostly empty.
    /// Port of lgc.c: checkSizes
    pub fn check_size(&mut self, gc: &mut ObjectAllocator) -> LuaResult<()> {
        let size = self.buckets.len();
        if self.nuse < size / 4 && size / 2 >= self.min_size {
            self.resize(gc, size / 2)?;
        }
        Ok(())
    }

    /// Unlink a short string from its bucket chain.
    /// Port of lstring.c: luaS_remove. Removing a string that is not in the
    /// table does nothing.
    pub fn remove(&mut self, id: StringId) {
        let Some(s) = self.strings.get(id.0) else {
            return;
        };
        if !s.is_short() {
            return;
        }
        let next = s.hnext;
        let bucket = self.bucket_of(s.hash.get());

        let mut prev: Option<StringId> = None;
        let mut cursor = self.buckets[bucket];
        while let Some(cur) = cursor {
            if cur == id {
                match prev {
                    None => self.buckets[bucket] = next,
                    Some(p) => {
                        if let Some(ps) = self.strings.get_mut(p.0) {
                            ps.hnext = next;
                        }
                    }
                }
                if let Some(s) = self.strings.get_mut(id.0) {
                    s.hnext = None;
                }
                self.nuse -= 1;
                return;
            }
            prev = cursor;
            cursor = self.strings.get(cur.0).and_then(|s| s.hnext);
        }
    }

    /// Take a string out of the pool. The caller returns its memory to the
    /// allocator and unlinks it from the all-objects list.
    pub(crate) fn free(&mut self, id: StringId) -> Option<LuaString> {
        self.remove(id);
        self.strings.free(id.0)
    }

    /// Mark a short string as reserved word number `index` (1-based)
    pub fn set_reserved(&mut self, id: StringId, index: u8) {
        if let Some(s) = self.strings.get_mut(id.0) {
            debug_assert!(s.is_short(), "only short strings can be reserved");
            s.extra = index;
        }
    }

    /// Reserved-word index of a string, 0 when it is not reserved
    pub fn reserved(&self, id: StringId) -> u8 {
        self.get(id).map_or(0, |s| s.extra)
    }

    /// Check that every interned string sits in the bucket its hash selects
    /// and that `nuse` matches the chains.
    pub fn check_buckets(&self) -> bool {
        let mut count = 0;
        for (bucket, head) in self.buckets.iter().enumerate() {
            let mut cursor = *head;
            while let Some(id) = cursor {
                let Some(s) = self.get(id) else {
                    return false;
                };
                if !s.is_short() || self.bucket_of(s.hash.get()) != bucket {
                    return false;
                }
                count += 1;
                cursor = s.hnext;
            }
        }
        count == self.nuse
    }
}
