// LuaTable - hybrid array/hash table, port of Lua's ltable.c
//
// - array part: values of the integer keys 1..=array.len()
// - hash part: `node`, 2^lsizenode chained nodes (see hash_table.rs);
//   an empty vector plays the role of Lua's shared dummy node
// - absence is "value is nil": a key set to nil keeps its node as a
//   tombstone until the next rehash
mod hash_table;
mod rehash;

pub(crate) use hash_table::Node;

use crate::gc::{GcHeader, GcId, GcObject, ObjectAllocator, StringId, StringPool, TableId};
use crate::lua_value::{LUA_VNIL, LUA_VNUMFLT, LUA_VNUMINT, LUA_VSHRSTR, LuaValue, NIL, float_to_integer};
use crate::{LuaError, LuaResult};

/// What a table mutation needs from the state around it: string hashes,
/// the allocator (memory accounting and write barrier) and the table's own
/// id for the barrier.
pub struct TableEnv<'a> {
    pub strings: &'a StringPool,
    pub gc: &'a mut ObjectAllocator,
    pub owner: TableId,
    pub max_hash_bits: u8,
}

impl TableEnv<'_> {
    #[inline(always)]
    pub(crate) fn barrier(&mut self, value: &LuaValue) {
        self.gc.barrier(GcId::TableId(self.owner), value);
    }
}

/// Storage cell of a key
#[derive(Clone, Copy, Debug)]
enum Slot {
    Array(usize),
    Node(usize),
}

pub struct LuaTable {
    pub(crate) header: GcHeader,
    pub(crate) array: Vec<LuaValue>,
    pub(crate) node: Vec<Node>,
    /// log2 of the hash part size
    pub(crate) lsizenode: u8,
    /// Every node at or above this index is known to be in use
    pub(crate) last_free: usize,
    meta: Option<TableId>,
}

impl LuaTable {
    /// Empty table: no array part, dummy hash part.
    /// Port of ltable.c: luaH_new
    pub fn new(header: GcHeader) -> Self {
        Self {
            header,
            array: Vec::new(),
            node: Vec::new(),
            lsizenode: 0,
            last_free: 0,
            meta: None,
        }
    }

    #[inline(always)]
    pub fn array_size(&self) -> usize {
        self.array.len()
    }

    /// Number of nodes in the hash part (0 for the dummy part)
    #[inline(always)]
    pub fn hash_size(&self) -> usize {
        self.node.len()
    }

    #[inline(always)]
    pub(crate) fn is_dummy(&self) -> bool {
        self.node.is_empty()
    }

    #[inline(always)]
    pub fn has_metatable(&self) -> bool {
        self.meta.is_some()
    }

    pub fn get_metatable(&self) -> Option<TableId> {
        self.meta
    }

    pub fn set_metatable(&mut self, metatable: Option<TableId>, env: &mut TableEnv) {
        self.meta = metatable;
        if let Some(mt) = metatable {
            env.barrier(&LuaValue::table(mt));
        }
    }

    // ============ Lookup ============

    /// Raw get. Port of ltable.c: luaH_get
    pub fn get(&self, key: &LuaValue, strings: &StringPool) -> LuaValue {
        match self.find_slot(key, strings) {
            Some(slot) => self.slot_value(slot),
            None => NIL,
        }
    }

    /// Port of ltable.c: luaH_getint
    pub fn get_int(&self, key: i64) -> LuaValue {
        match self.find_int(key) {
            Some(slot) => self.slot_value(slot),
            None => NIL,
        }
    }

    /// Port of ltable.c: luaH_getshortstr
    pub fn get_short_str(&self, key: StringId, strings: &StringPool) -> LuaValue {
        match self.find_short_str(key, strings) {
            Some(n) => self.node[n].value,
            None => NIL,
        }
    }

    /// Port of ltable.c: luaH_getstr
    pub fn get_str(&self, key: &LuaValue, strings: &StringPool) -> LuaValue {
        debug_assert!(key.ttisstring());
        if key.ttisshrstring() {
            self.get_short_str(key.tsvalue(), strings)
        } else {
            self.get(key, strings)
        }
    }

    fn find_slot(&self, key: &LuaValue, strings: &StringPool) -> Option<Slot> {
        match key.tt() {
            LUA_VSHRSTR => self.find_short_str(key.tsvalue(), strings).map(Slot::Node),
            LUA_VNUMINT => self.find_int(key.ivalue()),
            LUA_VNIL => None,
            LUA_VNUMFLT => match float_to_integer(key.fltvalue()) {
                Some(i) => self.find_int(i),
                None => self.find_generic(key, strings).map(Slot::Node),
            },
            _ => self.find_generic(key, strings).map(Slot::Node),
        }
    }

    fn find_int(&self, key: i64) -> Option<Slot> {
        // 1 <= key <= array.len() in one unsigned comparison
        let index = (key as u64).wrapping_sub(1);
        if index < self.array.len() as u64 {
            return Some(Slot::Array(index as usize));
        }
        if self.is_dummy() {
            return None;
        }
        self.walk_chain(self.hash_int(key), |k| {
            k.ttisinteger() && k.ivalue() == key
        })
        .map(Slot::Node)
    }

    fn find_short_str(&self, key: StringId, strings: &StringPool) -> Option<usize> {
        if self.is_dummy() {
            return None;
        }
        let key = LuaValue::shortstring(key);
        let mp = self.main_position(&key, strings);
        self.walk_chain(mp, |k| *k == key)
    }

    fn find_generic(&self, key: &LuaValue, strings: &StringPool) -> Option<usize> {
        if self.is_dummy() {
            return None;
        }
        let mp = self.main_position(key, strings);
        self.walk_chain(mp, |k| Self::key_equals(k, key, strings))
    }

    /// Raw equality, plus content equality for long strings
    #[inline]
    fn key_equals(a: &LuaValue, b: &LuaValue, strings: &StringPool) -> bool {
        *a == *b
            || (a.ttislngstring() && b.ttislngstring() && strings.equals(a.tsvalue(), b.tsvalue()))
    }

    #[inline(always)]
    fn slot_value(&self, slot: Slot) -> LuaValue {
        match slot {
            Slot::Array(i) => self.array[i],
            Slot::Node(n) => self.node[n].value,
        }
    }

    #[inline(always)]
    fn write_slot(&mut self, slot: Slot, value: LuaValue) {
        match slot {
            Slot::Array(i) => self.array[i] = value,
            Slot::Node(n) => self.node[n].value = value,
        }
    }

    // ============ Update ============

    /// Raw set. Port of ltable.c: luaH_set + luaH_newkey.
    ///
    /// An existing cell (tombstones included) is overwritten in place.
    /// Otherwise the key is validated and normalized (integral floats become
    /// integers) and a new cell is created; storing nil under an absent key
    /// creates nothing.
    pub fn set(&mut self, key: LuaValue, value: LuaValue, env: &mut TableEnv) -> LuaResult<()> {
        if let Some(slot) = self.find_slot(&key, env.strings) {
            self.write_slot(slot, value);
            env.barrier(&value);
            return Ok(());
        }
        let key = Self::normalize_key(key)?;
        if value.is_nil() {
            return Ok(());
        }
        self.new_key(key, value, env)
    }

    /// Port of ltable.c: luaH_setint
    pub fn set_int(&mut self, key: i64, value: LuaValue, env: &mut TableEnv) -> LuaResult<()> {
        if let Some(slot) = self.find_int(key) {
            self.write_slot(slot, value);
            env.barrier(&value);
            return Ok(());
        }
        if value.is_nil() {
            return Ok(());
        }
        self.new_key(LuaValue::integer(key), value, env)
    }

    fn normalize_key(key: LuaValue) -> LuaResult<LuaValue> {
        match key.tt() {
            LUA_VNIL => Err(LuaError::NilIndex),
            LUA_VNUMFLT => {
                let n = key.fltvalue();
                if let Some(i) = float_to_integer(n) {
                    Ok(LuaValue::integer(i))
                } else if n.is_nan() {
                    Err(LuaError::NaNIndex)
                } else {
                    Ok(key)
                }
            }
            _ => Ok(key),
        }
    }

    /// Insert an absent, validated key. When the hash part is full the
    /// table is rehashed first and the store is retried against the new
    /// layout, where the key may belong to the array part.
    fn new_key(&mut self, key: LuaValue, value: LuaValue, env: &mut TableEnv) -> LuaResult<()> {
        if self.insert_node(key, value, env) {
            return Ok(());
        }
        self.rehash(&key, env)?;
        self.set(key, value, env)
    }

    // ============ Traversal ============

    /// Position of `key` in traversal order: 0 for nil, i for array slot i,
    /// array.len() + n + 1 for node n. Port of ltable.c: findindex
    fn find_index(&self, key: &LuaValue, strings: &StringPool) -> LuaResult<usize> {
        if key.is_nil() {
            return Ok(0);
        }
        if key.ttisinteger() {
            let index = (key.ivalue() as u64).wrapping_sub(1);
            if index < self.array.len() as u64 {
                return Ok(index as usize + 1);
            }
        }
        if self.is_dummy() {
            return Err(LuaError::InvalidNextKey);
        }
        let mp = self.main_position(key, strings);
        // a dead key still names its entry, so traversal survives a
        // collection; a live node for the same key takes precedence
        let found = self
            .walk_chain(mp, |k| Self::key_equals(k, key, strings))
            .or_else(|| self.walk_chain(mp, |k| k.is_dead_key_of(key)));
        match found {
            Some(n) => Ok(n + 1 + self.array.len()),
            None => Err(LuaError::InvalidNextKey),
        }
    }

    /// Entry following `key` in traversal order (array part first, then the
    /// hash part in node order); nil starts a traversal.
    /// Port of ltable.c: luaH_next
    pub fn next(
        &self,
        key: &LuaValue,
        strings: &StringPool,
    ) -> LuaResult<Option<(LuaValue, LuaValue)>> {
        let start = self.find_index(key, strings)?;
        Ok(self.entry_from(start).map(|(_, k, v)| (k, v)))
    }

    /// First live entry at traversal position `i` or later
    fn entry_from(&self, mut i: usize) -> Option<(usize, LuaValue, LuaValue)> {
        let asize = self.array.len();
        while i < asize {
            if !self.array[i].is_nil() {
                return Some((i, LuaValue::integer(i as i64 + 1), self.array[i]));
            }
            i += 1;
        }
        while i - asize < self.node.len() {
            let node = &self.node[i - asize];
            if !node.value.is_nil() {
                return Some((i, node.key, node.value));
            }
            i += 1;
        }
        None
    }

    /// Iterate over live entries in `next` order
    pub fn iter(&self) -> TableIter<'_> {
        TableIter {
            table: self,
            position: 0,
        }
    }

    // ============ Length ============

    /// A border of the table: an index `i` with `t[i] ~= nil` (or `i == 0`)
    /// and `t[i+1] == nil`. Port of ltable.c: luaH_getn
    pub fn length(&self) -> u64 {
        let j = self.array.len();
        if j > 0 && self.array[j - 1].is_nil() {
            // binary search in the array part
            let mut i = 0;
            let mut j = j;
            while j - i > 1 {
                let m = (i + j) / 2;
                if self.array[m - 1].is_nil() {
                    j = m;
                } else {
                    i = m;
                }
            }
            i as u64
        } else if self.is_dummy() {
            j as u64
        } else {
            self.unbound_search(j as u64)
        }
    }

    fn unbound_search(&self, j: u64) -> u64 {
        let mut i = j; // zero or a present index
        let mut j = j + 1;
        while !self.get_int(j as i64).is_nil() {
            i = j;
            if j > (i64::MAX as u64) / 2 {
                // overflow: resort to a linear search
                let mut i: u64 = 1;
                while !self.get_int(i as i64).is_nil() {
                    i += 1;
                }
                return i - 1;
            }
            j *= 2;
        }
        while j - i > 1 {
            let m = (i + j) / 2;
            if self.get_int(m as i64).is_nil() {
                j = m;
            } else {
                i = m;
            }
        }
        i
    }

    // ============ Collector support ============

    /// Turn the collectable keys of nil-valued nodes into dead keys, so the
    /// objects they refer to can be freed. Port of lgc.c: clearkey
    pub fn clear_dead_keys(&mut self) {
        for node in self.node.iter_mut() {
            if node.value.is_nil() && node.key.iscollectable() {
                node.key = node.key.to_dead_key();
            }
        }
    }
}

impl GcObject for LuaTable {
    fn header(&self) -> &GcHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut GcHeader {
        &mut self.header
    }

    fn size_in_bytes(&self) -> usize {
        std::mem::size_of::<LuaTable>() + self.buffer_bytes()
    }
}

/// Iterator over the live entries of a table, in `next` order
pub struct TableIter<'a> {
    table: &'a LuaTable,
    position: usize,
}

impl Iterator for TableIter<'_> {
    type Item = (LuaValue, LuaValue);

    fn next(&mut self) -> Option<Self::Item> {
        let (i, k, v) = self.table.entry_from(self.position)?;
        self.position = i + 1;
        Some((k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SafeOption;
    use crate::lua_value::withvariant;
    use crate::lua_value::LUA_VTABLE;

    struct Fixture {
        gc: ObjectAllocator,
        strings: StringPool,
        table: LuaTable,
    }

    impl Fixture {
        fn new() -> Self {
            let mut gc = ObjectAllocator::new(usize::MAX);
            let option = SafeOption {
                string_seed: Some(0x5eed),
                ..SafeOption::default()
            };
            let strings = StringPool::new(&mut gc, &option).unwrap();
            let header = GcHeader::with_white(withvariant(LUA_VTABLE), 0, None);
            Fixture {
                gc,
                strings,
                table: LuaTable::new(header),
            }
        }

        fn set(&mut self, key: LuaValue, value: LuaValue) -> LuaResult<()> {
            let mut env = TableEnv {
                strings: &self.strings,
                gc: &mut self.gc,
                owner: TableId(0),
                max_hash_bits: 30,
            };
            self.table.set(key, value, &mut env)
        }

        fn get(&self, key: LuaValue) -> LuaValue {
            self.table.get(&key, &self.strings)
        }

        fn resize(&mut self, nasize: usize, nhsize: usize) {
            let mut env = TableEnv {
                strings: &self.strings,
                gc: &mut self.gc,
                owner: TableId(0),
                max_hash_bits: 30,
            };
            self.table.resize(nasize, nhsize, &mut env).unwrap();
        }

        fn next(&self, key: LuaValue) -> Option<(LuaValue, LuaValue)> {
            self.table.next(&key, &self.strings).unwrap()
        }
    }

    #[test]
    fn test_empty_table() {
        let f = Fixture::new();
        assert_eq!(f.table.array_size(), 0);
        assert_eq!(f.table.hash_size(), 0);
        assert!(f.get(LuaValue::integer(1)).is_nil());
        assert_eq!(f.table.length(), 0);
        assert_eq!(f.table.next(&NIL, &f.strings), Ok(None));
    }

    #[test]
    fn test_float_key_normalized() {
        let mut f = Fixture::new();
        f.set(LuaValue::float(3.0), LuaValue::integer(30)).unwrap();
        assert_eq!(f.get(LuaValue::integer(3)), LuaValue::integer(30));
        assert_eq!(f.get(LuaValue::float(3.0)), LuaValue::integer(30));
        let (k, _) = f.table.next(&NIL, &f.strings).unwrap().unwrap();
        assert!(k.ttisinteger());
    }

    #[test]
    fn test_invalid_keys() {
        let mut f = Fixture::new();
        assert_eq!(f.set(NIL, LuaValue::integer(1)), Err(LuaError::NilIndex));
        assert_eq!(
            f.set(LuaValue::float(f64::NAN), LuaValue::integer(1)),
            Err(LuaError::NaNIndex)
        );
        // nil value does not hide the key error
        assert_eq!(f.set(NIL, NIL), Err(LuaError::NilIndex));
        assert_eq!(f.table.hash_size(), 0);
        assert_eq!(f.table.array_size(), 0);
    }

    #[test]
    fn test_nil_store_creates_nothing() {
        let mut f = Fixture::new();
        f.set(LuaValue::integer(10), NIL).unwrap();
        assert_eq!(f.table.hash_size(), 0);
    }

    #[test]
    fn test_tombstone_keeps_chain() {
        let mut f = Fixture::new();
        for i in 0..8 {
            f.set(LuaValue::float(i as f64 + 0.5), LuaValue::integer(i)).unwrap();
        }
        f.set(LuaValue::float(0.5), NIL).unwrap();
        for i in 1..8 {
            assert_eq!(f.get(LuaValue::float(i as f64 + 0.5)), LuaValue::integer(i));
        }
        assert!(f.get(LuaValue::float(0.5)).is_nil());
        // storing again reuses the tombstone
        let size = f.table.hash_size();
        f.set(LuaValue::float(0.5), LuaValue::boolean(true)).unwrap();
        assert_eq!(f.table.hash_size(), size);
        assert!(f.table.main_position_holds(&f.strings));
    }

    #[test]
    fn test_clear_dead_keys_next() {
        let mut f = Fixture::new();
        let a = LuaValue::table(TableId(7));
        let b = LuaValue::table(TableId(8));
        f.set(a, LuaValue::integer(1)).unwrap();
        f.set(b, LuaValue::integer(2)).unwrap();
        f.set(a, NIL).unwrap();
        f.table.clear_dead_keys();
        // both keys share node 0 as home: `a` stays there, `b` takes node 1.
        // `a` was returned by an earlier `next`; it still resolves
        assert!(f.table.node[0].key.ttisdeadkey());
        assert_eq!(f.next(a), Some((b, LuaValue::integer(2))));
        assert_eq!(f.next(b), None);
        let all: Vec<_> = f.table.iter().collect();
        assert_eq!(all, vec![(b, LuaValue::integer(2))]);
    }

    #[test]
    fn test_dead_key_of_other_kind_in_chain() {
        let mut f = Fixture::new();
        f.resize(0, 4);
        // a string whose home node is also the home of the table with the
        // same arena index
        let mut s = NIL;
        for i in 0..64 {
            let v = f.strings.intern(&mut f.gc, format!("s{}", i).as_bytes()).unwrap();
            if (f.strings.hash(v.tsvalue()) as usize & 3) == (v.tsvalue().0 as usize % 3) {
                s = v;
                break;
            }
        }
        assert!(!s.is_nil());
        let t = LuaValue::table(TableId(s.tsvalue().0));
        let mp = f.table.main_position(&s, &f.strings);
        assert_eq!(f.table.main_position(&t, &f.strings), mp);

        f.set(s, LuaValue::integer(1)).unwrap();
        f.set(t, LuaValue::integer(2)).unwrap();
        f.set(s, NIL).unwrap();
        f.table.clear_dead_keys();
        assert!(f.table.node[mp].key.ttisdeadkey());

        assert_eq!(f.next(NIL), Some((t, LuaValue::integer(2))));
        assert_eq!(f.next(t), None);
        // the dead string still resolves to its own node
        assert_eq!(f.next(s), Some((t, LuaValue::integer(2))));
        assert!(f.table.main_position_holds(&f.strings));
    }

    #[test]
    fn test_main_position_holds_with_dead_home() {
        let mut f = Fixture::new();
        f.resize(0, 4);
        // indices 0 and 3 hash to node 0 of a 4 node part
        let a = LuaValue::table(TableId(0));
        let b = LuaValue::table(TableId(3));
        f.set(a, LuaValue::integer(1)).unwrap();
        f.set(b, LuaValue::integer(2)).unwrap();
        assert!(f.table.main_position_holds(&f.strings));

        f.set(a, NIL).unwrap();
        f.table.clear_dead_keys();
        assert!(f.table.main_position_holds(&f.strings));
        assert_eq!(f.get(b), LuaValue::integer(2));
        assert_eq!(f.next(NIL), Some((b, LuaValue::integer(2))));
        assert_eq!(f.next(b), None);

        // storing the cleared key again reuses its home node
        f.set(a, LuaValue::integer(3)).unwrap();
        assert_eq!(f.table.hash_size(), 4);
        assert!(f.table.main_position_holds(&f.strings));
        assert_eq!(f.get(a), LuaValue::integer(3));
        assert_eq!(f.get(b), LuaValue::integer(2));
    }
}
