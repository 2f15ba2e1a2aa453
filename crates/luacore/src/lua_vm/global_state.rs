// GlobalState - owner of everything the value core allocates
//
// Holds the allocator, the string pool and the table arena, and exposes the
// raw (metamethod-free) operations the interpreter builds on. Objects are
// named by ids; an id that does not refer to a live object of the right
// kind yields `LuaError::InvalidObject`.
use crate::gc::{
    GcHeader, GcId, GcObject, GcPool, ObjectAllocator, StringId, StringPool, TableId, WriteBarrier,
};
use crate::lua_value::{LUA_VTABLE, LuaString, LuaTable, LuaValue, TableEnv, withvariant};
use crate::lua_vm::lua_limits::MEMERRMSG;
use crate::{LuaError, LuaResult, SafeOption};

pub struct GlobalState {
    gc: ObjectAllocator,
    strings: StringPool,
    tables: GcPool<LuaTable>,
    option: SafeOption,
    /// Preallocated, fixed "not enough memory" string
    memerrmsg: LuaValue,
}

/// Split borrow of the state for one table operation
macro_rules! table_env {
    ($state:expr, $t:expr) => {{
        let GlobalState {
            gc,
            strings,
            tables,
            option,
            ..
        } = $state;
        let table = tables.get_mut($t.0).ok_or(LuaError::InvalidObject)?;
        let env = TableEnv {
            strings,
            gc,
            owner: $t,
            max_hash_bits: option.max_hash_bits,
        };
        (table, env)
    }};
}

impl GlobalState {
    /// Port of lstate.c: lua_newstate / f_luaopen (string table and the
    /// memory error message)
    pub fn new(option: SafeOption) -> LuaResult<Self> {
        let mut gc = ObjectAllocator::new(option.max_memory_limit);
        let strings = StringPool::new(&mut gc, &option)?;
        let mut state = Self {
            gc,
            strings,
            tables: GcPool::new(),
            option,
            memerrmsg: LuaValue::nil(),
        };
        let msg = state.create_string(MEMERRMSG)?;
        if let Some(id) = msg.as_gc_id() {
            state.fix_object(id)?;
        }
        state.memerrmsg = msg;
        Ok(state)
    }

    pub fn with_barrier(option: SafeOption, barrier: Box<dyn WriteBarrier>) -> LuaResult<Self> {
        let mut state = Self::new(option)?;
        state.gc.set_barrier(barrier);
        Ok(state)
    }

    #[inline]
    pub fn option(&self) -> &SafeOption {
        &self.option
    }

    #[inline]
    pub fn allocator(&self) -> &ObjectAllocator {
        &self.gc
    }

    #[inline]
    pub fn allocator_mut(&mut self) -> &mut ObjectAllocator {
        &mut self.gc
    }

    #[inline]
    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    pub fn memory_error_message(&self) -> LuaValue {
        self.memerrmsg
    }

    // ==================== Strings ====================

    pub fn create_string(&mut self, s: impl AsRef<[u8]>) -> LuaResult<LuaValue> {
        self.strings.intern(&mut self.gc, s.as_ref())
    }

    pub fn string(&self, id: StringId) -> Option<&LuaString> {
        self.strings.get(id)
    }

    /// Content of a string value
    pub fn string_bytes(&self, value: &LuaValue) -> Option<&[u8]> {
        self.string(value.as_string_id()?).map(|s| s.as_bytes())
    }

    /// Intern `word`, fix it and mark it as reserved word `index`.
    /// Port of llex.c: luaX_init
    pub fn create_reserved_word(&mut self, word: &str, index: u8) -> LuaResult<LuaValue> {
        let value = self.create_string(word)?;
        debug_assert!(value.ttisshrstring(), "reserved words are short strings");
        let id = value.tsvalue();
        self.fix_object(GcId::StringId(id))?;
        self.strings.set_reserved(id, index);
        Ok(value)
    }

    /// Collector hook: shrink the string table when it is mostly empty
    pub fn check_string_table_size(&mut self) -> LuaResult<()> {
        self.strings.check_size(&mut self.gc)
    }

    // ==================== Tables ====================

    /// New table with room for `narray` array entries and `nhash` hashed
    /// keys. Port of lapi.c: lua_createtable
    pub fn create_table(&mut self, narray: usize, nhash: usize) -> LuaResult<LuaValue> {
        let id = TableId(self.tables.reserve_slot()?);
        let header = self.gc.allocate(
            GcId::TableId(id),
            withvariant(LUA_VTABLE),
            std::mem::size_of::<LuaTable>(),
        )?;
        self.tables.alloc(LuaTable::new(header));
        if narray > 0 || nhash > 0 {
            if let Err(e) = self.resize_table(id, narray, nhash) {
                self.free_object(GcId::TableId(id))?;
                return Err(e);
            }
        }
        Ok(LuaValue::table(id))
    }

    pub fn table(&self, id: TableId) -> Option<&LuaTable> {
        self.tables.get(id.0)
    }

    fn table_ref(&self, id: TableId) -> LuaResult<&LuaTable> {
        self.tables.get(id.0).ok_or(LuaError::InvalidObject)
    }

    pub fn raw_get(&self, t: TableId, key: &LuaValue) -> LuaResult<LuaValue> {
        Ok(self.table_ref(t)?.get(key, &self.strings))
    }

    pub fn raw_get_int(&self, t: TableId, key: i64) -> LuaResult<LuaValue> {
        Ok(self.table_ref(t)?.get_int(key))
    }

    pub fn raw_set(&mut self, t: TableId, key: LuaValue, value: LuaValue) -> LuaResult<()> {
        let (table, mut env) = table_env!(self, t);
        table.set(key, value, &mut env)
    }

    pub fn raw_set_int(&mut self, t: TableId, key: i64, value: LuaValue) -> LuaResult<()> {
        let (table, mut env) = table_env!(self, t);
        table.set_int(key, value, &mut env)
    }

    pub fn raw_len(&self, t: TableId) -> LuaResult<u64> {
        Ok(self.table_ref(t)?.length())
    }

    pub fn next(&self, t: TableId, key: &LuaValue) -> LuaResult<Option<(LuaValue, LuaValue)>> {
        self.table_ref(t)?.next(key, &self.strings)
    }

    pub fn resize_table(&mut self, t: TableId, nasize: usize, nhsize: usize) -> LuaResult<()> {
        let (table, mut env) = table_env!(self, t);
        table.resize(nasize, nhsize, &mut env)
    }

    pub fn resize_table_array(&mut self, t: TableId, nasize: usize) -> LuaResult<()> {
        let (table, mut env) = table_env!(self, t);
        table.resize_array(nasize, &mut env)
    }

    /// Collector hook: turn the collectable keys of cleared entries into
    /// dead keys
    pub fn clear_dead_keys(&mut self, t: TableId) -> LuaResult<()> {
        self.tables
            .get_mut(t.0)
            .ok_or(LuaError::InvalidObject)?
            .clear_dead_keys();
        Ok(())
    }

    pub fn get_metatable(&self, t: TableId) -> LuaResult<Option<TableId>> {
        Ok(self.table_ref(t)?.get_metatable())
    }

    pub fn set_metatable(&mut self, t: TableId, metatable: Option<TableId>) -> LuaResult<()> {
        if let Some(mt) = metatable {
            self.table_ref(mt)?;
        }
        let (table, mut env) = table_env!(self, t);
        table.set_metatable(metatable, &mut env);
        Ok(())
    }

    // ==================== Object lists ====================

    pub fn header(&self, id: GcId) -> Option<&GcHeader> {
        match id {
            GcId::StringId(s) => self.strings.get(s).map(|o| o.header()),
            GcId::TableId(t) => self.tables.get(t.0).map(|o| o.header()),
            _ => None,
        }
    }

    fn header_mut(&mut self, id: GcId) -> Option<&mut GcHeader> {
        match id {
            GcId::StringId(s) => self.strings.get_mut(s).map(|o| o.header_mut()),
            GcId::TableId(t) => self.tables.get_mut(t.0).map(|o| o.header_mut()),
            _ => None,
        }
    }

    /// Walk an intrusive list starting at `head`
    fn list(&self, head: Option<GcId>) -> impl Iterator<Item = GcId> + '_ {
        std::iter::successors(head, move |id| self.header(*id).and_then(|h| h.next))
    }

    /// Every collectable object, newest first
    pub fn all_objects(&self) -> impl Iterator<Item = GcId> + '_ {
        self.list(self.gc.all_gc)
    }

    /// Objects that are never collected
    pub fn fixed_objects(&self) -> impl Iterator<Item = GcId> + '_ {
        self.list(self.gc.fixed_gc)
    }

    /// Remove `id` from the list starting at `head`; returns the new head
    /// and whether the object was found.
    fn unlink(&mut self, head: Option<GcId>, id: GcId) -> LuaResult<(Option<GcId>, bool)> {
        let next = self.header(id).ok_or(LuaError::InvalidObject)?.next;
        if head == Some(id) {
            return Ok((next, true));
        }
        let mut cursor = head;
        while let Some(cur) = cursor {
            let cur_next = self.header(cur).and_then(|h| h.next);
            if cur_next == Some(id) {
                if let Some(h) = self.header_mut(cur) {
                    h.next = next;
                }
                return Ok((head, true));
            }
            cursor = cur_next;
        }
        Ok((head, false))
    }

    /// Move an object to the list of objects that are never collected.
    /// Port of lgc.c: luaC_fix
    pub fn fix_object(&mut self, id: GcId) -> LuaResult<()> {
        let (all_gc, found) = self.unlink(self.gc.all_gc, id)?;
        if !found {
            // already fixed
            return Ok(());
        }
        self.gc.all_gc = all_gc;
        let fixed = self.gc.fixed_gc;
        if let Some(h) = self.header_mut(id) {
            h.set_fixed();
            h.next = fixed;
        }
        self.gc.fixed_gc = Some(id);
        Ok(())
    }

    /// Free an object the collector found unreachable: unlink it, drop it
    /// from its arena and give its memory back. Port of lgc.c: freeobj
    pub fn free_object(&mut self, id: GcId) -> LuaResult<()> {
        if self.header(id).is_some_and(|h| h.is_fixed()) {
            return Err(LuaError::InvalidObject);
        }
        let (all_gc, found) = self.unlink(self.gc.all_gc, id)?;
        if !found {
            return Err(LuaError::InvalidObject);
        }
        self.gc.all_gc = all_gc;
        let size = match id {
            GcId::StringId(s) => self.strings.free(s).map(|o| o.size_in_bytes()),
            GcId::TableId(t) => self.tables.free(t.0).map(|o| o.size_in_bytes()),
            _ => None,
        };
        self.gc.release(size.unwrap_or(0));
        Ok(())
    }

    /// Whether a collectable value names a live object whose header tag
    /// matches the value's tag. Non-collectable values always pass.
    pub fn check_value(&self, value: &LuaValue) -> bool {
        match value.as_gc_id() {
            None => true,
            Some(id @ (GcId::StringId(_) | GcId::TableId(_))) => self
                .header(id)
                .is_some_and(|h| h.tt == withvariant(value.tt())),
            // owned by the interpreter
            Some(_) => true,
        }
    }
}
