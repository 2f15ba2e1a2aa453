use std::cell::RefCell;
use std::rc::Rc;

use super::{new_state, new_table};
use crate::lua_value::{LUA_TSTRING, novariant};
use crate::{
    FunctionId, GcId, GcObject, GlobalState, LuaError, LuaValue, SafeOption, StringId, TableId,
    WriteBarrier,
};

/// Barrier that records every reference it is told about
#[derive(Clone, Default)]
struct RecordingBarrier {
    writes: Rc<RefCell<Vec<(GcId, LuaValue)>>>,
}

impl WriteBarrier for RecordingBarrier {
    fn on_reference_written(&mut self, owner: GcId, value: &LuaValue) {
        self.writes.borrow_mut().push((owner, *value));
    }
}

fn recording_state() -> (GlobalState, RecordingBarrier) {
    let barrier = RecordingBarrier::default();
    let state = GlobalState::with_barrier(
        SafeOption {
            string_seed: Some(1),
            ..SafeOption::default()
        },
        Box::new(barrier.clone()),
    )
    .unwrap();
    (state, barrier)
}

#[test]
fn test_objects_listed_newest_first() {
    let mut state = new_state();
    let s = state.create_string("first").unwrap();
    let t = new_table(&mut state);
    let objects: Vec<_> = state.all_objects().take(2).collect();
    assert_eq!(objects, vec![GcId::TableId(t), GcId::StringId(s.tsvalue())]);

    // the memory error message is fixed at creation
    let msg = state.memory_error_message();
    let fixed: Vec<_> = state.fixed_objects().collect();
    assert_eq!(fixed, vec![GcId::StringId(msg.tsvalue())]);
    assert!(!state.all_objects().any(|id| id == GcId::StringId(msg.tsvalue())));
}

#[test]
fn test_new_objects_are_current_white() {
    let mut state = new_state();
    let t = new_table(&mut state);
    let header = *state.header(GcId::TableId(t)).unwrap();
    assert!(header.is_white());
    assert!(!header.is_dead(state.allocator().other_white()));
    state.allocator_mut().flip_white();
    let header = *state.header(GcId::TableId(t)).unwrap();
    assert!(header.is_dead(state.allocator().other_white()));
    let t2 = new_table(&mut state);
    let header = *state.header(GcId::TableId(t2)).unwrap();
    assert!(!header.is_dead(state.allocator().other_white()));
}

#[test]
fn test_memory_accounting() {
    let mut state = new_state();
    let base = state.allocator().total_bytes();
    let t = new_table(&mut state);
    let table_bytes = state.table(t).unwrap().size_in_bytes();
    assert_eq!(state.allocator().total_bytes(), base + table_bytes);

    for i in 1..=100 {
        state.raw_set_int(t, i, LuaValue::integer(i)).unwrap();
    }
    let grown = state.table(t).unwrap().size_in_bytes();
    assert!(grown > table_bytes);
    assert_eq!(state.allocator().total_bytes(), base + grown);

    state.free_object(GcId::TableId(t)).unwrap();
    assert_eq!(state.allocator().total_bytes(), base);
}

#[test]
fn test_free_object() {
    let mut state = new_state();
    let a = new_table(&mut state);
    let b = new_table(&mut state);
    let c = new_table(&mut state);
    state.free_object(GcId::TableId(b)).unwrap();
    let objects: Vec<_> = state.all_objects().take(2).collect();
    assert_eq!(objects, vec![GcId::TableId(c), GcId::TableId(a)]);
    assert!(state.table(b).is_none());
    assert_eq!(
        state.free_object(GcId::TableId(b)),
        Err(LuaError::InvalidObject)
    );
    assert_eq!(
        state.free_object(GcId::FunctionId(FunctionId(0))),
        Err(LuaError::InvalidObject)
    );
    let msg = state.memory_error_message().tsvalue();
    assert_eq!(
        state.free_object(GcId::StringId(msg)),
        Err(LuaError::InvalidObject)
    );
}

#[test]
fn test_freed_slot_is_reused() {
    let mut state = new_state();
    let a = new_table(&mut state);
    state.raw_set_int(a, 1, LuaValue::integer(1)).unwrap();
    state.free_object(GcId::TableId(a)).unwrap();
    let b = new_table(&mut state);
    assert_eq!(a, b);
    // the new table starts empty
    assert!(state.raw_get_int(b, 1).unwrap().is_nil());
}

#[test]
fn test_check_value() {
    let mut state = new_state();
    let t = state.create_table(0, 0).unwrap();
    let s = state.create_string("abc").unwrap();
    assert!(state.check_value(&t));
    assert!(state.check_value(&s));
    assert!(state.check_value(&LuaValue::integer(1)));
    assert!(state.check_value(&LuaValue::function(FunctionId(5))));
    assert!(!state.check_value(&LuaValue::table(TableId(77))));
    // a string id read as a table does not match the header
    assert!(!state.check_value(&LuaValue::table(TableId(s.tsvalue().0))));
    // the memory error message is short, so a long-string value cannot name it
    let msg = state.memory_error_message().tsvalue();
    assert!(!state.check_value(&LuaValue::longstring(msg)));
    assert!(!state.check_value(&LuaValue::shortstring(StringId(999))));
    state.free_object(GcId::TableId(t.hvalue())).unwrap();
    assert!(!state.check_value(&t));
}

#[test]
fn test_barrier_sees_collectable_writes() {
    let (mut state, barrier) = recording_state();
    let t = new_table(&mut state);
    let mt = new_table(&mut state);
    let key = state.create_string("key").unwrap();
    let value = state.create_table(0, 0).unwrap();
    barrier.writes.borrow_mut().clear();

    state.raw_set_int(t, 1, LuaValue::integer(5)).unwrap();
    state.raw_set(t, LuaValue::boolean(true), LuaValue::float(1.5)).unwrap();
    assert!(barrier.writes.borrow().is_empty());

    state.raw_set(t, key, value).unwrap();
    state.set_metatable(t, Some(mt)).unwrap();
    let writes = barrier.writes.borrow();
    let owner = GcId::TableId(t);
    assert!(writes.iter().all(|(o, _)| *o == owner));
    assert!(writes.contains(&(owner, key)));
    assert!(writes.contains(&(owner, value)));
    assert!(writes.contains(&(owner, LuaValue::table(mt))));
}

#[test]
fn test_barrier_sees_relocated_entries() {
    let (mut state, barrier) = recording_state();
    let t = new_table(&mut state);
    let keys: Vec<_> = (0..4)
        .map(|i| state.create_string(format!("s{}", i)).unwrap())
        .collect();
    for k in &keys {
        state.raw_set(t, *k, LuaValue::integer(0)).unwrap();
    }
    barrier.writes.borrow_mut().clear();
    // the fifth key forces a rehash that reinserts every string key
    let fifth = state.create_string("s4").unwrap();
    state.raw_set(t, fifth, LuaValue::integer(0)).unwrap();
    let writes = barrier.writes.borrow();
    for k in keys.iter().chain(std::iter::once(&fifth)) {
        assert!(writes.contains(&(GcId::TableId(t), *k)), "{:?}", k);
    }
}

#[test]
fn test_object_ids_and_tags() {
    let mut state = new_state();
    let s = state.create_string("x").unwrap();
    let t = state.create_table(0, 0).unwrap();
    assert_eq!(s.as_gc_id(), Some(GcId::StringId(s.tsvalue())));
    assert_eq!(t.as_gc_id(), Some(GcId::TableId(t.hvalue())));
    assert_eq!(GcId::TableId(t.hvalue()).index(), t.hvalue().0);
    assert_eq!(LuaValue::integer(3).as_gc_id(), None);
    let header = state.header(GcId::TableId(t.hvalue())).unwrap();
    assert_eq!(novariant(header.tt), GcId::TableId(t.hvalue()).type_tag());
    let header = state.header(GcId::StringId(s.tsvalue())).unwrap();
    assert_eq!(novariant(header.tt), LUA_TSTRING);
}
