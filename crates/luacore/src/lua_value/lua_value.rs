// LuaValue - tagged value of the Lua core
//
// Layout:
// - Value union: 8 bytes (i64 / f64 / raw address / arena index)
// - tt: 1 byte type tag
// - 16 bytes in total with padding
//
// Type tag encoding (bits 0-6):
// - Bits 0-3: basic type (LUA_TNIL, LUA_TBOOLEAN, LUA_TNUMBER, etc.)
// - Bits 4-5: variant bits (integer/float, short/long string, closure kinds)
// - Bit 6: BIT_ISCOLLECTABLE (payload is the arena index of a heap object)
//
// Collectable payloads are plain indices, so a value never owns anything and
// copying one is always a bit copy.
use crate::{FunctionId, GcId, ProtoId, StringId, TableId, ThreadId, UserdataId};

// ============ Basic type tags (bits 0-3) ============
pub const LUA_TNIL: u8 = 0;
pub const LUA_TBOOLEAN: u8 = 1;
pub const LUA_TLIGHTUSERDATA: u8 = 2;
pub const LUA_TNUMBER: u8 = 3;
pub const LUA_TSTRING: u8 = 4;
pub const LUA_TTABLE: u8 = 5;
pub const LUA_TFUNCTION: u8 = 6;
pub const LUA_TUSERDATA: u8 = 7;
pub const LUA_TTHREAD: u8 = 8;

// Internal kinds, never visible to Lua code
pub const LUA_TPROTO: u8 = 9; // function prototype
pub const LUA_TDEADKEY: u8 = 10; // key of a removed table entry

/// Dead keys keep the original tag above the 32-bit arena index
const DEADKEY_TAG_SHIFT: u32 = 32;

// ============ Variant tags (with bits 4-5) ============
macro_rules! makevariant {
    ($base:expr, $variant:expr) => {
        $base | ($variant << 4)
    };
}

// Collectable types (bit 6 set)
pub const BIT_ISCOLLECTABLE: u8 = 1 << 6;

pub const LUA_VNIL: u8 = makevariant!(LUA_TNIL, 0);

pub const LUA_VFALSE: u8 = makevariant!(LUA_TBOOLEAN, 0);
pub const LUA_VTRUE: u8 = makevariant!(LUA_TBOOLEAN, 1);

pub const LUA_VNUMINT: u8 = makevariant!(LUA_TNUMBER, 0); // integer
pub const LUA_VNUMFLT: u8 = makevariant!(LUA_TNUMBER, 1); // float

// Light userdata (NOT collectable)
pub const LUA_VLIGHTUSERDATA: u8 = makevariant!(LUA_TLIGHTUSERDATA, 0);

pub const LUA_VSHRSTR: u8 = makevariant!(LUA_TSTRING, 0) | BIT_ISCOLLECTABLE; // 0x44 - short string (interned)
pub const LUA_VLNGSTR: u8 = makevariant!(LUA_TSTRING, 1) | BIT_ISCOLLECTABLE; // 0x54 - long string

pub const LUA_VTABLE: u8 = LUA_TTABLE | BIT_ISCOLLECTABLE; // 0x45

pub const LUA_VLCL: u8 = makevariant!(LUA_TFUNCTION, 0) | BIT_ISCOLLECTABLE; // 0x46 - Lua closure
pub const LUA_VLCF: u8 = makevariant!(LUA_TFUNCTION, 1); // 0x16 - light C function
pub const LUA_VCCL: u8 = makevariant!(LUA_TFUNCTION, 2) | BIT_ISCOLLECTABLE; // 0x66 - C closure

pub const LUA_VUSERDATA: u8 = LUA_TUSERDATA | BIT_ISCOLLECTABLE; // 0x47
pub const LUA_VTHREAD: u8 = LUA_TTHREAD | BIT_ISCOLLECTABLE; // 0x48
pub const LUA_VPROTO: u8 = LUA_TPROTO | BIT_ISCOLLECTABLE; // 0x49

#[inline(always)]
pub const fn novariant(tt: u8) -> u8 {
    tt & 0x0F
}

#[inline(always)]
pub const fn withvariant(tt: u8) -> u8 {
    tt & 0x3F
}

// ============ Value union ============
/// 8-byte payload, interpreted according to the tag
#[derive(Clone, Copy)]
#[repr(C)]
pub union Value {
    pub i: i64,  // integer number
    pub n: f64,  // float number
    pub p: u64,  // light userdata / light C function address
    pub gc: u64, // arena index of a collectable object
}

impl Value {
    #[inline(always)]
    pub const fn nil() -> Self {
        Value { i: 0 }
    }

    #[inline(always)]
    pub const fn integer(i: i64) -> Self {
        Value { i }
    }

    #[inline(always)]
    pub const fn float(n: f64) -> Self {
        Value { n }
    }

    #[inline(always)]
    pub const fn gc(index: u32) -> Self {
        Value { gc: index as u64 }
    }

    /// Every variant is 8 bytes wide, so the bits are always initialized
    #[inline(always)]
    pub fn bits(&self) -> u64 {
        unsafe { self.p }
    }
}

/// The tagged value
#[derive(Clone, Copy)]
#[repr(C)]
pub struct LuaValue {
    pub(crate) value: Value,
    pub(crate) tt: u8,
}

/// Canonical shared nil, handed out for absent entries
pub const NIL: LuaValue = LuaValue::nil();

/// Exact float to integer conversion; `None` when `f` has a fractional
/// part, is out of the i64 range or is not a number.
#[inline]
pub fn float_to_integer(f: f64) -> Option<i64> {
    if f >= i64::MIN as f64 && f < -(i64::MIN as f64) {
        let i = f as i64;
        if i as f64 == f {
            return Some(i);
        }
    }
    None
}

impl LuaValue {
    // ============ Constructors ============

    #[inline(always)]
    pub const fn nil() -> Self {
        Self {
            value: Value::nil(),
            tt: LUA_VNIL,
        }
    }

    #[inline(always)]
    pub const fn boolean(b: bool) -> Self {
        Self {
            value: Value::nil(),
            tt: if b { LUA_VTRUE } else { LUA_VFALSE },
        }
    }

    #[inline(always)]
    pub const fn integer(i: i64) -> Self {
        Self {
            value: Value::integer(i),
            tt: LUA_VNUMINT,
        }
    }

    #[inline(always)]
    pub const fn float(n: f64) -> Self {
        Self {
            value: Value::float(n),
            tt: LUA_VNUMFLT,
        }
    }

    #[inline(always)]
    pub const fn lightuserdata(addr: usize) -> Self {
        Self {
            value: Value { p: addr as u64 },
            tt: LUA_VLIGHTUSERDATA,
        }
    }

    #[inline(always)]
    pub const fn light_cfunction(addr: usize) -> Self {
        Self {
            value: Value { p: addr as u64 },
            tt: LUA_VLCF,
        }
    }

    #[inline(always)]
    pub const fn shortstring(id: StringId) -> Self {
        Self {
            value: Value::gc(id.0),
            tt: LUA_VSHRSTR,
        }
    }

    #[inline(always)]
    pub const fn longstring(id: StringId) -> Self {
        Self {
            value: Value::gc(id.0),
            tt: LUA_VLNGSTR,
        }
    }

    #[inline(always)]
    pub const fn table(id: TableId) -> Self {
        Self {
            value: Value::gc(id.0),
            tt: LUA_VTABLE,
        }
    }

    /// Lua closure
    #[inline(always)]
    pub const fn function(id: FunctionId) -> Self {
        Self {
            value: Value::gc(id.0),
            tt: LUA_VLCL,
        }
    }

    #[inline(always)]
    pub const fn cclosure(id: FunctionId) -> Self {
        Self {
            value: Value::gc(id.0),
            tt: LUA_VCCL,
        }
    }

    #[inline(always)]
    pub const fn userdata(id: UserdataId) -> Self {
        Self {
            value: Value::gc(id.0),
            tt: LUA_VUSERDATA,
        }
    }

    #[inline(always)]
    pub const fn thread(id: ThreadId) -> Self {
        Self {
            value: Value::gc(id.0),
            tt: LUA_VTHREAD,
        }
    }

    #[inline(always)]
    pub const fn proto(id: ProtoId) -> Self {
        Self {
            value: Value::gc(id.0),
            tt: LUA_VPROTO,
        }
    }

    /// Generic reference constructor: `kind` and `variant` must describe an
    /// object of the same kind as `id`.
    #[inline]
    pub fn from_gc(kind: u8, variant: u8, id: GcId) -> Self {
        debug_assert_eq!(kind, id.type_tag(), "reference kind does not match id");
        debug_assert!(variant < 4, "variant has two bits");
        Self {
            value: Value::gc(id.index()),
            tt: makevariant!(kind, variant) | BIT_ISCOLLECTABLE,
        }
    }

    /// Tombstone for a collectable key whose entry was cleared.
    /// The arena index stays in the low 32 bits and the original tag moves
    /// to bits 32-39: ids of different kinds share index ranges, so `next`
    /// needs both to locate the entry.
    #[inline]
    pub(crate) fn to_dead_key(self) -> Self {
        debug_assert!(self.iscollectable());
        Self {
            value: Value {
                gc: (self.gcvalue() as u64) | ((self.tt as u64) << DEADKEY_TAG_SHIFT),
            },
            tt: LUA_TDEADKEY,
        }
    }

    /// Tag of the key a dead key was made from
    #[inline]
    pub fn dead_key_tag(&self) -> u8 {
        debug_assert!(self.ttisdeadkey());
        (self.raw_bits() >> DEADKEY_TAG_SHIFT) as u8
    }

    /// Whether this dead key was made from `key`: same object kind and index
    #[inline]
    pub fn is_dead_key_of(&self, key: &LuaValue) -> bool {
        self.ttisdeadkey()
            && key.iscollectable()
            && self.dead_key_tag() == key.tt
            && self.gcvalue() == key.gcvalue()
    }

    // ============ Tag predicates ============

    #[inline(always)]
    pub fn tt(&self) -> u8 {
        self.tt
    }

    /// Basic type without variant bits
    #[inline(always)]
    pub fn ttype(&self) -> u8 {
        novariant(self.tt)
    }

    /// Type tag with variant bits but without the collectable bit
    #[inline(always)]
    pub fn ttypetag(&self) -> u8 {
        withvariant(self.tt)
    }

    #[inline(always)]
    pub fn checktag(&self, t: u8) -> bool {
        self.tt == t
    }

    #[inline(always)]
    pub fn checktype(&self, t: u8) -> bool {
        novariant(self.tt) == t
    }

    #[inline(always)]
    pub fn iscollectable(&self) -> bool {
        self.tt & BIT_ISCOLLECTABLE != 0
    }

    #[inline(always)]
    pub fn ttisnil(&self) -> bool {
        self.checktype(LUA_TNIL)
    }

    #[inline(always)]
    pub fn ttisboolean(&self) -> bool {
        self.checktype(LUA_TBOOLEAN)
    }

    #[inline(always)]
    pub fn ttisfalse(&self) -> bool {
        self.checktag(LUA_VFALSE)
    }

    #[inline(always)]
    pub fn ttistrue(&self) -> bool {
        self.checktag(LUA_VTRUE)
    }

    #[inline(always)]
    pub fn ttisnumber(&self) -> bool {
        self.checktype(LUA_TNUMBER)
    }

    #[inline(always)]
    pub fn ttisinteger(&self) -> bool {
        self.checktag(LUA_VNUMINT)
    }

    #[inline(always)]
    pub fn ttisfloat(&self) -> bool {
        self.checktag(LUA_VNUMFLT)
    }

    #[inline(always)]
    pub fn ttisstring(&self) -> bool {
        self.checktype(LUA_TSTRING)
    }

    #[inline(always)]
    pub fn ttisshrstring(&self) -> bool {
        self.checktag(LUA_VSHRSTR)
    }

    #[inline(always)]
    pub fn ttislngstring(&self) -> bool {
        self.checktag(LUA_VLNGSTR)
    }

    #[inline(always)]
    pub fn ttistable(&self) -> bool {
        self.checktag(LUA_VTABLE)
    }

    #[inline(always)]
    pub fn ttisfunction(&self) -> bool {
        self.checktype(LUA_TFUNCTION)
    }

    #[inline(always)]
    pub fn ttislcf(&self) -> bool {
        self.checktag(LUA_VLCF)
    }

    #[inline(always)]
    pub fn ttislightuserdata(&self) -> bool {
        self.checktag(LUA_VLIGHTUSERDATA)
    }

    #[inline(always)]
    pub fn ttisfulluserdata(&self) -> bool {
        self.checktag(LUA_VUSERDATA)
    }

    #[inline(always)]
    pub fn ttisthread(&self) -> bool {
        self.checktag(LUA_VTHREAD)
    }

    #[inline(always)]
    pub fn ttisdeadkey(&self) -> bool {
        self.checktag(LUA_TDEADKEY)
    }

    // ============ Unchecked accessors ============
    // The caller checks the tag first; debug builds verify it.

    #[inline(always)]
    pub fn bvalue(&self) -> bool {
        debug_assert!(self.ttisboolean());
        self.tt == LUA_VTRUE
    }

    #[inline(always)]
    pub fn ivalue(&self) -> i64 {
        debug_assert!(self.ttisinteger());
        unsafe { self.value.i }
    }

    #[inline(always)]
    pub fn fltvalue(&self) -> f64 {
        debug_assert!(self.ttisfloat());
        unsafe { self.value.n }
    }

    #[inline(always)]
    pub fn pvalue(&self) -> usize {
        debug_assert!(self.ttislightuserdata() || self.ttislcf());
        unsafe { self.value.p as usize }
    }

    /// Arena index of the referenced object (also valid for dead keys)
    #[inline(always)]
    pub fn gcvalue(&self) -> u32 {
        debug_assert!(self.iscollectable() || self.ttisdeadkey());
        unsafe { self.value.gc as u32 }
    }

    #[inline(always)]
    pub fn tsvalue(&self) -> StringId {
        debug_assert!(self.ttisstring());
        StringId(self.gcvalue())
    }

    #[inline(always)]
    pub fn hvalue(&self) -> TableId {
        debug_assert!(self.ttistable());
        TableId(self.gcvalue())
    }

    /// Raw payload bits, whatever the tag
    #[inline(always)]
    pub fn raw_bits(&self) -> u64 {
        self.value.bits()
    }

    // ============ Checked accessors ============

    #[inline(always)]
    pub fn is_nil(&self) -> bool {
        self.ttisnil()
    }

    #[inline(always)]
    pub fn is_boolean(&self) -> bool {
        self.ttisboolean()
    }

    #[inline(always)]
    pub fn is_integer(&self) -> bool {
        self.ttisinteger()
    }

    #[inline(always)]
    pub fn is_float(&self) -> bool {
        self.ttisfloat()
    }

    #[inline(always)]
    pub fn is_number(&self) -> bool {
        self.ttisnumber()
    }

    #[inline(always)]
    pub fn is_string(&self) -> bool {
        self.ttisstring()
    }

    #[inline(always)]
    pub fn is_table(&self) -> bool {
        self.ttistable()
    }

    #[inline(always)]
    pub fn is_function(&self) -> bool {
        self.ttisfunction()
    }

    #[inline(always)]
    pub fn is_collectable(&self) -> bool {
        self.iscollectable()
    }

    /// Only nil and false are falsy
    #[inline(always)]
    pub fn is_falsy(&self) -> bool {
        self.ttisnil() || self.ttisfalse()
    }

    #[inline(always)]
    pub fn is_truthy(&self) -> bool {
        !self.is_falsy()
    }

    #[inline]
    pub fn as_boolean(&self) -> Option<bool> {
        self.ttisboolean().then(|| self.bvalue())
    }

    /// Integer payload, without float conversion
    #[inline]
    pub fn as_integer_strict(&self) -> Option<i64> {
        self.ttisinteger().then(|| self.ivalue())
    }

    /// Integer value, converting floats with an exact integer value
    #[inline]
    pub fn as_integer(&self) -> Option<i64> {
        match self.tt {
            LUA_VNUMINT => Some(self.ivalue()),
            LUA_VNUMFLT => float_to_integer(self.fltvalue()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self.tt {
            LUA_VNUMFLT => Some(self.fltvalue()),
            LUA_VNUMINT => Some(self.ivalue() as f64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_string_id(&self) -> Option<StringId> {
        self.ttisstring().then(|| self.tsvalue())
    }

    #[inline]
    pub fn as_table_id(&self) -> Option<TableId> {
        self.ttistable().then(|| self.hvalue())
    }

    /// Id of the referenced heap object, `None` for non-collectable values
    pub fn as_gc_id(&self) -> Option<GcId> {
        if !self.iscollectable() {
            return None;
        }
        let index = self.gcvalue();
        Some(match self.ttype() {
            LUA_TSTRING => GcId::StringId(StringId(index)),
            LUA_TTABLE => GcId::TableId(TableId(index)),
            LUA_TFUNCTION => GcId::FunctionId(FunctionId(index)),
            LUA_TUSERDATA => GcId::UserdataId(UserdataId(index)),
            LUA_TTHREAD => GcId::ThreadId(ThreadId(index)),
            _ => GcId::ProtoId(ProtoId(index)),
        })
    }

    /// Safe, exhaustive view of the value for pattern matching
    pub fn unpack(&self) -> LuaValueRef {
        match self.tt {
            LUA_VNIL => LuaValueRef::Nil,
            LUA_VFALSE => LuaValueRef::Boolean(false),
            LUA_VTRUE => LuaValueRef::Boolean(true),
            LUA_VNUMINT => LuaValueRef::Integer(self.ivalue()),
            LUA_VNUMFLT => LuaValueRef::Float(self.fltvalue()),
            LUA_VLIGHTUSERDATA => LuaValueRef::LightUserdata(self.pvalue()),
            LUA_VLCF => LuaValueRef::LightCFunction(self.pvalue()),
            LUA_VSHRSTR => LuaValueRef::ShortString(self.tsvalue()),
            LUA_VLNGSTR => LuaValueRef::LongString(self.tsvalue()),
            LUA_VTABLE => LuaValueRef::Table(self.hvalue()),
            LUA_VLCL => LuaValueRef::Function(FunctionId(self.gcvalue())),
            LUA_VCCL => LuaValueRef::CClosure(FunctionId(self.gcvalue())),
            LUA_VUSERDATA => LuaValueRef::Userdata(UserdataId(self.gcvalue())),
            LUA_VTHREAD => LuaValueRef::Thread(ThreadId(self.gcvalue())),
            LUA_VPROTO => LuaValueRef::Proto(ProtoId(self.gcvalue())),
            LUA_TDEADKEY => LuaValueRef::DeadKey(self.gcvalue()),
            _ => {
                debug_assert!(false, "malformed tag 0x{:x}", self.tt);
                LuaValueRef::Nil
            }
        }
    }

    // ============ Type names ============

    pub fn type_name(&self) -> &'static str {
        match self.ttype() {
            LUA_TNIL => "nil",
            LUA_TBOOLEAN => "boolean",
            LUA_TNUMBER => "number",
            LUA_TSTRING => "string",
            LUA_TTABLE => "table",
            LUA_TFUNCTION => "function",
            LUA_TLIGHTUSERDATA => "userdata",
            LUA_TUSERDATA => "userdata",
            LUA_TTHREAD => "thread",
            LUA_TPROTO => "proto",
            LUA_TDEADKEY => "deadkey",
            _ => "unknown",
        }
    }

    // ============ Kind enum (for pattern matching) ============

    pub fn kind(&self) -> LuaValueKind {
        match self.ttype() {
            LUA_TNIL => LuaValueKind::Nil,
            LUA_TBOOLEAN => LuaValueKind::Boolean,
            LUA_TNUMBER => {
                if self.ttisinteger() {
                    LuaValueKind::Integer
                } else {
                    LuaValueKind::Float
                }
            }
            LUA_TSTRING => LuaValueKind::String,
            LUA_TTABLE => LuaValueKind::Table,
            LUA_TFUNCTION => match self.tt {
                LUA_VLCF => LuaValueKind::CFunction,
                LUA_VCCL => LuaValueKind::CClosure,
                _ => LuaValueKind::Function,
            },
            LUA_TLIGHTUSERDATA => LuaValueKind::LightUserdata,
            LUA_TUSERDATA => LuaValueKind::Userdata,
            LUA_TTHREAD => LuaValueKind::Thread,
            LUA_TPROTO => LuaValueKind::Proto,
            _ => LuaValueKind::DeadKey,
        }
    }
}

/// Raw equality: same tag and bit-identical payload.
/// References are equal iff they name the same object; long strings with
/// equal content are told apart here and only matched by the string pool.
impl PartialEq for LuaValue {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.tt == other.tt && (self.ttisnil() || self.raw_bits() == other.raw_bits())
    }
}

impl Eq for LuaValue {}

// ============ Sum-type view ============

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LuaValueRef {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    LightUserdata(usize),
    LightCFunction(usize),
    ShortString(StringId),
    LongString(StringId),
    Table(TableId),
    Function(FunctionId),
    CClosure(FunctionId),
    Userdata(UserdataId),
    Thread(ThreadId),
    Proto(ProtoId),
    DeadKey(u32),
}

// ============ Type enum for pattern matching ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LuaValueKind {
    Nil,
    Boolean,
    Integer,
    Float,
    String,
    Table,
    Function,
    CFunction,
    CClosure,
    LightUserdata,
    Userdata,
    Thread,
    Proto,
    DeadKey,
}

// ============ Traits ============

impl Default for LuaValue {
    #[inline(always)]
    fn default() -> Self {
        Self::nil()
    }
}

impl std::fmt::Debug for LuaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.unpack() {
            LuaValueRef::Nil => write!(f, "nil"),
            LuaValueRef::Boolean(b) => write!(f, "{}", b),
            LuaValueRef::Integer(i) => write!(f, "{}", i),
            LuaValueRef::Float(n) => write!(f, "{:?}", n),
            LuaValueRef::LightUserdata(p) => write!(f, "lightuserdata(0x{:x})", p),
            LuaValueRef::LightCFunction(p) => write!(f, "cfunction(0x{:x})", p),
            LuaValueRef::ShortString(id) => write!(f, "shrstr({})", id.0),
            LuaValueRef::LongString(id) => write!(f, "lngstr({})", id.0),
            LuaValueRef::Table(id) => write!(f, "table({})", id.0),
            LuaValueRef::Function(id) => write!(f, "function({})", id.0),
            LuaValueRef::CClosure(id) => write!(f, "cclosure({})", id.0),
            LuaValueRef::Userdata(id) => write!(f, "userdata({})", id.0),
            LuaValueRef::Thread(id) => write!(f, "thread({})", id.0),
            LuaValueRef::Proto(id) => write!(f, "proto({})", id.0),
            LuaValueRef::DeadKey(index) => write!(f, "deadkey({})", index),
        }
    }
}

impl std::fmt::Display for LuaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            LuaValueKind::Nil => write!(f, "nil"),
            LuaValueKind::Boolean => write!(f, "{}", self.bvalue()),
            LuaValueKind::Integer => write!(f, "{}", self.ivalue()),
            LuaValueKind::Float => {
                let n = self.fltvalue();
                if n.floor() == n && n.abs() < 1e14 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            LuaValueKind::CFunction | LuaValueKind::LightUserdata => {
                write!(f, "{}: 0x{:x}", self.type_name(), self.pvalue())
            }
            _ => write!(f, "{}: {}", self.type_name(), self.gcvalue()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_layout() {
        assert_eq!(std::mem::size_of::<LuaValue>(), 16);
        assert_eq!(LUA_VSHRSTR, 0x44);
        assert_eq!(LUA_VLNGSTR, 0x54);
        assert_eq!(LUA_VTABLE, 0x45);
        assert_eq!(novariant(LUA_VNUMFLT), LUA_TNUMBER);
        assert!(!LuaValue::light_cfunction(0x10).iscollectable());
        assert!(LuaValue::cclosure(FunctionId(1)).iscollectable());
    }

    #[test]
    fn test_collectable_iff_reference() {
        let values = [
            LuaValue::nil(),
            LuaValue::boolean(true),
            LuaValue::integer(1),
            LuaValue::float(1.5),
            LuaValue::lightuserdata(0x1000),
            LuaValue::shortstring(StringId(1)),
            LuaValue::longstring(StringId(2)),
            LuaValue::table(TableId(3)),
            LuaValue::function(FunctionId(4)),
            LuaValue::userdata(UserdataId(5)),
            LuaValue::thread(ThreadId(6)),
            LuaValue::proto(ProtoId(7)),
        ];
        for v in values {
            assert_eq!(v.iscollectable(), v.as_gc_id().is_some(), "{:?}", v);
        }
    }

    #[test]
    fn test_from_gc() {
        let v = LuaValue::from_gc(LUA_TSTRING, 1, GcId::StringId(StringId(9)));
        assert!(v.ttislngstring());
        assert_eq!(v, LuaValue::longstring(StringId(9)));
        let t = LuaValue::from_gc(LUA_TTABLE, 0, GcId::TableId(TableId(2)));
        assert_eq!(t.as_table_id(), Some(TableId(2)));
    }

    #[test]
    fn test_raw_equality() {
        assert_eq!(LuaValue::integer(3), LuaValue::integer(3));
        assert_ne!(LuaValue::integer(3), LuaValue::float(3.0));
        assert_ne!(LuaValue::float(0.0), LuaValue::float(-0.0));
        assert_eq!(LuaValue::float(f64::NAN), LuaValue::float(f64::NAN));
        assert_ne!(LuaValue::table(TableId(1)), LuaValue::table(TableId(2)));
        assert_ne!(
            LuaValue::shortstring(StringId(1)),
            LuaValue::longstring(StringId(1))
        );
        assert_eq!(LuaValue::boolean(false), LuaValue::boolean(false));
        assert_ne!(LuaValue::boolean(false), LuaValue::nil());
    }

    #[test]
    fn test_float_to_integer() {
        assert_eq!(float_to_integer(3.0), Some(3));
        assert_eq!(float_to_integer(-0.0), Some(0));
        assert_eq!(float_to_integer(3.5), None);
        assert_eq!(float_to_integer(f64::NAN), None);
        assert_eq!(float_to_integer(f64::INFINITY), None);
        assert_eq!(float_to_integer(9.3e18), None);
        assert_eq!(float_to_integer(-9223372036854775808.0), Some(i64::MIN));
    }

    #[test]
    fn test_unpack_and_truthiness() {
        assert_eq!(LuaValue::integer(7).unpack(), LuaValueRef::Integer(7));
        assert_eq!(LuaValue::boolean(true).unpack(), LuaValueRef::Boolean(true));
        assert_eq!(
            LuaValue::table(TableId(1)).to_dead_key().unpack(),
            LuaValueRef::DeadKey(1)
        );
        let dead = LuaValue::table(TableId(1)).to_dead_key();
        assert_eq!(dead.dead_key_tag(), LUA_VTABLE);
        assert!(dead.is_dead_key_of(&LuaValue::table(TableId(1))));
        // same index, different kind
        assert!(!dead.is_dead_key_of(&LuaValue::shortstring(StringId(1))));
        assert!(!dead.is_dead_key_of(&LuaValue::table(TableId(2))));
        assert_ne!(dead, LuaValue::shortstring(StringId(1)).to_dead_key());
        assert!(LuaValue::nil().is_falsy());
        assert!(LuaValue::boolean(false).is_falsy());
        assert!(LuaValue::integer(0).is_truthy());
        assert_eq!(LuaValue::float(2.0).as_integer(), Some(2));
        assert_eq!(LuaValue::float(2.0).as_integer_strict(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(LuaValue::integer(42).to_string(), "42");
        assert_eq!(LuaValue::float(1.0).to_string(), "1.0");
        assert_eq!(LuaValue::float(0.5).to_string(), "0.5");
        assert_eq!(LuaValue::table(TableId(3)).to_string(), "table: 3");
        assert_eq!(LuaValue::nil().type_name(), "nil");
    }
}
