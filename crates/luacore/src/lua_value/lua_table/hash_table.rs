// Hash part of LuaTable - chained scatter table with Brent's variation
//
// Invariant: if a key is not in its main position, the key that occupies
// its main position is in its own main position. This keeps chains short
// even at 100% load factor, so the part is only resized when it is full.
//
// Chains are relative offsets between nodes (0 = end of chain); a node
// whose value is nil but whose key is set is a tombstone and stays in its
// chain.
use super::{LuaTable, TableEnv};
use crate::StringPool;
use crate::lua_value::{
    LUA_VFALSE, LUA_VLCF, LUA_VLIGHTUSERDATA, LUA_VLNGSTR, LUA_VNUMFLT, LUA_VNUMINT, LUA_VSHRSTR,
    LUA_VTRUE, LuaValue, NIL,
};

/// Hash node - key-value pair plus the chain link
#[derive(Clone, Copy, Debug)]
pub(crate) struct Node {
    pub(crate) value: LuaValue,
    pub(crate) key: LuaValue,
    /// Offset to the next node of the chain (0 = end)
    pub(crate) next: i32,
}

impl Node {
    pub(crate) const EMPTY: Node = Node {
        value: NIL,
        key: NIL,
        next: 0,
    };
}

/// `h mod size` for a power-of-two size
#[inline(always)]
fn hash_pow2(h: u64, size: usize) -> usize {
    (h as usize) & (size - 1)
}

/// Modulo by an odd number, for hashes with poor low bits
#[inline(always)]
fn hash_mod(h: u32, size: usize) -> usize {
    (h % (((size - 1) | 1) as u32)) as usize
}

/// Split `x` into a mantissa in [0.5, 1) and a power of two.
fn frexp(x: f64) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let exp = ((bits >> 52) & 0x7ff) as i32;
    if exp == 0 {
        // subnormal: scale by 2^64 into the normal range
        let (m, e) = frexp(x * f64::from_bits(0x43f0_0000_0000_0000));
        return (m, e - 64);
    }
    let mantissa = f64::from_bits((bits & !(0x7ff << 52)) | (1022 << 52));
    (mantissa, exp - 1022)
}

/// Hash of a float key. Port of ltable.c: l_hashfloat.
/// Never negative; inf and nan hash to 0.
pub(crate) fn l_hashfloat(n: f64) -> u32 {
    let (m, e) = frexp(n);
    let n = m * -(i32::MIN as f64);
    if !n.is_finite() {
        return 0;
    }
    let u = (e as u32).wrapping_add(n as i64 as u32);
    if u <= i32::MAX as u32 { u } else { !u }
}

impl LuaTable {
    /// Main position of a key: the node its hash selects.
    /// Port of ltable.c: mainposition
    pub(crate) fn main_position(&self, key: &LuaValue, strings: &StringPool) -> usize {
        let size = self.node.len();
        debug_assert!(size.is_power_of_two());
        match key.tt() {
            LUA_VNUMINT => hash_pow2(key.ivalue() as u64, size),
            LUA_VNUMFLT => hash_mod(l_hashfloat(key.fltvalue()), size),
            LUA_VSHRSTR | LUA_VLNGSTR => hash_pow2(strings.hash(key.tsvalue()) as u64, size),
            LUA_VFALSE => hash_pow2(0, size),
            LUA_VTRUE => hash_pow2(1, size),
            LUA_VLIGHTUSERDATA | LUA_VLCF => hash_mod(key.pvalue() as u32, size),
            // collectable objects (and dead keys) hash their arena index
            _ => hash_mod(key.gcvalue(), size),
        }
    }

    #[inline(always)]
    pub(crate) fn hash_int(&self, key: i64) -> usize {
        hash_pow2(key as u64, self.node.len())
    }

    /// Follow a chain from `start` until `matches` accepts a key
    #[inline]
    pub(crate) fn walk_chain(
        &self,
        start: usize,
        mut matches: impl FnMut(&LuaValue) -> bool,
    ) -> Option<usize> {
        let mut n = start;
        loop {
            let node = &self.node[n];
            if matches(&node.key) {
                return Some(n);
            }
            if node.next == 0 {
                return None;
            }
            n = (n as isize + node.next as isize) as usize;
        }
    }

    /// Find a free node, scanning down from `last_free`.
    /// A node is free while its key is nil; tombstones are not reused.
    fn get_free_pos(&mut self) -> Option<usize> {
        while self.last_free > 0 {
            self.last_free -= 1;
            if self.node[self.last_free].key.is_nil() {
                return Some(self.last_free);
            }
        }
        None
    }

    /// Insert a key that is known to be absent into the hash part.
    /// Port of ltable.c: luaH_newkey (the part after key validation).
    ///
    /// Returns false, with the table unchanged, when there is no free node.
    pub(crate) fn insert_node(
        &mut self,
        key: LuaValue,
        value: LuaValue,
        env: &mut TableEnv,
    ) -> bool {
        if self.is_dummy() {
            return false;
        }
        let mut mp = self.main_position(&key, env.strings);
        if !self.node[mp].value.is_nil() {
            // main position is taken
            let Some(f) = self.get_free_pos() else {
                return false;
            };
            let othern = self.main_position(&self.node[mp].key, env.strings);
            if othern != mp {
                // colliding node is out of its main position: move it into the
                // free slot and take its place
                let mut prev = othern;
                while prev as isize + self.node[prev].next as isize != mp as isize {
                    prev = (prev as isize + self.node[prev].next as isize) as usize;
                }
                self.node[prev].next = (f as isize - prev as isize) as i32;
                self.node[f] = self.node[mp];
                if self.node[mp].next != 0 {
                    self.node[f].next += (mp as isize - f as isize) as i32;
                    self.node[mp].next = 0;
                }
                self.node[mp].value = NIL;
                let moved = self.node[f];
                env.barrier(&moved.key);
                env.barrier(&moved.value);
            } else {
                // colliding node is in its own main position: the new key
                // goes into the free slot, right after it in the chain
                if self.node[mp].next != 0 {
                    self.node[f].next =
                        (mp as isize + self.node[mp].next as isize - f as isize) as i32;
                } else {
                    debug_assert_eq!(self.node[f].next, 0);
                }
                self.node[mp].next = (f as isize - mp as isize) as i32;
                mp = f;
            }
        }
        self.node[mp].key = key;
        env.barrier(&key);
        self.node[mp].value = value;
        env.barrier(&value);
        true
    }

    /// Check the main-position invariant over every live node
    pub fn main_position_holds(&self, strings: &StringPool) -> bool {
        for (i, node) in self.node.iter().enumerate() {
            if node.value.is_nil() {
                continue;
            }
            let mp = self.main_position(&node.key, strings);
            if mp == i {
                continue;
            }
            let occupant = &self.node[mp];
            if occupant.key.is_nil() {
                return false;
            }
            // a live occupant must be at home; a tombstone or dead key only
            // has to keep the chain intact
            if !occupant.value.is_nil() && self.main_position(&occupant.key, strings) != mp {
                return false;
            }
            // the key must be reachable from its main position
            if self.walk_chain(mp, |k| *k == node.key).is_none() {
                return false;
            }
        }
        true
    }
}
