// Rehash - choosing the sizes of the array and hash parts
//
// `nums[i]` counts the integer keys k with 2^(i-1) < k <= 2^i. The array
// part gets the largest size n (a power of two) such that more than half of
// the slots 1..=n would be in use; every other key goes to the hash part.
use super::{LuaTable, Node, TableEnv};
use crate::lua_value::{LuaValue, NIL};
use crate::lua_vm::lua_limits::{MAXABITS, MAXASIZE};
use crate::{LuaError, LuaResult};

const VALUE_SIZE: usize = std::mem::size_of::<LuaValue>();
const NODE_SIZE: usize = std::mem::size_of::<Node>();

/// ceil(log2(x)) for x >= 1. Port of lobject.c: luaO_ceillog2
#[inline]
pub(crate) fn ceil_log2(x: usize) -> u32 {
    debug_assert!(x > 0);
    usize::BITS - (x - 1).leading_zeros()
}

/// Index in the array part a key would take, or 0.
/// Port of ltable.c: arrayindex
#[inline]
fn array_index(key: &LuaValue) -> usize {
    if key.ttisinteger() {
        let k = key.ivalue();
        if k > 0 && (k as u64) <= MAXASIZE as u64 {
            return k as usize;
        }
    }
    0
}

fn count_int(key: &LuaValue, nums: &mut [u32; MAXABITS + 1]) -> u32 {
    let k = array_index(key);
    if k != 0 {
        nums[ceil_log2(k) as usize] += 1;
        1
    } else {
        0
    }
}

/// Compute the optimal array size. `na` holds the number of integer keys
/// on entry and the number of them that go to the array part on exit.
/// Port of ltable.c: computesizes
fn compute_sizes(nums: &[u32; MAXABITS + 1], na: &mut u32) -> usize {
    let mut a: u32 = 0; // keys smaller than 2^i
    let mut nna: u32 = 0; // keys going to the array part
    let mut optimal: u64 = 0;
    let mut twotoi: u64 = 1;
    let mut i = 0;
    while i <= MAXABITS && *na as u64 > twotoi / 2 {
        if nums[i] > 0 {
            a += nums[i];
            if a as u64 > twotoi / 2 {
                optimal = twotoi;
                nna = a;
            }
        }
        i += 1;
        twotoi *= 2;
    }
    debug_assert!(optimal == 0 || optimal / 2 < nna as u64 && nna as u64 <= optimal);
    *na = nna;
    optimal as usize
}

impl LuaTable {
    /// Count the non-nil array slots into `nums`, slice by slice.
    /// Port of ltable.c: numusearray
    fn num_use_array(&self, nums: &mut [u32; MAXABITS + 1]) -> u32 {
        let asize = self.array.len() as u64;
        let mut ause: u32 = 0;
        let mut i: u64 = 1;
        let mut ttlg: u64 = 1;
        for lg in 0..=MAXABITS {
            let mut lc: u32 = 0;
            let mut lim = ttlg;
            if lim > asize {
                lim = asize;
                if i > lim {
                    break;
                }
            }
            while i <= lim {
                if !self.array[(i - 1) as usize].is_nil() {
                    lc += 1;
                }
                i += 1;
            }
            nums[lg] += lc;
            ause += lc;
            ttlg *= 2;
        }
        ause
    }

    /// Count the live nodes, adding integer keys to `nums` and `na`.
    /// Port of ltable.c: numusehash
    fn num_use_hash(&self, nums: &mut [u32; MAXABITS + 1], na: &mut u32) -> u32 {
        let mut totaluse: u32 = 0;
        let mut ause: u32 = 0;
        for node in self.node.iter().rev() {
            if !node.value.is_nil() {
                ause += count_int(&node.key, nums);
                totaluse += 1;
            }
        }
        *na += ause;
        totaluse
    }

    /// Resize both parts to fit the current entries plus `extra_key`.
    /// Port of ltable.c: rehash
    pub(crate) fn rehash(&mut self, extra_key: &LuaValue, env: &mut TableEnv) -> LuaResult<()> {
        let mut nums = [0u32; MAXABITS + 1];
        let mut na = self.num_use_array(&mut nums);
        let mut totaluse = na;
        totaluse += self.num_use_hash(&mut nums, &mut na);
        na += count_int(extra_key, &mut nums);
        totaluse += 1;
        let asize = compute_sizes(&nums, &mut na);
        log::trace!(
            "rehash table {}: array {} -> {}, hash {} -> {}",
            env.owner.0,
            self.array.len(),
            asize,
            self.node.len(),
            totaluse - na
        );
        self.resize(asize, (totaluse - na) as usize, env)
    }

    /// Resize the array part to `nasize` slots and the hash part to hold at
    /// least `nhsize` keys. Port of ltable.c: luaH_resize.
    ///
    /// Entries of a vanishing array slice move to the hash part, and the
    /// hash part is enlarged if it could not hold every surviving entry.
    /// Memory is reserved and charged before anything changes, so an error
    /// leaves the table untouched.
    pub fn resize(&mut self, nasize: usize, nhsize: usize, env: &mut TableEnv) -> LuaResult<()> {
        if nasize > MAXASIZE {
            return Err(LuaError::MemoryError);
        }
        let oldasize = self.array.len();
        let nhsize = nhsize.max(self.hash_entries_after_resize(nasize));

        let (lsize, hsize) = if nhsize == 0 {
            (0, 0)
        } else {
            let lsize = ceil_log2(nhsize);
            if lsize > env.max_hash_bits as u32 {
                log::debug!(
                    "table {} overflow: {} hash slots requested",
                    env.owner.0,
                    nhsize
                );
                return Err(LuaError::TableOverflow);
            }
            (lsize as u8, 1usize << lsize)
        };

        let mut new_node: Vec<Node> = Vec::new();
        new_node
            .try_reserve_exact(hsize)
            .map_err(|_| LuaError::MemoryError)?;
        if nasize > oldasize {
            self.array
                .try_reserve_exact(nasize - oldasize)
                .map_err(|_| LuaError::MemoryError)?;
        }
        env.gc
            .reallocate(self.buffer_bytes(), nasize * VALUE_SIZE + hsize * NODE_SIZE)?;

        // nothing can fail from here on
        new_node.resize(hsize, Node::EMPTY);
        let old_node = std::mem::replace(&mut self.node, new_node);
        self.lsizenode = lsize;
        self.last_free = hsize;
        if nasize > oldasize {
            self.array.resize(nasize, NIL);
        } else if nasize < oldasize {
            // re-insert the vanishing slice into the hash part
            for i in nasize..oldasize {
                let value = self.array[i];
                if !value.is_nil() {
                    let inserted = self.insert_node(LuaValue::integer(i as i64 + 1), value, env);
                    debug_assert!(inserted, "hash part sized too small");
                }
            }
            self.array.truncate(nasize);
            self.array.shrink_to_fit();
        }
        // re-insert the elements of the old hash part
        for old in old_node.iter().rev() {
            if !old.value.is_nil() {
                self.reinsert(old.key, old.value, env);
            }
        }
        Ok(())
    }

    /// Resize the array part, keeping the hash part's size.
    /// Port of ltable.c: luaH_resizearray
    pub fn resize_array(&mut self, nasize: usize, env: &mut TableEnv) -> LuaResult<()> {
        let nhsize = self.node.len();
        self.resize(nasize, nhsize, env)
    }

    /// Number of live entries that would sit in the hash part once the array
    /// part has `nasize` slots
    fn hash_entries_after_resize(&self, nasize: usize) -> usize {
        let vanishing = self
            .array
            .iter()
            .skip(nasize)
            .filter(|v| !v.is_nil())
            .count();
        let staying = self
            .node
            .iter()
            .filter(|n| !n.value.is_nil())
            .filter(|n| {
                let k = array_index(&n.key);
                k == 0 || k > nasize
            })
            .count();
        vanishing + staying
    }

    /// Put back an entry during a resize: array slot if the key fits, free
    /// node otherwise
    fn reinsert(&mut self, key: LuaValue, value: LuaValue, env: &mut TableEnv) {
        let k = array_index(&key);
        if k != 0 && k <= self.array.len() {
            self.array[k - 1] = value;
            env.barrier(&value);
        } else {
            let inserted = self.insert_node(key, value, env);
            debug_assert!(inserted, "hash part sized too small");
        }
    }

    /// Bytes held by the array and hash buffers
    #[inline]
    pub(crate) fn buffer_bytes(&self) -> usize {
        self.array.len() * VALUE_SIZE + self.node.len() * NODE_SIZE
    }
}
