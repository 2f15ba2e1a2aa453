use crate::lua_vm::lua_limits::{LUAI_MAXSHORTLEN, MAXHBITS, MINSTRTABSIZE};

#[derive(Debug, Clone)]
pub struct SafeOption {
    /// Strings up to this many bytes are interned
    pub short_string_limit: usize,
    /// Seed of the string hash; `None` draws a random one per state
    pub string_seed: Option<u32>,
    /// The string pool's bucket array never shrinks below this size
    pub min_string_table_size: usize,
    /// Hash parts of tables are limited to `2^max_hash_bits` nodes
    pub max_hash_bits: u8,
    /// Maximum memory limit in bytes
    pub max_memory_limit: usize,
}

impl Default for SafeOption {
    fn default() -> Self {
        Self {
            short_string_limit: LUAI_MAXSHORTLEN,
            string_seed: None,
            min_string_table_size: MINSTRTABSIZE,
            max_hash_bits: MAXHBITS,
            max_memory_limit: usize::MAX,
        }
    }
}

impl SafeOption {
    /// Seed to use for a new state
    pub fn seed(&self) -> u32 {
        self.string_seed.unwrap_or_else(rand::random::<u32>)
    }
}
