//! Hash containers with a fixed `foldhash` seed.

use foldhash::fast::FixedState;

/// A fixed hash seed.
const FIXED_HASH_STATE: FixedState = FixedState::with_seed(0x95EE04C4F326B271);

/// A [`hashbrown::HashMap`] hashing with [`FIXED_HASH_STATE`].
pub(crate) type HashMap<K, V> = hashbrown::HashMap<K, V, FixedState>;

#[inline]
pub(crate) fn new_map<K, V>() -> HashMap<K, V> {
    HashMap::with_hasher(FIXED_HASH_STATE)
}
