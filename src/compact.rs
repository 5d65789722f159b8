//! Open addressing with slot state held in a separate control-byte array.
//!
//! The probing algorithm and load limit are those of
//! [`OpenAddressingMap`](crate::open_addressing::OpenAddressingMap). The
//! difference is layout: a probe walks a dense `Vec<u8>` of control bytes
//! and only touches the entry array when the 7-bit hash tag of a slot
//! matches the key's.

use core::fmt;
use core::hash::BuildHasher;
use core::hash::Hash;

use log::trace;

use crate::hash::DefaultHashBuilder;
use crate::hash::home_index;
use crate::hash::make_hash;
use crate::map::Entry;
use crate::map::HashMapCore;
use crate::map::LoadLimit;
use crate::map::Probe;
use crate::map::alloc_table;
use crate::map::grown_capacity;
use crate::map::probe_exhausted;
use crate::map::table_capacity;
use crate::stats::ProbeStats;

const MAX_LOAD: LoadLimit = LoadLimit::new(7, 10);

/// Control byte of a slot that has never held an entry.
pub const EMPTY: u8 = 0x80;
/// Control byte of a slot whose entry was removed.
pub const TOMBSTONE: u8 = 0xFE;

#[inline(always)]
fn hashtag(hash: u64) -> u8 {
    (hash >> 57) as u8
}

#[inline(always)]
fn is_full(control: u8) -> bool {
    control & 0x80 == 0
}

/// A linear-probing hash map with one control byte per slot.
#[derive(Clone)]
pub struct CompactOpenAddressingMap<K, V, S = DefaultHashBuilder> {
    controls: Vec<u8>,
    entries: Vec<Option<Entry<K, V>>>,
    len: usize,
    tombstones: usize,
    hash_builder: S,
}

impl<K, V> CompactOpenAddressingMap<K, V, DefaultHashBuilder> {
    /// Creates an empty map with the minimum capacity.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty map with at least `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S: Default> Default for CompactOpenAddressingMap<K, V, S> {
    fn default() -> Self {
        Self::with_capacity_and_hasher(0, S::default())
    }
}

impl<K, V, S> CompactOpenAddressingMap<K, V, S> {
    /// Creates an empty map with at least `capacity` slots, hashing with
    /// `hash_builder`.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let capacity = table_capacity(capacity);
        Self {
            controls: alloc_table(capacity, || EMPTY),
            entries: alloc_table(capacity, || None),
            len: 0,
            tombstones: 0,
            hash_builder,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.controls.len()
    }

    /// Number of tombstones currently in the table.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// The control bytes, in table order.
    pub fn controls(&self) -> &[u8] {
        &self.controls
    }

    /// Iterates over every live entry in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries
            .iter()
            .flatten()
            .map(|entry| (&entry.key, &entry.value))
    }
}

impl<K, V, S> CompactOpenAddressingMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn matches(&self, index: usize, key: &K) -> bool {
        self.entries[index]
            .as_ref()
            .is_some_and(|entry| entry.key == *key)
    }

    #[inline]
    fn find(&self, hash: u64, key: &K) -> Option<usize> {
        let tag = hashtag(hash);
        let mask = self.controls.len() - 1;
        let mut index = home_index(hash, self.controls.len());
        for _ in 0..self.controls.len() {
            match self.controls[index] {
                EMPTY => return None,
                control if control == tag && self.matches(index, key) => return Some(index),
                _ => index = (index + 1) & mask,
            }
        }
        probe_exhausted(self.controls.len())
    }

    #[inline]
    fn probe(&self, hash: u64, key: &K) -> Probe {
        let tag = hashtag(hash);
        let mask = self.controls.len() - 1;
        let mut index = home_index(hash, self.controls.len());
        let mut first_tombstone = None;
        for _ in 0..self.controls.len() {
            match self.controls[index] {
                EMPTY => return Probe::Vacant(first_tombstone.unwrap_or(index)),
                TOMBSTONE => {
                    first_tombstone.get_or_insert(index);
                }
                control if control == tag && self.matches(index, key) => {
                    return Probe::Found(index);
                }
                _ => {}
            }
            index = (index + 1) & mask;
        }
        probe_exhausted(self.controls.len())
    }

    #[inline]
    fn find_empty(&self, hash: u64) -> usize {
        let mask = self.controls.len() - 1;
        let mut index = home_index(hash, self.controls.len());
        for _ in 0..self.controls.len() {
            if self.controls[index] == EMPTY {
                return index;
            }
            index = (index + 1) & mask;
        }
        probe_exhausted(self.controls.len())
    }

    #[inline]
    fn place(&mut self, index: usize, hash: u64, entry: Entry<K, V>) {
        self.controls[index] = hashtag(hash);
        self.entries[index] = Some(entry);
    }

    /// Returns a reference to the value stored under `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        let index = self.find(make_hash(&self.hash_builder, key), key)?;
        self.entries[index].as_ref().map(|entry| &entry.value)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Inserts `value` under `key`, returning the value it replaced.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = make_hash(&self.hash_builder, &key);
        let index = match self.probe(hash, &key) {
            Probe::Found(index) => {
                return self.entries[index]
                    .as_mut()
                    .map(|entry| core::mem::replace(&mut entry.value, value));
            }
            Probe::Vacant(index) => index,
        };

        let index = if self.controls[index] == TOMBSTONE {
            self.tombstones -= 1;
            index
        } else if MAX_LOAD.reached_by(self.len + self.tombstones + 1, self.controls.len()) {
            self.grow();
            self.find_empty(hash)
        } else {
            index
        };

        self.place(index, hash, Entry::new(key, value));
        self.len += 1;
        None
    }

    /// Removes `key`, leaving a tombstone control byte in its slot.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.find(make_hash(&self.hash_builder, key), key)?;
        self.controls[index] = TOMBSTONE;
        self.len -= 1;
        self.tombstones += 1;
        self.entries[index].take().map(|entry| entry.value)
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self) {
        let capacity = grown_capacity(self.controls.len());
        trace!(
            "open_addressing_compact: growing {} -> {capacity} slots at {} entries, dropping {} \
             tombstones",
            self.controls.len(),
            self.len,
            self.tombstones
        );

        self.controls = alloc_table(capacity, || EMPTY);
        let old = core::mem::replace(&mut self.entries, alloc_table(capacity, || None));
        self.tombstones = 0;
        for entry in old.into_iter().flatten() {
            let hash = make_hash(&self.hash_builder, &entry.key);
            let index = self.find_empty(hash);
            self.place(index, hash, entry);
        }
    }
}

impl<K, V, S> HashMapCore<K, V> for CompactOpenAddressingMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    const NAME: &'static str = "open_addressing_compact";

    #[inline]
    fn insert(&mut self, key: K, value: V) -> Option<V> {
        CompactOpenAddressingMap::insert(self, key, value)
    }

    #[inline]
    fn get(&self, key: &K) -> Option<&V> {
        CompactOpenAddressingMap::get(self, key)
    }

    #[inline]
    fn remove(&mut self, key: &K) -> Option<V> {
        CompactOpenAddressingMap::remove(self, key)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.controls.len()
    }

    fn max_load_factor(&self) -> f64 {
        MAX_LOAD.ratio()
    }

    fn probe_stats(&self) -> ProbeStats {
        let mask = self.controls.len() - 1;
        self.controls
            .iter()
            .enumerate()
            .filter(|&(_, &control)| is_full(control))
            .filter_map(|(index, _)| {
                let entry = self.entries[index].as_ref()?;
                let home = home_index(make_hash(&self.hash_builder, &entry.key), mask + 1);
                Some((index.wrapping_sub(home) & mask) + 1)
            })
            .collect()
    }
}

impl<K, V, S> fmt::Debug for CompactOpenAddressingMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
