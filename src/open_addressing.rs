//! Every entry lives inline in one flat array of [`Slot`]s. A lookup starts
//! at the key's home slot and walks forward one slot at a time, wrapping at
//! the end of the table, so a probe sequence touches consecutive memory.
//!
//! Deleting a key leaves a [`Slot::Tombstone`] behind. Lookups skip over
//! tombstones; only an [`Slot::Empty`] slot ends a probe. Tombstones count
//! toward the growth trigger and are dropped when the table is rebuilt,
//! which guarantees that an empty slot always exists.

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

/// The state of one table slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<K, V> {
    /// Never used since the table was built. Ends a probe.
    Empty,
    /// Holds a live entry.
    Occupied(Entry<K, V>),
    /// Held an entry that was removed. Probes continue past it.
    Tombstone,
}

/// A hash map resolving collisions by linear probing over a flat slot array.
///
/// The table grows to twice its capacity when a new key would bring live
/// entries plus tombstones to 0.70 of capacity. It never shrinks.
#[derive(Clone)]
pub struct OpenAddressingMap<K, V, S = DefaultHashBuilder> {
    slots: Vec<Slot<K, V>>,
    len: usize,
    tombstones: usize,
    hash_builder: S,
}

impl<K, V> OpenAddressingMap<K, V, DefaultHashBuilder> {
    /// Creates an empty map with the minimum capacity.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty map with at least `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S: Default> Default for OpenAddressingMap<K, V, S> {
    fn default() -> Self {
        Self::with_capacity_and_hasher(0, S::default())
    }
}

impl<K, V, S> OpenAddressingMap<K, V, S> {
    /// Creates an empty map with at least `capacity` slots, hashing with
    /// `hash_builder`.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            slots: alloc_table(table_capacity(capacity), || Slot::Empty),
            len: 0,
            tombstones: 0,
            hash_builder,
        }
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the map holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of tombstones currently in the table.
    #[inline]
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// The slot array, in table order.
    pub fn slots(&self) -> &[Slot<K, V>] {
        &self.slots
    }

    /// Iterates over every live entry in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Occupied(entry) => Some((&entry.key, &entry.value)),
            Slot::Empty | Slot::Tombstone => None,
        })
    }
}

impl<K, V, S> OpenAddressingMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Index of the slot holding `key`, stopping at the first empty slot.
    #[inline]
    fn find(&self, hash: u64, key: &K) -> Option<usize> {
        let mask = self.slots.len() - 1;
        let mut index = home_index(hash, self.slots.len());
        for _ in 0..self.slots.len() {
            match &self.slots[index] {
                Slot::Empty => return None,
                Slot::Occupied(entry) if entry.key == *key => return Some(index),
                Slot::Occupied(_) | Slot::Tombstone => index = (index + 1) & mask,
            }
        }
        probe_exhausted(self.slots.len())
    }

    /// Probes for `key`, remembering the first tombstone on the way.
    ///
    /// A miss reports the first tombstone if one was passed, otherwise the
    /// empty slot that ended the probe.
    #[inline]
    fn probe(&self, hash: u64, key: &K) -> Probe {
        let mask = self.slots.len() - 1;
        let mut index = home_index(hash, self.slots.len());
        let mut first_tombstone = None;
        for _ in 0..self.slots.len() {
            match &self.slots[index] {
                Slot::Empty => return Probe::Vacant(first_tombstone.unwrap_or(index)),
                Slot::Occupied(entry) if entry.key == *key => return Probe::Found(index),
                Slot::Tombstone if first_tombstone.is_none() => first_tombstone = Some(index),
                Slot::Occupied(_) | Slot::Tombstone => {}
            }
            index = (index + 1) & mask;
        }
        probe_exhausted(self.slots.len())
    }

    /// First empty slot from `hash`'s home index. Only valid on a table
    /// known not to contain the key.
    #[inline]
    fn find_empty(&self, hash: u64) -> usize {
        let mask = self.slots.len() - 1;
        let mut index = home_index(hash, self.slots.len());
        for _ in 0..self.slots.len() {
            if matches!(self.slots[index], Slot::Empty) {
                return index;
            }
            index = (index + 1) & mask;
        }
        probe_exhausted(self.slots.len())
    }

    /// Returns a reference to the value stored under `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        let index = self.find(make_hash(&self.hash_builder, key), key)?;
        match &self.slots[index] {
            Slot::Occupied(entry) => Some(&entry.value),
            Slot::Empty | Slot::Tombstone => None,
        }
    }

    /// Returns `true` if `key` is present.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Inserts `value` under `key`, returning the value it replaced.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = make_hash(&self.hash_builder, &key);
        let index = match self.probe(hash, &key) {
            Probe::Found(index) => {
                return match &mut self.slots[index] {
                    Slot::Occupied(entry) => Some(core::mem::replace(&mut entry.value, value)),
                    Slot::Empty | Slot::Tombstone => unreachable!("probe found a vacant slot"),
                };
            }
            Probe::Vacant(index) => index,
        };

        // Reusing a tombstone leaves `len + tombstones` unchanged.
        let index = if matches!(self.slots[index], Slot::Tombstone) {
            self.tombstones -= 1;
            index
        } else if MAX_LOAD.reached_by(self.len + self.tombstones + 1, self.slots.len()) {
            self.grow();
            self.find_empty(hash)
        } else {
            index
        };

        self.slots[index] = Slot::Occupied(Entry::new(key, value));
        self.len += 1;
        None
    }

    /// Removes `key`, leaving a tombstone in its slot.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.find(make_hash(&self.hash_builder, key), key)?;
        match core::mem::replace(&mut self.slots[index], Slot::Tombstone) {
            Slot::Occupied(entry) => {
                self.len -= 1;
                self.tombstones += 1;
                Some(entry.value)
            }
            Slot::Empty | Slot::Tombstone => unreachable!("find returned a vacant slot"),
        }
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self) {
        let capacity = grown_capacity(self.slots.len());
        trace!(
            "open_addressing: growing {} -> {capacity} slots at {} entries, dropping {} tombstones",
            self.slots.len(),
            self.len,
            self.tombstones
        );

        let old = core::mem::replace(&mut self.slots, alloc_table(capacity, || Slot::Empty));
        self.tombstones = 0;
        for slot in old {
            if let Slot::Occupied(entry) = slot {
                let index = self.find_empty(make_hash(&self.hash_builder, &entry.key));
                self.slots[index] = Slot::Occupied(entry);
            }
        }
    }
}

impl<K, V, S> HashMapCore<K, V> for OpenAddressingMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    const NAME: &'static str = "open_addressing";

    #[inline]
    fn insert(&mut self, key: K, value: V) -> Option<V> {
        OpenAddressingMap::insert(self, key, value)
    }

    #[inline]
    fn get(&self, key: &K) -> Option<&V> {
        OpenAddressingMap::get(self, key)
    }

    #[inline]
    fn remove(&mut self, key: &K) -> Option<V> {
        OpenAddressingMap::remove(self, key)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn max_load_factor(&self) -> f64 {
        MAX_LOAD.ratio()
    }

    fn probe_stats(&self) -> ProbeStats {
        let mask = self.slots.len() - 1;
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied(entry) => {
                    let home = home_index(make_hash(&self.hash_builder, &entry.key), mask + 1);
                    Some((index.wrapping_sub(home) & mask) + 1)
                }
                Slot::Empty | Slot::Tombstone => None,
            })
            .collect()
    }
}

impl<K, V, S> fmt::Debug for OpenAddressingMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::CollidingHashBuilder;
    use crate::hash::IdentityHashBuilder;

    fn colliding() -> OpenAddressingMap<u64, &'static str, CollidingHashBuilder> {
        OpenAddressingMap::default()
    }

    #[test]
    fn probe_continues_past_tombstone() {
        let mut map = colliding();
        map.insert(1, "k1");
        map.insert(2, "k2");
        map.insert(3, "k3");
        assert_eq!(map.remove(&2), Some("k2"));
        assert_eq!(map.tombstones(), 1);
        assert_eq!(map.get(&3), Some(&"k3"));
        assert_eq!(map.get(&1), Some(&"k1"));
        assert_eq!(map.get(&2), None);
        assert!(matches!(map.slots()[1], Slot::Tombstone));
    }

    #[test]
    fn insert_reuses_first_tombstone_without_duplicating() {
        let mut map = colliding();
        map.insert(1, "k1");
        map.insert(2, "k2");
        map.insert(3, "k3");
        map.remove(&2);

        // Key 3 sits after the tombstone; updating it must not place a copy
        // in the tombstone.
        assert_eq!(map.insert(3, "k3'"), Some("k3"));
        assert_eq!(map.len(), 2);
        assert_eq!(map.tombstones(), 1);

        assert_eq!(map.insert(4, "k4"), None);
        assert_eq!(map.tombstones(), 0);
        assert!(matches!(&map.slots()[1], Slot::Occupied(entry) if entry.key == 4));
        assert_eq!(map.remove(&3), Some("k3'"));
        assert_eq!(map.get(&3), None);
    }

    #[test]
    fn tombstones_count_toward_growth() {
        let mut map: OpenAddressingMap<u64, u64> = OpenAddressingMap::with_capacity(8);
        for key in 0..5 {
            map.insert(key, key);
        }
        for key in 0..3 {
            map.remove(&key);
        }
        assert_eq!(map.len(), 2);
        assert_eq!(map.tombstones(), 3);
        assert_eq!(map.capacity(), 8);

        // Live + tombstones + 1 reaches 0.7 of 8 only when a new key lands
        // in an empty slot.
        let mut key = 100;
        while map.capacity() == 8 {
            map.insert(key, key);
            key += 1;
        }
        assert_eq!(map.capacity(), 16);
        assert_eq!(map.tombstones(), 0);
        for key in 3..5 {
            assert_eq!(map.get(&key), Some(&key));
        }
    }

    #[test]
    fn growth_drops_tombstones() {
        let mut map: OpenAddressingMap<u64, u64> = OpenAddressingMap::new();
        for key in 0..4 {
            map.insert(key, key);
        }
        map.remove(&0);
        map.remove(&1);
        for key in 10..40 {
            map.insert(key, key);
        }
        assert_eq!(map.tombstones(), 0);
        assert_eq!(map.len(), 32);
        assert!(map.load_factor() <= 0.7);
    }

    #[test]
    fn probe_lengths_measure_distance_from_home() {
        let mut map = colliding();
        map.insert(1, "a");
        map.insert(2, "b");
        map.insert(3, "c");
        let stats = map.probe_stats();
        assert_eq!(stats.histogram(), &[1, 1, 1]);
        assert_eq!(stats.mean(), 2.0);
    }

    #[test]
    fn probe_wraps_at_table_end() {
        let mut map: OpenAddressingMap<u64, u64, IdentityHashBuilder> =
            OpenAddressingMap::with_capacity_and_hasher(8, IdentityHashBuilder::default());
        map.insert(7, 0);
        map.insert(15, 1);
        map.insert(23, 2);
        assert!(matches!(&map.slots()[7], Slot::Occupied(entry) if entry.key == 7));
        assert!(matches!(&map.slots()[0], Slot::Occupied(entry) if entry.key == 15));
        assert!(matches!(&map.slots()[1], Slot::Occupied(entry) if entry.key == 23));
        assert_eq!(map.get(&23), Some(&2));
        assert_eq!(map.probe_stats().histogram(), &[1, 1, 1]);
        assert_eq!(map.get(&31), None);
    }

    #[test]
    #[should_panic(expected = "without reaching an empty slot")]
    fn exhausted_probe_panics() {
        let mut map: OpenAddressingMap<u64, u64> = OpenAddressingMap::new();
        map.slots = (0..8).map(|_| Slot::Tombstone).collect();
        map.get(&1);
    }

    #[test]
    fn debug_lists_entries() {
        let mut map: OpenAddressingMap<u64, u64> = OpenAddressingMap::new();
        map.insert(3, 30);
        assert_eq!(format!("{map:?}"), "{3: 30}");
        assert!(map.contains_key(&3));
        assert_eq!(map.iter().count(), 1);
    }
}
