//! Each bucket is a contiguous `Vec` of entries, so a lookup costs one jump
//! to the bucket's allocation followed by a short linear scan. Every bucket
//! is its own allocation, which is what separates this layout from open
//! addressing when the table no longer fits in cache.

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
use crate::map::alloc_table;
use crate::map::grown_capacity;
use crate::map::table_capacity;
use crate::stats::ProbeStats;

const MAX_LOAD: LoadLimit = LoadLimit::new(3, 4);

/// A hash map resolving collisions with per-bucket entry lists.
///
/// The table grows to twice its capacity when a new key would bring the
/// load factor to 0.75. It never shrinks.
#[derive(Clone)]
pub struct ChainingMap<K, V, S = DefaultHashBuilder> {
    buckets: Vec<Vec<Entry<K, V>>>,
    len: usize,
    hash_builder: S,
}

impl<K, V> ChainingMap<K, V, DefaultHashBuilder> {
    /// Creates an empty map with the minimum capacity.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty map with at least `capacity` buckets.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S: Default> Default for ChainingMap<K, V, S> {
    fn default() -> Self {
        Self::with_capacity_and_hasher(0, S::default())
    }
}

impl<K, V, S> ChainingMap<K, V, S> {
    /// Creates an empty map with at least `capacity` buckets, hashing with
    /// `hash_builder`.
    ///
    /// The bucket count is rounded up to a power of two.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            buckets: alloc_table(table_capacity(capacity), Vec::new),
            len: 0,
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

    /// Number of buckets.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Iterates over every entry, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.buckets
            .iter()
            .flatten()
            .map(|entry| (&entry.key, &entry.value))
    }

    /// Chain length of every bucket, in table order.
    pub fn bucket_lengths(&self) -> impl Iterator<Item = usize> + '_ {
        self.buckets.iter().map(Vec::len)
    }
}

impl<K, V, S> ChainingMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn bucket_index(&self, key: &K) -> usize {
        home_index(make_hash(&self.hash_builder, key), self.buckets.len())
    }

    /// Returns a reference to the value stored under `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.buckets[self.bucket_index(key)]
            .iter()
            .find(|entry| entry.key == *key)
            .map(|entry| &entry.value)
    }

    /// Returns `true` if `key` is present.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Inserts `value` under `key`, returning the value it replaced.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let index = self.bucket_index(&key);
        if let Some(entry) = self.buckets[index]
            .iter_mut()
            .find(|entry| entry.key == key)
        {
            return Some(core::mem::replace(&mut entry.value, value));
        }

        let index = if MAX_LOAD.reached_by(self.len + 1, self.buckets.len()) {
            self.grow();
            self.bucket_index(&key)
        } else {
            index
        };
        self.buckets[index].push(Entry::new(key, value));
        self.len += 1;
        None
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.bucket_index(key);
        let bucket = &mut self.buckets[index];
        let position = bucket.iter().position(|entry| entry.key == *key)?;
        self.len -= 1;
        Some(bucket.swap_remove(position).value)
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self) {
        let capacity = grown_capacity(self.buckets.len());
        trace!(
            "chaining: growing {} -> {capacity} buckets at {} entries",
            self.buckets.len(),
            self.len
        );

        let old = core::mem::replace(&mut self.buckets, alloc_table(capacity, Vec::new));
        for entry in old.into_iter().flatten() {
            let index = home_index(make_hash(&self.hash_builder, &entry.key), capacity);
            self.buckets[index].push(entry);
        }
    }
}

impl<K, V, S> HashMapCore<K, V> for ChainingMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    const NAME: &'static str = "chaining";

    #[inline]
    fn insert(&mut self, key: K, value: V) -> Option<V> {
        ChainingMap::insert(self, key, value)
    }

    #[inline]
    fn get(&self, key: &K) -> Option<&V> {
        ChainingMap::get(self, key)
    }

    #[inline]
    fn remove(&mut self, key: &K) -> Option<V> {
        ChainingMap::remove(self, key)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn max_load_factor(&self) -> f64 {
        MAX_LOAD.ratio()
    }

    fn probe_stats(&self) -> ProbeStats {
        self.buckets
            .iter()
            .flat_map(|bucket| 1..=bucket.len())
            .collect()
    }
}

impl<K, V, S> fmt::Debug for ChainingMap<K, V, S>
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

    #[test]
    fn capacity_is_rounded() {
        let map: ChainingMap<u64, u64> = ChainingMap::with_capacity(100);
        assert_eq!(map.capacity(), 128);
        let map: ChainingMap<u64, u64> = ChainingMap::new();
        assert_eq!(map.capacity(), 8);
    }

    #[test]
    fn grows_on_sixth_key_of_eight() {
        let mut map: ChainingMap<u64, u64> = ChainingMap::with_capacity(8);
        for key in 0..5 {
            map.insert(key, key);
        }
        assert_eq!(map.capacity(), 8);
        assert_eq!(map.load_factor(), 0.625);

        map.insert(5, 5);
        assert_eq!(map.capacity(), 16);
        assert_eq!(map.len(), 6);

        // Updating an existing key never grows.
        let mut map: ChainingMap<u64, u64> = ChainingMap::with_capacity(8);
        for key in 0..5 {
            map.insert(key, key);
        }
        map.insert(4, 40);
        assert_eq!(map.capacity(), 8);
    }

    #[test]
    fn entries_live_in_their_home_bucket() {
        let mut map: ChainingMap<u64, u64, IdentityHashBuilder> =
            ChainingMap::with_capacity_and_hasher(8, IdentityHashBuilder::default());
        for key in [1u64, 9, 17, 2] {
            map.insert(key, key);
        }
        let lengths: Vec<usize> = map.bucket_lengths().collect();
        assert_eq!(lengths, [0, 3, 1, 0, 0, 0, 0, 0]);
        assert_eq!(lengths.iter().sum::<usize>(), map.len());
    }

    #[test]
    fn colliding_keys_share_one_chain() {
        let mut map: ChainingMap<u64, &str, CollidingHashBuilder> = ChainingMap::default();
        map.insert(1, "a");
        map.insert(2, "b");
        map.insert(3, "c");
        assert_eq!(map.remove(&1), Some("a"));
        assert_eq!(map.get(&2), Some(&"b"));
        assert_eq!(map.get(&3), Some(&"c"));
        assert_eq!(map.get(&1), None);

        let stats = map.probe_stats();
        assert_eq!(stats.histogram(), &[1, 1]);
        assert_eq!(stats.max(), 2);
    }

    #[test]
    fn probe_lengths_follow_chain_positions() {
        let mut map: ChainingMap<u64, u64, CollidingHashBuilder> = ChainingMap::default();
        for key in 0..4 {
            map.insert(key, key);
        }
        let stats = map.probe_stats();
        assert_eq!(stats.histogram(), &[1, 1, 1, 1]);
        assert_eq!(stats.mean(), 2.5);
    }

    #[test]
    fn debug_lists_entries() {
        let mut map: ChainingMap<u64, u64> = ChainingMap::new();
        map.insert(7, 70);
        assert_eq!(format!("{map:?}"), "{7: 70}");
        assert!(map.contains_key(&7));
        assert_eq!(map.iter().count(), 1);
    }
}
