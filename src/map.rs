//! The capability contract shared by every map layout, plus the table
//! helpers the layouts have in common.

use std::alloc::Layout;
use std::alloc::handle_alloc_error;

use crate::stats::ProbeStats;

/// Smallest table any map allocates.
pub const MIN_CAPACITY: usize = 8;

/// An owned key-value pair stored inside a map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<K, V> {
    /// The key.
    pub key: K,
    /// The value associated with `key`.
    pub value: V,
}

impl<K, V> Entry<K, V> {
    #[inline]
    pub(crate) fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

/// Operations every benchmarked map provides.
///
/// The runner is generic over this trait, so the layout under test is fixed
/// once when the map is constructed and every operation afterwards is
/// statically dispatched.
pub trait HashMapCore<K, V> {
    /// Name of the layout, as accepted on the command line.
    const NAME: &'static str;

    /// Inserts `value` under `key`, returning the value it replaced.
    ///
    /// If `key` is new and storing it would bring the table to its load
    /// limit, the table grows first. After this returns,
    /// `load_factor() <= max_load_factor()`.
    fn insert(&mut self, key: K, value: V) -> Option<V>;

    /// Returns a reference to the value stored under `key`.
    fn get(&self, key: &K) -> Option<&V>;

    /// Removes `key`, returning its value if it was present.
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Number of live entries.
    fn len(&self) -> usize;

    /// Returns `true` if the map holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buckets or slots in the table.
    fn capacity(&self) -> usize;

    /// The load factor at which the table grows.
    fn max_load_factor(&self) -> f64;

    /// Live entries divided by capacity.
    fn load_factor(&self) -> f64 {
        let capacity = self.capacity();
        if capacity == 0 {
            0.0
        } else {
            self.len() as f64 / capacity as f64
        }
    }

    /// Probe lengths over every live entry in the current layout.
    fn probe_stats(&self) -> ProbeStats;
}

/// Rounds a requested capacity up to a power of two no smaller than
/// [`MIN_CAPACITY`].
pub fn table_capacity(requested: usize) -> usize {
    requested
        .max(MIN_CAPACITY)
        .checked_next_power_of_two()
        .expect("capacity overflow")
}

#[inline]
pub(crate) fn grown_capacity(capacity: usize) -> usize {
    capacity.checked_mul(2).expect("capacity overflow")
}

/// Allocates a table of exactly `capacity` elements produced by `fill`.
///
/// Allocation failure aborts through [`handle_alloc_error`].
pub(crate) fn alloc_table<T>(capacity: usize, fill: impl FnMut() -> T) -> Vec<T> {
    let mut table = Vec::new();
    if table.try_reserve_exact(capacity).is_err() {
        handle_alloc_error(Layout::array::<T>(capacity).expect("allocation size overflow"));
    }
    table.resize_with(capacity, fill);
    table
}

/// A load limit expressed as an exact fraction.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LoadLimit {
    numerator: usize,
    denominator: usize,
}

impl LoadLimit {
    pub(crate) const fn new(numerator: usize, denominator: usize) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Returns `true` if `used / capacity` is at or above the limit.
    #[inline]
    pub(crate) fn reached_by(self, used: usize, capacity: usize) -> bool {
        used as u128 * self.denominator as u128 >= capacity as u128 * self.numerator as u128
    }

    pub(crate) fn ratio(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

/// Outcome of probing an open-addressed table for a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Probe {
    /// The key lives at this index.
    Found(usize),
    /// The key is absent; this is where it should be placed.
    Vacant(usize),
}

#[cold]
#[inline(never)]
pub(crate) fn probe_exhausted(capacity: usize) -> ! {
    panic!(
        "probe wrapped all {capacity} slots without reaching an empty slot; load limit was not \
         enforced"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chaining::ChainingMap;
    use crate::compact::CompactOpenAddressingMap;
    use crate::hash::SipHashBuilder;
    use crate::open_addressing::OpenAddressingMap;

    #[test]
    fn capacity_rounding() {
        assert_eq!(table_capacity(0), 8);
        assert_eq!(table_capacity(8), 8);
        assert_eq!(table_capacity(9), 16);
        assert_eq!(table_capacity(65536), 65536);
        assert_eq!(grown_capacity(8), 16);
    }

    #[test]
    #[should_panic(expected = "capacity overflow")]
    fn capacity_overflow_panics() {
        table_capacity(usize::MAX);
    }

    #[test]
    fn load_limit_is_exact() {
        let limit = LoadLimit::new(3, 4);
        assert!(!limit.reached_by(5, 8));
        assert!(limit.reached_by(6, 8));
        assert_eq!(limit.ratio(), 0.75);

        let limit = LoadLimit::new(7, 10);
        assert!(!limit.reached_by(5, 8));
        assert!(limit.reached_by(6, 8));
        assert!(!limit.reached_by(89, 128));
        assert!(limit.reached_by(90, 128));
    }

    #[test]
    fn alloc_table_fills() {
        let table = alloc_table(16, || 7u8);
        assert_eq!(table.len(), 16);
        assert!(table.iter().all(|&b| b == 7));
    }

    fn round_trip<M: HashMapCore<u64, u64> + Default>() {
        let mut map = M::default();
        assert!(map.is_empty());
        for key in 0..100u64 {
            assert_eq!(map.insert(key, key * 10), None);
            assert_eq!(map.get(&key), Some(&(key * 10)));
        }
        assert_eq!(map.len(), 100);
    }

    fn overwrite<M: HashMapCore<u64, u64> + Default>() {
        let mut map = M::default();
        assert_eq!(map.insert(5, 1), None);
        assert_eq!(map.insert(5, 2), Some(1));
        assert_eq!(map.get(&5), Some(&2));
        assert_eq!(map.len(), 1);
    }

    fn removal<M: HashMapCore<u64, u64> + Default>() {
        let mut map = M::default();
        map.insert(1, 11);
        map.insert(2, 22);
        assert_eq!(map.remove(&1), Some(11));
        assert_eq!(map.get(&1), None);
        assert_eq!(map.get(&2), Some(&22));
        assert_eq!(map.len(), 1);
    }

    fn absent_remove<M: HashMapCore<u64, u64> + Default>() {
        let mut map = M::default();
        assert_eq!(map.remove(&3), None);
        map.insert(4, 44);
        assert_eq!(map.remove(&3), None);
        assert_eq!(map.len(), 1);
        assert_eq!(map.remove(&4), Some(44));
        assert_eq!(map.remove(&4), None);
        assert!(map.is_empty());
    }

    fn load_factor_bound<M: HashMapCore<u64, u64> + Default>() {
        let mut map = M::default();
        for key in 0..2000u64 {
            map.insert(key.wrapping_mul(0x9e37_79b9_7f4a_7c15), key);
            assert!(map.load_factor() <= map.max_load_factor());
            assert!(map.capacity().is_power_of_two());
        }
    }

    fn growth_preserves_contents<M: HashMapCore<u64, u64> + Default>() {
        let mut map = M::default();
        let initial = map.capacity();
        for key in 0..500u64 {
            map.insert(key, key);
        }
        for key in (0..500u64).step_by(3) {
            assert_eq!(map.insert(key, key + 1000), Some(key));
        }
        assert!(map.capacity() > initial);
        assert_eq!(map.len(), 500);
        for key in 0..500u64 {
            let expected = if key % 3 == 0 { key + 1000 } else { key };
            assert_eq!(map.get(&key), Some(&expected));
        }
        assert_eq!(map.probe_stats().entries(), 500);
    }

    fn churn<M: HashMapCore<u64, u64> + Default>() {
        let mut map = M::default();
        for key in 0..1000u64 {
            map.insert(key, key);
        }
        for key in (0..1000u64).filter(|k| k % 2 == 0) {
            assert_eq!(map.remove(&key), Some(key));
        }
        for key in 1000..1500u64 {
            map.insert(key, key);
        }
        assert_eq!(map.len(), 1000);
        for key in 0..1500u64 {
            let present = key >= 1000 || key % 2 == 1;
            assert_eq!(map.get(&key).is_some(), present, "key {key}");
        }
    }

    macro_rules! contract_tests {
        ($($module:ident => $map:ty),* $(,)?) => {
            $(
                mod $module {
                    use super::*;

                    #[test]
                    fn round_trip() {
                        super::round_trip::<$map>();
                    }

                    #[test]
                    fn overwrite() {
                        super::overwrite::<$map>();
                    }

                    #[test]
                    fn removal() {
                        super::removal::<$map>();
                    }

                    #[test]
                    fn absent_remove() {
                        super::absent_remove::<$map>();
                    }

                    #[test]
                    fn load_factor_bound() {
                        super::load_factor_bound::<$map>();
                    }

                    #[test]
                    fn growth_preserves_contents() {
                        super::growth_preserves_contents::<$map>();
                    }

                    #[test]
                    #[cfg_attr(miri, ignore)]
                    fn churn() {
                        super::churn::<$map>();
                    }
                }
            )*
        };
    }

    contract_tests! {
        chaining => ChainingMap<u64, u64, SipHashBuilder>,
        open_addressing => OpenAddressingMap<u64, u64, SipHashBuilder>,
        compact => CompactOpenAddressingMap<u64, u64, SipHashBuilder>,
    }
}
