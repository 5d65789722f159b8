//! Key generation.
//!
//! A [`KeySpace`] turns a random source into a sequence of distinct `u64`
//! keys with a chosen shape. The random source is always supplied by the
//! caller, so the same seeded generator yields the same keys.

use core::fmt;
use core::str::FromStr;
use std::collections::HashSet;

use rand::Rng;
use rand::seq::index;

use crate::error::ConfigError;

/// Default number of dense ranges in the clustered pattern.
pub const DEFAULT_CLUSTERS: usize = 10;
/// Default width of each dense range in the clustered pattern.
pub const DEFAULT_CLUSTER_WIDTH: usize = 1024;

/// Number of distinct prefixes, and of distinct offsets within one cluster,
/// a clustered key can take.
pub const CLUSTER_SPAN: u64 = 1 << 32;

/// The shape of a generated key sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyPattern {
    /// Independent random keys spread over the whole key space.
    Uniform,
    /// Keys concentrated in a few dense ranges.
    Clustered,
    /// Consecutive keys from a random start.
    Sequential,
}

impl KeyPattern {
    /// Every pattern, in the order they are listed on the command line.
    pub const ALL: [KeyPattern; 3] = [
        KeyPattern::Uniform,
        KeyPattern::Clustered,
        KeyPattern::Sequential,
    ];

    /// The name accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            KeyPattern::Uniform => "uniform",
            KeyPattern::Clustered => "clustered",
            KeyPattern::Sequential => "sequential",
        }
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyPattern {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyPattern::ALL
            .into_iter()
            .find(|pattern| pattern.name() == s)
            .ok_or_else(|| ConfigError::UnknownKeyPattern(s.to_string()))
    }
}

/// A key generator for one [`KeyPattern`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeySpace {
    pattern: KeyPattern,
    clusters: usize,
    cluster_width: usize,
}

impl KeySpace {
    /// A key space with the default cluster shape.
    pub fn new(pattern: KeyPattern) -> Self {
        Self {
            pattern,
            clusters: DEFAULT_CLUSTERS,
            cluster_width: DEFAULT_CLUSTER_WIDTH,
        }
    }

    /// Sets the number and width of the dense ranges used by
    /// [`KeyPattern::Clustered`]. Both are clamped to at least one.
    ///
    /// # Panics
    ///
    /// Panics if either exceeds [`CLUSTER_SPAN`].
    pub fn with_clusters(mut self, clusters: usize, cluster_width: usize) -> Self {
        assert!(
            clusters as u64 <= CLUSTER_SPAN && cluster_width as u64 <= CLUSTER_SPAN,
            "clustered key space limited to {CLUSTER_SPAN} clusters of {CLUSTER_SPAN} keys"
        );
        self.clusters = clusters.max(1);
        self.cluster_width = cluster_width.max(1);
        self
    }

    /// The pattern this key space generates.
    pub fn pattern(&self) -> KeyPattern {
        self.pattern
    }

    /// Generates `count` keys.
    ///
    /// Sequential and clustered keys are always distinct. Uniform keys are
    /// independent draws from the full `u64` range.
    pub fn keys<R: Rng>(&self, rng: &mut R, count: usize) -> Vec<u64> {
        match self.pattern {
            KeyPattern::Uniform => (0..count).map(|_| rng.random::<u64>()).collect(),
            KeyPattern::Sequential => {
                let start = rng.random_range(0..u64::MAX / 2);
                (start..).take(count).collect()
            }
            KeyPattern::Clustered => self.clustered(rng, count),
        }
    }

    /// Each cluster takes a distinct random 32-bit prefix in the high half
    /// of the key and distinct offsets from `0..width` in the low half. Keys
    /// are emitted round-robin across clusters.
    fn clustered<R: Rng>(&self, rng: &mut R, count: usize) -> Vec<u64> {
        let per_cluster = count.div_ceil(self.clusters);
        assert!(
            per_cluster as u64 <= CLUSTER_SPAN,
            "{count} keys do not fit in {} clusters",
            self.clusters
        );
        let width = self.cluster_width.max(per_cluster);

        let mut seen = HashSet::with_capacity(self.clusters);
        let mut prefixes: Vec<u64> = Vec::with_capacity(self.clusters);
        while prefixes.len() < self.clusters {
            let prefix = rng.random::<u32>();
            if seen.insert(prefix) {
                prefixes.push(u64::from(prefix));
            }
        }

        let offsets: Vec<Vec<u64>> = prefixes
            .iter()
            .map(|_| {
                index::sample(rng, width, per_cluster)
                    .into_iter()
                    .map(|offset| offset as u64)
                    .collect()
            })
            .collect();

        (0..count)
            .map(|i| {
                let cluster = i % self.clusters;
                (prefixes[cluster] << 32) | offsets[cluster][i / self.clusters]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[test]
    fn parse_patterns() {
        for pattern in KeyPattern::ALL {
            assert_eq!(pattern.name().parse::<KeyPattern>(), Ok(pattern));
        }
        assert_eq!(
            "zipf".parse::<KeyPattern>(),
            Err(ConfigError::UnknownKeyPattern("zipf".to_string()))
        );
    }

    #[test]
    fn same_seed_same_keys() {
        for pattern in KeyPattern::ALL {
            let space = KeySpace::new(pattern);
            assert_eq!(space.keys(&mut rng(), 500), space.keys(&mut rng(), 500));
        }
    }

    #[test]
    fn sequential_keys_are_consecutive() {
        let keys = KeySpace::new(KeyPattern::Sequential).keys(&mut rng(), 100);
        assert_eq!(keys.len(), 100);
        assert!(keys.windows(2).all(|pair| pair[1] == pair[0] + 1));
    }

    #[test]
    fn clustered_keys_stay_in_their_ranges() {
        let space = KeySpace::new(KeyPattern::Clustered).with_clusters(4, 32);
        let keys = space.keys(&mut rng(), 64);
        assert_eq!(keys.len(), 64);

        let distinct: HashSet<u64> = keys.iter().copied().collect();
        assert_eq!(distinct.len(), 64);

        let prefixes: HashSet<u64> = keys.iter().map(|key| key >> 32).collect();
        assert_eq!(prefixes.len(), 4);
        assert!(keys.iter().all(|key| key & 0xffff_ffff < 32));

        // Round-robin: consecutive keys come from different clusters.
        assert_ne!(keys[0] >> 32, keys[1] >> 32);
        assert_eq!(keys[0] >> 32, keys[4] >> 32);
    }

    #[test]
    fn clustered_width_widens_to_fit() {
        let space = KeySpace::new(KeyPattern::Clustered).with_clusters(2, 4);
        let keys = space.keys(&mut rng(), 20);
        let distinct: HashSet<u64> = keys.iter().copied().collect();
        assert_eq!(distinct.len(), 20);
        assert!(keys.iter().all(|key| key & 0xffff_ffff < 10));
    }

    #[test]
    fn many_small_clusters_get_distinct_prefixes() {
        let space = KeySpace::new(KeyPattern::Clustered).with_clusters(5_000, 1);
        let keys = space.keys(&mut rng(), 5_000);
        let prefixes: HashSet<u64> = keys.iter().map(|key| key >> 32).collect();
        assert_eq!(prefixes.len(), 5_000);
        assert!(keys.iter().all(|key| key & 0xffff_ffff == 0));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[should_panic(expected = "clustered key space limited")]
    fn cluster_width_past_offset_bits_panics() {
        let _ = KeySpace::new(KeyPattern::Clustered).with_clusters(2, 1 << 40);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn widest_clusters_keep_their_prefix() {
        let space = KeySpace::new(KeyPattern::Clustered).with_clusters(2, 1 << 32);
        let keys = space.keys(&mut rng(), 1_000);
        let prefixes: HashSet<u64> = keys.iter().map(|key| key >> 32).collect();
        assert_eq!(prefixes.len(), 2);
    }

    #[test]
    fn empty_request() {
        for pattern in KeyPattern::ALL {
            assert!(KeySpace::new(pattern).keys(&mut rng(), 0).is_empty());
        }
    }
}
