//! Hashing shared by every map implementation.
//!
//! All maps derive their home index from [`make_hash`] and [`home_index`], so
//! a comparison between layouts never mixes in a difference in hash quality.
//! The hash builders here are seeded with fixed keys: two processes hashing
//! the same key produce the same table placement.

use core::fmt;
use core::hash::BuildHasher;
use core::hash::BuildHasherDefault;
use core::hash::Hash;
use core::hash::Hasher;
use core::str::FromStr;

use siphasher::sip::SipHasher13;

use crate::error::ConfigError;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Fixed-seed foldhash, the default hash for every map.
        pub type FoldHashBuilder = foldhash::fast::FixedState;

        /// The hash builder maps use when none is given.
        pub type DefaultHashBuilder = FoldHashBuilder;

        const DEFAULT_HASH_KIND: HashKind = HashKind::Fold;
        const ACCEPTED_HASHES: &str = "foldhash, siphash, identity";
    } else {
        /// The hash builder maps use when none is given.
        pub type DefaultHashBuilder = SipHashBuilder;

        const DEFAULT_HASH_KIND: HashKind = HashKind::Sip;
        const ACCEPTED_HASHES: &str = "siphash, identity";
    }
}

const SIP_K0: u64 = 0x243f_6a88_85a3_08d3;
const SIP_K1: u64 = 0x1319_8a2e_0370_7344;

/// SipHash-1-3 with fixed keys.
#[derive(Clone, Copy, Debug)]
pub struct SipHashBuilder {
    k0: u64,
    k1: u64,
}

impl SipHashBuilder {
    /// Creates a builder with explicit keys.
    pub const fn with_keys(k0: u64, k1: u64) -> Self {
        Self { k0, k1 }
    }
}

impl Default for SipHashBuilder {
    fn default() -> Self {
        Self::with_keys(SIP_K0, SIP_K1)
    }
}

impl BuildHasher for SipHashBuilder {
    type Hasher = SipHasher13;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher13::new_with_keys(self.k0, self.k1)
    }
}

/// A hasher that passes integer keys through unchanged.
///
/// With this hasher the home index of an integer key is its low bits, so
/// any structure in the key space shows up directly in the table. Byte
/// writes are folded in order, which keeps nearby byte strings nearby.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHasher {
    hash: u64,
}

impl Hasher for IdentityHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.hash = self.hash.rotate_left(8) ^ u64::from(byte);
        }
    }

    #[inline]
    fn write_u8(&mut self, n: u8) {
        self.write_u64(u64::from(n));
    }

    #[inline]
    fn write_u16(&mut self, n: u16) {
        self.write_u64(u64::from(n));
    }

    #[inline]
    fn write_u32(&mut self, n: u32) {
        self.write_u64(u64::from(n));
    }

    #[inline]
    fn write_u64(&mut self, n: u64) {
        self.hash = self.hash.rotate_left(32) ^ n;
    }

    #[inline]
    fn write_usize(&mut self, n: usize) {
        self.write_u64(n as u64);
    }
}

/// Builder for [`IdentityHasher`].
pub type IdentityHashBuilder = BuildHasherDefault<IdentityHasher>;

/// The hash functions a benchmark run can select.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashKind {
    /// foldhash with a fixed seed.
    #[cfg(feature = "foldhash")]
    Fold,
    /// SipHash-1-3 with fixed keys.
    Sip,
    /// [`IdentityHasher`].
    Identity,
}

impl HashKind {
    /// The name accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            #[cfg(feature = "foldhash")]
            HashKind::Fold => "foldhash",
            HashKind::Sip => "siphash",
            HashKind::Identity => "identity",
        }
    }
}

impl Default for HashKind {
    fn default() -> Self {
        DEFAULT_HASH_KIND
    }
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            #[cfg(feature = "foldhash")]
            "foldhash" => Ok(HashKind::Fold),
            "siphash" => Ok(HashKind::Sip),
            "identity" => Ok(HashKind::Identity),
            other => Err(ConfigError::UnknownHash {
                name: other.to_string(),
                accepted: ACCEPTED_HASHES,
            }),
        }
    }
}

/// Hashes `key` with a fresh hasher from `hash_builder`.
#[inline]
pub fn make_hash<K, S>(hash_builder: &S, key: &K) -> u64
where
    K: Hash + ?Sized,
    S: BuildHasher,
{
    hash_builder.hash_one(key)
}

/// Maps a hash onto a table of `capacity` slots.
///
/// `capacity` must be a power of two, which makes the mask equal to
/// `hash mod capacity`.
#[inline(always)]
pub fn home_index(hash: u64, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    hash as usize & (capacity - 1)
}

/// A hasher that sends every key to the same home index.
#[cfg(test)]
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct CollidingHasher;

#[cfg(test)]
impl Hasher for CollidingHasher {
    fn finish(&self) -> u64 {
        0
    }

    fn write(&mut self, _bytes: &[u8]) {}
}

#[cfg(test)]
pub(crate) type CollidingHashBuilder = BuildHasherDefault<CollidingHasher>;
