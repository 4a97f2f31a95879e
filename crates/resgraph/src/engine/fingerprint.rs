use std::{any::TypeId, fmt};

use resgraph_stable_hash::{Sip128Hasher, StableHash, StableHasher};

use crate::resource::Resource;

const PRIMARY_KEYS: (u64, u64) = (0x7265_7367_7261_7068, 0x6b65_7973_2d6f_6e65);
const SECONDARY_KEYS: (u64, u64) =
    (0x5f3f_25d1_8c3a_9e41, 0xa4c1_0d27_7b9e_6f13);

/// The identity of a cached resource value.
///
/// A key is derived deterministically from the resource type, its arguments
/// and the configured fingerprint seed. Keys are stored as two `u64` halves
/// so they keep an 8-byte alignment inside map entries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub struct ResourceKey {
    hi: u64,
    lo: u64,
}

impl ResourceKey {
    /// Returns the key as a single 128-bit integer.
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        ((self.hi as u128) << 64) | self.lo as u128
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

/// Computes the key of resource `R` with `args`.
///
/// Two independently keyed SipHash-128 passes over `(seed, type, args)` are
/// each folded to 64 bits and form the two halves of the key.
#[must_use]
pub fn fingerprint<R: Resource>(args: &R::Args, seed: u64) -> ResourceKey {
    ResourceKey {
        hi: fold(keyed_hash::<R>(PRIMARY_KEYS, args, seed)),
        lo: fold(keyed_hash::<R>(SECONDARY_KEYS, args, seed)),
    }
}

fn keyed_hash<R: Resource>(
    (key0, key1): (u64, u64),
    args: &R::Args,
    seed: u64,
) -> u128 {
    let mut hasher = Sip128Hasher::new_with_keys(key0, key1);

    seed.stable_hash(&mut hasher);
    std::hash::Hash::hash(&TypeId::of::<R>(), &mut hasher);
    args.stable_hash(&mut hasher);

    StableHasher::finish(&hasher)
}

#[allow(clippy::cast_possible_truncation)]
const fn fold(hash: u128) -> u64 { (hash >> 64) as u64 ^ hash as u64 }
