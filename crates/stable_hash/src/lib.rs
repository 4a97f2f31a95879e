//! # Stable Hash
//!
//! Deterministic hashing for resource arguments.
//!
//! The resource graph identifies every cached value by a fingerprint of the
//! resource type and its arguments. Rust's [`std::hash::Hash`] is not a good
//! fit for that: the standard `Hasher` trait is tied to 64-bit output and the
//! `Hash` implementations of some types (e.g. `HashMap`) depend on iteration
//! order. This crate provides:
//!
//! - [`StableHash`]: how a value feeds itself into a hasher
//! - [`StableHasher`]: a hash function producing a wide [`Value`]
//! - [`Sip128Hasher`]: the `SipHash` 1-3 128-bit implementation
//! - `#[derive(StableHash)]` for argument structs and enums
//!
//! ## Example
//!
//! ```
//! use resgraph_stable_hash::{Sip128Hasher, StableHash, StableHasher};
//!
//! let mut hasher = Sip128Hasher::new();
//! ("chunk", 4_i32, 2_i32).stable_hash(&mut hasher);
//! let fingerprint: u128 = hasher.finish();
//! # let _ = fingerprint;
//! ```

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    hash::BuildHasher,
    rc::Rc,
    sync::Arc,
};

pub use resgraph_stable_hash_derive::StableHash;
pub use siphasher::sip128::SipHasher as Sip128Hasher;
use siphasher::sip128::Hasher128;

/// A hash output that can be combined without regard to order.
///
/// Unordered collections hash each element with a sub-hasher and add the
/// results together, so two maps with the same contents hash identically no
/// matter how they iterate.
pub trait Value: Default + StableHash + Send + Sync + 'static {
    /// Adds two hash values, wrapping on overflow.
    #[must_use]
    fn wrapping_add(self, other: Self) -> Self;
}

macro_rules! impl_value {
    ($($ty:ty),*) => {
        $(
            impl Value for $ty {
                fn wrapping_add(self, other: Self) -> Self {
                    <$ty>::wrapping_add(self, other)
                }
            }
        )*
    };
}

impl_value!(u8, u16, u32, u64, u128, usize);

/// A deterministic hash function.
///
/// Integers are written in little-endian byte order so the same value hashes
/// identically on every platform. Variable length data is prefixed with its
/// length.
pub trait StableHasher: Send + Sync + 'static {
    /// The type of hash value produced by this hasher.
    type Hash: Value;

    /// Returns the hash of everything written so far.
    fn finish(&self) -> Self::Hash;

    /// Writes raw bytes into the hasher.
    fn write(&mut self, bytes: &[u8]);

    /// Writes a single byte.
    fn write_u8(&mut self, i: u8) { self.write(&[i]); }

    /// Writes a `u16` in little-endian order.
    fn write_u16(&mut self, i: u16) { self.write(&i.to_le_bytes()); }

    /// Writes a `u32` in little-endian order.
    fn write_u32(&mut self, i: u32) { self.write(&i.to_le_bytes()); }

    /// Writes a `u64` in little-endian order.
    fn write_u64(&mut self, i: u64) { self.write(&i.to_le_bytes()); }

    /// Writes a `u128` in little-endian order.
    fn write_u128(&mut self, i: u128) { self.write(&i.to_le_bytes()); }

    /// Writes a `usize` widened to 64 bits, so 32-bit and 64-bit targets
    /// agree.
    fn write_usize(&mut self, i: usize) { self.write_u64(i as u64); }

    /// Writes a float, normalizing every NaN to the canonical one.
    fn write_f64(&mut self, f: f64) {
        let normalized = if f.is_nan() { f64::NAN } else { f };
        self.write(&normalized.to_le_bytes());
    }

    /// Writes the length prefix of a variable length sequence.
    fn write_length_prefix(&mut self, len: usize) { self.write_usize(len); }

    /// Writes a length-prefixed string.
    fn write_str(&mut self, s: &str) {
        self.write_length_prefix(s.len());
        self.write(s.as_bytes());
    }

    /// Hashes a nested value with a fresh hasher that shares this hasher's
    /// keys, returning the nested hash.
    ///
    /// Used by unordered collections: the element hashes are combined with
    /// [`Value::wrapping_add`] before being written to `self`.
    fn sub_hash(
        &self,
        f: &mut dyn FnMut(&mut dyn StableHasher<Hash = Self::Hash>),
    ) -> Self::Hash;
}

/// A type that can be hashed deterministically.
///
/// Implementations must hash every field that contributes to equality, in a
/// fixed order. Two values that compare equal must produce the same hash.
pub trait StableHash {
    /// Feeds this value into `sink`.
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H);
}

static_assertions::assert_obj_safe!(StableHasher<Hash = u128>);

impl StableHasher for Sip128Hasher {
    type Hash = u128;

    fn finish(&self) -> Self::Hash { self.finish128().into() }

    fn write(&mut self, bytes: &[u8]) { std::hash::Hasher::write(self, bytes); }

    fn sub_hash(
        &self,
        f: &mut dyn FnMut(&mut dyn StableHasher<Hash = Self::Hash>),
    ) -> Self::Hash {
        let mut sub_hasher = *self;
        f(&mut sub_hasher);
        sub_hasher.finish128().into()
    }
}

macro_rules! impl_stable_hash_int {
    ($($ty:ty => $write:ident as $as:ty),* $(,)?) => {
        $(
            impl StableHash for $ty {
                #[allow(clippy::cast_sign_loss, clippy::cast_lossless)]
                fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
                    sink.$write(*self as $as);
                }
            }
        )*
    };
}

impl_stable_hash_int!(
    u8 => write_u8 as u8,
    i8 => write_u8 as u8,
    u16 => write_u16 as u16,
    i16 => write_u16 as u16,
    u32 => write_u32 as u32,
    i32 => write_u32 as u32,
    u64 => write_u64 as u64,
    i64 => write_u64 as u64,
    u128 => write_u128 as u128,
    i128 => write_u128 as u128,
    usize => write_usize as usize,
    isize => write_usize as usize,
);

impl StableHash for f32 {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        sink.write_f64(f64::from(*self));
    }
}

impl StableHash for f64 {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        sink.write_f64(*self);
    }
}

impl StableHash for bool {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        sink.write_u8(u8::from(*self));
    }
}

impl StableHash for char {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        sink.write_u32(u32::from(*self));
    }
}

impl StableHash for str {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        sink.write_str(self);
    }
}

impl StableHash for String {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        sink.write_str(self);
    }
}

impl StableHash for std::path::Path {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        let bytes = self.as_os_str().as_encoded_bytes();
        sink.write_length_prefix(bytes.len());
        sink.write(bytes);
    }
}

impl StableHash for std::path::PathBuf {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        self.as_path().stable_hash(sink);
    }
}

impl StableHash for std::time::Duration {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        sink.write_u64(self.as_secs());
        sink.write_u32(self.subsec_nanos());
    }
}

impl<T> StableHash for std::marker::PhantomData<T> {
    fn stable_hash<H: StableHasher + ?Sized>(&self, _sink: &mut H) {}
}

impl<T: StableHash> StableHash for [T] {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        sink.write_length_prefix(self.len());
        for item in self {
            item.stable_hash(sink);
        }
    }
}

impl<T: StableHash, const N: usize> StableHash for [T; N] {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        self.as_slice().stable_hash(sink);
    }
}

impl<T: StableHash> StableHash for Vec<T> {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        self.as_slice().stable_hash(sink);
    }
}

impl<T: StableHash> StableHash for VecDeque<T> {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        sink.write_length_prefix(self.len());
        for item in self {
            item.stable_hash(sink);
        }
    }
}

impl<T: StableHash> StableHash for Option<T> {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        match self {
            None => sink.write_u8(0),
            Some(value) => {
                sink.write_u8(1);
                value.stable_hash(sink);
            }
        }
    }
}

impl<T: StableHash, E: StableHash> StableHash for Result<T, E> {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        match self {
            Ok(value) => {
                sink.write_u8(0);
                value.stable_hash(sink);
            }
            Err(error) => {
                sink.write_u8(1);
                error.stable_hash(sink);
            }
        }
    }
}

macro_rules! impl_stable_hash_deref {
    ($($ty:ident),*) => {
        $(
            impl<T: StableHash + ?Sized> StableHash for $ty<T> {
                fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
                    (**self).stable_hash(sink);
                }
            }
        )*
    };
}

impl_stable_hash_deref!(Box, Rc, Arc);

impl<T: StableHash + ?Sized> StableHash for &T {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        (**self).stable_hash(sink);
    }
}

impl<K: StableHash, V: StableHash> StableHash for BTreeMap<K, V> {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        sink.write_length_prefix(self.len());
        for (key, value) in self {
            key.stable_hash(sink);
            value.stable_hash(sink);
        }
    }
}

impl<T: StableHash> StableHash for BTreeSet<T> {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        sink.write_length_prefix(self.len());
        for value in self {
            value.stable_hash(sink);
        }
    }
}

impl<K: StableHash, V: StableHash, B: BuildHasher> StableHash
    for HashMap<K, V, B>
{
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        sink.write_length_prefix(self.len());
        let mut combined = H::Hash::default();

        for (key, value) in self {
            combined = combined.wrapping_add(sink.sub_hash(&mut |sub| {
                key.stable_hash(sub);
                value.stable_hash(sub);
            }));
        }

        combined.stable_hash(sink);
    }
}

impl<T: StableHash, B: BuildHasher> StableHash for HashSet<T, B> {
    fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
        sink.write_length_prefix(self.len());
        let mut combined = H::Hash::default();

        for value in self {
            combined = combined.wrapping_add(sink.sub_hash(&mut |sub| {
                value.stable_hash(sub);
            }));
        }

        combined.stable_hash(sink);
    }
}

macro_rules! impl_stable_hash_tuple {
    () => {
        impl StableHash for () {
            fn stable_hash<H: StableHasher + ?Sized>(&self, _sink: &mut H) {}
        }
    };
    ($($name:ident)+) => {
        impl<$($name: StableHash),+> StableHash for ($($name,)+) {
            #[allow(non_snake_case)]
            fn stable_hash<H: StableHasher + ?Sized>(&self, sink: &mut H) {
                let ($($name,)+) = self;
                $($name.stable_hash(sink);)+
            }
        }
    };
}

impl_stable_hash_tuple!();
impl_stable_hash_tuple!(T);
impl_stable_hash_tuple!(T U);
impl_stable_hash_tuple!(T U V);
impl_stable_hash_tuple!(T U V W);
impl_stable_hash_tuple!(T U V W X);
impl_stable_hash_tuple!(T U V W X Y);
impl_stable_hash_tuple!(T U V W X Y Z);
impl_stable_hash_tuple!(T U V W X Y Z A);

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::{Sip128Hasher, StableHash, StableHasher};

    fn hash_of<T: StableHash + ?Sized>(value: &T) -> u128 {
        let mut hasher = Sip128Hasher::new();
        value.stable_hash(&mut hasher);
        hasher.finish()
    }

    #[derive(StableHash)]
    #[stable_hash_crate(crate)]
    struct Chunk {
        x: i32,
        y: i32,
    }

    #[derive(StableHash)]
    #[stable_hash_crate(crate)]
    enum Shape {
        Point,
        Circle(u32),
        Rect { width: u32, height: u32 },
    }

    #[test]
    fn equal_values_hash_equal() {
        assert_eq!(hash_of("mesh"), hash_of(&String::from("mesh")));
        assert_eq!(hash_of(&(1_i32, 2_i32)), hash_of(&(1_i32, 2_i32)));
        assert_eq!(
            hash_of(&Chunk { x: 3, y: -4 }),
            hash_of(&Chunk { x: 3, y: -4 })
        );
    }

    #[test]
    fn length_prefix_separates_concatenations() {
        assert_ne!(
            hash_of(&(String::from("ab"), String::from("c"))),
            hash_of(&(String::from("a"), String::from("bc")))
        );
    }

    #[test]
    fn enum_variants_are_distinguished() {
        assert_ne!(hash_of(&Shape::Point), hash_of(&Shape::Circle(0)));
        assert_ne!(
            hash_of(&Shape::Circle(2)),
            hash_of(&Shape::Rect { width: 2, height: 0 })
        );
    }

    #[test]
    fn hash_map_ignores_insertion_order() {
        let forward: HashMap<i32, &str> =
            (0..64).map(|i| (i, "value")).collect();
        let backward: HashMap<i32, &str> =
            (0..64).rev().map(|i| (i, "value")).collect();

        assert_eq!(hash_of(&forward), hash_of(&backward));
    }

    #[test]
    fn nan_is_normalized() {
        assert_eq!(hash_of(&f64::NAN), hash_of(&(-f64::NAN)));
    }
}
