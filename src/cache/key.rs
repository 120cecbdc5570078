//! Cache Key Derivation
//!
//! Strings are used verbatim, self-describing keys provide their own string,
//! everything else is hashed together with an explicit type discriminator.

use crate::error::Result;
use md5::{Digest, Md5};
use serde::Serialize;

/// MD5 hex digest of `type_id` followed by `repr`
///
/// The discriminator is hashed alongside the value so equal representations
/// of different key types never collide.
pub fn checksum(type_id: &str, repr: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(type_id.as_bytes());
    hasher.update(repr.as_bytes());
    hex::encode(hasher.finalize())
}

// =============================================================================
// Key Traits
// =============================================================================

/// Anything that can address a cache entry
///
/// Implement this directly for a self-describing key that exposes its own
/// string representation.
pub trait ToCacheKey {
    fn to_cache_key(&self) -> Result<String>;
}

impl ToCacheKey for str {
    fn to_cache_key(&self) -> Result<String> {
        Ok(self.to_owned())
    }
}

impl ToCacheKey for String {
    fn to_cache_key(&self) -> Result<String> {
        Ok(self.clone())
    }
}

/// Keys addressed by a content hash
///
/// `KEY_TYPE` is a stable, versioned discriminator (e.g. `"user_ref.v1"`).
/// The representation defaults to the JSON encoding of the key; a key that
/// cannot be encoded has no address and yields an error.
pub trait HashedKey: Serialize {
    const KEY_TYPE: &'static str;

    fn key_repr(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<T: HashedKey> ToCacheKey for T {
    fn to_cache_key(&self) -> Result<String> {
        Ok(checksum(T::KEY_TYPE, &self.key_repr()?))
    }
}

macro_rules! hashed_primitive {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl HashedKey for $ty {
                const KEY_TYPE: &'static str = $name;

                fn key_repr(&self) -> Result<String> {
                    Ok(self.to_string())
                }
            }
        )*
    };
}

// Fixed wire names: renaming one changes every digest of that key type.
hashed_primitive! {
    isize => "int",
    i8 => "int8",
    i16 => "int16",
    i32 => "int32",
    i64 => "int64",
    usize => "uint",
    u8 => "uint8",
    u16 => "uint16",
    u32 => "uint32",
    u64 => "uint64",
    f32 => "float32",
    f64 => "float64",
    bool => "bool",
    char => "int32",
}
