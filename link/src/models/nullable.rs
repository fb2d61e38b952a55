//! Field deserializers that treat an explicit JSON `null` like a missing key.
//!
//! The monitoring server fills optional fields with `null` rather than
//! omitting them, and `#[serde(default)]` alone only covers the missing case.

use serde::{Deserialize, Deserializer};

/// `null` becomes `T::default()`.
pub(crate) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
