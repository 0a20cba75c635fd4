//! Serde helper for partial updates

use serde::{Deserialize, Deserializer};

/// Deserialize a field that must tell "absent" from an explicit `null`
///
/// Pair with `#[serde(default)]`: a missing field stays `None`, `null`
/// becomes `Some(None)` and a value becomes `Some(Some(value))`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
