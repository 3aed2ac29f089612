//! Serde helpers for PATCH-style request bodies.

use serde::{de::Error as _, Deserialize, Deserializer};

use crate::types::DbId;

/// Distinguish an absent field from an explicit `null`.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` on an
/// `Option<Option<T>>` field: absent gives `None`, `null` gives `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseId {
    Id(DbId),
    Text(String),
}

/// An optional id sent by a form: a number, a numeric string, `""` or `null`.
/// Blank strings count as no id.
pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<DbId>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<LooseId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LooseId::Id(id)) => Ok(Some(id)),
        Some(LooseId::Text(text)) => match text.trim() {
            "" => Ok(None),
            digits => digits
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("invalid id: {text:?}"))),
        },
    }
}

/// [`optional_id`] for PATCH-style bodies: absent gives `None`, while `null`
/// and `""` both give `Some(None)`.
pub fn double_optional_id<'de, D>(deserializer: D) -> Result<Option<Option<DbId>>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_id(deserializer).map(Some)
}
