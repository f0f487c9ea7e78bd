//! Serde adapters that write booleans as `0`/`1` integers.
//!
//! The review page compares flags numerically, so every pass/fail value in an
//! artifact is an integer. Reading accepts either integers or JSON booleans.

use serde::{Deserialize, Deserializer, Serializer, de};

pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    FlagRepr::deserialize(deserializer)?.into_bool()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
}

impl FlagRepr {
    fn into_bool<E: de::Error>(self) -> Result<bool, E> {
        match self {
            FlagRepr::Bool(value) => Ok(value),
            FlagRepr::Int(0) => Ok(false),
            FlagRepr::Int(1) => Ok(true),
            FlagRepr::Int(other) => Err(E::custom(format!("flag must be 0 or 1, found {other}"))),
        }
    }
}

/// Same encoding for optional flags; `None` is written as `null`.
pub mod option {
    use super::FlagRepr;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<bool>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(flag) => serializer.serialize_some(&u8::from(*flag)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<bool>, D::Error> {
        Option::<FlagRepr>::deserialize(deserializer)?
            .map(FlagRepr::into_bool)
            .transpose()
    }
}
