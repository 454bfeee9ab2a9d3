//! Serde integration for [`Uuid`](crate::Uuid).
//!
//! [`Uuid`](crate::Uuid) implements [`Serialize`] and [`Deserialize`]
//! directly: human-readable formats use the hyphenated string form, compact
//! formats use the 16 big-endian bytes. The [`as_native`] module serializes
//! the raw `u128` instead.
//!
//! ```
//! use njall::Uuid;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Row {
//!     id: Uuid,
//!     #[serde(with = "njall::serde::as_native")]
//!     raw: Uuid,
//! }
//! ```

use crate::Uuid;
use ::serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use core::fmt;

impl Serialize for Uuid {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if s.is_human_readable() {
            s.collect_str(self)
        } else {
            s.serialize_bytes(&self.to_bytes())
        }
    }
}

impl<'de> Deserialize<'de> for Uuid {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct UuidVisitor;

        impl<'de> de::Visitor<'de> for UuidVisitor {
            type Value = Uuid;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a hyphenated or simple hex string, or 16 bytes")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Uuid::parse_str(v).map_err(de::Error::custom)
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let bytes: [u8; 16] = v
                    .try_into()
                    .map_err(|_| de::Error::invalid_length(v.len(), &self))?;
                Ok(Uuid::from_bytes(bytes))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut bytes = [0u8; 16];
                for (i, byte) in bytes.iter_mut().enumerate() {
                    *byte = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                }
                Ok(Uuid::from_bytes(bytes))
            }
        }

        if d.is_human_readable() {
            d.deserialize_str(UuidVisitor)
        } else {
            d.deserialize_bytes(UuidVisitor)
        }
    }
}

/// Serializes a [`Uuid`] as its raw `u128`.
pub mod as_native {
    use super::*;

    pub fn serialize<S>(id: &Uuid, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        id.to_raw().serialize(s)
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Uuid, D::Error>
    where
        D: Deserializer<'de>,
    {
        u128::deserialize(d).map(Uuid::from_raw)
    }
}
