// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Serde-specific utilties

use core::fmt;

use serde::{Deserializer, Serializer, de};

/// Serde "module" for (de)serializing `bool` capability flags as `0` or `1`
///
/// Discovery responses report flags as single bits. Configuration files
/// written by hand or dumped by tools thus usually carry integers.
pub struct Flag;

impl Flag {
    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        deserializer.deserialize_any(FlagVisitor)
    }
}

/// [`Visitor`][de::Visitor] accepting integer or boolean flags
struct FlagVisitor;

impl FlagVisitor {
    fn from_int<E: de::Error>(value: i128, unexpected: de::Unexpected) -> Result<bool, E> {
        match value {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::invalid_value(unexpected, &"0 or 1")),
        }
    }
}

impl de::Visitor<'_> for FlagVisitor {
    type Value = bool;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "either 0, 1 or a boolean")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Self::from_int(v.into(), de::Unexpected::Signed(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Self::from_int(v.into(), de::Unexpected::Unsigned(v))
    }
}
