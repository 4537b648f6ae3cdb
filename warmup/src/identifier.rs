// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Agent identifiers
//!
//! Every agent instance is keyed by exactly one of four identifier kinds. The kind is a property
//! of the agent type and is fixed at discovery time; identifiers produced by strategies or read
//! from the store carry their kind as the enum tag, so downstream code matches on it instead of
//! inspecting types at runtime.
//!

use crate::Error;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// The kind of key an agent type is addressed by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Uuid,
    String,
    Int32,
    Int64,
}

impl IdentifierKind {
    /// True for the integer kinds.
    pub fn is_numeric(&self) -> bool {
        matches!(self, IdentifierKind::Int32 | IdentifierKind::Int64)
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentifierKind::Uuid => "uuid",
            IdentifierKind::String => "string",
            IdentifierKind::Int32 => "int32",
            IdentifierKind::Int64 => "int64",
        };
        f.write_str(name)
    }
}

/// Identifier of a single agent instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifier {
    Uuid(Uuid),
    String(String),
    Int32(i32),
    Int64(i64),
}

impl Identifier {
    /// The kind of this identifier.
    pub fn kind(&self) -> IdentifierKind {
        match self {
            Identifier::Uuid(_) => IdentifierKind::Uuid,
            Identifier::String(_) => IdentifierKind::String,
            Identifier::Int32(_) => IdentifierKind::Int32,
            Identifier::Int64(_) => IdentifierKind::Int64,
        }
    }

    /// Parses the raw textual form of an identifier as the given kind.
    ///
    /// UUIDs are accepted both hyphenated and in the 32 hex digit simple form, which is the form
    /// the persistence layer writes.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidIdentifier` if `raw` is not a valid value of `kind`.
    ///
    pub fn parse(kind: IdentifierKind, raw: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidIdentifier(kind, raw.to_owned());
        match kind {
            IdentifierKind::Uuid => Uuid::parse_str(raw)
                .map(Identifier::Uuid)
                .map_err(|_| invalid()),
            IdentifierKind::String => {
                if raw.is_empty() {
                    Err(invalid())
                } else {
                    Ok(Identifier::String(raw.to_owned()))
                }
            }
            IdentifierKind::Int32 => {
                raw.parse().map(Identifier::Int32).map_err(|_| invalid())
            }
            IdentifierKind::Int64 => {
                raw.parse().map(Identifier::Int64).map_err(|_| invalid())
            }
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Uuid(id) => write!(f, "{}", id.simple()),
            Identifier::String(id) => f.write_str(id),
            Identifier::Int32(id) => write!(f, "{}", id),
            Identifier::Int64(id) => write!(f, "{}", id),
        }
    }
}

impl From<Uuid> for Identifier {
    fn from(value: Uuid) -> Self {
        Identifier::Uuid(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::String(value.to_owned())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::String(value)
    }
}

impl From<i32> for Identifier {
    fn from(value: i32) -> Self {
        Identifier::Int32(value)
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Identifier::Int64(value)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_parse_each_kind() {
        let uuid = Uuid::new_v4();
        assert_eq!(
            Identifier::parse(IdentifierKind::Uuid, &uuid.simple().to_string())
                .unwrap(),
            Identifier::Uuid(uuid)
        );
        assert_eq!(
            Identifier::parse(IdentifierKind::Uuid, &uuid.to_string()).unwrap(),
            Identifier::Uuid(uuid)
        );
        assert_eq!(
            Identifier::parse(IdentifierKind::String, "order-7").unwrap(),
            Identifier::from("order-7")
        );
        assert_eq!(
            Identifier::parse(IdentifierKind::Int32, "-12").unwrap(),
            Identifier::Int32(-12)
        );
        assert_eq!(
            Identifier::parse(IdentifierKind::Int64, "9000000000").unwrap(),
            Identifier::Int64(9_000_000_000)
        );
    }

    #[test]
    fn test_parse_rejects_mismatched_values() {
        assert!(Identifier::parse(IdentifierKind::Uuid, "not-a-uuid").is_err());
        assert!(Identifier::parse(IdentifierKind::Int32, "9000000000").is_err());
        assert!(Identifier::parse(IdentifierKind::Int64, "abc").is_err());
        assert_eq!(
            Identifier::parse(IdentifierKind::String, ""),
            Err(Error::InvalidIdentifier(IdentifierKind::String, String::new()))
        );
    }

    #[test]
    fn test_display_matches_parse() {
        let uuid = Uuid::new_v4();
        let id = Identifier::Uuid(uuid);
        assert_eq!(id.to_string(), uuid.simple().to_string());
        assert_eq!(
            Identifier::parse(IdentifierKind::Uuid, &id.to_string()).unwrap(),
            id
        );
        assert_eq!(Identifier::from(42i64).kind(), IdentifierKind::Int64);
    }
}
