// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!

use crate::identifier::IdentifierKind;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the warmup system.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// Invalid configuration or strategy parameters, detected before a run starts.
    #[error("Validation error: {0}")]
    Validation(String),
    /// A registered type can not be turned into a warmup descriptor.
    #[error("Discovery error for {0}: {1}")]
    Discovery(String, String),
    /// The identifier kind does not match the kind the agent type is keyed by.
    #[error("Unsupported identifier kind {actual} for agent type keyed by {expected}.")]
    UnsupportedIdentifierKind {
        /// Kind expected by the agent type.
        expected: IdentifierKind,
        /// Kind of the identifier received.
        actual: IdentifierKind,
    },
    /// A raw identifier could not be parsed into the requested kind.
    #[error("Invalid {0} identifier: {1}")]
    InvalidIdentifier(IdentifierKind, String),
    /// The actor runtime could not resolve a reference.
    #[error("Actor runtime error: {0}")]
    Runtime(String),
    /// The activation call failed.
    #[error("Activation failed: {0}")]
    Activation(String),
    /// An operation did not complete in time.
    #[error("Timed out after {0} ms.")]
    Timeout(u64),
    /// Identifier store error.
    #[error("Store error: {0}")]
    Store(String),
    /// Unexpected failure inside the warmup machinery.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True if a new activation attempt may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Runtime(_)
                | Error::Activation(_)
                | Error::Timeout(_)
                | Error::Store(_)
        )
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(Error::Activation("boom".to_owned()).is_retryable());
        assert!(Error::Timeout(5000).is_retryable());
        assert!(!Error::Validation("empty".to_owned()).is_retryable());
        assert!(
            !Error::UnsupportedIdentifierKind {
                expected: IdentifierKind::Uuid,
                actual: IdentifierKind::String,
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_error_display() {
        let error = Error::UnsupportedIdentifierKind {
            expected: IdentifierKind::Int64,
            actual: IdentifierKind::String,
        };
        assert_eq!(
            error.to_string(),
            "Unsupported identifier kind string for agent type keyed by int64."
        );
    }
}
