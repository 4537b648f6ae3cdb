// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Store Error Types
//!
//! Errors raised while reading agent identifiers from a document store.
//!
//! ## Error Categories
//!
//! ### Storage Infrastructure Errors
//! - **CreateStore**: the backend could not be opened or initialised
//! - **Store**: a write, a lock or another backend operation failed
//!
//! ### Data Access Errors
//! - **Get**: a read from the backend failed
//! - **Timeout**: a read did not complete within the configured query timeout
//! - **MalformedDocument**: a stored document id is not in the `{agenttype}/{identifier}` form
//!
//! Every store error converts into `warmup::Error::Store`, so identifier sources can use `?`
//! inside the warmup boundary traits.
//!

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the store crate.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq)]
pub enum Error {
    /// Storage backend creation or initialization failure.
    ///
    /// Raised when a database file or directory can not be created, or the connection to the
    /// backend can not be established.
    #[error("Can't create store: {0}")]
    CreateStore(String),

    /// Data retrieval failure from storage backend.
    #[error("Get error: {0}")]
    Get(String),

    /// General storage operation failure.
    #[error("Store error: {0}")]
    Store(String),

    /// A read did not complete within the query timeout, in milliseconds.
    #[error("Query timed out after {0} ms")]
    Timeout(u64),

    /// A document id that can not be turned into an agent identifier.
    #[error("Malformed document id: {0}")]
    MalformedDocument(String),
}

impl From<Error> for warmup::Error {
    fn from(error: Error) -> Self {
        warmup::Error::Store(error.to_string())
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_into_warmup_error() {
        let error: warmup::Error = Error::Timeout(30000).into();
        assert_eq!(
            error,
            warmup::Error::Store("Query timed out after 30000 ms".to_owned())
        );
        assert!(error.is_retryable());
    }
}
