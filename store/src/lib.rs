// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Store module.
//!
//! Reads the identifiers of persisted agents from a document store. Backends implement the
//! [`database`] traits; [`StoreIdentifierSource`] turns any of them into a warmup
//! identifier source.
//!

pub mod database;
pub mod error;
pub mod memory;
pub mod naming;
pub mod rate_limit;
pub mod source;

pub use error::Error;
pub use source::StoreIdentifierSource;
