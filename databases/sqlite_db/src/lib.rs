// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # SQLite database module.
//!
//! SQLite document store backend for reading persisted agent identifiers.
//!

mod sqlite;

pub use sqlite::{SqliteCollection, SqliteManager, open};
