// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Document Store Abstraction
//!
//! Traits a document store backend implements so that agent identifiers can be read from it.
//! The persistence layer of the actor runtime keeps one collection per agent type; every
//! document of a collection is the persisted state of one agent instance and its id has the
//! form `{agenttype}/{identifier}`, where `agenttype` is the lowercase short type name.
//!
//! ## Architecture Overview
//!
//! - **[`DbManager`]**: opens collections and lists the existing ones
//! - **[`DocumentCollection`]**: ordered, paginated access to the document ids of a collection
//!
//! Document ids are read with keyset pagination: each page holds the ids strictly greater than
//! the last id of the previous page, in ascending order. A page read therefore costs the same
//! whatever its position, and documents inserted while a scan is running do not shift the pages.
//!
//! ## Implementation Guide
//!
//! ```ignore
//! use store::{Error, database::{DbManager, DocumentCollection}};
//!
//! #[derive(Clone)]
//! struct MyManager { pool: ConnectionPool }
//!
//! impl DbManager<MyCollection> for MyManager {
//!     fn create_collection(&self, name: &str) -> Result<MyCollection, Error> {
//!         self.pool.create_table(name)?;
//!         Ok(MyCollection::new(self.pool.clone(), name))
//!     }
//!
//!     fn collection(&self, name: &str) -> Result<Option<MyCollection>, Error> {
//!         Ok(self.pool.has_table(name)?.then(|| MyCollection::new(self.pool.clone(), name)))
//!     }
//!
//!     fn collection_names(&self) -> Result<Vec<String>, Error> {
//!         self.pool.table_names()
//!     }
//! }
//! ```
//!
//! Backends are checked against the shared contract with [`test_document_store!`]:
//!
//! ```ignore
//! #[cfg(test)]
//! mod tests {
//!     use super::*;
//!     use store::test_document_store;
//!
//!     test_document_store! {
//!         unit_test_my_manager:MyManager:MyCollection
//!     }
//! }
//! ```
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`. The trait methods are blocking; async callers run them on
//! the blocking thread pool.
//!

use crate::error::Error;

/// Database manager trait for opening document collections.
///
/// # Type Parameters
///
/// * `C` - Collection type that implements [`DocumentCollection`]
///
pub trait DbManager<C>: Sync + Send + Clone
where
    C: DocumentCollection + 'static,
{
    /// Opens the collection `name`, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Error::CreateStore` if the collection can not be created.
    ///
    fn create_collection(&self, name: &str) -> Result<C, Error>;

    /// Opens the collection `name` if it exists.
    fn collection(&self, name: &str) -> Result<Option<C>, Error>;

    /// Names of the existing collections.
    fn collection_names(&self) -> Result<Vec<String>, Error>;

    /// Releases the backend.
    fn stop(self) -> Result<(), Error> {
        Ok(())
    }
}

/// Ordered access to the documents of one collection.
pub trait DocumentCollection: Sync + Send + 'static {
    /// Collection name.
    fn name(&self) -> &str;

    /// Up to `limit` document ids greater than `after`, in ascending order. `None` starts from
    /// the first id.
    ///
    /// # Errors
    ///
    /// Returns `Error::Get` if the backend read fails.
    ///
    fn page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, Error>;

    /// Number of documents in the collection.
    fn count(&self) -> Result<u64, Error>;

    /// Inserts or replaces the document `id`.
    fn insert(&mut self, id: &str, value: &[u8]) -> Result<(), Error>;

    /// Persists pending writes.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Contract tests every [`DbManager`] backend must pass.
///
/// The manager type must implement `Default`, creating an empty, isolated store.
#[macro_export]
macro_rules! test_document_store {
    ($name:ident: $type:ty: $type2:ty) => {
        #[cfg(test)]
        mod $name {
            use super::*;
            use $crate::database::{DbManager, DocumentCollection};

            #[test]
            fn test_create_collection() {
                let manager = <$type>::default();
                let collection: $type2 =
                    manager.create_collection("agents").unwrap();
                assert_eq!(DocumentCollection::name(&collection), "agents");
                assert_eq!(collection.count().unwrap(), 0);
                assert!(
                    manager
                        .collection_names()
                        .unwrap()
                        .contains(&"agents".to_owned())
                );
                assert!(manager.stop().is_ok())
            }

            #[test]
            fn test_missing_collection() {
                let manager = <$type>::default();
                let collection: Option<$type2> =
                    manager.collection("missing").unwrap();
                assert!(collection.is_none());
                assert!(
                    !manager
                        .collection_names()
                        .unwrap()
                        .contains(&"missing".to_owned())
                );
            }

            #[test]
            fn test_insert_and_count() {
                let manager = <$type>::default();
                let mut collection: $type2 =
                    manager.create_collection("agents").unwrap();
                collection.insert("agent/1", b"one").unwrap();
                collection.insert("agent/2", b"two").unwrap();
                collection.insert("agent/1", b"uno").unwrap();
                collection.flush().unwrap();
                assert_eq!(collection.count().unwrap(), 2);

                let reopened: $type2 =
                    manager.collection("agents").unwrap().unwrap();
                assert_eq!(reopened.count().unwrap(), 2);
            }

            #[test]
            fn test_keyset_pages() {
                let manager = <$type>::default();
                let mut collection: $type2 =
                    manager.create_collection("agents").unwrap();
                for id in ["agent/c", "agent/a", "agent/e", "agent/b", "agent/d"]
                {
                    collection.insert(id, b"{}").unwrap();
                }

                let first = collection.page(None, 2).unwrap();
                assert_eq!(first, vec!["agent/a", "agent/b"]);
                let second = collection
                    .page(first.last().map(|s| s.as_str()), 2)
                    .unwrap();
                assert_eq!(second, vec!["agent/c", "agent/d"]);
                let third = collection
                    .page(second.last().map(|s| s.as_str()), 2)
                    .unwrap();
                assert_eq!(third, vec!["agent/e"]);
                let last = collection
                    .page(third.last().map(|s| s.as_str()), 2)
                    .unwrap();
                assert!(last.is_empty());
                assert!(collection.page(None, 0).unwrap().is_empty());
            }

            #[test]
            fn test_collections_are_isolated() {
                let manager = <$type>::default();
                let mut orders: $type2 =
                    manager.create_collection("orders").unwrap();
                let users: $type2 = manager.create_collection("users").unwrap();
                orders.insert("order/1", b"{}").unwrap();
                assert_eq!(orders.count().unwrap(), 1);
                assert_eq!(users.count().unwrap(), 0);
                assert!(users.page(None, 10).unwrap().is_empty());
            }
        }
    };
}
