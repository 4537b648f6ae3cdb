// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Memory document store.
//!

use crate::{
    database::{DbManager, DocumentCollection},
    error::Error,
};

use std::{
    collections::{BTreeMap, HashMap},
    ops::Bound,
    sync::{Arc, RwLock},
};

type Documents = Arc<RwLock<BTreeMap<String, Vec<u8>>>>;

#[derive(Default, Clone)]
pub struct MemoryManager {
    data: Arc<RwLock<HashMap<String, Documents>>>,
}

impl DbManager<MemoryCollection> for MemoryManager {
    fn create_collection(&self, name: &str) -> Result<MemoryCollection, Error> {
        let mut data_lock = self.data.write().map_err(|e| {
            Error::Store(format!("Can not lock manager data: {}", e))
        })?;
        let data = data_lock.entry(name.to_owned()).or_default().clone();

        Ok(MemoryCollection {
            name: name.to_owned(),
            data,
        })
    }

    fn collection(
        &self,
        name: &str,
    ) -> Result<Option<MemoryCollection>, Error> {
        let data_lock = self.data.read().map_err(|e| {
            Error::Store(format!("Can not lock manager data: {}", e))
        })?;

        Ok(data_lock.get(name).map(|data| MemoryCollection {
            name: name.to_owned(),
            data: data.clone(),
        }))
    }

    fn collection_names(&self) -> Result<Vec<String>, Error> {
        let data_lock = self.data.read().map_err(|e| {
            Error::Store(format!("Can not lock manager data: {}", e))
        })?;
        let mut names: Vec<String> = data_lock.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// A collection whose documents live in memory, ordered by id.
#[derive(Default, Clone)]
pub struct MemoryCollection {
    name: String,
    data: Documents,
}

impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, Error> {
        let lock = self
            .data
            .read()
            .map_err(|e| Error::Get(format!("Can not lock data: {}", e)))?;
        let lower = match after {
            Some(after) => Bound::Excluded(after.to_owned()),
            None => Bound::Unbounded,
        };

        Ok(lock
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(id, _)| id.clone())
            .collect())
    }

    fn count(&self) -> Result<u64, Error> {
        let lock = self
            .data
            .read()
            .map_err(|e| Error::Get(format!("Can not lock data: {}", e)))?;
        Ok(lock.len() as u64)
    }

    fn insert(&mut self, id: &str, value: &[u8]) -> Result<(), Error> {
        let mut lock = self
            .data
            .write()
            .map_err(|e| Error::Store(format!("Can not lock data: {}", e)))?;
        lock.insert(id.to_owned(), value.to_vec());
        Ok(())
    }
}
