// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Store identifier source
//!
//! [`IdentifierSource`] over a document store. Identifiers are streamed page by page with
//! keyset pagination, so only one page is held in memory at a time. Every page read, count and
//! existence check takes a slot from the per-collection rate limiter first, then runs on the
//! blocking thread pool bounded by the query timeout.
//!

use crate::{
    database::{DbManager, DocumentCollection},
    error::Error,
    naming::{collection_name, parse_document_id},
    rate_limit::RateLimiterManager,
};

use warmup::{
    AgentTypeDescriptor, Identifier, IdentifierSource, StoreIntegrationConfig,
    WarmupConfig,
};

use async_trait::async_trait;
use futures::{
    StreamExt,
    stream::{self, BoxStream},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use std::{collections::VecDeque, marker::PhantomData, sync::Arc};

/// Identifier source reading the document ids of a [`DbManager`] backend.
pub struct StoreIdentifierSource<M, C>
where
    M: DbManager<C> + 'static,
    C: DocumentCollection,
{
    manager: M,
    config: StoreIntegrationConfig,
    limiter: RateLimiterManager,
    _collection: PhantomData<fn() -> C>,
}

/// Progress of one identifier scan.
struct Scan<C> {
    collection: Option<Arc<C>>,
    after: Option<String>,
    buffer: VecDeque<Identifier>,
    yielded: usize,
    exhausted: bool,
}

impl<M, C> StoreIdentifierSource<M, C>
where
    M: DbManager<C> + 'static,
    C: DocumentCollection,
{
    pub fn new(manager: M, config: &WarmupConfig) -> Self {
        Self {
            manager,
            config: config.store_integration.clone(),
            limiter: RateLimiterManager::new(&config.store_rate_limit),
            _collection: PhantomData,
        }
    }

    /// Shares `limiter` with other sources reading the same store.
    pub fn with_limiter(mut self, limiter: RateLimiterManager) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn limiter(&self) -> &RateLimiterManager {
        &self.limiter
    }

    /// Runs a blocking store operation bounded by the query timeout.
    async fn blocking<T, F>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce() -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::task::spawn_blocking(operation);
        match tokio::time::timeout(self.config.query_timeout(), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(Error::Get(format!("Store task failed: {}", e))),
            Err(_) => Err(Error::Timeout(self.config.query_timeout_ms)),
        }
    }

    /// Reads the page after `after`. `None` if the collection does not exist.
    async fn page(
        &self,
        name: &str,
        collection: Option<Arc<C>>,
        after: Option<String>,
        limit: usize,
    ) -> Result<Option<(Arc<C>, Vec<String>)>, Error> {
        self.limiter.acquire(name).await;
        let manager = self.manager.clone();
        let name = name.to_owned();
        self.blocking(move || {
            let collection = match collection {
                Some(collection) => collection,
                None => match manager.collection(&name)? {
                    Some(collection) => Arc::new(collection),
                    None => return Ok(None),
                },
            };
            let ids = collection.page(after.as_deref(), limit)?;
            Ok(Some((collection, ids)))
        })
        .await
    }

    async fn next_identifier(
        &self,
        agent_type: &AgentTypeDescriptor,
        name: &str,
        max_count: usize,
        token: &CancellationToken,
        scan: &mut Scan<C>,
    ) -> Option<Identifier> {
        loop {
            if scan.yielded >= max_count {
                return None;
            }
            if let Some(identifier) = scan.buffer.pop_front() {
                scan.yielded += 1;
                return Some(identifier);
            }
            if scan.exhausted || token.is_cancelled() {
                return None;
            }

            let limit =
                self.config.batch_size.min(max_count - scan.yielded).max(1);
            let collection = scan.collection.clone();
            let after = scan.after.clone();
            let page = tokio::select! {
                biased;
                _ = token.cancelled() => return None,
                page = self.page(name, collection, after, limit) => page,
            };

            match page {
                Ok(Some((collection, ids))) => {
                    debug!("Read {} document ids from {}", ids.len(), name);
                    scan.collection = Some(collection);
                    scan.exhausted = ids.len() < limit;
                    scan.after = ids.last().cloned();
                    for id in ids {
                        match parse_document_id(agent_type, &id) {
                            Ok(identifier) => scan.buffer.push_back(identifier),
                            Err(e) => {
                                warn!("Skipping document in {}: {}", name, e)
                            }
                        }
                    }
                }
                Ok(None) => {
                    debug!("Collection {} does not exist", name);
                    return None;
                }
                Err(e) => {
                    error!(
                        "Can not read identifiers of {} from {}: {}",
                        agent_type.short_name, name, e
                    );
                    return None;
                }
            }
        }
    }
}

#[async_trait]
impl<M, C> IdentifierSource for StoreIdentifierSource<M, C>
where
    M: DbManager<C> + 'static,
    C: DocumentCollection,
{
    fn stream_identifiers<'a>(
        &'a self,
        agent_type: &'a AgentTypeDescriptor,
        max_count: Option<usize>,
        token: CancellationToken,
    ) -> BoxStream<'a, Identifier> {
        let name = collection_name(&self.config, agent_type);
        let max_count = max_count.unwrap_or(usize::MAX);
        let scan = Scan {
            collection: None,
            after: None,
            buffer: VecDeque::new(),
            yielded: 0,
            exhausted: false,
        };

        stream::unfold(scan, move |mut scan| {
            let name = name.clone();
            let token = token.clone();
            async move {
                self.next_identifier(
                    agent_type, &name, max_count, &token, &mut scan,
                )
                .await
                .map(|identifier| (identifier, scan))
            }
        })
        .boxed()
    }

    fn collection_name(&self, agent_type: &AgentTypeDescriptor) -> String {
        collection_name(&self.config, agent_type)
    }

    async fn count(
        &self,
        agent_type: &AgentTypeDescriptor,
    ) -> Result<u64, warmup::Error> {
        let name = collection_name(&self.config, agent_type);
        self.limiter.acquire(&name).await;
        let manager = self.manager.clone();
        let count = self
            .blocking(move || match manager.collection(&name)? {
                Some(collection) => collection.count(),
                None => Ok(0),
            })
            .await?;
        Ok(count)
    }

    async fn exists(
        &self,
        agent_type: &AgentTypeDescriptor,
    ) -> Result<bool, warmup::Error> {
        let name = collection_name(&self.config, agent_type);
        self.limiter.acquire(&name).await;
        let manager = self.manager.clone();
        let exists = self
            .blocking(move || {
                Ok(manager.collection_names()?.iter().any(|n| *n == name))
            })
            .await?;
        Ok(exists)
    }
}
