// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Identifier source boundary
//!

use crate::{Error, discovery::AgentTypeDescriptor, identifier::Identifier};

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

/// Read access to the identifiers of the agent instances persisted for an agent type.
#[async_trait]
pub trait IdentifierSource: Send + Sync {
    /// Lazily streams the persisted identifiers of `agent_type`.
    ///
    /// Every call queries again from the start. The stream ends when the identifiers are
    /// exhausted, `max_count` identifiers were yielded, `token` is cancelled or a read fails.
    fn stream_identifiers<'a>(
        &'a self,
        agent_type: &'a AgentTypeDescriptor,
        max_count: Option<usize>,
        token: CancellationToken,
    ) -> BoxStream<'a, Identifier>;

    /// Name of the collection holding the state of `agent_type`.
    fn collection_name(&self, agent_type: &AgentTypeDescriptor) -> String;

    /// Number of persisted instances of `agent_type`.
    async fn count(&self, agent_type: &AgentTypeDescriptor)
    -> Result<u64, Error>;

    /// True if the collection of `agent_type` exists.
    async fn exists(&self, agent_type: &AgentTypeDescriptor)
    -> Result<bool, Error>;
}
