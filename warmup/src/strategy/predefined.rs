// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use super::{ITEM_DELAY, WarmupStrategy, paced_stream};

use crate::{Error, discovery::AgentTypeDescriptor, identifier::Identifier};

use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Activates a fixed list of identifiers of one agent type.
#[derive(Debug, Clone)]
pub struct PredefinedStrategy {
    name: String,
    applicable_types: Vec<String>,
    identifiers: Vec<Identifier>,
}

impl PredefinedStrategy {
    /// # Errors
    ///
    /// Returns `Error::Validation` if `identifiers` is empty.
    ///
    pub fn new(
        name: &str,
        agent_type: &str,
        identifiers: Vec<Identifier>,
    ) -> Result<Self, Error> {
        if identifiers.is_empty() {
            return Err(Error::Validation(format!(
                "Predefined strategy {} needs at least one identifier",
                name
            )));
        }
        Ok(Self {
            name: name.to_owned(),
            applicable_types: vec![agent_type.to_owned()],
            identifiers,
        })
    }
}

impl WarmupStrategy for PredefinedStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn applicable_types(&self) -> &[String] {
        &self.applicable_types
    }

    fn priority(&self) -> i32 {
        100
    }

    fn estimated_count(&self) -> usize {
        self.identifiers.len()
    }

    fn generate_identifiers<'a>(
        &'a self,
        agent_type: &'a AgentTypeDescriptor,
        token: CancellationToken,
    ) -> BoxStream<'a, Identifier> {
        debug!(
            "Generating {} predefined identifiers for {} with strategy {}",
            self.identifiers.len(),
            agent_type.type_name,
            self.name
        );
        paced_stream(self.identifiers.iter().cloned(), 1, ITEM_DELAY, token)
    }

    fn is_valid(&self) -> bool {
        !self.identifiers.is_empty()
    }
}
