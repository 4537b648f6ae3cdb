// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use super::{ITEM_DELAY, WarmupStrategy, paced_stream};

use crate::{
    config::{DefaultStrategyConfig, IdentifierSourceKind},
    discovery::AgentTypeDescriptor,
    identifier::{Identifier, IdentifierKind},
    source::IdentifierSource,
};

use futures::{
    StreamExt,
    stream::{self, BoxStream},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use std::sync::Arc;

/// Number of test identifiers the predefined source yields at most.
const PREDEFINED_IDENTIFIERS: usize = 10;

/// Fallback strategy for every agent type no other strategy claims.
pub struct DefaultStrategy {
    config: DefaultStrategyConfig,
    source: Arc<dyn IdentifierSource>,
}

impl DefaultStrategy {
    pub fn new(
        config: DefaultStrategyConfig,
        source: Arc<dyn IdentifierSource>,
    ) -> Self {
        Self { config, source }
    }

    fn from_store<'a>(
        &'a self,
        agent_type: &'a AgentTypeDescriptor,
        token: CancellationToken,
    ) -> BoxStream<'a, Identifier> {
        stream::once(async move {
            match self.source.exists(agent_type).await {
                Ok(exists) => {
                    if !exists {
                        info!(
                            "No collection {} for agent type {}, skipping",
                            self.source.collection_name(agent_type),
                            agent_type.short_name
                        );
                    }
                    exists
                }
                Err(e) => {
                    error!(
                        "Can not check collection of agent type {}: {}",
                        agent_type.short_name, e
                    );
                    false
                }
            }
        })
        .flat_map(move |exists| {
            if exists {
                self.source.stream_identifiers(
                    agent_type,
                    Some(self.config.max_identifiers_per_type),
                    token.clone(),
                )
            } else {
                stream::empty().boxed()
            }
        })
        .boxed()
    }

    /// A handful of test identifiers of the type's kind.
    fn predefined(&self, agent_type: &AgentTypeDescriptor) -> Vec<Identifier> {
        let count =
            PREDEFINED_IDENTIFIERS.min(self.config.max_identifiers_per_type);
        match agent_type.identifier_kind {
            IdentifierKind::Uuid => (0..count)
                .map(|_| Identifier::Uuid(Uuid::new_v4()))
                .collect(),
            IdentifierKind::String => (0..count)
                .map(|i| {
                    Identifier::String(format!(
                        "test-{}-{}",
                        agent_type.short_name, i
                    ))
                })
                .collect(),
            IdentifierKind::Int32 => {
                (1..=count as i32).map(Identifier::Int32).collect()
            }
            IdentifierKind::Int64 => {
                (1..=count as i64).map(Identifier::Int64).collect()
            }
        }
    }
}

/// Sequential identifiers `1..=max` of the type's kind. UUIDs are derived from the type name
/// and the index, so they are the same on every run.
fn sequential_identifiers(
    agent_type: &AgentTypeDescriptor,
    max: usize,
) -> impl Iterator<Item = Identifier> + Send + 'static {
    let kind = agent_type.identifier_kind;
    let short_name = agent_type.short_name.clone();
    let type_hash = fnv1a(&agent_type.type_name);
    // Integer kinds stop at their largest value.
    let last = match kind {
        IdentifierKind::Int32 => (max as u64).min(i32::MAX as u64),
        IdentifierKind::Int64 => (max as u64).min(i64::MAX as u64),
        IdentifierKind::Uuid | IdentifierKind::String => max as u64,
    };
    (1..=last).map(move |i| match kind {
        IdentifierKind::Uuid => {
            Identifier::Uuid(Uuid::from_u64_pair(type_hash, i))
        }
        IdentifierKind::String => {
            Identifier::String(format!("{}-{:06}", short_name, i))
        }
        IdentifierKind::Int32 => {
            Identifier::Int32(i32::try_from(i).unwrap_or(i32::MAX))
        }
        IdentifierKind::Int64 => {
            Identifier::Int64(i64::try_from(i).unwrap_or(i64::MAX))
        }
    })
}

fn fnv1a(value: &str) -> u64 {
    value.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x100000001b3)
    })
}

impl WarmupStrategy for DefaultStrategy {
    fn name(&self) -> &str {
        "DefaultStrategy"
    }

    fn applicable_types(&self) -> &[String] {
        &[]
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn estimated_count(&self) -> usize {
        self.config.max_identifiers_per_type
    }

    fn generate_identifiers<'a>(
        &'a self,
        agent_type: &'a AgentTypeDescriptor,
        token: CancellationToken,
    ) -> BoxStream<'a, Identifier> {
        if !self.config.enabled {
            return stream::empty().boxed();
        }
        match self.config.identifier_source {
            IdentifierSourceKind::Store => self.from_store(agent_type, token),
            IdentifierSourceKind::Predefined => {
                info!(
                    "Generating predefined identifiers for agent type {}",
                    agent_type.short_name
                );
                paced_stream(
                    self.predefined(agent_type).into_iter(),
                    1,
                    ITEM_DELAY,
                    token,
                )
            }
            IdentifierSourceKind::Range => {
                info!(
                    "Generating range identifiers for agent type {}",
                    agent_type.short_name
                );
                paced_stream(
                    sequential_identifiers(
                        agent_type,
                        self.config.max_identifiers_per_type,
                    ),
                    1,
                    ITEM_DELAY,
                    token,
                )
            }
        }
    }

    fn is_valid(&self) -> bool {
        self.config.enabled && self.config.max_identifiers_per_type > 0
    }
}
