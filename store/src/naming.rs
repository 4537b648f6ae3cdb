// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Collection names and document ids of the persistence layer.
//!
//! The persistence layer writes the state of every agent instance as one document whose id is
//! `{agenttype}/{identifier}`, with `agenttype` the lowercase short type name. Collection names
//! only depend on the agent type and the configuration, so they are stable across restarts.
//!

use crate::error::Error;

use warmup::{
    AgentTypeDescriptor, Identifier, NamingStrategy, StoreIntegrationConfig,
};

/// Name of the collection that stores the agents of `agent_type`.
pub fn collection_name(
    config: &StoreIntegrationConfig,
    agent_type: &AgentTypeDescriptor,
) -> String {
    let base = match config.naming_strategy {
        NamingStrategy::FullTypeName => agent_type.type_name.clone(),
        NamingStrategy::TypeName => agent_type.short_name.clone(),
        NamingStrategy::Custom => {
            format!("agents_{}", agent_type.short_name.to_lowercase())
        }
    };
    format!("{}{}", config.collection_prefix, base)
}

/// Document id under which the state of `identifier` is persisted.
pub fn document_id(
    agent_type: &AgentTypeDescriptor,
    identifier: &Identifier,
) -> String {
    format!("{}/{}", agent_type.short_name.to_lowercase(), identifier)
}

/// Identifier encoded in a document id.
///
/// Only the first `/` separates the type part, which is not checked: documents are read from the
/// collection of a single type.
///
/// # Errors
///
/// Returns `Error::MalformedDocument` if the id has no separator or the key is not a valid
/// identifier of the agent type's kind.
///
pub fn parse_document_id(
    agent_type: &AgentTypeDescriptor,
    document_id: &str,
) -> Result<Identifier, Error> {
    let Some((_, key)) = document_id.split_once('/') else {
        return Err(Error::MalformedDocument(document_id.to_owned()));
    };
    Identifier::parse(agent_type.identifier_kind, key).map_err(|e| {
        Error::MalformedDocument(format!("{}: {}", document_id, e))
    })
}
