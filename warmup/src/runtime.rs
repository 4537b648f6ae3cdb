// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor runtime boundary
//!
//! Warmup does not place, persist or message actors itself. It asks the hosting runtime for a
//! reference to an actor instance and touches it, which makes the runtime activate the instance
//! and load its persisted state.
//!

use crate::{Error, identifier::Identifier};

use async_trait::async_trait;

use std::sync::Arc;

/// The actor runtime hosting the agents.
pub trait ActorRuntime: Send + Sync {
    /// Resolves the actor addressed by `identifier` through the actor interface `interface`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Runtime` if the runtime can not resolve the reference.
    ///
    fn actor_reference(
        &self,
        interface: &str,
        identifier: &Identifier,
    ) -> Result<Arc<dyn ActorHandle>, Error>;
}

/// Reference to a single actor instance.
#[async_trait]
pub trait ActorHandle: Send + Sync {
    /// Lightweight call that forces the actor to activate.
    async fn touch(&self) -> Result<(), Error>;
}
