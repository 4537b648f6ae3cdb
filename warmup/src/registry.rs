// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Agent registry
//!
//! Agent implementation types are not scanned at runtime. Each actor module registers an
//! [`AgentRegistration`] describing its agent types when it is initialised, and discovery filters
//! the registered set.
//!
//! ```ignore
//! AgentRegistry::global().register(
//!     AgentRegistration::new("Aevatar.Agents.OrderAgent")
//!         .with_key(KeyShape::Uuid)
//!         .with_interface("IOrderAgent")
//!         .with_storage_provider("PubSubStore"),
//! );
//! ```
//!

use serde::{Deserialize, Serialize};
use tracing::debug;

use std::sync::{Arc, OnceLock, RwLock};

/// Key shape an agent type declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyShape {
    Uuid,
    String,
    Int32,
    Int64,
    /// UUID plus a string extension. Not supported by warmup.
    UuidCompound,
    /// Integer plus a string extension. Not supported by warmup.
    IntegerCompound,
}

/// An actor interface implemented by an agent type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDecl {
    pub name: String,
    /// Generic interfaces (for example `IStateAgent<TState>`) can not address a single type.
    pub generic: bool,
}

/// Static description of an agent implementation type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRegistration {
    /// Full type name, `Namespace.TypeName`.
    pub type_name: String,
    pub is_abstract: bool,
    /// True if the type belongs to the actor family handled by the runtime.
    pub is_actor: bool,
    pub base_types: Vec<String>,
    pub interfaces: Vec<InterfaceDecl>,
    pub key_shapes: Vec<KeyShape>,
    /// Storage provider the type persists its state with.
    pub storage_provider: Option<String>,
    pub markers: Vec<String>,
}

impl AgentRegistration {
    /// A concrete actor type with no key, interface or storage declared yet.
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_owned(),
            is_abstract: false,
            is_actor: true,
            base_types: Vec::new(),
            interfaces: Vec::new(),
            key_shapes: Vec::new(),
            storage_provider: None,
            markers: Vec::new(),
        }
    }

    pub fn with_key(mut self, shape: KeyShape) -> Self {
        self.key_shapes.push(shape);
        self
    }

    pub fn with_interface(mut self, name: &str) -> Self {
        self.interfaces.push(InterfaceDecl {
            name: name.to_owned(),
            generic: false,
        });
        self
    }

    pub fn with_generic_interface(mut self, name: &str) -> Self {
        self.interfaces.push(InterfaceDecl {
            name: name.to_owned(),
            generic: true,
        });
        self
    }

    pub fn with_base_type(mut self, name: &str) -> Self {
        self.base_types.push(name.to_owned());
        self
    }

    pub fn with_storage_provider(mut self, provider: &str) -> Self {
        self.storage_provider = Some(provider.to_owned());
        self
    }

    pub fn with_marker(mut self, marker: &str) -> Self {
        self.markers.push(marker.to_owned());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn non_actor(mut self) -> Self {
        self.is_actor = false;
        self
    }

    /// Type name without its namespace.
    pub fn short_name(&self) -> &str {
        short_name(&self.type_name)
    }
}

/// Type name without its namespace.
pub fn short_name(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}

/// Central list of agent registrations.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    registrations: Arc<RwLock<Vec<AgentRegistration>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry actor modules register into.
    pub fn global() -> &'static AgentRegistry {
        static GLOBAL: OnceLock<AgentRegistry> = OnceLock::new();
        GLOBAL.get_or_init(AgentRegistry::new)
    }

    /// Adds a registration. A second registration of the same type name replaces the first.
    pub fn register(&self, registration: AgentRegistration) {
        debug!("Registering agent type {}", registration.type_name);
        let mut registrations = match self.registrations.write() {
            Ok(lock) => lock,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) = registrations
            .iter_mut()
            .find(|r| r.type_name == registration.type_name)
        {
            *existing = registration;
        } else {
            registrations.push(registration);
        }
    }

    /// Registrations in registration order.
    pub fn registrations(&self) -> Vec<AgentRegistration> {
        match self.registrations.read() {
            Ok(lock) => lock.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.registrations().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
