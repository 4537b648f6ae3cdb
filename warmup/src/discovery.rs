// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Agent discovery
//!
//! Filters the [`AgentRegistry`] down to the agent types that can be warmed up and derives an
//! [`AgentTypeDescriptor`] for each one. A type is eligible when it is a concrete actor type
//! persisted with the configured storage provider, carries every required marker, derives from
//! one of the configured base types (if any), is not excluded, and is keyed by exactly one
//! supported identifier kind. Types that fail the key check are skipped with a warning.
//!
//! The discovered set can be cached for the lifetime of the process. The registry is assumed to
//! be complete once warmup starts, so the cache is only dropped by [`AgentDiscovery::reset_cache`].
//!

use crate::{
    Error,
    config::AutoDiscoveryConfig,
    identifier::IdentifierKind,
    registry::{AgentRegistration, AgentRegistry, KeyShape, short_name},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use std::{collections::BTreeMap, sync::RwLock};

/// Warmup view of an agent type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentTypeDescriptor {
    /// Full type name.
    pub type_name: String,
    pub short_name: String,
    pub identifier_kind: IdentifierKind,
    /// Actor interface references are resolved through.
    pub interface: String,
    pub base_types: Vec<String>,
}

impl AgentTypeDescriptor {
    pub fn new(
        type_name: &str,
        identifier_kind: IdentifierKind,
        interface: &str,
    ) -> Self {
        Self {
            type_name: type_name.to_owned(),
            short_name: short_name(type_name).to_owned(),
            identifier_kind,
            interface: interface.to_owned(),
            base_types: Vec::new(),
        }
    }

    pub fn with_base_type(mut self, base_type: &str) -> Self {
        self.base_types.push(base_type.to_owned());
        self
    }

    /// True if this type is `type_name` or derives from it.
    pub fn is_a(&self, type_name: &str) -> bool {
        self.type_name == type_name
            || self.base_types.iter().any(|b| b == type_name)
    }
}

/// Discovery service.
pub struct AgentDiscovery {
    config: AutoDiscoveryConfig,
    registry: AgentRegistry,
    cache: RwLock<Option<Vec<AgentTypeDescriptor>>>,
}

impl AgentDiscovery {
    pub fn new(config: AutoDiscoveryConfig, registry: AgentRegistry) -> Self {
        Self {
            config,
            registry,
            cache: RwLock::new(None),
        }
    }

    /// Returns the warmup-eligible agent types in registration order, minus `excluded` and the
    /// configured exclusions.
    pub fn discover_eligible_types(
        &self,
        excluded: &[String],
    ) -> Vec<AgentTypeDescriptor> {
        if !self.config.enabled {
            info!("Automatic agent discovery is disabled");
            return Vec::new();
        }

        self.discovered()
            .into_iter()
            .filter(|descriptor| {
                let name = &descriptor.type_name;
                !excluded.contains(name)
                    && !self.config.excluded_types.contains(name)
            })
            .collect()
    }

    /// Eligibility checks that do not depend on the key shape.
    pub fn is_warmup_eligible(&self, registration: &AgentRegistration) -> bool {
        if registration.is_abstract || !registration.is_actor {
            return false;
        }

        let required = self.config.required_marker.as_str();
        let provider_ok = match (&registration.storage_provider, required) {
            (None, _) => false,
            (Some(_), "") => true,
            (Some(provider), required) => provider == required,
        };
        if !provider_ok {
            debug!(
                "Agent type {} is not persisted with storage provider {}",
                registration.type_name, self.config.required_marker
            );
            return false;
        }

        if !self
            .config
            .required_markers
            .iter()
            .all(|marker| registration.markers.contains(marker))
        {
            debug!(
                "Agent type {} does not have required markers",
                registration.type_name
            );
            return false;
        }

        if !self.config.base_types.is_empty() {
            let derives = self.config.base_types.iter().any(|base| {
                registration.type_name == *base
                    || registration.base_types.contains(base)
                    || registration.interfaces.iter().any(|i| i.name == *base)
            });
            if !derives {
                debug!(
                    "Agent type {} does not inherit from any required base types",
                    registration.type_name
                );
                return false;
            }
        }

        true
    }

    /// Identifier kind of a registration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Discovery` if the type declares no key, a compound key, or keys of more
    /// than one kind.
    ///
    pub fn identifier_kind(
        &self,
        registration: &AgentRegistration,
    ) -> Result<IdentifierKind, Error> {
        let mut kinds: Vec<IdentifierKind> = Vec::new();
        for shape in &registration.key_shapes {
            let kind = match shape {
                KeyShape::Uuid => IdentifierKind::Uuid,
                KeyShape::String => IdentifierKind::String,
                KeyShape::Int32 => IdentifierKind::Int32,
                KeyShape::Int64 => IdentifierKind::Int64,
                KeyShape::UuidCompound | KeyShape::IntegerCompound => {
                    return Err(Error::Discovery(
                        registration.type_name.clone(),
                        format!("unsupported key shape {:?}", shape),
                    ));
                }
            };
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }

        match kinds.as_slice() {
            [kind] => Ok(*kind),
            [] => Err(Error::Discovery(
                registration.type_name.clone(),
                "no key declared".to_owned(),
            )),
            _ => Err(Error::Discovery(
                registration.type_name.clone(),
                format!("ambiguous key shapes {:?}", registration.key_shapes),
            )),
        }
    }

    /// Most specific non-generic actor interface of a registration.
    ///
    /// `I{ShortName}` wins, then the first non-generic interface. A type that only declares
    /// generic interfaces falls back to the first of them.
    pub fn resolve_interface(
        &self,
        registration: &AgentRegistration,
    ) -> Result<String, Error> {
        let expected = format!("I{}", registration.short_name());
        if let Some(interface) = registration
            .interfaces
            .iter()
            .find(|i| !i.generic && i.name == expected)
        {
            return Ok(interface.name.clone());
        }
        if let Some(interface) =
            registration.interfaces.iter().find(|i| !i.generic)
        {
            return Ok(interface.name.clone());
        }
        if let Some(interface) = registration.interfaces.first() {
            warn!(
                "No specific agent interface found for {}, falling back to {} (may cause resolution conflicts)",
                registration.type_name, interface.name
            );
            return Ok(interface.name.clone());
        }
        Err(Error::Discovery(
            registration.type_name.clone(),
            "no actor interface declared".to_owned(),
        ))
    }

    /// Builds the descriptor of a registration.
    pub fn describe(
        &self,
        registration: &AgentRegistration,
    ) -> Result<AgentTypeDescriptor, Error> {
        let identifier_kind = self.identifier_kind(registration)?;
        let interface = self.resolve_interface(registration)?;
        Ok(AgentTypeDescriptor {
            type_name: registration.type_name.clone(),
            short_name: registration.short_name().to_owned(),
            identifier_kind,
            interface,
            base_types: registration.base_types.clone(),
        })
    }

    /// Type name to identifier kind of every discovered type.
    pub fn agent_type_mapping(&self) -> BTreeMap<String, IdentifierKind> {
        self.discovered()
            .into_iter()
            .map(|d| (d.type_name, d.identifier_kind))
            .collect()
    }

    /// Drops the cached discovery result.
    pub fn reset_cache(&self) {
        let mut cache = match self.cache.write() {
            Ok(lock) => lock,
            Err(poisoned) => poisoned.into_inner(),
        };
        *cache = None;
    }

    fn discovered(&self) -> Vec<AgentTypeDescriptor> {
        if self.config.cache_discovered_types {
            let cache = match self.cache.read() {
                Ok(lock) => lock,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(cached) = cache.as_ref() {
                return cached.clone();
            }
        }

        let discovered = self.scan();

        if self.config.cache_discovered_types {
            let mut cache = match self.cache.write() {
                Ok(lock) => lock,
                Err(poisoned) => poisoned.into_inner(),
            };
            *cache = Some(discovered.clone());
        }
        discovered
    }

    fn scan(&self) -> Vec<AgentTypeDescriptor> {
        info!("Starting automatic agent discovery...");
        let mut discovered = Vec::new();
        for registration in self.registry.registrations() {
            if !self.is_warmup_eligible(&registration) {
                continue;
            }
            match self.describe(&registration) {
                Ok(descriptor) => discovered.push(descriptor),
                Err(e) => warn!(
                    "Skipping agent type {}: {}",
                    registration.type_name, e
                ),
            }
        }
        info!(
            "Agent discovery completed. Found {} eligible agent types",
            discovered.len()
        );
        discovered
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use tracing_test::traced_test;

    fn registry() -> AgentRegistry {
        let registry = AgentRegistry::new();
        registry.register(
            AgentRegistration::new("Agents.OrderAgent")
                .with_key(KeyShape::Uuid)
                .with_interface("IOrderAgent")
                .with_base_type("Agents.GAgentBase")
                .with_storage_provider("PubSubStore"),
        );
        registry.register(
            AgentRegistration::new("Agents.UserAgent")
                .with_key(KeyShape::String)
                .with_generic_interface("IStateAgent<UserState>")
                .with_interface("IUserAgent")
                .with_storage_provider("PubSubStore"),
        );
        registry.register(
            AgentRegistration::new("Agents.AbstractAgent")
                .with_key(KeyShape::Uuid)
                .with_interface("IAbstractAgent")
                .with_storage_provider("PubSubStore")
                .abstract_type(),
        );
        registry.register(
            AgentRegistration::new("Agents.MemoryAgent")
                .with_key(KeyShape::Uuid)
                .with_interface("IMemoryAgent")
                .with_storage_provider("Memory"),
        );
        registry.register(
            AgentRegistration::new("Agents.CompoundAgent")
                .with_key(KeyShape::UuidCompound)
                .with_interface("ICompoundAgent")
                .with_storage_provider("PubSubStore"),
        );
        registry.register(
            AgentRegistration::new("Agents.AmbiguousAgent")
                .with_key(KeyShape::Uuid)
                .with_key(KeyShape::Int64)
                .with_interface("IAmbiguousAgent")
                .with_storage_provider("PubSubStore"),
        );
        registry.register(
            AgentRegistration::new("Agents.PlainService")
                .with_storage_provider("PubSubStore")
                .non_actor(),
        );
        registry
    }

    fn names(descriptors: &[AgentTypeDescriptor]) -> Vec<&str> {
        descriptors.iter().map(|d| d.type_name.as_str()).collect()
    }

    #[test]
    #[traced_test]
    fn test_discover_filters_registry() {
        let discovery =
            AgentDiscovery::new(AutoDiscoveryConfig::default(), registry());
        let types = discovery.discover_eligible_types(&[]);
        assert_eq!(names(&types), vec!["Agents.OrderAgent", "Agents.UserAgent"]);
        assert_eq!(types[0].identifier_kind, IdentifierKind::Uuid);
        assert_eq!(types[0].interface, "IOrderAgent");
        assert_eq!(types[1].identifier_kind, IdentifierKind::String);
        assert_eq!(types[1].interface, "IUserAgent");
        assert!(logs_contain("Skipping agent type Agents.CompoundAgent"));
        assert!(logs_contain("Skipping agent type Agents.AmbiguousAgent"));
    }

    #[test]
    fn test_exclusions() {
        let config = AutoDiscoveryConfig {
            excluded_types: vec!["Agents.UserAgent".to_owned()],
            ..Default::default()
        };
        let discovery = AgentDiscovery::new(config, registry());
        assert_eq!(names(&discovery.discover_eligible_types(&[])), vec![
            "Agents.OrderAgent"
        ]);
        assert!(
            discovery
                .discover_eligible_types(&["Agents.OrderAgent".to_owned()])
                .is_empty()
        );
    }

    #[test]
    fn test_base_types_and_markers() {
        let config = AutoDiscoveryConfig {
            base_types: vec!["Agents.GAgentBase".to_owned()],
            ..Default::default()
        };
        let discovery = AgentDiscovery::new(config, registry());
        assert_eq!(names(&discovery.discover_eligible_types(&[])), vec![
            "Agents.OrderAgent"
        ]);

        let config = AutoDiscoveryConfig {
            required_markers: vec!["Warmup".to_owned()],
            ..Default::default()
        };
        let discovery = AgentDiscovery::new(config, registry());
        assert!(discovery.discover_eligible_types(&[]).is_empty());
    }

    #[test]
    fn test_any_provider_when_marker_empty() {
        let config = AutoDiscoveryConfig {
            required_marker: String::new(),
            ..Default::default()
        };
        let discovery = AgentDiscovery::new(config, registry());
        assert!(names(&discovery.discover_eligible_types(&[]))
            .contains(&"Agents.MemoryAgent"));
    }

    #[test]
    fn test_identifier_kind_queries() {
        let discovery =
            AgentDiscovery::new(AutoDiscoveryConfig::default(), registry());
        let registration = AgentRegistration::new("A.B")
            .with_key(KeyShape::Int32)
            .with_key(KeyShape::Int32);
        assert_eq!(
            discovery.identifier_kind(&registration),
            Ok(IdentifierKind::Int32)
        );
        assert!(
            discovery
                .identifier_kind(&AgentRegistration::new("A.NoKey"))
                .is_err()
        );
    }

    #[test]
    fn test_resolve_interface_fallbacks() {
        let discovery =
            AgentDiscovery::new(AutoDiscoveryConfig::default(), registry());
        let registration = AgentRegistration::new("A.Thing")
            .with_interface("IOther")
            .with_interface("IThing");
        assert_eq!(discovery.resolve_interface(&registration).unwrap(), "IThing");

        let registration = AgentRegistration::new("A.Thing")
            .with_generic_interface("IStateAgent<T>")
            .with_interface("IOther");
        assert_eq!(discovery.resolve_interface(&registration).unwrap(), "IOther");

        let registration =
            AgentRegistration::new("A.Thing").with_generic_interface("IStateAgent<T>");
        assert_eq!(
            discovery.resolve_interface(&registration).unwrap(),
            "IStateAgent<T>"
        );
        assert!(
            discovery
                .resolve_interface(&AgentRegistration::new("A.Thing"))
                .is_err()
        );
    }

    #[test]
    fn test_cache_until_reset() {
        let registry = registry();
        let discovery = AgentDiscovery::new(
            AutoDiscoveryConfig::default(),
            registry.clone(),
        );
        assert_eq!(discovery.discover_eligible_types(&[]).len(), 2);

        registry.register(
            AgentRegistration::new("Agents.LateAgent")
                .with_key(KeyShape::Int64)
                .with_interface("ILateAgent")
                .with_storage_provider("PubSubStore"),
        );
        assert_eq!(discovery.discover_eligible_types(&[]).len(), 2);

        discovery.reset_cache();
        assert_eq!(discovery.discover_eligible_types(&[]).len(), 3);
        assert_eq!(
            discovery.agent_type_mapping().get("Agents.LateAgent"),
            Some(&IdentifierKind::Int64)
        );
    }

    #[test]
    fn test_disabled_discovery() {
        let config = AutoDiscoveryConfig {
            enabled: false,
            ..Default::default()
        };
        let discovery = AgentDiscovery::new(config, registry());
        assert!(discovery.discover_eligible_types(&[]).is_empty());
    }
}
