// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Warmup configuration
//!
//! The configuration is loaded once at startup and is immutable for the duration of a run.
//! Every key is optional: missing keys take the defaults below, so an empty document is a valid
//! configuration.
//!
//! ```ignore
//! let config = WarmupConfig::from_json_str(r#"{
//!     "max_concurrency": 20,
//!     "auto_discovery": { "excluded_types": ["Aevatar.Agents.LegacyAgent"] },
//!     "store_integration": { "collection_prefix": "Stream", "naming_strategy": "TypeName" }
//! }"#)?;
//! ```
//!

use crate::Error;

use serde::{Deserialize, Serialize};

use std::time::Duration;

/// Top level warmup configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    /// Whether warmup runs at all.
    pub enabled: bool,
    /// Maximum number of activations in flight at once.
    pub max_concurrency: usize,
    /// Size of the first batch of every strategy execution.
    pub initial_batch_size: usize,
    /// Upper bound for the batch size.
    pub max_batch_size: usize,
    /// Growth factor applied after each completed batch.
    pub batch_size_increase_factor: f64,
    /// Pause between two batches.
    pub delay_between_batches_ms: u64,
    /// Timeout of a single activation call.
    pub agent_activation_timeout_ms: u64,
    /// Retries after the first failed activation attempt.
    pub max_retry_attempts: usize,
    /// Pause between two activation attempts.
    pub retry_delay_ms: u64,
    /// Pause before a background-spawned run starts.
    pub startup_delay_ms: u64,
    pub store_rate_limit: StoreRateLimitConfig,
    pub auto_discovery: AutoDiscoveryConfig,
    pub default_strategy: DefaultStrategyConfig,
    pub store_integration: StoreIntegrationConfig,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrency: 10,
            initial_batch_size: 5,
            max_batch_size: 50,
            batch_size_increase_factor: 1.5,
            delay_between_batches_ms: 100,
            agent_activation_timeout_ms: 5000,
            max_retry_attempts: 3,
            retry_delay_ms: 1000,
            startup_delay_ms: 5000,
            store_rate_limit: StoreRateLimitConfig::default(),
            auto_discovery: AutoDiscoveryConfig::default(),
            default_strategy: DefaultStrategyConfig::default(),
            store_integration: StoreIntegrationConfig::default(),
        }
    }
}

impl WarmupConfig {
    /// Loads a configuration from a JSON document. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let config: WarmupConfig = serde_json::from_str(json).map_err(|e| {
            Error::Validation(format!(
                "Can not parse warmup configuration: {}",
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values a run can not work with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_concurrency == 0 {
            return Err(Error::Validation(
                "max_concurrency must be positive".to_owned(),
            ));
        }
        if self.initial_batch_size == 0 || self.max_batch_size == 0 {
            return Err(Error::Validation(
                "batch sizes must be positive".to_owned(),
            ));
        }
        if self.initial_batch_size > self.max_batch_size {
            return Err(Error::Validation(format!(
                "initial_batch_size {} exceeds max_batch_size {}",
                self.initial_batch_size, self.max_batch_size
            )));
        }
        if !self.batch_size_increase_factor.is_finite()
            || self.batch_size_increase_factor < 1.0
        {
            return Err(Error::Validation(format!(
                "batch_size_increase_factor must be >= 1.0, got {}",
                self.batch_size_increase_factor
            )));
        }
        if self.store_integration.batch_size == 0 {
            return Err(Error::Validation(
                "store_integration.batch_size must be positive".to_owned(),
            ));
        }
        if self.store_rate_limit.max_operations_per_second == 0
            || self.store_rate_limit.window_ms == 0
        {
            return Err(Error::Validation(
                "store_rate_limit needs a positive rate and window".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn delay_between_batches(&self) -> Duration {
        Duration::from_millis(self.delay_between_batches_ms)
    }

    pub fn activation_timeout(&self) -> Duration {
        Duration::from_millis(self.agent_activation_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}

/// Rate limit protecting the backing store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreRateLimitConfig {
    pub max_operations_per_second: u32,
    /// Extra operations tolerated inside one window.
    pub burst_allowance: u32,
    pub window_ms: u64,
}

impl Default for StoreRateLimitConfig {
    fn default() -> Self {
        Self {
            max_operations_per_second: 50,
            burst_allowance: 10,
            window_ms: 1000,
        }
    }
}

impl StoreRateLimitConfig {
    /// Operations allowed in one sliding window, burst included.
    pub fn operations_per_window(&self) -> usize {
        let steady = (self.max_operations_per_second as u64 * self.window_ms)
            / 1000;
        (steady as usize + self.burst_allowance as usize).max(1)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Automatic discovery of warmup-eligible agent types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoDiscoveryConfig {
    pub enabled: bool,
    /// Storage provider an agent type must be persisted with. Empty accepts any provider.
    pub required_marker: String,
    /// Additional markers an agent type must carry.
    pub required_markers: Vec<String>,
    /// Base types of which an agent type must derive from at least one. Empty accepts all.
    pub base_types: Vec<String>,
    /// Full type names never warmed up.
    pub excluded_types: Vec<String>,
    pub cache_discovered_types: bool,
}

impl Default for AutoDiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            required_marker: "PubSubStore".to_owned(),
            required_markers: Vec::new(),
            base_types: Vec::new(),
            excluded_types: Vec::new(),
            cache_discovered_types: true,
        }
    }
}

/// Where the default strategy takes identifiers from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierSourceKind {
    /// Identifiers stored in the agent type's collection.
    Store,
    /// A handful of generated identifiers per type.
    Predefined,
    /// Sequential identifiers.
    Range,
}

/// Fallback strategy for types no explicit strategy claims.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultStrategyConfig {
    pub enabled: bool,
    pub identifier_source: IdentifierSourceKind,
    pub max_identifiers_per_type: usize,
    pub priority: i32,
}

impl Default for DefaultStrategyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            identifier_source: IdentifierSourceKind::Store,
            max_identifiers_per_type: 1000,
            priority: 0,
        }
    }
}

/// How collection names are derived from agent types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamingStrategy {
    /// Full type name, `Aevatar.Agents.OrderAgent`.
    FullTypeName,
    /// Short type name, `OrderAgent`.
    TypeName,
    /// `agents_orderagent`.
    Custom,
}

/// Connection to the store that persists agent state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreIntegrationConfig {
    pub connection_string: String,
    pub database: String,
    pub collection_prefix: String,
    pub naming_strategy: NamingStrategy,
    /// Page size of identifier queries.
    pub batch_size: usize,
    pub query_timeout_ms: u64,
}

impl Default for StoreIntegrationConfig {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            database: String::new(),
            collection_prefix: String::new(),
            naming_strategy: NamingStrategy::FullTypeName,
            batch_size: 100,
            query_timeout_ms: 30000,
        }
    }
}

impl StoreIntegrationConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}
