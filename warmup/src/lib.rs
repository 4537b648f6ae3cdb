// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Agent Warmup
//!
//! Proactive activation of persistent actors ("agents") at cluster startup. An agent that is
//! activated for the first time has to load its state from storage before it can answer, so the
//! first request it receives pays the activation latency. Warmup activates the agents that are
//! likely to be used before real traffic arrives.
//!
//! ## Overview
//!
//! A warmup run goes through four stages:
//!
//! 1. **Discovery**: the [`AgentDiscovery`] service filters the [`AgentRegistry`] down to the
//!    agent types that are concrete, persisted with the configured storage provider and keyed
//!    by a single supported identifier kind.
//! 2. **Planning**: [`create_execution_plan`] assigns every discovered type to the applicable
//!    [`WarmupStrategy`] with the highest priority. Types no strategy applies to are reported
//!    as unassigned.
//! 3. **Execution**: the [`WarmupOrchestrator`] runs the plan's strategy executions one after
//!    the other. For each target type the [`BatchExecutor`] pulls identifiers from the
//!    strategy's lazy stream in growing batches and activates them with bounded concurrency,
//!    timeouts and retries.
//! 4. **Reporting**: progress is recorded in an [`AgentWarmupStatus`] that can be read at any
//!    time through [`WarmupService::status`].
//!
//! ## Strategies
//!
//! - [`PredefinedStrategy`]: a fixed list of identifiers for one type.
//! - [`SampleStrategy`]: a uniform random sample of the persisted identifiers of one type.
//! - [`RangeStrategy`]: sequential integer identifiers for one type.
//! - [`DefaultStrategy`]: fallback for every type, reading identifiers from an
//!   [`IdentifierSource`].
//!
//! ## Boundaries
//!
//! The crate does not host actors. The actor runtime is reached through [`ActorRuntime`] and
//! [`ActorHandle`], and persisted identifiers through [`IdentifierSource`], which the `store`
//! crate implements on top of a document store.
//!
//! ## Getting Started
//!
//! ```ignore
//! use warmup::{AgentRegistry, PredefinedStrategy, WarmupConfig, WarmupService};
//! use tokio_util::sync::CancellationToken;
//! use std::sync::Arc;
//!
//! let config = WarmupConfig::from_json_str(&config_json)?;
//! let service = Arc::new(
//!     WarmupService::new(config, AgentRegistry::global().clone(), runtime, source)
//!         .with_strategy(Arc::new(PredefinedStrategy::new(
//!             "VipOrders",
//!             "Aevatar.Agents.OrderAgent",
//!             vip_order_ids,
//!         )?)),
//! );
//!
//! let token = CancellationToken::new();
//! let handle = service.spawn(token.clone());
//! // ...
//! println!("{:?}", service.status());
//! ```
//!

mod config;
mod discovery;
mod error;
mod executor;
mod identifier;
mod orchestrator;
mod registry;
mod retries;
mod runtime;
mod service;
mod source;
mod status;
mod strategy;

//
// Configuration
//

/// Warmup configuration and its sections.
///
/// Every key is optional and takes its default when missing.
pub use config::{
    AutoDiscoveryConfig, DefaultStrategyConfig, IdentifierSourceKind,
    NamingStrategy, StoreIntegrationConfig, StoreRateLimitConfig, WarmupConfig,
};

//
// Identifiers and discovery
//

/// Identifier of an agent instance and the kind of key an agent type uses.
pub use identifier::{Identifier, IdentifierKind};

/// Registration of agent types, the replacement for scanning loaded types at runtime.
pub use registry::{AgentRegistration, AgentRegistry, InterfaceDecl, KeyShape};

/// Discovery of warmup-eligible agent types.
pub use discovery::{AgentDiscovery, AgentTypeDescriptor};

//
// Boundaries
//

/// Actor runtime boundary.
pub use runtime::{ActorHandle, ActorRuntime};

/// Identifier store boundary.
pub use source::IdentifierSource;

//
// Strategies and execution
//

/// Warmup strategies.
pub use strategy::{
    DefaultStrategy, ITEM_DELAY, PACING_DELAY, PredefinedStrategy,
    RangeStrategy, SampleStrategy, WarmupStrategy,
};

/// Retry strategies of failed activations.
pub use retries::{FixedIntervalStrategy, NoIntervalStrategy, RetryStrategy};

/// Planning and plan execution.
pub use orchestrator::{
    StrategyExecution, WarmupExecutionPlan, WarmupOrchestrator,
    create_execution_plan,
};

/// Batched activation of the identifiers of one agent type.
pub use executor::{BatchExecutor, ExecutionSummary};

//
// Service and status
//

/// Warmup status and its lifecycle.
pub use status::{
    AgentWarmupStatus, MAX_RECORDED_ERRORS, StatusTracker, WarmupState,
};

/// Entry point of the warmup system.
pub use service::WarmupService;

/// Error type of the warmup system.
pub use error::Error;
