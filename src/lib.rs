//! Warmup of persistent actor fleets.
//! Activates the agents most likely to be used before real traffic reaches the cluster.
//! This library bundles the warmup engine and the document store integration it reads persisted
//! agent identifiers from.

pub use warmup::{
    ActorHandle, ActorRuntime, AgentDiscovery, AgentRegistration, AgentRegistry,
    AgentTypeDescriptor, AgentWarmupStatus, AutoDiscoveryConfig, BatchExecutor,
    DefaultStrategy, DefaultStrategyConfig, Error, ExecutionSummary,
    Identifier, IdentifierKind, IdentifierSource, IdentifierSourceKind,
    InterfaceDecl, KeyShape, NamingStrategy, PredefinedStrategy, RangeStrategy,
    SampleStrategy, StatusTracker, StoreIntegrationConfig, StoreRateLimitConfig,
    StrategyExecution, WarmupConfig, WarmupExecutionPlan, WarmupOrchestrator,
    WarmupService, WarmupState, WarmupStrategy, create_execution_plan,
};

pub use store::{
    Error as StoreError, StoreIdentifierSource,
    database::{DbManager, DocumentCollection},
    memory::{MemoryCollection, MemoryManager},
    naming::{collection_name, document_id},
    rate_limit::RateLimiterManager,
};

#[cfg(feature = "sqlite")]
pub use sqlite_db::{SqliteCollection, SqliteManager};
