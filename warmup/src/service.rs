// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Warmup service
//!
//! Entry point of the warmup system. A run discovers the eligible agent types, builds a plan
//! from them and the registered strategies, and executes it. Only one run is active at a time;
//! once a run ends, successfully or not, a new one can be started.
//!

use crate::{
    Error,
    config::WarmupConfig,
    discovery::AgentDiscovery,
    executor::BatchExecutor,
    orchestrator::{WarmupOrchestrator, create_execution_plan},
    registry::AgentRegistry,
    runtime::ActorRuntime,
    source::IdentifierSource,
    status::{AgentWarmupStatus, StatusTracker, WarmupState},
    strategy::{DefaultStrategy, WarmupStrategy, pause},
};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use std::sync::{Arc, Mutex};

/// Warmup service.
pub struct WarmupService {
    config: WarmupConfig,
    discovery: AgentDiscovery,
    runtime: Arc<dyn ActorRuntime>,
    strategies: Vec<Arc<dyn WarmupStrategy>>,
    default_strategy: Arc<dyn WarmupStrategy>,
    status: StatusTracker,
    run_token: Mutex<Option<CancellationToken>>,
}

impl WarmupService {
    /// Creates a service with only the default strategy registered.
    pub fn new(
        config: WarmupConfig,
        registry: AgentRegistry,
        runtime: Arc<dyn ActorRuntime>,
        source: Arc<dyn IdentifierSource>,
    ) -> Self {
        let discovery =
            AgentDiscovery::new(config.auto_discovery.clone(), registry);
        let default_strategy: Arc<dyn WarmupStrategy> = Arc::new(
            DefaultStrategy::new(config.default_strategy.clone(), source),
        );
        Self {
            config,
            discovery,
            runtime,
            strategies: Vec::new(),
            default_strategy,
            status: StatusTracker::new(),
            run_token: Mutex::new(None),
        }
    }

    /// Registers a strategy. Registration order breaks priority ties.
    pub fn with_strategy(mut self, strategy: Arc<dyn WarmupStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn config(&self) -> &WarmupConfig {
        &self.config
    }

    pub fn discovery(&self) -> &AgentDiscovery {
        &self.discovery
    }

    /// Registered strategies followed by the default one.
    pub fn strategies(&self) -> Vec<Arc<dyn WarmupStrategy>> {
        let mut strategies = self.strategies.clone();
        strategies.push(self.default_strategy.clone());
        strategies
    }

    /// Snapshot of the current or last run.
    pub fn status(&self) -> AgentWarmupStatus {
        self.status.snapshot()
    }

    /// Runs warmup to completion.
    ///
    /// Does nothing if warmup is disabled or a run is already in progress. Cancelling `token`
    /// or calling [`WarmupService::stop`] ends the run early in the `Stopped` state.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the run fails unexpectedly. The status is final by then.
    ///
    pub async fn start(&self, token: &CancellationToken) -> Result<(), Error> {
        if !self.config.enabled {
            info!("Agent warmup is disabled");
            return Ok(());
        }
        if !self.status.try_begin() {
            warn!("Agent warmup is already running");
            return Ok(());
        }

        let run_token = token.child_token();
        self.set_run_token(Some(run_token.clone()));
        let mut guard = RunGuard {
            service: self,
            armed: true,
        };

        info!("Starting agent warmup");
        let result = self.run(&run_token).await;

        guard.armed = false;
        self.set_run_token(None);
        let state = match &result {
            Ok(()) if run_token.is_cancelled() => WarmupState::Stopped,
            Ok(()) => WarmupState::Completed,
            Err(_) => WarmupState::Failed,
        };
        self.status.finish(state);

        let status = self.status.snapshot();
        match &result {
            Ok(()) => info!(
                "Agent warmup {:?}: {} warmed up, {} failed, {} strategies completed",
                state,
                status.warmed_up_agents,
                status.failed_agents,
                status.completed_strategies
            ),
            Err(e) => error!("Agent warmup failed: {}", e),
        }
        result
    }

    /// Cancels the current run, if any.
    pub fn stop(&self) {
        let token = match self.run_token.lock() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if let Some(token) = token {
            info!("Stopping agent warmup");
            token.cancel();
        }
    }

    /// Starts a run in the background once the startup delay has elapsed.
    pub fn spawn(
        self: &Arc<Self>,
        token: CancellationToken,
    ) -> JoinHandle<Result<(), Error>> {
        let service = self.clone();
        tokio::spawn(async move {
            let delay = service.config.startup_delay();
            info!("Agent warmup starts in {} ms", delay.as_millis());
            if !pause(delay, &token).await {
                info!("Agent warmup cancelled before start");
                return Ok(());
            }
            service.start(&token).await
        })
    }

    async fn run(&self, token: &CancellationToken) -> Result<(), Error> {
        let agent_types = self.discovery.discover_eligible_types(&[]);
        let plan = create_execution_plan(&agent_types, &self.strategies());
        self.status
            .plan(plan.strategy_executions.len(), plan.estimated_agents());
        if plan.is_empty() {
            info!("No agent types to warm up");
            return Ok(());
        }

        let executor = BatchExecutor::new(
            &self.config,
            self.runtime.clone(),
            self.status.clone(),
        );
        WarmupOrchestrator::new(executor, self.status.clone())
            .execute_plan(&plan, token)
            .await
    }

    fn set_run_token(&self, token: Option<CancellationToken>) {
        match self.run_token.lock() {
            Ok(mut current) => *current = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}

/// Leaves the running state if a run is abandoned, by a panic or by dropping its future.
struct RunGuard<'a> {
    service: &'a WarmupService,
    armed: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let state = if std::thread::panicking() {
                WarmupState::Failed
            } else {
                WarmupState::Stopped
            };
            self.service.set_run_token(None);
            self.service.status.finish(state);
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use crate::{
        discovery::AgentTypeDescriptor,
        identifier::Identifier,
        registry::{AgentRegistration, KeyShape},
        runtime::ActorHandle,
    };

    use async_trait::async_trait;
    use futures::{
        StreamExt,
        stream::{self, BoxStream},
    };
    use tracing_test::traced_test;

    struct Ready;

    #[async_trait]
    impl ActorHandle for Ready {
        async fn touch(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    struct ReadyRuntime;

    impl ActorRuntime for ReadyRuntime {
        fn actor_reference(
            &self,
            _interface: &str,
            _identifier: &Identifier,
        ) -> Result<Arc<dyn ActorHandle>, Error> {
            Ok(Arc::new(Ready))
        }
    }

    struct Counted(usize);

    #[async_trait]
    impl IdentifierSource for Counted {
        fn stream_identifiers<'a>(
            &'a self,
            _agent_type: &'a AgentTypeDescriptor,
            max_count: Option<usize>,
            _token: CancellationToken,
        ) -> BoxStream<'a, Identifier> {
            let count = max_count.unwrap_or(usize::MAX).min(self.0);
            stream::iter((0..count as i64).map(Identifier::Int64)).boxed()
        }

        fn collection_name(&self, agent_type: &AgentTypeDescriptor) -> String {
            agent_type.type_name.clone()
        }

        async fn count(
            &self,
            _agent_type: &AgentTypeDescriptor,
        ) -> Result<u64, Error> {
            Ok(self.0 as u64)
        }

        async fn exists(
            &self,
            _agent_type: &AgentTypeDescriptor,
        ) -> Result<bool, Error> {
            Ok(true)
        }
    }

    fn service(config: WarmupConfig) -> WarmupService {
        let registry = AgentRegistry::new();
        registry.register(
            AgentRegistration::new("Agents.CounterAgent")
                .with_key(KeyShape::Int64)
                .with_interface("ICounterAgent")
                .with_storage_provider("PubSubStore"),
        );
        WarmupService::new(
            config,
            registry,
            Arc::new(ReadyRuntime),
            Arc::new(Counted(12)),
        )
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_default_strategy_run() {
        let service = service(WarmupConfig::default());
        service.start(&CancellationToken::new()).await.unwrap();

        let status = service.status();
        assert_eq!(status.state, WarmupState::Completed);
        assert!(!status.is_running);
        assert_eq!(status.total_strategies, 1);
        assert_eq!(status.completed_strategies, 1);
        assert_eq!(status.warmed_up_agents, 12);
        assert_eq!(status.total_agents, 12);
        assert_eq!(status.progress_percentage, 100.0);
        assert_eq!(status.success_rate, 100.0);
        assert!(status.start_time.is_some());
        assert!(status.end_time.is_some());
        assert!(logs_contain("Executing warmup strategy DefaultStrategy"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_disabled_is_noop() {
        let config = WarmupConfig {
            enabled: false,
            ..Default::default()
        };
        let service = service(config);
        service.start(&CancellationToken::new()).await.unwrap();
        assert_eq!(service.status().state, WarmupState::Idle);
        assert!(logs_contain("Agent warmup is disabled"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_token_stops_run() {
        let service = service(WarmupConfig::default());
        let token = CancellationToken::new();
        token.cancel();
        service.start(&token).await.unwrap();

        let status = service.status();
        assert_eq!(status.state, WarmupState::Stopped);
        assert!(!status.is_running);
        assert!(status.end_time.is_some());
        assert_eq!(status.warmed_up_agents, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_waits_for_startup_delay() {
        let config = WarmupConfig {
            startup_delay_ms: 5000,
            ..Default::default()
        };
        let service = Arc::new(service(config));
        let handle = service.spawn(CancellationToken::new());

        tokio::time::sleep(std::time::Duration::from_millis(4000)).await;
        assert_eq!(service.status().state, WarmupState::Idle);

        handle.await.unwrap().unwrap();
        assert_eq!(service.status().state, WarmupState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_cancelled_during_startup_delay() {
        let service = Arc::new(service(WarmupConfig::default()));
        let token = CancellationToken::new();
        let handle = service.spawn(token.clone());
        token.cancel();
        handle.await.unwrap().unwrap();
        assert_eq!(service.status().state, WarmupState::Idle);
    }
}
