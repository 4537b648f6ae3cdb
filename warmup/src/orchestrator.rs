// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Orchestrator
//!
//! Assigns every discovered agent type to one strategy and runs the resulting plan.
//!

use crate::{
    Error,
    discovery::AgentTypeDescriptor,
    executor::BatchExecutor,
    status::StatusTracker,
    strategy::WarmupStrategy,
};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use std::sync::Arc;

/// A strategy and the agent types assigned to it.
#[derive(Clone)]
pub struct StrategyExecution {
    pub strategy: Arc<dyn WarmupStrategy>,
    pub target_agent_types: Vec<AgentTypeDescriptor>,
    pub priority: i32,
}

/// What a run activates, in execution order.
#[derive(Clone, Default)]
pub struct WarmupExecutionPlan {
    pub strategy_executions: Vec<StrategyExecution>,
    /// Types no valid strategy applies to.
    pub unassigned_agent_types: Vec<AgentTypeDescriptor>,
}

impl WarmupExecutionPlan {
    /// Sum of the strategies' estimates over their target types.
    pub fn estimated_agents(&self) -> usize {
        self.strategy_executions
            .iter()
            .map(|execution| {
                execution
                    .strategy
                    .estimated_count()
                    .saturating_mul(execution.target_agent_types.len())
            })
            .fold(0usize, |total, count| total.saturating_add(count))
    }

    pub fn is_empty(&self) -> bool {
        self.strategy_executions.is_empty()
    }
}

/// Builds the plan of a run.
///
/// Invalid strategies are ignored. Each type goes to the applicable strategy with the highest
/// priority, the first registered one on ties. Executions are ordered by descending priority,
/// then registration order, and strategies assigned no type are left out.
pub fn create_execution_plan(
    agent_types: &[AgentTypeDescriptor],
    strategies: &[Arc<dyn WarmupStrategy>],
) -> WarmupExecutionPlan {
    let valid: Vec<&Arc<dyn WarmupStrategy>> = strategies
        .iter()
        .filter(|strategy| {
            let valid = strategy.is_valid();
            if !valid {
                warn!("Strategy {} is invalid, ignoring it", strategy.name());
            }
            valid
        })
        .collect();

    let mut targets: Vec<Vec<AgentTypeDescriptor>> =
        vec![Vec::new(); valid.len()];
    let mut unassigned = Vec::new();

    for agent_type in agent_types {
        let mut best: Option<(usize, i32)> = None;
        for (index, strategy) in valid.iter().enumerate() {
            if !strategy.applies_to(agent_type) {
                continue;
            }
            let priority = strategy.priority();
            if best.map_or(true, |(_, best_priority)| priority > best_priority)
            {
                best = Some((index, priority));
            }
        }
        match best {
            Some((index, _)) => targets[index].push(agent_type.clone()),
            None => {
                warn!(
                    "No warmup strategy applies to agent type {}",
                    agent_type.type_name
                );
                unassigned.push(agent_type.clone());
            }
        }
    }

    let mut strategy_executions: Vec<StrategyExecution> = valid
        .into_iter()
        .zip(targets)
        .filter(|(_, targets)| !targets.is_empty())
        .map(|(strategy, target_agent_types)| StrategyExecution {
            strategy: strategy.clone(),
            priority: strategy.priority(),
            target_agent_types,
        })
        .collect();
    // Stable, so registration order breaks ties.
    strategy_executions.sort_by(|a, b| b.priority.cmp(&a.priority));

    info!(
        "Warmup plan has {} strategy executions, {} unassigned agent types",
        strategy_executions.len(),
        unassigned.len()
    );

    WarmupExecutionPlan {
        strategy_executions,
        unassigned_agent_types: unassigned,
    }
}

/// Runs plans through the batch executor.
pub struct WarmupOrchestrator {
    executor: BatchExecutor,
    status: StatusTracker,
}

impl WarmupOrchestrator {
    pub fn new(executor: BatchExecutor, status: StatusTracker) -> Self {
        Self { executor, status }
    }

    /// Runs the executions of `plan` one after the other.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if an activation task panics. Other errors are logged and the
    /// run moves on to the next agent type.
    ///
    pub async fn execute_plan(
        &self,
        plan: &WarmupExecutionPlan,
        token: &CancellationToken,
    ) -> Result<(), Error> {
        for execution in &plan.strategy_executions {
            if token.is_cancelled() {
                break;
            }
            let name = execution.strategy.name();
            info!(
                "Executing warmup strategy {} for {} agent types",
                name,
                execution.target_agent_types.len()
            );
            self.status.begin_strategy(name);

            for agent_type in &execution.target_agent_types {
                if token.is_cancelled() {
                    break;
                }
                let result = self
                    .executor
                    .execute(
                        execution.strategy.clone(),
                        Arc::new(agent_type.clone()),
                        token,
                    )
                    .await;
                match result {
                    Ok(_) => {}
                    Err(e @ Error::Internal(_)) => return Err(e),
                    Err(e) => {
                        error!(
                            "Strategy {} failed for agent type {}: {}",
                            name, agent_type.type_name, e
                        );
                        self.status.record_error(format!(
                            "{} {}: {}",
                            name, agent_type.short_name, e
                        ));
                    }
                }
            }

            if token.is_cancelled() {
                break;
            }
            self.status.complete_strategy();
            info!("Warmup strategy {} completed", name);
        }
        Ok(())
    }
}
