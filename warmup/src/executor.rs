// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Batch executor
//!
//! Activates the identifiers a strategy yields for one agent type. Identifiers are pulled from
//! the strategy's stream in batches; every identifier of a batch is activated in its own task,
//! and a semaphore bounds how many activations are in flight. The next batch only starts once
//! every task of the current one has finished, and its size grows by the configured factor up
//! to the configured maximum.
//!
//! Each activation resolves the actor reference through the strategy and touches the actor
//! under a timeout. Retryable failures are retried with a fixed delay. The run's cancellation
//! token is observed while waiting for a permit, an activation, a retry delay, the pause
//! between batches and the next identifier. Activations abandoned because of cancellation are
//! counted neither as warmed nor as failed.
//!

use crate::{
    Error,
    config::WarmupConfig,
    discovery::AgentTypeDescriptor,
    identifier::Identifier,
    retries::activation_retry_strategy,
    runtime::ActorRuntime,
    status::StatusTracker,
    strategy::{WarmupStrategy, pause},
};

use futures::StreamExt;
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use std::{sync::Arc, time::Duration};

/// Result of executing one strategy against one agent type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Identifiers handed to activation tasks.
    pub dispatched: usize,
    pub warmed: usize,
    pub failed: usize,
    pub batches: usize,
    pub cancelled: bool,
}

/// Outcome of a single activation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Activation {
    Warmed,
    Failed,
    Cancelled,
}

/// Everything an activation task needs, shared by the tasks of one execution.
#[derive(Clone)]
struct ActivationContext {
    strategy: Arc<dyn WarmupStrategy>,
    runtime: Arc<dyn ActorRuntime>,
    agent_type: Arc<AgentTypeDescriptor>,
    semaphore: Arc<Semaphore>,
    status: StatusTracker,
    timeout: Duration,
    max_retries: usize,
    retry_delay: Duration,
    token: CancellationToken,
}

/// Drives batched, bounded-concurrency activations.
pub struct BatchExecutor {
    runtime: Arc<dyn ActorRuntime>,
    status: StatusTracker,
    max_concurrency: usize,
    initial_batch_size: usize,
    max_batch_size: usize,
    batch_size_increase_factor: f64,
    delay_between_batches: Duration,
    activation_timeout: Duration,
    max_retry_attempts: usize,
    retry_delay: Duration,
}

impl BatchExecutor {
    pub fn new(
        config: &WarmupConfig,
        runtime: Arc<dyn ActorRuntime>,
        status: StatusTracker,
    ) -> Self {
        Self {
            runtime,
            status,
            max_concurrency: config.max_concurrency.max(1),
            initial_batch_size: config.initial_batch_size.max(1),
            max_batch_size: config.max_batch_size.max(1),
            batch_size_increase_factor: config.batch_size_increase_factor,
            delay_between_batches: config.delay_between_batches(),
            activation_timeout: config.activation_timeout(),
            max_retry_attempts: config.max_retry_attempts,
            retry_delay: config.retry_delay(),
        }
    }

    /// Size of the first batch.
    pub fn initial_batch_size(&self) -> usize {
        self.initial_batch_size.min(self.max_batch_size)
    }

    /// Size of the batch following one of `current` identifiers.
    ///
    /// A factor above one grows the batch by at least one identifier. The result never exceeds
    /// the maximum batch size.
    pub fn next_batch_size(&self, current: usize) -> usize {
        let grown =
            (current as f64 * self.batch_size_increase_factor).floor() as usize;
        let grown = if self.batch_size_increase_factor > 1.0 {
            grown.max(current + 1)
        } else {
            current
        };
        grown.min(self.max_batch_size)
    }

    /// Activates every identifier `strategy` yields for `agent_type`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if an activation task panics. Activation failures are recorded
    /// in the status and do not fail the execution.
    ///
    pub async fn execute(
        &self,
        strategy: Arc<dyn WarmupStrategy>,
        agent_type: Arc<AgentTypeDescriptor>,
        token: &CancellationToken,
    ) -> Result<ExecutionSummary, Error> {
        let context = ActivationContext {
            strategy: strategy.clone(),
            runtime: self.runtime.clone(),
            agent_type: agent_type.clone(),
            semaphore: Arc::new(Semaphore::new(self.max_concurrency)),
            status: self.status.clone(),
            timeout: self.activation_timeout,
            max_retries: self.max_retry_attempts,
            retry_delay: self.retry_delay,
            token: token.clone(),
        };

        let mut expected = strategy.estimated_count();
        let mut summary = ExecutionSummary::default();
        let mut batch_size = self.initial_batch_size();
        let mut identifiers =
            strategy.generate_identifiers(&agent_type, token.clone());

        loop {
            let mut batch: Vec<Identifier> = Vec::with_capacity(batch_size);
            while batch.len() < batch_size {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    next = identifiers.next() => next,
                };
                match next {
                    Some(identifier) => batch.push(identifier),
                    None => break,
                }
            }
            if batch.is_empty() {
                break;
            }
            let last = batch.len() < batch_size;

            summary.batches += 1;
            summary.dispatched += batch.len();
            if summary.dispatched > expected {
                self.status.replace_expected(expected, summary.dispatched);
                expected = summary.dispatched;
            }
            debug!(
                "Processing batch {} of {} identifiers for {} with strategy {}",
                summary.batches,
                batch.len(),
                agent_type.short_name,
                strategy.name()
            );

            let mut tasks = JoinSet::new();
            for identifier in batch {
                tasks.spawn(activate(context.clone(), identifier));
            }
            while let Some(result) = tasks.join_next().await {
                match result {
                    Ok(Activation::Warmed) => summary.warmed += 1,
                    Ok(Activation::Failed) => summary.failed += 1,
                    Ok(Activation::Cancelled) => {}
                    Err(e) => {
                        tasks.abort_all();
                        return Err(Error::Internal(format!(
                            "Activation task for {} failed: {}",
                            agent_type.short_name, e
                        )));
                    }
                }
            }

            if last || token.is_cancelled() {
                break;
            }
            batch_size = self.next_batch_size(batch_size);
            if !pause(self.delay_between_batches, token).await {
                break;
            }
        }

        summary.cancelled = token.is_cancelled();
        if !summary.cancelled {
            self.status.replace_expected(expected, summary.dispatched);
        }
        info!(
            "Strategy {} warmed up {} agents of {} ({} failed)",
            strategy.name(),
            summary.warmed,
            agent_type.short_name,
            summary.failed
        );
        Ok(summary)
    }
}

async fn activate(
    context: ActivationContext,
    identifier: Identifier,
) -> Activation {
    let _permit = tokio::select! {
        biased;
        _ = context.token.cancelled() => return Activation::Cancelled,
        permit = context.semaphore.clone().acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return Activation::Cancelled,
        },
    };

    let mut retries =
        activation_retry_strategy(context.max_retries, context.retry_delay);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = context.token.cancelled() => return Activation::Cancelled,
            result = attempt_activation(&context, &identifier) => result,
        };
        match result {
            Ok(()) => {
                context.status.record_success();
                return Activation::Warmed;
            }
            Err(e) if e.is_retryable() && attempt <= retries.max_retries() => {
                debug!(
                    "Attempt {} to warm up {} {} failed: {}",
                    attempt, context.agent_type.short_name, identifier, e
                );
                if let Some(delay) = retries.next_backoff() {
                    if !pause(delay, &context.token).await {
                        return Activation::Cancelled;
                    }
                }
            }
            Err(e) => {
                warn!(
                    "Failed to warm up {} {} after {} attempts: {}",
                    context.agent_type.short_name, identifier, attempt, e
                );
                context.status.record_failure(format!(
                    "{} {}: {}",
                    context.agent_type.short_name, identifier, e
                ));
                return Activation::Failed;
            }
        }
    }
}

async fn attempt_activation(
    context: &ActivationContext,
    identifier: &Identifier,
) -> Result<(), Error> {
    let handle = context.strategy.create_actor_reference(
        context.runtime.as_ref(),
        &context.agent_type,
        identifier,
    )?;
    match tokio::time::timeout(context.timeout, handle.touch()).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(context.timeout.as_millis() as u64)),
    }
}
