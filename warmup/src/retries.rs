// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Retry strategies for agent activations
//!

use std::{fmt::Debug, time::Duration};

/// Trait to define a RetryStrategy. The batch executor asks it how many times a failed
/// activation is retried and how long to wait before each retry.
pub trait RetryStrategy: Debug + Send + Sync {
    /// Maximum number of retries after the first attempt.
    fn max_retries(&self) -> usize;
    /// Wait duration before the next retry.
    fn next_backoff(&mut self) -> Option<Duration>;
}

/// A retry strategy that retries immediately.
#[derive(Debug, Default, Clone)]
pub struct NoIntervalStrategy {
    max_retries: usize,
}

impl NoIntervalStrategy {
    pub fn new(max_retries: usize) -> Self {
        NoIntervalStrategy { max_retries }
    }
}

impl RetryStrategy for NoIntervalStrategy {
    fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        None
    }
}

/// A retry strategy that waits a fixed period before every retry.
#[derive(Debug, Default, Clone)]
pub struct FixedIntervalStrategy {
    max_retries: usize,
    duration: Duration,
}

impl FixedIntervalStrategy {
    pub fn new(max_retries: usize, duration: Duration) -> Self {
        FixedIntervalStrategy {
            max_retries,
            duration,
        }
    }
}

impl RetryStrategy for FixedIntervalStrategy {
    fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.duration.is_zero() {
            None
        } else {
            Some(self.duration)
        }
    }
}

/// Builds the retry strategy of one activation from the configured attempts and delay.
pub fn activation_retry_strategy(
    max_retries: usize,
    delay: Duration,
) -> Box<dyn RetryStrategy> {
    if delay.is_zero() {
        Box::new(NoIntervalStrategy::new(max_retries))
    } else {
        Box::new(FixedIntervalStrategy::new(max_retries, delay))
    }
}
