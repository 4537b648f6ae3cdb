// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Rate limiting of store operations.
//!
//! Every collection has its own sliding-window limiter, shared by all the callers of a
//! [`RateLimiterManager`]: at most `operations_per_window` operations start inside any window
//! of `window` length.
//!

use warmup::StoreRateLimitConfig;

use tokio::{
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::debug;

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

/// Sliding-window limiter of one collection.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    /// Start time of the operations inside the current window, oldest first.
    started: VecDeque<Instant>,
    operations_per_window: usize,
    window: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(operations_per_window: usize, window: Duration) -> Self {
        Self {
            started: VecDeque::with_capacity(operations_per_window),
            operations_per_window: operations_per_window.max(1),
            window,
        }
    }

    /// Takes a slot if one is free. Otherwise returns how long until the oldest operation
    /// leaves the window.
    pub fn try_acquire(&mut self) -> Result<(), Duration> {
        let now = Instant::now();
        while let Some(oldest) = self.started.front() {
            if now.duration_since(*oldest) >= self.window {
                self.started.pop_front();
            } else {
                break;
            }
        }

        if self.started.len() < self.operations_per_window {
            self.started.push_back(now);
            Ok(())
        } else {
            let oldest = self.started.front().copied().unwrap_or(now);
            Err(self.window.saturating_sub(now.duration_since(oldest)))
        }
    }

    /// Operations currently inside the window.
    pub fn in_window(&self) -> usize {
        self.started.len()
    }
}

/// Manager for per-collection rate limiters.
#[derive(Debug, Clone)]
pub struct RateLimiterManager {
    limiters: Arc<Mutex<HashMap<String, SlidingWindowLimiter>>>,
    operations_per_window: usize,
    window: Duration,
}

impl RateLimiterManager {
    pub fn new(config: &StoreRateLimitConfig) -> Self {
        Self {
            limiters: Arc::new(Mutex::new(HashMap::new())),
            operations_per_window: config.operations_per_window(),
            window: config.window(),
        }
    }

    /// Acquire a slot for an operation on `collection`, waiting if necessary.
    ///
    /// Returns the duration waited.
    ///
    /// # Cancel Safety
    ///
    /// This method is cancel-safe. The lock is never held across the wait, so a waiting caller
    /// does not block the other collections.
    pub async fn acquire(&self, collection: &str) -> Duration {
        let mut total_wait = Duration::ZERO;

        loop {
            let wait = {
                let mut limiters = self.limiters.lock().await;
                let limiter =
                    limiters.entry(collection.to_owned()).or_insert_with(|| {
                        SlidingWindowLimiter::new(
                            self.operations_per_window,
                            self.window,
                        )
                    });
                match limiter.try_acquire() {
                    Ok(()) => return total_wait,
                    Err(wait) => wait,
                }
            };

            debug!("Rate limited on {}, waiting {:?}", collection, wait);
            tokio::time::sleep(wait).await;
            total_wait += wait;
        }
    }

    /// Try to acquire a slot without waiting.
    pub async fn try_acquire(&self, collection: &str) -> bool {
        let mut limiters = self.limiters.lock().await;
        limiters
            .entry(collection.to_owned())
            .or_insert_with(|| {
                SlidingWindowLimiter::new(
                    self.operations_per_window,
                    self.window,
                )
            })
            .try_acquire()
            .is_ok()
    }
}
