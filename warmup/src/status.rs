// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Warmup status
//!

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::sync::{Arc, Mutex, MutexGuard};

/// Maximum number of error messages kept in the status.
pub const MAX_RECORDED_ERRORS: usize = 100;

/// Lifecycle of a warmup run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarmupState {
    #[default]
    Idle,
    Running,
    Completed,
    /// Cancelled by the operator or by shutdown.
    Stopped,
    Failed,
}

/// Progress of the current or last warmup run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentWarmupStatus {
    pub state: WarmupState,
    pub is_running: bool,
    pub total_strategies: usize,
    pub completed_strategies: usize,
    /// Estimated until a strategy execution finishes, then the number of identifiers dispatched.
    pub total_agents: usize,
    pub warmed_up_agents: usize,
    pub failed_agents: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub current_strategy: Option<String>,
    /// First error messages of the run.
    pub errors: Vec<String>,
    pub progress_percentage: f64,
    pub success_rate: f64,
}

impl AgentWarmupStatus {
    /// Processed agents over the total, in percent.
    pub fn progress_percentage(&self) -> f64 {
        if self.total_agents == 0 {
            return 0.0;
        }
        let processed = (self.warmed_up_agents + self.failed_agents) as f64;
        (processed / self.total_agents as f64 * 100.0).min(100.0)
    }

    /// Warmed agents over the processed ones, in percent.
    pub fn success_rate(&self) -> f64 {
        let processed = self.warmed_up_agents + self.failed_agents;
        if processed == 0 {
            return 0.0;
        }
        self.warmed_up_agents as f64 / processed as f64 * 100.0
    }
}

/// Shared handle to the status of a run. Clones share the same status.
#[derive(Clone, Debug, Default)]
pub struct StatusTracker {
    inner: Arc<Mutex<AgentWarmupStatus>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AgentWarmupStatus> {
        match self.inner.lock() {
            Ok(status) => status,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Deep copy of the status with the derived percentages filled in.
    pub fn snapshot(&self) -> AgentWarmupStatus {
        let mut status = self.lock().clone();
        status.progress_percentage = status.progress_percentage();
        status.success_rate = status.success_rate();
        status
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_running
    }

    /// Marks a run as started unless one is already running. Returns false in that case.
    pub fn try_begin(&self) -> bool {
        let mut status = self.lock();
        if status.is_running {
            return false;
        }
        *status = AgentWarmupStatus {
            state: WarmupState::Running,
            is_running: true,
            start_time: Some(Utc::now()),
            ..Default::default()
        };
        true
    }

    /// Records the size of the plan.
    pub fn plan(&self, total_strategies: usize, total_agents: usize) {
        let mut status = self.lock();
        status.total_strategies = total_strategies;
        status.total_agents = total_agents;
    }

    pub fn begin_strategy(&self, name: &str) {
        self.lock().current_strategy = Some(name.to_owned());
    }

    pub fn complete_strategy(&self) {
        let mut status = self.lock();
        status.completed_strategies += 1;
        status.current_strategy = None;
    }

    /// Replaces `previous` expected agents by `current` in the total.
    pub fn replace_expected(&self, previous: usize, current: usize) {
        let mut status = self.lock();
        status.total_agents = status
            .total_agents
            .saturating_sub(previous)
            .saturating_add(current);
    }

    pub fn record_success(&self) {
        self.lock().warmed_up_agents += 1;
    }

    pub fn record_failure(&self, message: String) {
        let mut status = self.lock();
        status.failed_agents += 1;
        if status.errors.len() < MAX_RECORDED_ERRORS {
            status.errors.push(message);
        }
    }

    /// Records an error that is not tied to one agent.
    pub fn record_error(&self, message: String) {
        let mut status = self.lock();
        if status.errors.len() < MAX_RECORDED_ERRORS {
            status.errors.push(message);
        }
    }

    /// Leaves the running state. Counters are kept.
    pub fn finish(&self, state: WarmupState) {
        let mut status = self.lock();
        status.state = state;
        status.is_running = false;
        status.current_strategy = None;
        status.end_time = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_percentages() {
        let mut status = AgentWarmupStatus::default();
        assert_eq!(status.progress_percentage(), 0.0);
        assert_eq!(status.success_rate(), 0.0);

        status.total_agents = 8;
        status.warmed_up_agents = 3;
        status.failed_agents = 1;
        assert_eq!(status.progress_percentage(), 50.0);
        assert_eq!(status.success_rate(), 75.0);
    }

    #[test]
    fn test_run_lifecycle() {
        let tracker = StatusTracker::new();
        assert_eq!(tracker.snapshot().state, WarmupState::Idle);
        assert!(tracker.try_begin());
        assert!(!tracker.try_begin());

        tracker.plan(2, 10);
        tracker.begin_strategy("Vip");
        tracker.record_success();
        tracker.record_failure("boom".to_owned());
        tracker.replace_expected(10, 2);
        tracker.complete_strategy();
        tracker.finish(WarmupState::Completed);

        let status = tracker.snapshot();
        assert_eq!(status.state, WarmupState::Completed);
        assert!(!status.is_running);
        assert!(status.end_time.is_some());
        assert_eq!(status.total_agents, 2);
        assert_eq!(status.completed_strategies, 1);
        assert_eq!(status.progress_percentage, 100.0);
        assert_eq!(status.success_rate, 50.0);
        assert_eq!(status.errors, vec!["boom".to_owned()]);

        assert!(tracker.try_begin());
        assert_eq!(tracker.snapshot().warmed_up_agents, 0);
    }

    #[test]
    fn test_errors_are_capped() {
        let tracker = StatusTracker::new();
        for i in 0..(MAX_RECORDED_ERRORS + 20) {
            tracker.record_failure(format!("error {}", i));
        }
        let status = tracker.snapshot();
        assert_eq!(status.failed_agents, MAX_RECORDED_ERRORS + 20);
        assert_eq!(status.errors.len(), MAX_RECORDED_ERRORS);
    }

    #[test]
    fn test_status_serializes() {
        let tracker = StatusTracker::new();
        tracker.try_begin();
        let json = serde_json::to_string(&tracker.snapshot()).unwrap();
        assert!(json.contains("\"state\":\"Running\""));
        assert!(json.contains("\"is_running\":true"));
    }
}
