// src/engine/stats.rs

//! Running counters for the supervisor, exposed as an on-demand snapshot.
//!
//! All counters are atomics so the read path never takes a lock and can be
//! called concurrently with active supervision.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::types::{ExecutionState, StallReason};

#[derive(Debug)]
pub struct Stats {
    started_at: Instant,
    total: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    stalled: AtomicU64,
    timeout: AtomicU64,
    recovered: AtomicU64,
    /// Every detection trigger that fired, including repeat stalls of the
    /// same execution. Terminal counters above count each execution once.
    stall_events: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            stalled: AtomicU64::new(0),
            timeout: AtomicU64::new(0),
            recovered: AtomicU64::new(0),
            stall_events: AtomicU64::new(0),
        }
    }

    /// An execution was admitted (before launch).
    pub fn record_admitted(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// A detection trigger fired for some execution.
    pub fn record_stall_event(&self, _reason: StallReason) {
        self.stall_events.fetch_add(1, Ordering::Relaxed);
    }

    /// An execution reached its terminal state. Called exactly once per
    /// execution by the finalizer.
    pub fn record_terminal(&self, state: ExecutionState) {
        let counter = match state {
            ExecutionState::Completed => &self.completed,
            ExecutionState::Failed => &self.failed,
            ExecutionState::Stalled => &self.stalled,
            ExecutionState::Timeout => &self.timeout,
            ExecutionState::Recovered => &self.recovered,
            // Pending/Running are not terminal; nothing to count.
            ExecutionState::Pending | ExecutionState::Running => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, active: usize) -> StatsSnapshot {
        let completed = self.completed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let stalled = self.stalled.load(Ordering::Relaxed);
        let timeout = self.timeout.load(Ordering::Relaxed);
        let recovered = self.recovered.load(Ordering::Relaxed);

        let finished = completed + failed + stalled + timeout + recovered;
        let success_rate = if finished > 0 {
            (completed + recovered) as f64 / finished as f64
        } else {
            0.0
        };

        let disturbed = stalled + timeout + recovered;
        let recovery_rate = if disturbed > 0 {
            recovered as f64 / disturbed as f64
        } else {
            0.0
        };

        StatsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            completed,
            failed,
            stalled,
            timeout,
            recovered,
            stall_events: self.stall_events.load(Ordering::Relaxed),
            active,
            success_rate,
            recovery_rate,
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the supervisor's counters.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub stalled: u64,
    pub timeout: u64,
    pub recovered: u64,
    pub stall_events: u64,
    pub active: usize,
    /// Fraction of finished executions that ended `Completed` or `Recovered`.
    pub success_rate: f64,
    /// Fraction of stalled/timed-out executions that ended `Recovered`.
    pub recovery_rate: f64,
    pub uptime: Duration,
}
