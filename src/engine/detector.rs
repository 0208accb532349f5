// src/engine/detector.rs

//! Pure stall-trigger evaluation.
//!
//! This module contains a synchronous, deterministic evaluator that consumes
//! a point-in-time [`DetectorView`] of one execution and decides whether a
//! stall trigger fires. The async/IO-heavy shell (`engine::monitor`) is
//! responsible for:
//! - ticking the check interval
//! - snapshotting executions from the registry
//! - applying the resulting state transitions and spawning recovery
//!
//! The evaluator is intended to be extensively unit tested without any
//! Tokio, channels, or processes.

use std::time::Instant;

use crate::config::DetectorConfig;
use crate::types::{ExecutionState, StallReason};

/// Point-in-time view of the fields the detector needs. Built by the
/// monitor loop under the execution's lock.
#[derive(Debug, Clone, Copy)]
pub struct DetectorView {
    pub state: ExecutionState,
    pub exited: bool,
    pub recovering: bool,
    pub deadline: Option<Instant>,
    pub last_output_time: Option<Instant>,
    pub stall_window_start: Option<Instant>,
}

/// Evaluate the three stall triggers for one execution.
///
/// The triggers are independent and checked in a fixed order; the first one
/// that fires determines the transition for this tick:
/// 1. absolute timeout (the request's deadline has passed)
/// 2. output silence (no output for longer than `output_timeout`)
/// 3. overall stall window (total runtime beyond `stall_timeout` while
///    still `Running`, regardless of output activity)
///
/// Returns `None` for executions that are not currently supervisable:
/// already exited, mid-recovery, or in a state the detector does not watch.
pub fn evaluate(view: &DetectorView, config: &DetectorConfig, now: Instant) -> Option<StallReason> {
    if view.exited || view.recovering || !view.state.is_supervisable() {
        return None;
    }

    // No state guard needed here: `Timeout` already fails the
    // supervisability check above, so the deadline cannot re-fire.
    if let Some(deadline) = view.deadline {
        if now > deadline {
            return Some(StallReason::AbsoluteTimeout);
        }
    }

    if let Some(last_output) = view.last_output_time {
        if now.duration_since(last_output) > config.output_timeout
            && view.state != ExecutionState::Stalled
        {
            return Some(StallReason::OutputSilence);
        }
    }

    if let Some(window_start) = view.stall_window_start {
        if now.duration_since(window_start) > config.stall_timeout
            && view.state == ExecutionState::Running
        {
            return Some(StallReason::StallWindow);
        }
    }

    None
}
