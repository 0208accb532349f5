// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Lifecycle state of a supervised execution.
///
/// `Completed` and `Failed` are always terminal. `Stalled` and `Timeout` are
/// not: a successful recovery moves the execution to `Recovered`, exhausted
/// recovery leaves it where it is with the exhaustion recorded in its error
/// list. `Recovered` becomes terminal once the process has exited or been
/// replaced; while the recovered process is still alive the execution stays
/// under detection and may stall again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Pending,
    Running,
    Completed,
    Failed,
    Stalled,
    Timeout,
    Recovered,
}

impl ExecutionState {
    /// Whether the detector should keep evaluating an execution in this
    /// state (given that its process is still alive).
    pub fn is_supervisable(self) -> bool {
        matches!(
            self,
            ExecutionState::Running | ExecutionState::Stalled | ExecutionState::Recovered
        )
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionState::Pending => "pending",
            ExecutionState::Running => "running",
            ExecutionState::Completed => "completed",
            ExecutionState::Failed => "failed",
            ExecutionState::Stalled => "stalled",
            ExecutionState::Timeout => "timeout",
            ExecutionState::Recovered => "recovered",
        };
        f.write_str(s)
    }
}

/// One step in the recovery escalation ladder.
///
/// The controller walks a request's ordered action list and dispatches on
/// this enum; each variant has exactly one handler returning a success flag
/// and a human-readable outcome string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Send SIGINT and wait a short grace period for exit.
    Interrupt,
    /// Send SIGTERM and wait a bounded timeout for exit.
    Terminate,
    /// Send SIGKILL and wait briefly for exit.
    Kill,
    /// Kill the current process and relaunch the same request.
    Restart,
    /// Multiply the remaining absolute timeout by the configured factor
    /// without touching the process.
    ExtendTimeout,
    /// Take no corrective action; emit a loud diagnostic for an operator and
    /// report failure so the next action (if any) still runs.
    Escalate,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecoveryAction::Interrupt => "interrupt",
            RecoveryAction::Terminate => "terminate",
            RecoveryAction::Kill => "kill",
            RecoveryAction::Restart => "restart",
            RecoveryAction::ExtendTimeout => "extend_timeout",
            RecoveryAction::Escalate => "escalate",
        };
        f.write_str(s)
    }
}

impl FromStr for RecoveryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interrupt" => Ok(RecoveryAction::Interrupt),
            "terminate" => Ok(RecoveryAction::Terminate),
            "kill" => Ok(RecoveryAction::Kill),
            "restart" => Ok(RecoveryAction::Restart),
            "extend_timeout" | "extend-timeout" => Ok(RecoveryAction::ExtendTimeout),
            "escalate" => Ok(RecoveryAction::Escalate),
            other => Err(format!(
                "invalid recovery action: {other} (expected one of \
                 interrupt, terminate, kill, restart, extend_timeout, escalate)"
            )),
        }
    }
}

/// Default escalation ladder applied when a request does not specify one.
pub fn default_recovery_actions() -> Vec<RecoveryAction> {
    vec![
        RecoveryAction::Interrupt,
        RecoveryAction::Terminate,
        RecoveryAction::Kill,
    ]
}

/// Why an execution was flagged for recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallReason {
    /// The request's absolute timeout was exceeded.
    AbsoluteTimeout,
    /// No output for longer than `output_timeout`.
    OutputSilence,
    /// Total runtime exceeded `stall_timeout` regardless of output.
    StallWindow,
}

impl StallReason {
    /// State the detector assigns when this trigger fires.
    pub fn target_state(self) -> ExecutionState {
        match self {
            StallReason::AbsoluteTimeout => ExecutionState::Timeout,
            StallReason::OutputSilence | StallReason::StallWindow => ExecutionState::Stalled,
        }
    }
}

impl fmt::Display for StallReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StallReason::AbsoluteTimeout => "absolute_timeout",
            StallReason::OutputSilence => "output_silence",
            StallReason::StallWindow => "stall_window",
        };
        f.write_str(s)
    }
}
