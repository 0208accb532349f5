// src/execution.rs

//! The supervised execution entity and its request/snapshot types.
//!
//! An [`Execution`] is shared between the launcher, the output readers, the
//! detection loop and the recovery controller. All mutable state lives
//! behind one std `Mutex` that is never held across an await point; state
//! transitions happen under that lock, and the `recovering` flag guarantees
//! that the detector never starts a second recovery sequence while one is in
//! flight for the same execution.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Notify};

use crate::errors::{Result, StallguardError};
use crate::types::{default_recovery_actions, ExecutionState, RecoveryAction};

/// Minimum/maximum per-request timeout, in seconds.
const TIMEOUT_RANGE_SECS: (u64, u64) = (1, 3600);

/// A request to run one external command under supervision.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    /// Argv to execute. With `shell = true` the elements are joined with
    /// spaces and run through the platform shell.
    pub command: Vec<String>,
    /// Run through `sh -c` (or `cmd /C` on Windows) instead of spawning the
    /// argv directly.
    pub shell: bool,
    /// Absolute timeout for the whole execution (1–3600 s).
    pub timeout: Option<Duration>,
    /// Working directory for the child.
    pub working_dir: Option<PathBuf>,
    /// Environment variable overrides.
    pub env: BTreeMap<String, String>,
    /// Ordered escalation ladder applied when the execution stalls.
    pub recovery_actions: Vec<RecoveryAction>,
    /// Informational flag; carried through to logs and reports.
    pub critical: bool,
    /// Per-request override of the config's `enable_auto_recovery`.
    pub auto_recover: Option<bool>,
}

impl CommandRequest {
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            shell: false,
            timeout: None,
            working_dir: None,
            env: BTreeMap::new(),
            recovery_actions: default_recovery_actions(),
            critical: false,
            auto_recover: None,
        }
    }

    /// Local, synchronous validation with no side effects. Called by the
    /// façade before any process is started.
    pub fn validate(&self) -> Result<()> {
        if self.command.is_empty() || self.command.iter().all(|s| s.trim().is_empty()) {
            return Err(StallguardError::ValidationError(
                "command must be non-empty".to_string(),
            ));
        }

        if let Some(timeout) = self.timeout {
            let (min, max) = TIMEOUT_RANGE_SECS;
            if timeout < Duration::from_secs(min) || timeout > Duration::from_secs(max) {
                return Err(StallguardError::ValidationError(format!(
                    "timeout must be in [{min}, {max}] seconds (got {:?})",
                    timeout
                )));
            }
        }

        Ok(())
    }

    /// The command as a single displayable string (for logs and reports).
    pub fn display_command(&self) -> String {
        self.command.join(" ")
    }
}

/// Mutable per-execution state. Guarded by `Execution::inner`.
#[derive(Debug)]
pub(crate) struct ExecutionInner {
    pub state: ExecutionState,
    /// OS pid of the current child; `None` before launch, after launch
    /// failure, and once the process has been reaped.
    pub pid: Option<u32>,
    pub start_time: Option<Instant>,
    pub last_output_time: Option<Instant>,
    /// Baseline for the overall stall window. Equal to `start_time` until a
    /// successful recovery resets it.
    pub stall_window_start: Option<Instant>,
    /// Absolute deadline derived from the request timeout; the
    /// extend-timeout action pushes this out.
    pub deadline: Option<Instant>,
    pub end_time: Option<Instant>,
    pub return_code: Option<i32>,
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,
    pub recovery_attempts: u32,
    /// Append-only audit log, one `action:reason:outcome` entry per
    /// attempted recovery action.
    pub recovery_history: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// A recovery sequence is in flight; the detector must not start another.
    pub recovering: bool,
    /// A recovery action succeeded at some point in this execution's life.
    pub recovered: bool,
    /// The child has exited (the waiter observed `wait()` return).
    pub exited: bool,
    /// Terminal bookkeeping (stats, done notification) has run.
    pub finalized: bool,
    /// Incremented on restart so stale waiter/reader tasks from a replaced
    /// process can detect they are out of date.
    pub generation: u32,
}

impl ExecutionInner {
    fn new() -> Self {
        Self {
            state: ExecutionState::Pending,
            pid: None,
            start_time: None,
            last_output_time: None,
            stall_window_start: None,
            deadline: None,
            end_time: None,
            return_code: None,
            stdout_lines: Vec::new(),
            stderr_lines: Vec::new(),
            recovery_attempts: 0,
            recovery_history: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            recovering: false,
            recovered: false,
            exited: false,
            finalized: false,
            generation: 0,
        }
    }
}

/// One supervised invocation of an external command.
#[derive(Debug)]
pub struct Execution {
    pub id: u64,
    pub request: CommandRequest,
    /// Whether the detection loop sweeps this execution. Basic (fallback)
    /// executions are registered for status and statistics but never swept.
    pub(crate) supervised: bool,
    inner: Mutex<ExecutionInner>,
    done_tx: watch::Sender<bool>,
    exit_notify: Notify,
}

impl Execution {
    pub(crate) fn new(id: u64, request: CommandRequest, supervised: bool) -> Self {
        let (done_tx, _) = watch::channel(false);
        Self {
            id,
            request,
            supervised,
            inner: Mutex::new(ExecutionInner::new()),
            done_tx,
            exit_notify: Notify::new(),
        }
    }

    pub(crate) fn lock(&self) -> std::sync::MutexGuard<'_, ExecutionInner> {
        self.inner.lock().expect("execution lock poisoned")
    }

    /// Record a successful spawn: transition to `Running` and start the
    /// timing windows. Used both for the initial launch and for restarts.
    /// Returns the new process generation; the waiter and reader tasks tied
    /// to this spawn carry it so they can detect they have been replaced.
    pub(crate) fn mark_running(&self, pid: Option<u32>, now: Instant) -> u32 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.pid = pid;
        inner.exited = false;
        if inner.start_time.is_none() {
            inner.start_time = Some(now);
            if let Some(timeout) = self.request.timeout {
                inner.deadline = Some(now + timeout);
            }
        }
        inner.last_output_time = Some(now);
        inner.stall_window_start = Some(now);
        if inner.state == ExecutionState::Pending {
            inner.state = ExecutionState::Running;
        }
        inner.generation
    }

    /// Append an output line and bump the activity timestamp. Called only by
    /// the output readers; never touches `state`. Lines from a replaced
    /// process generation are still appended (they are real output produced
    /// before the restart) but no longer count as liveness.
    pub(crate) fn note_output(&self, line: String, is_stderr: bool, now: Instant, generation: u32) {
        let mut inner = self.lock();
        if inner.generation == generation {
            // last_output_time only moves forward.
            match inner.last_output_time {
                Some(prev) if prev >= now => {}
                _ => inner.last_output_time = Some(now),
            }
        }
        if is_stderr {
            inner.stderr_lines.push(line);
        } else {
            inner.stdout_lines.push(line);
        }
    }

    /// Wake any recovery handler blocked in [`Execution::wait_exited`].
    pub(crate) fn notify_exit(&self) {
        self.exit_notify.notify_waiters();
    }

    /// Wait up to `grace` for the current process to exit, as observed by
    /// the waiter task. Returns whether the process is gone.
    pub(crate) async fn wait_exited(&self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        loop {
            let notified = self.exit_notify.notified();
            if self.lock().exited {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            if tokio::time::timeout(remaining, notified).await.is_err() {
                return self.lock().exited;
            }
        }
    }

    /// Whether the execution has reached a state the caller can collect.
    pub fn is_done(&self) -> bool {
        *self.done_tx.borrow()
    }

    /// Mark terminal bookkeeping as complete and wake `wait_done` callers.
    /// Idempotent: returns false if the execution was already finalized.
    pub(crate) fn mark_finalized(&self) -> bool {
        {
            let mut inner = self.lock();
            if inner.finalized {
                return false;
            }
            inner.finalized = true;
        }
        // send_replace stores the value even with no receiver; a finalize
        // that beats the caller's wait_done must not be lost.
        self.done_tx.send_replace(true);
        true
    }

    /// Suspend until the execution reaches a terminal state. No busy-wait:
    /// this parks on a watch channel signalled by the finalizer.
    pub(crate) async fn wait_done(&self) {
        let mut rx = self.done_tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Point-in-time view of the execution's public fields.
    pub fn status(&self) -> ExecutionStatus {
        let inner = self.lock();
        ExecutionStatus {
            id: self.id,
            command: self.request.display_command(),
            state: inner.state,
            pid: inner.pid,
            return_code: inner.return_code,
            runtime: runtime_of(&inner),
            recovery_attempts: inner.recovery_attempts,
            stdout_lines: inner.stdout_lines.len(),
            stderr_lines: inner.stderr_lines.len(),
            error_count: inner.errors.len(),
        }
    }

    /// Full owned snapshot handed back to the caller once the execution is
    /// terminal.
    pub fn report(&self) -> ExecutionReport {
        let inner = self.lock();
        ExecutionReport {
            id: self.id,
            command: self.request.display_command(),
            state: inner.state,
            return_code: inner.return_code,
            runtime: runtime_of(&inner),
            stdout_lines: inner.stdout_lines.clone(),
            stderr_lines: inner.stderr_lines.clone(),
            recovery_attempts: inner.recovery_attempts,
            recovery_history: inner.recovery_history.clone(),
            errors: inner.errors.clone(),
            warnings: inner.warnings.clone(),
        }
    }
}

fn runtime_of(inner: &ExecutionInner) -> Option<Duration> {
    let start = inner.start_time?;
    Some(match inner.end_time {
        Some(end) => end.duration_since(start),
        None => start.elapsed(),
    })
}

/// Public point-in-time view of a single execution.
#[derive(Debug, Clone)]
pub struct ExecutionStatus {
    pub id: u64,
    pub command: String,
    pub state: ExecutionState,
    pub pid: Option<u32>,
    pub return_code: Option<i32>,
    pub runtime: Option<Duration>,
    pub recovery_attempts: u32,
    pub stdout_lines: usize,
    pub stderr_lines: usize,
    pub error_count: usize,
}

/// Final result of a supervised execution, returned by the façade.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub id: u64,
    pub command: String,
    pub state: ExecutionState,
    pub return_code: Option<i32>,
    pub runtime: Option<Duration>,
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,
    pub recovery_attempts: u32,
    pub recovery_history: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ExecutionReport {
    /// Convenience predicate: the command ran to a successful end, either
    /// cleanly or after recovery.
    pub fn succeeded(&self) -> bool {
        matches!(
            self.state,
            ExecutionState::Completed | ExecutionState::Recovered
        )
    }
}
