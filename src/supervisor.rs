// src/supervisor.rs

//! Command wrapper façade.
//!
//! [`Supervisor`] is the public entry point: it validates requests, enforces
//! admission control, hands executions to the launcher, and suspends until
//! the detection loop / recovery path settles a terminal state. It is an
//! explicitly constructed object, not a global; embedding applications
//! typically keep one long-lived instance and share it by reference.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::DetectorConfig;
use crate::engine::monitor::{self, MonitorHandle};
use crate::engine::registry::Registry;
use crate::engine::stats::{Stats, StatsSnapshot};
use crate::errors::Result;
use crate::exec::launcher;
use crate::execution::{CommandRequest, ExecutionReport, ExecutionStatus};
use crate::types::{ExecutionState, StallReason};

/// Structured pass/fail report of the runtime environment, one boolean per
/// checked capability, so callers can diagnose *why* the environment is
/// unusable rather than getting a single opaque flag.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentReport {
    /// An async runtime is available to drive supervision.
    pub async_runtime: bool,
    /// Child processes can be spawned at all.
    pub can_spawn: bool,
    /// Child stdout can be captured through a pipe.
    pub pipes_captured: bool,
    /// A trivial reference command (`echo`) runs and exits 0.
    pub reference_command: bool,
}

impl EnvironmentReport {
    pub fn usable(&self) -> bool {
        self.async_runtime && self.can_spawn && self.pipes_captured && self.reference_command
    }
}

/// Probe the environment: runtime presence, subprocess creation, pipe
/// capture, and a trivial reference command.
pub async fn verify_environment() -> EnvironmentReport {
    let async_runtime = tokio::runtime::Handle::try_current().is_ok();

    let mut can_spawn = false;
    let mut pipes_captured = false;
    let mut reference_command = false;

    let spawned = Command::new("echo")
        .arg("ok")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();

    if let Ok(child) = spawned {
        can_spawn = true;
        if let Ok(output) = child.wait_with_output().await {
            reference_command = output.status.success();
            pipes_captured = String::from_utf8_lossy(&output.stdout).trim() == "ok";
        }
    }

    let report = EnvironmentReport {
        async_runtime,
        can_spawn,
        pipes_captured,
        reference_command,
    };
    debug!(?report, "environment verified");
    report
}

/// The stall-detection supervisor.
pub struct Supervisor {
    config: Arc<DetectorConfig>,
    registry: Arc<Registry>,
    stats: Arc<Stats>,
    monitor: Mutex<Option<MonitorHandle>>,
    detector_running: AtomicBool,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("config", &self.config)
            .field("active", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Construct a supervisor and start its background detection loop.
    /// Must be called from within a tokio runtime.
    pub fn new(config: DetectorConfig) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(Registry::new(config.max_concurrent));
        let stats = Arc::new(Stats::new());

        let handle = monitor::spawn_monitor(
            Arc::clone(&registry),
            Arc::clone(&stats),
            Arc::clone(&config),
        );

        info!(max_concurrent = config.max_concurrent, "supervisor started");

        Self {
            config,
            registry,
            stats,
            monitor: Mutex::new(Some(handle)),
            detector_running: AtomicBool::new(true),
        }
    }

    /// Run one command under full supervision. Returns only when the
    /// execution reaches a terminal state (including `Recovered`); a
    /// malformed request fails synchronously before any process starts.
    ///
    /// When the detection loop has been shut down, falls back to
    /// [`Supervisor::execute_basic`].
    pub async fn execute(&self, request: CommandRequest) -> Result<ExecutionReport> {
        request.validate()?;

        if !self.detector_running.load(Ordering::Acquire) {
            warn!("stall detector unavailable; using basic execution fallback");
            return self.execute_basic(request).await;
        }

        let exec = self.registry.admit(request, true)?;
        self.stats.record_admitted();

        launcher::launch(&exec, &self.stats);
        exec.wait_done().await;

        self.registry.remove(exec.id);
        Ok(exec.report())
    }

    /// No-detection fallback: run the command with a plain optional timeout
    /// and no stall supervision or recovery. The execution is registered for
    /// status and statistics but the detection loop never sweeps it. The
    /// result is normalized into the same `ExecutionReport` shape.
    pub async fn execute_basic(&self, request: CommandRequest) -> Result<ExecutionReport> {
        request.validate()?;

        let exec = self.registry.admit(request, false)?;
        self.stats.record_admitted();

        launcher::launch(&exec, &self.stats);

        match exec.request.timeout {
            None => exec.wait_done().await,
            Some(timeout) => {
                if tokio::time::timeout(timeout, exec.wait_done()).await.is_err() {
                    let pid = {
                        let mut inner = exec.lock();
                        if !inner.exited && inner.state.is_supervisable() {
                            inner.state = ExecutionState::Timeout;
                            inner
                                .warnings
                                .push("timeout exceeded (basic execution, no recovery)".to_string());
                            self.stats.record_stall_event(StallReason::AbsoluteTimeout);
                            inner.pid
                        } else {
                            None
                        }
                    };

                    #[cfg(unix)]
                    if let Some(pid) = pid {
                        if let Err(e) = crate::exec::recovery::send_signal(
                            pid,
                            nix::sys::signal::Signal::SIGKILL,
                        ) {
                            warn!(id = exec.id, pid, error = %e, "failed to kill timed-out process");
                        }
                    }
                    #[cfg(not(unix))]
                    let _ = pid;

                    exec.wait_done().await;
                }
            }
        }

        self.registry.remove(exec.id);
        Ok(exec.report())
    }

    /// Probe the runtime environment. See [`verify_environment`].
    pub async fn verify_environment(&self) -> EnvironmentReport {
        verify_environment().await
    }

    /// Read-only counters snapshot; safe to call concurrently with active
    /// supervision.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.registry.len())
    }

    /// Point-in-time view of a single execution's public fields, or `None`
    /// if the id is unknown (never launched, or already collected).
    pub fn execution_status(&self, id: u64) -> Option<ExecutionStatus> {
        self.registry.get(id).map(|exec| exec.status())
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Stop the detection loop. Executions submitted afterwards take the
    /// basic fallback path.
    pub async fn shutdown(&self) {
        if !self.detector_running.swap(false, Ordering::AcqRel) {
            return;
        }
        let handle = self
            .monitor
            .lock()
            .expect("monitor lock poisoned")
            .take();
        if let Some(mut handle) = handle {
            handle.shutdown().await;
        }
        info!("supervisor shut down");
    }
}
