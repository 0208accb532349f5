// src/engine/monitor.rs

//! The async shell around the pure detector: one long-lived background task
//! drives the detection tick for all active executions.
//!
//! Per-execution serialization: transitions happen under the execution's
//! lock, and an execution whose `recovering` flag is set is skipped until
//! its recovery sequence finishes, so the detector and the recovery
//! controller never act on the same execution concurrently.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::DetectorConfig;
use crate::engine::detector::{self, DetectorView};
use crate::engine::registry::Registry;
use crate::engine::stats::Stats;
use crate::exec::recovery;
use crate::execution::Execution;
use crate::types::StallReason;

/// Handle to the background monitor task.
#[derive(Debug)]
pub(crate) struct MonitorHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Stop the detection loop and wait for it to wind down.
    pub(crate) async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Spawn the detection loop. It ticks every `check_interval` until shutdown
/// is requested, evaluating every live execution against the three stall
/// triggers.
pub(crate) fn spawn_monitor(
    registry: Arc<Registry>,
    stats: Arc<Stats>,
    config: Arc<DetectorConfig>,
) -> MonitorHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        info!(
            interval_ms = config.check_interval.as_millis() as u64,
            "stall detection loop started"
        );

        let mut ticker = tokio::time::interval(config.check_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    sweep(&registry, &stats, &config);
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("stall detection loop stopped");
    });

    MonitorHandle {
        shutdown_tx,
        task: Some(task),
    }
}

/// One detection tick over all registered executions. Never reads process
/// streams and never awaits per execution; recovery runs on its own task.
fn sweep(registry: &Arc<Registry>, stats: &Arc<Stats>, config: &Arc<DetectorConfig>) {
    let now = Instant::now();

    for exec in registry.snapshot() {
        if !exec.supervised {
            continue;
        }

        let view = {
            let inner = exec.lock();
            DetectorView {
                state: inner.state,
                exited: inner.exited,
                recovering: inner.recovering,
                deadline: inner.deadline,
                last_output_time: inner.last_output_time,
                stall_window_start: inner.stall_window_start,
            }
        };

        let Some(reason) = detector::evaluate(&view, config, now) else {
            continue;
        };

        apply_trigger(&exec, stats, config, reason);
    }
}

/// Apply one fired trigger: transition the execution and decide what (if
/// anything) intervenes.
fn apply_trigger(
    exec: &Arc<Execution>,
    stats: &Arc<Stats>,
    config: &Arc<DetectorConfig>,
    reason: StallReason,
) {
    let auto_recover = exec
        .request
        .auto_recover
        .unwrap_or(config.enable_auto_recovery);

    enum Intervention {
        Recover,
        KillTimedOut(u32),
        None,
    }

    let (target, intervention) = {
        let mut inner = exec.lock();
        // Re-check under the lock; the waiter or a recovery task may have
        // moved the execution since the snapshot.
        if inner.exited || inner.recovering || !inner.state.is_supervisable() {
            return;
        }

        let target = reason.target_state();
        inner.state = target;
        let runtime_secs = inner
            .start_time
            .map(|s| s.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        inner
            .warnings
            .push(format!("{reason} detected after {runtime_secs:.1}s"));
        stats.record_stall_event(reason);

        let intervention = if auto_recover {
            if inner.recovery_attempts < config.max_recovery_attempts {
                inner.recovering = true;
                Intervention::Recover
            } else {
                inner.errors.push(format!(
                    "{reason} detected but recovery attempts are exhausted"
                ));
                Intervention::None
            }
        } else if reason == StallReason::AbsoluteTimeout {
            // Auto-recovery is off but the absolute timeout is still the
            // cancellation trigger: tear the process down directly.
            inner
                .warnings
                .push("auto-recovery disabled; killing timed-out process".to_string());
            match inner.pid {
                Some(pid) => Intervention::KillTimedOut(pid),
                None => Intervention::None,
            }
        } else {
            Intervention::None
        };

        (target, intervention)
    };

    warn!(
        id = exec.id,
        cmd = %exec.request.display_command(),
        %reason,
        state = %target,
        auto_recover,
        "stall trigger fired"
    );

    match intervention {
        Intervention::Recover => {
            let exec = Arc::clone(exec);
            let config = Arc::clone(config);
            let stats = Arc::clone(stats);
            tokio::spawn(async move {
                recovery::run_recovery(exec, config, stats, reason).await;
            });
        }
        #[cfg(unix)]
        Intervention::KillTimedOut(pid) => {
            if let Err(e) = recovery::send_signal(pid, nix::sys::signal::Signal::SIGKILL) {
                warn!(id = exec.id, pid, error = %e, "failed to kill timed-out process");
            }
        }
        #[cfg(not(unix))]
        Intervention::KillTimedOut(pid) => {
            debug!(id = exec.id, pid, "cannot signal on this platform");
        }
        Intervention::None => {
            debug!(id = exec.id, "no intervention for this trigger");
        }
    }
}
