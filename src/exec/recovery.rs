// src/exec/recovery.rs

//! Recovery controller.
//!
//! Given a stalled or timed-out execution and the reason, walks the
//! request's ordered recovery actions with a fixed delay between attempts,
//! up to the lifetime attempt cap. Each action is a closed-enum variant with
//! one handler returning a success flag and a human-readable outcome string;
//! every attempt, successful or not, is appended to the execution's
//! `recovery_history` as `action:reason:outcome`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::DetectorConfig;
use crate::engine::stats::Stats;
use crate::exec::launcher;
use crate::execution::Execution;
use crate::types::{ExecutionState, RecoveryAction, StallReason};

/// Grace period after SIGINT before the action is judged.
const INTERRUPT_GRACE: Duration = Duration::from_secs(2);
/// Bounded wait after SIGTERM.
const TERMINATE_WAIT: Duration = Duration::from_secs(3);
/// Brief wait after SIGKILL; can still time out under severe load.
const KILL_WAIT: Duration = Duration::from_secs(2);

/// Deliver a signal to a pid without holding the child handle (the waiter
/// task owns that). ESRCH means the process is already gone, which the
/// subsequent exit wait confirms.
#[cfg(unix)]
pub(crate) fn send_signal(pid: u32, signal: nix::sys::signal::Signal) -> Result<(), String> {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(format!("kill({pid}, {signal}) failed: {e}")),
    }
}

#[cfg(not(unix))]
pub(crate) fn send_signal(_pid: u32, _signal: ()) -> Result<(), String> {
    Err("signal delivery is not supported on this platform".to_string())
}

/// Run one recovery sequence for a stall event. Spawned by the monitor loop
/// with the execution's `recovering` flag already set; exactly one sequence
/// runs per execution at a time.
pub(crate) async fn run_recovery(
    exec: Arc<Execution>,
    config: Arc<DetectorConfig>,
    stats: Arc<Stats>,
    reason: StallReason,
) {
    let actions = exec.request.recovery_actions.clone();
    info!(
        id = exec.id,
        %reason,
        actions = ?actions,
        "starting recovery sequence"
    );

    let mut capped = false;

    for (idx, action) in actions.iter().enumerate() {
        {
            let mut inner = exec.lock();
            if inner.recovery_attempts >= config.max_recovery_attempts {
                inner.errors.push(format!(
                    "recovery attempt cap reached ({}) while handling {reason}",
                    config.max_recovery_attempts
                ));
                capped = true;
                break;
            }
            inner.recovery_attempts += 1;
        }

        info!(id = exec.id, action = %action, %reason, "attempting recovery action");

        let (ok, outcome) = apply_action(*action, &exec, &config, &stats, reason).await;

        {
            let mut inner = exec.lock();
            inner
                .recovery_history
                .push(format!("{action}:{reason}:{outcome}"));
        }

        if ok {
            info!(id = exec.id, action = %action, outcome = %outcome, "recovery succeeded");
            conclude_success(&exec, &stats);
            return;
        }

        warn!(id = exec.id, action = %action, outcome = %outcome, "recovery action failed");

        if idx + 1 < actions.len() {
            sleep(config.recovery_delay).await;
        }
    }

    conclude_exhausted(&exec, &stats, reason, capped, actions.len());
}

/// First action succeeded: the execution is `Recovered`. If the process is
/// still alive (extend-timeout, restart) the activity windows start fresh so
/// detection resumes cleanly; a later stall event may open a new sequence,
/// still bounded by the lifetime cap.
fn conclude_success(exec: &Arc<Execution>, stats: &Arc<Stats>) {
    let finalize_now = {
        let mut inner = exec.lock();
        inner.recovered = true;
        inner.state = ExecutionState::Recovered;
        inner.recovering = false;
        if !inner.exited {
            let now = Instant::now();
            inner.last_output_time = Some(now);
            inner.stall_window_start = Some(now);
        }
        inner.exited && !inner.finalized
    };

    if finalize_now {
        launcher::finalize(exec, stats);
    }
}

/// Every configured action failed (or the cap cut the sequence short). The
/// exhaustion is recorded on the execution; no further recovery runs for
/// this stall event.
fn conclude_exhausted(
    exec: &Arc<Execution>,
    stats: &Arc<Stats>,
    reason: StallReason,
    capped: bool,
    attempted: usize,
) {
    let finalize_now = {
        let mut inner = exec.lock();
        if !capped {
            inner.errors.push(format!(
                "recovery exhausted: all {attempted} action(s) failed for {reason}"
            ));
        }
        inner.recovering = false;
        inner.exited && !inner.finalized
    };

    error!(
        id = exec.id,
        %reason,
        capped,
        "recovery sequence exhausted without success"
    );

    if finalize_now {
        launcher::finalize(exec, stats);
    }
}

async fn apply_action(
    action: RecoveryAction,
    exec: &Arc<Execution>,
    config: &Arc<DetectorConfig>,
    stats: &Arc<Stats>,
    reason: StallReason,
) -> (bool, String) {
    match action {
        #[cfg(unix)]
        RecoveryAction::Interrupt => {
            signal_and_wait(exec, nix::sys::signal::Signal::SIGINT, INTERRUPT_GRACE).await
        }
        #[cfg(unix)]
        RecoveryAction::Terminate => {
            signal_and_wait(exec, nix::sys::signal::Signal::SIGTERM, TERMINATE_WAIT).await
        }
        #[cfg(unix)]
        RecoveryAction::Kill => {
            signal_and_wait(exec, nix::sys::signal::Signal::SIGKILL, KILL_WAIT).await
        }
        #[cfg(not(unix))]
        RecoveryAction::Interrupt | RecoveryAction::Terminate | RecoveryAction::Kill => (
            false,
            "signal delivery is not supported on this platform".to_string(),
        ),
        RecoveryAction::Restart => restart(exec, stats).await,
        RecoveryAction::ExtendTimeout => extend_timeout(exec, config),
        RecoveryAction::Escalate => escalate(exec, reason),
    }
}

#[cfg(unix)]
async fn signal_and_wait(
    exec: &Arc<Execution>,
    signal: nix::sys::signal::Signal,
    grace: Duration,
) -> (bool, String) {
    let (pid, exited) = {
        let inner = exec.lock();
        (inner.pid, inner.exited)
    };

    if exited {
        return (true, "process already exited".to_string());
    }
    let Some(pid) = pid else {
        return (false, "no process handle".to_string());
    };

    if let Err(e) = send_signal(pid, signal) {
        return (false, e);
    }
    debug!(id = exec.id, pid, %signal, "signal sent");

    if exec.wait_exited(grace).await {
        (true, format!("process exited after {signal}"))
    } else {
        (
            false,
            format!(
                "process survived {signal} for {:.1}s",
                grace.as_secs_f64()
            ),
        )
    }
}

/// Kill the current process and relaunch the same request. A successfully
/// spawned replacement counts as success; it starts a fresh output-silence
/// window (handled by the launcher's `mark_running`).
async fn restart(exec: &Arc<Execution>, stats: &Arc<Stats>) -> (bool, String) {
    #[cfg(unix)]
    {
        let pid = exec.lock().pid;
        if let Some(pid) = pid {
            if let Err(e) = send_signal(pid, nix::sys::signal::Signal::SIGKILL) {
                return (false, format!("could not kill old process: {e}"));
            }
            if !exec.wait_exited(KILL_WAIT).await {
                warn!(
                    id = exec.id,
                    pid, "old process did not confirm exit before restart"
                );
            }
        }
    }

    {
        let mut inner = exec.lock();
        inner
            .warnings
            .push("process restarted; subsequent output is from the replacement".to_string());
    }

    match launcher::respawn(exec, stats) {
        Ok(()) => (true, "restarted with a fresh process".to_string()),
        Err(e) => (false, format!("restart spawn failed: {e:#}")),
    }
}

/// Push the absolute deadline out by the configured multiplier without
/// touching the process.
fn extend_timeout(exec: &Arc<Execution>, config: &Arc<DetectorConfig>) -> (bool, String) {
    let mut inner = exec.lock();
    let now = Instant::now();

    let (Some(deadline), Some(base)) = (inner.deadline, exec.request.timeout) else {
        return (true, "no absolute timeout set; nothing to extend".to_string());
    };

    let remaining = deadline.saturating_duration_since(now);
    let extension = if remaining.is_zero() {
        // Deadline already passed; grant the multiplier's share of the
        // original budget as fresh headroom.
        base.mul_f64(config.timeout_multiplier - 1.0)
    } else {
        remaining.mul_f64(config.timeout_multiplier)
    };

    inner.deadline = Some(now + extension);
    (
        true,
        format!("deadline extended by {:.1}s", extension.as_secs_f64()),
    )
}

/// No corrective action: surface a loud, structured diagnostic for operator
/// attention and report failure so the next action (if any) still runs.
fn escalate(exec: &Arc<Execution>, reason: StallReason) -> (bool, String) {
    let (runtime_secs, attempts) = {
        let inner = exec.lock();
        let runtime = inner
            .start_time
            .map(|s| s.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        (runtime, inner.recovery_attempts)
    };

    error!(
        id = exec.id,
        cmd = %exec.request.display_command(),
        %reason,
        runtime_secs,
        attempts,
        critical = exec.request.critical,
        "ESCALATION: execution requires operator attention"
    );

    (false, "escalated for operator attention".to_string())
}
