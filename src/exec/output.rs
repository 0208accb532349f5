// src/exec/output.rs

//! Output monitor: per-stream reader tasks.
//!
//! Each supervised process gets its own stdout/stderr readers so that a
//! slow or stalled child can never block the detection tick. Readers append
//! lines to the execution's buffers and bump its last-output timestamp;
//! they never touch `state`. Both streams are always drained so OS pipe
//! buffers cannot fill up and wedge the child.

use std::time::Instant;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::execution::Execution;
use std::sync::Arc;

/// Spawn reader tasks for whichever streams the child exposes. The returned
/// handles complete at EOF; the waiter awaits them before finalizing so the
/// caller always sees fully drained buffers.
pub(crate) fn spawn_readers(
    exec: &Arc<Execution>,
    generation: u32,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    if let Some(stdout) = stdout {
        let exec = Arc::clone(exec);
        handles.push(tokio::spawn(async move {
            let reader = BufReader::new(stdout);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(id = exec.id, "stdout: {}", line);
                exec.note_output(line, false, Instant::now(), generation);
            }
        }));
    }

    if let Some(stderr) = stderr {
        let exec = Arc::clone(exec);
        handles.push(tokio::spawn(async move {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(id = exec.id, "stderr: {}", line);
                exec.note_output(line, true, Instant::now(), generation);
            }
        }));
    }

    handles
}
