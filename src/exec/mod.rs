// src/exec/mod.rs

//! Process execution layer.
//!
//! This module owns everything that touches the child process, using
//! `tokio::process::Command`:
//!
//! - [`launcher`] spawns processes, wires their reader/waiter tasks, and
//!   settles terminal states (a missing executable becomes `Failed`/127,
//!   never a propagated error).
//! - [`output`] holds the per-stream reader tasks that feed the execution's
//!   buffers and last-output timestamp.
//! - [`recovery`] walks the escalation ladder (interrupt → terminate → kill
//!   → restart → extend-timeout → escalate) for stalled executions.

pub(crate) mod launcher;
pub(crate) mod output;
pub(crate) mod recovery;

pub use launcher::EXIT_COMMAND_NOT_FOUND;
