// src/lib.rs

//! `stallguard` — a process stall-detection and auto-recovery supervisor.
//!
//! The supervisor launches an external command, monitors its liveness
//! (output activity and total runtime), classifies it as stalled when the
//! configured thresholds are exceeded, and applies a tiered sequence of
//! recovery actions (interrupt → terminate → kill → restart → extend-timeout
//! → escalate) before giving up.
//!
//! ```no_run
//! use stallguard::{CommandRequest, DetectorConfig, Supervisor};
//!
//! # async fn demo() -> stallguard::errors::Result<()> {
//! let supervisor = Supervisor::new(DetectorConfig::default());
//!
//! let report = supervisor
//!     .execute(CommandRequest::new(["echo", "hi"]))
//!     .await?;
//! assert!(report.succeeded());
//! assert_eq!(report.return_code, Some(0));
//!
//! supervisor.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! Architecture, in one pass: the [`Supervisor`] façade validates a request
//! and registers an execution; the launcher (`exec::launcher`) spawns the
//! child with captured stdio; per-stream reader tasks feed the execution's
//! buffers and last-output timestamp; one background monitor task ticks the
//! pure trigger evaluator (`engine::detector`) for every live execution; on
//! a stall or timeout, the recovery controller (`exec::recovery`) walks the
//! request's escalation ladder. The caller suspends until a terminal state
//! and gets the full [`ExecutionReport`] back, errors included — one
//! execution's failure never interrupts supervision of the others.

pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod execution;
pub mod logging;
pub mod supervisor;
pub mod types;

pub use config::{DetectorConfig, RawDetectorConfig};
pub use engine::{Registry, Stats, StatsSnapshot};
pub use errors::{Result, StallguardError};
pub use execution::{CommandRequest, Execution, ExecutionReport, ExecutionStatus};
pub use supervisor::{verify_environment, EnvironmentReport, Supervisor};
pub use types::{ExecutionState, RecoveryAction, StallReason};
