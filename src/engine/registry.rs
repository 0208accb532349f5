// src/engine/registry.rs

//! Execution registry: the concurrency-safe map from execution id to live
//! execution, and the admission-control point for `max_concurrent`.
//!
//! This is the only structure mutated by multiple actors (façade, monitor
//! loop, recovery tasks, statistics readers); everything inside an
//! individual execution is guarded by that execution's own lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::{Result, StallguardError};
use crate::execution::{CommandRequest, Execution};

#[derive(Debug)]
pub struct Registry {
    executions: Mutex<HashMap<u64, Arc<Execution>>>,
    next_id: AtomicU64,
    max_concurrent: usize,
}

impl Registry {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            executions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            max_concurrent,
        }
    }

    /// Admit a request: allocate an id and register the execution, or reject
    /// when the concurrency limit is already reached. Submissions beyond the
    /// limit are rejected rather than queued. `supervised` decides whether
    /// the detection loop sweeps the execution.
    pub fn admit(&self, request: CommandRequest, supervised: bool) -> Result<Arc<Execution>> {
        let mut map = self.lock();
        if map.len() >= self.max_concurrent {
            return Err(StallguardError::CapacityExceeded {
                active: map.len(),
                max: self.max_concurrent,
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let exec = Arc::new(Execution::new(id, request, supervised));
        map.insert(id, Arc::clone(&exec));
        Ok(exec)
    }

    pub fn get(&self, id: u64) -> Option<Arc<Execution>> {
        self.lock().get(&id).cloned()
    }

    /// Remove an execution once its caller has collected the final report.
    pub fn remove(&self, id: u64) -> Option<Arc<Execution>> {
        self.lock().remove(&id)
    }

    /// Snapshot of all live executions for one detection sweep.
    pub fn snapshot(&self) -> Vec<Arc<Execution>> {
        self.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Arc<Execution>>> {
        self.executions.lock().expect("registry lock poisoned")
    }
}
