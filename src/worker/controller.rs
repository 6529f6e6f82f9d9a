//! Worker registry
//!
//! Resolves worker ids to live workers. The storage layer holds a registry
//! injected at construction and never reaches for global state.

use crate::error::{WorkrefError, WorkrefResult};
use crate::identity;
use crate::worker::Worker;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Resolves a worker id to a live worker
pub trait WorkerRegistry: Send + Sync {
    /// Get a worker by id, failing with `UnknownWorker` when not registered
    fn get(&self, worker_id: &str) -> WorkrefResult<Arc<dyn Worker>>;
}

/// In-process worker registry
///
/// Workers are kept in registration order; the first one is the default.
#[derive(Default)]
pub struct WorkerController {
    workers: RwLock<Vec<Arc<dyn Worker>>>,
}

impl WorkerController {
    /// Create an empty controller
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker.
    ///
    /// The worker id must be usable as the first half of a cache identity.
    pub fn add(&self, worker: Arc<dyn Worker>) -> WorkrefResult<()> {
        identity::validate_component("worker", worker.id())?;

        let mut workers = self
            .workers
            .write()
            .map_err(|_| WorkrefError::Internal("worker registry lock poisoned".to_string()))?;

        if workers.iter().any(|w| w.id() == worker.id()) {
            return Err(WorkrefError::DuplicateWorker(worker.id().to_string()));
        }

        info!("Registered worker {}", worker.id());
        workers.push(worker);
        Ok(())
    }

    /// Unregister a worker, returning it if it was present
    pub fn remove(&self, worker_id: &str) -> WorkrefResult<Option<Arc<dyn Worker>>> {
        let mut workers = self
            .workers
            .write()
            .map_err(|_| WorkrefError::Internal("worker registry lock poisoned".to_string()))?;

        let removed = workers
            .iter()
            .position(|w| w.id() == worker_id)
            .map(|idx| workers.remove(idx));
        if removed.is_some() {
            info!("Removed worker {}", worker_id);
        }
        Ok(removed)
    }

    /// All registered workers in registration order
    pub fn list(&self) -> WorkrefResult<Vec<Arc<dyn Worker>>> {
        let workers = self
            .workers
            .read()
            .map_err(|_| WorkrefError::Internal("worker registry lock poisoned".to_string()))?;
        Ok(workers.clone())
    }

    /// The first registered worker
    pub fn get_default(&self) -> WorkrefResult<Arc<dyn Worker>> {
        self.list()?
            .into_iter()
            .next()
            .ok_or_else(|| WorkrefError::Internal("no default worker available".to_string()))
    }
}

impl WorkerRegistry for WorkerController {
    fn get(&self, worker_id: &str) -> WorkrefResult<Arc<dyn Worker>> {
        let workers = self
            .workers
            .read()
            .map_err(|_| WorkrefError::Internal("worker registry lock poisoned".to_string()))?;

        let worker = workers.iter().find(|w| w.id() == worker_id).cloned();
        match worker {
            Some(worker) => Ok(worker),
            None => {
                debug!("Worker lookup failed: {}", worker_id);
                Err(WorkrefError::UnknownWorker(worker_id.to_string()))
            }
        }
    }
}
