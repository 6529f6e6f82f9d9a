//! Worker references
//!
//! A [`WorkerRef`] pairs a loaded reference with the worker that owns it.
//! That pairing is what solvers see as a computed artifact.

use crate::cache::SolverResult;
use crate::compression::CompressionOpt;
use crate::error::WorkrefResult;
use crate::identity;
use crate::remote::Remote;
use crate::session::Group;
use crate::worker::{ImmutableRef, Worker};
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// A loaded reference and its owning worker
///
/// The reference is `None` for worker-only results that carry no content.
/// Releasing consumes the wrapper, so a released handle cannot be reused.
pub struct WorkerRef {
    immutable_ref: Option<Box<dyn ImmutableRef>>,
    worker: Arc<dyn Worker>,
}

impl WorkerRef {
    pub fn new(immutable_ref: Option<Box<dyn ImmutableRef>>, worker: Arc<dyn Worker>) -> Self {
        Self {
            immutable_ref,
            worker,
        }
    }

    /// Cache identity of this reference: `<worker>::<ref>`
    pub fn id(&self) -> String {
        let ref_id = self.immutable_ref.as_ref().map(|r| r.id()).unwrap_or("");
        identity::encode(self.worker.id(), ref_id)
    }

    pub fn immutable_ref(&self) -> Option<&dyn ImmutableRef> {
        self.immutable_ref.as_deref()
    }

    pub fn worker(&self) -> &Arc<dyn Worker> {
        &self.worker
    }

    /// Export the reference as remote descriptors.
    ///
    /// A worker-only reference has nothing to export.
    pub async fn get_remotes(
        &self,
        ctx: &CancellationToken,
        create_if_needed: bool,
        compression: &CompressionOpt,
        all: bool,
        group: &Group,
    ) -> WorkrefResult<Vec<Remote>> {
        match &self.immutable_ref {
            Some(r) => {
                r.get_remotes(ctx, create_if_needed, compression, all, group)
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    /// Release the underlying reference
    pub fn release(self) -> WorkrefResult<()> {
        match self.immutable_ref {
            Some(r) => r.release(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for WorkerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRef").field("id", &self.id()).finish()
    }
}

/// A reference loaded for the duration of a single call.
///
/// Released when dropped, on every exit path.
pub struct ScopedRef(WorkerRef);

impl ScopedRef {
    pub fn new(wref: WorkerRef) -> Self {
        Self(wref)
    }
}

impl Deref for ScopedRef {
    type Target = WorkerRef;

    fn deref(&self) -> &WorkerRef {
        &self.0
    }
}

impl Drop for ScopedRef {
    fn drop(&mut self) {
        if let Some(r) = self.0.immutable_ref.take() {
            if let Err(e) = r.release() {
                let id = identity::encode(self.0.worker.id(), r.id());
                warn!("Failed to release {}: {}", id, e);
            }
        }
    }
}

/// Solver-facing result backed by a [`WorkerRef`]
///
/// The holder owns the reference and must call
/// [`SolverResult::release`] when done.
#[derive(Debug)]
pub struct WorkerResult {
    wref: WorkerRef,
}

impl WorkerResult {
    pub fn new(wref: WorkerRef) -> Self {
        Self { wref }
    }

    pub fn worker_ref(&self) -> &WorkerRef {
        &self.wref
    }
}

impl SolverResult for WorkerResult {
    fn id(&self) -> String {
        self.wref.id()
    }

    fn sys(&self) -> &(dyn Any + Send + Sync) {
        &self.wref
    }

    fn sys_type_name(&self) -> &'static str {
        std::any::type_name::<WorkerRef>()
    }

    fn release(self: Box<Self>) -> WorkrefResult<()> {
        self.wref.release()
    }
}
