//! Solver-facing cache result types

use crate::compression::CompressionOpt;
use crate::error::WorkrefResult;
use crate::remote::Remote;
use crate::session::Group;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use tokio_util::sync::CancellationToken;

/// Durable record of a saved result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheResult {
    /// Worker-qualified identity, `<worker>::<ref>`
    pub id: String,
    /// Timestamp supplied by the solver at save time
    pub created_at: DateTime<Utc>,
}

/// A result computed by the solver
///
/// The concrete system value behind a result is only known at runtime;
/// consumers check it with [`SolverResult::sys`] and a downcast.
pub trait SolverResult: Send + Sync {
    fn id(&self) -> String;

    /// Underlying system value
    fn sys(&self) -> &(dyn Any + Send + Sync);

    /// Type name of the system value, for diagnostics
    fn sys_type_name(&self) -> &'static str;

    /// Release whatever the result holds
    fn release(self: Box<Self>) -> WorkrefResult<()>;
}

/// Storage contract consumed by the solver's caching layer
#[async_trait]
pub trait CacheResultStorage: Send + Sync {
    /// Record that `result` exists and keep it from being collected
    async fn save(
        &self,
        result: &dyn SolverResult,
        created_at: DateTime<Utc>,
    ) -> WorkrefResult<CacheResult>;

    /// Materialize a saved result. The caller must release it.
    async fn load(
        &self,
        ctx: &CancellationToken,
        result: &CacheResult,
    ) -> WorkrefResult<Box<dyn SolverResult>>;

    /// Export a saved result as remote blobs, best effort.
    ///
    /// An empty list means nothing could be exported. A worker-only id
    /// (`<worker>::`) has no content and yields an empty list.
    async fn load_remotes(
        &self,
        ctx: &CancellationToken,
        result: &CacheResult,
        compression: Option<&CompressionOpt>,
        group: &Group,
    ) -> WorkrefResult<Vec<Remote>>;

    /// Whether a saved result can still be materialized
    async fn exists(&self, id: &str) -> bool;
}
