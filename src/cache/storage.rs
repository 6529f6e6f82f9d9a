//! Worker-backed implementation of [`CacheResultStorage`]

use crate::cache::result::{CacheResult, CacheResultStorage, SolverResult};
use crate::compression::{CompressionOpt, CompressionType};
use crate::config::schema::CacheConfig;
use crate::error::{WorkrefError, WorkrefResult};
use crate::identity;
use crate::remote::Remote;
use crate::session::Group;
use crate::worker::{ScopedRef, Worker, WorkerRef, WorkerResult, WorkerRegistry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Cache result storage that resolves identities through a worker registry
pub struct WorkerCacheStorage {
    registry: Arc<dyn WorkerRegistry>,
    default_compression: CompressionType,
}

impl WorkerCacheStorage {
    /// Create a storage exporting with the default compression when the
    /// caller has no preference
    pub fn new(registry: Arc<dyn WorkerRegistry>) -> Self {
        Self {
            registry,
            default_compression: CompressionType::default(),
        }
    }

    /// Create a storage using the configured default compression
    pub fn from_config(registry: Arc<dyn WorkerRegistry>, config: &CacheConfig) -> Self {
        Self {
            registry,
            default_compression: config.default_compression,
        }
    }

    pub fn default_compression(&self) -> CompressionType {
        self.default_compression
    }

    /// Decode `id` and resolve its worker
    fn resolve<'a>(&self, id: &'a str) -> WorkrefResult<(Arc<dyn Worker>, &'a str)> {
        let (worker_id, ref_id) = identity::decode(id)?;
        let worker = self.registry.get(worker_id)?;
        Ok((worker, ref_id))
    }

    async fn load_worker_ref(
        &self,
        ctx: &CancellationToken,
        id: &str,
        hidden: bool,
    ) -> WorkrefResult<WorkerRef> {
        let (worker, ref_id) = self.resolve(id)?;
        if ref_id.is_empty() {
            return Ok(WorkerRef::new(None, worker));
        }

        let immutable_ref = worker
            .load_ref(ctx, ref_id, hidden)
            .await
            .map_err(|e| WorkrefError::reference_load(ref_id, e))?;
        Ok(WorkerRef::new(Some(immutable_ref), worker))
    }
}

#[async_trait]
impl CacheResultStorage for WorkerCacheStorage {
    async fn save(
        &self,
        result: &dyn SolverResult,
        created_at: DateTime<Utc>,
    ) -> WorkrefResult<CacheResult> {
        let wref = result
            .sys()
            .downcast_ref::<WorkerRef>()
            .ok_or_else(|| WorkrefError::InvalidResultType(result.sys_type_name().to_string()))?;

        if let Some(immutable_ref) = wref.immutable_ref() {
            if !immutable_ref.has_cache_policy_retain() {
                immutable_ref
                    .set_cache_policy_retain()
                    .await
                    .map_err(|e| WorkrefError::retain_policy(immutable_ref.id(), e))?;
                debug!("Set retain policy on {}", wref.id());
            }
        }

        Ok(CacheResult {
            id: wref.id(),
            created_at,
        })
    }

    async fn load(
        &self,
        ctx: &CancellationToken,
        result: &CacheResult,
    ) -> WorkrefResult<Box<dyn SolverResult>> {
        let wref = self.load_worker_ref(ctx, &result.id, false).await?;
        debug!("Loaded cache result {}", result.id);
        Ok(Box::new(WorkerResult::new(wref)))
    }

    async fn load_remotes(
        &self,
        ctx: &CancellationToken,
        result: &CacheResult,
        compression: Option<&CompressionOpt>,
        group: &Group,
    ) -> WorkrefResult<Vec<Remote>> {
        let (worker, ref_id) = self.resolve(&result.id)?;
        if ref_id.is_empty() {
            debug!("Cache result {} has no content to export", result.id);
            return Ok(Vec::new());
        }

        let immutable_ref = worker
            .load_ref(ctx, ref_id, true)
            .await
            .map_err(|e| WorkrefError::reference_load(ref_id, e))?;
        let wref = ScopedRef::new(WorkerRef::new(Some(immutable_ref), worker));

        // An explicit preference asks for every variant, the default only
        // for the best single match.
        let (compression, all) = match compression {
            Some(opt) => (*opt, true),
            None => (CompressionOpt::new(self.default_compression), false),
        };

        match wref.get_remotes(ctx, false, &compression, all, group).await {
            Ok(remotes) => Ok(remotes),
            Err(e) => {
                let err = WorkrefError::export(ref_id, e);
                warn!("Ignoring remote export failure for {}: {}", result.id, err);
                Ok(Vec::new())
            }
        }
    }

    async fn exists(&self, id: &str) -> bool {
        let ctx = CancellationToken::new();
        match self.load_worker_ref(&ctx, id, true).await {
            Ok(wref) => {
                if let Err(e) = wref.release() {
                    warn!("Failed to release probe of {}: {}", id, e);
                }
                true
            }
            Err(e) => {
                debug!("Cache result {} not available: {}", id, e);
                false
            }
        }
    }
}
