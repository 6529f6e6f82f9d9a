//! In-memory worker
//!
//! A complete [`Worker`] backed by a map of records. It keeps count of
//! open handles, loads and policy changes so callers can check that every
//! load was matched by a release. Useful in tests and for embedding a
//! local cache without a real content store.

use crate::compression::{CompressionOpt, CompressionType, ANNOTATION_ESTARGZ_TOC};
use crate::error::{WorkrefError, WorkrefResult};
use crate::identity;
use crate::remote::{Descriptor, Remote, ANNOTATION_UNCOMPRESSED};
use crate::session::Group;
use crate::worker::{ImmutableRef, Worker};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// An export call as seen by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub ref_id: String,
    pub create_if_needed: bool,
    pub compression: CompressionOpt,
    pub all: bool,
    pub group: Group,
}

#[derive(Debug)]
struct Record {
    content: Vec<u8>,
    retain: bool,
    blobs: BTreeMap<CompressionType, Descriptor>,
    export_failure: Option<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: HashMap<String, Record>,
    open_handles: usize,
    hidden_loads: usize,
    visible_loads: usize,
    retain_sets: usize,
    exports: Vec<ExportRequest>,
}

type SharedState = Arc<Mutex<MemoryState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn sha256_digest(data: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(data)))
}

/// Build the descriptor of `content` stored with `compression`
fn blob_descriptor(content: &[u8], compression: CompressionType) -> Descriptor {
    let mut tagged = compression.to_string().into_bytes();
    tagged.extend_from_slice(content);

    let mut annotations = BTreeMap::new();
    annotations.insert(ANNOTATION_UNCOMPRESSED.to_string(), sha256_digest(content));
    if compression == CompressionType::Estargz {
        annotations.insert(
            ANNOTATION_ESTARGZ_TOC.to_string(),
            sha256_digest(&[b"toc".as_slice(), content].concat()),
        );
    }

    Descriptor {
        media_type: compression.media_type().to_string(),
        digest: sha256_digest(&tagged),
        size: content.len() as u64,
        annotations,
    }
}

/// Worker whose content store lives in memory
pub struct MemoryWorker {
    id: String,
    state: SharedState,
}

impl MemoryWorker {
    /// Create an empty worker
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Arc::default(),
        }
    }

    /// Store content under `ref_id` without any exported blobs
    pub fn put(&self, ref_id: &str, content: &[u8]) -> WorkrefResult<()> {
        self.put_with_blobs(ref_id, content, &[])
    }

    /// Store content under `ref_id` with blobs already exported in the
    /// given compressions.
    ///
    /// Fails with `InvalidComponent` when `ref_id` cannot be part of a
    /// cache identity.
    pub fn put_with_blobs(
        &self,
        ref_id: &str,
        content: &[u8],
        compressions: &[CompressionType],
    ) -> WorkrefResult<()> {
        identity::validate_component("reference", ref_id)?;
        self.store(ref_id, content, compressions);
        Ok(())
    }

    /// Store content under a generated reference id
    pub fn insert(&self, content: &[u8]) -> String {
        let ref_id = Uuid::new_v4().simple().to_string();
        self.store(&ref_id, content, &[]);
        ref_id
    }

    fn store(&self, ref_id: &str, content: &[u8], compressions: &[CompressionType]) {
        let blobs = compressions
            .iter()
            .map(|ty| (*ty, blob_descriptor(content, *ty)))
            .collect();

        lock(&self.state).records.insert(
            ref_id.to_string(),
            Record {
                content: content.to_vec(),
                retain: false,
                blobs,
                export_failure: None,
            },
        );
        debug!("Stored {} in worker {}", ref_id, self.id);
    }

    /// Remove a reference. Open handles stay open but further loads and
    /// policy changes fail.
    pub fn remove(&self, ref_id: &str) -> bool {
        lock(&self.state).records.remove(ref_id).is_some()
    }

    /// Make every export of `ref_id` fail with `reason`
    pub fn fail_exports(&self, ref_id: &str, reason: impl Into<String>) {
        if let Some(record) = lock(&self.state).records.get_mut(ref_id) {
            record.export_failure = Some(reason.into());
        }
    }

    pub fn contains(&self, ref_id: &str) -> bool {
        lock(&self.state).records.contains_key(ref_id)
    }

    pub fn is_retained(&self, ref_id: &str) -> bool {
        lock(&self.state)
            .records
            .get(ref_id)
            .is_some_and(|r| r.retain)
    }

    /// Handles loaded and not yet released
    pub fn outstanding(&self) -> usize {
        lock(&self.state).open_handles
    }

    pub fn hidden_loads(&self) -> usize {
        lock(&self.state).hidden_loads
    }

    pub fn visible_loads(&self) -> usize {
        lock(&self.state).visible_loads
    }

    /// Number of times a retain policy was set
    pub fn retain_sets(&self) -> usize {
        lock(&self.state).retain_sets
    }

    /// Every export request received, oldest first
    pub fn export_requests(&self) -> Vec<ExportRequest> {
        lock(&self.state).exports.clone()
    }
}

#[async_trait]
impl Worker for MemoryWorker {
    fn id(&self) -> &str {
        &self.id
    }

    async fn load_ref(
        &self,
        ctx: &CancellationToken,
        id: &str,
        hidden: bool,
    ) -> WorkrefResult<Box<dyn ImmutableRef>> {
        if ctx.is_cancelled() {
            return Err(WorkrefError::Cancelled);
        }

        let mut state = lock(&self.state);
        if !state.records.contains_key(id) {
            return Err(WorkrefError::RefNotFound(id.to_string()));
        }

        if hidden {
            state.hidden_loads += 1;
        } else {
            state.visible_loads += 1;
        }
        state.open_handles += 1;

        Ok(Box::new(MemoryRef {
            id: id.to_string(),
            state: self.state.clone(),
            released: AtomicBool::new(false),
        }))
    }
}

/// Handle to a record of a [`MemoryWorker`]
struct MemoryRef {
    id: String,
    state: SharedState,
    released: AtomicBool,
}

#[async_trait]
impl ImmutableRef for MemoryRef {
    fn id(&self) -> &str {
        &self.id
    }

    fn release(&self) -> WorkrefResult<()> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Err(WorkrefError::RefReleased(self.id.clone()));
        }
        let mut state = lock(&self.state);
        state.open_handles = state.open_handles.saturating_sub(1);
        Ok(())
    }

    fn has_cache_policy_retain(&self) -> bool {
        lock(&self.state)
            .records
            .get(&self.id)
            .is_some_and(|r| r.retain)
    }

    async fn set_cache_policy_retain(&self) -> WorkrefResult<()> {
        let mut state = lock(&self.state);
        let record = state
            .records
            .get_mut(&self.id)
            .ok_or_else(|| WorkrefError::RefNotFound(self.id.clone()))?;
        record.retain = true;
        state.retain_sets += 1;
        Ok(())
    }

    async fn get_remotes(
        &self,
        ctx: &CancellationToken,
        create_if_needed: bool,
        compression: &CompressionOpt,
        all: bool,
        group: &Group,
    ) -> WorkrefResult<Vec<Remote>> {
        if ctx.is_cancelled() {
            return Err(WorkrefError::Cancelled);
        }

        let mut state = lock(&self.state);
        state.exports.push(ExportRequest {
            ref_id: self.id.clone(),
            create_if_needed,
            compression: *compression,
            all,
            group: group.clone(),
        });

        let record = state
            .records
            .get_mut(&self.id)
            .ok_or_else(|| WorkrefError::RefNotFound(self.id.clone()))?;
        if let Some(reason) = &record.export_failure {
            return Err(WorkrefError::Store(reason.clone()));
        }

        let wanted = compression.compression_type;
        if !record.blobs.contains_key(&wanted) {
            if !create_if_needed {
                return Err(WorkrefError::BlobMissing {
                    ref_id: self.id.clone(),
                    compression: wanted.to_string(),
                });
            }
            let desc = blob_descriptor(&record.content, wanted);
            record.blobs.insert(wanted, desc);
        }

        let mut remotes = Vec::new();
        if let Some(desc) = record.blobs.get(&wanted) {
            remotes.push(Remote::new(vec![desc.clone()]));
        }
        if all {
            remotes.extend(
                record
                    .blobs
                    .iter()
                    .filter(|(ty, _)| **ty != wanted)
                    .map(|(_, desc)| Remote::new(vec![desc.clone()])),
            );
        }
        Ok(remotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn load_counts_handles() {
        let worker = MemoryWorker::new("w1");
        worker.put("r1", b"data").unwrap();

        let visible = worker.load_ref(&ctx(), "r1", false).await.unwrap();
        let hidden = worker.load_ref(&ctx(), "r1", true).await.unwrap();
        assert_eq!(worker.outstanding(), 2);
        assert_eq!(worker.visible_loads(), 1);
        assert_eq!(worker.hidden_loads(), 1);

        visible.release().unwrap();
        hidden.release().unwrap();
        assert_eq!(worker.outstanding(), 0);
    }

    #[tokio::test]
    async fn load_missing_ref() {
        let worker = MemoryWorker::new("w1");
        let err = worker.load_ref(&ctx(), "nope", false).await.err().unwrap();
        assert!(matches!(err, WorkrefError::RefNotFound(_)));
        assert_eq!(worker.outstanding(), 0);
    }

    #[tokio::test]
    async fn load_honors_cancellation() {
        let worker = MemoryWorker::new("w1");
        worker.put("r1", b"data").unwrap();

        let token = ctx();
        token.cancel();
        let err = worker.load_ref(&token, "r1", false).await.err().unwrap();
        assert!(matches!(err, WorkrefError::Cancelled));
    }

    #[tokio::test]
    async fn double_release_fails() {
        let worker = MemoryWorker::new("w1");
        worker.put("r1", b"data").unwrap();

        let r = worker.load_ref(&ctx(), "r1", false).await.unwrap();
        r.release().unwrap();
        assert!(matches!(r.release(), Err(WorkrefError::RefReleased(_))));
        assert_eq!(worker.outstanding(), 0);
    }

    #[tokio::test]
    async fn retain_policy() {
        let worker = MemoryWorker::new("w1");
        worker.put("r1", b"data").unwrap();

        let r = worker.load_ref(&ctx(), "r1", false).await.unwrap();
        assert!(!r.has_cache_policy_retain());
        r.set_cache_policy_retain().await.unwrap();
        assert!(r.has_cache_policy_retain());
        assert!(worker.is_retained("r1"));
        assert_eq!(worker.retain_sets(), 1);

        worker.remove("r1");
        assert!(r.set_cache_policy_retain().await.is_err());
        r.release().unwrap();
    }

    #[tokio::test]
    async fn export_single_and_all() {
        let worker = MemoryWorker::new("w1");
        worker.put_with_blobs(
            "r1",
            b"data",
            &[CompressionType::Gzip, CompressionType::Zstd],
        )
        .unwrap();
        let r = worker.load_ref(&ctx(), "r1", true).await.unwrap();

        let zstd = CompressionOpt::new(CompressionType::Zstd);
        let single = r
            .get_remotes(&ctx(), false, &zstd, false, &Group::empty())
            .await
            .unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].compression(), Some(CompressionType::Zstd));

        let all = r
            .get_remotes(&ctx(), false, &zstd, true, &Group::empty())
            .await
            .unwrap();
        let kinds: Vec<_> = all.iter().map(|r| r.compression()).collect();
        assert_eq!(
            kinds,
            vec![Some(CompressionType::Zstd), Some(CompressionType::Gzip)]
        );

        assert_eq!(worker.export_requests().len(), 2);
        r.release().unwrap();
    }

    #[tokio::test]
    async fn export_missing_blob() {
        let worker = MemoryWorker::new("w1");
        worker.put("r1", b"data").unwrap();
        let r = worker.load_ref(&ctx(), "r1", true).await.unwrap();

        let err = r
            .get_remotes(&ctx(), false, &CompressionOpt::default(), false, &Group::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkrefError::BlobMissing { .. }));

        let created = r
            .get_remotes(&ctx(), true, &CompressionOpt::default(), false, &Group::empty())
            .await
            .unwrap();
        assert_eq!(created.len(), 1);
        let desc = &created[0].descriptors[0];
        assert!(desc.digest.starts_with("sha256:"));
        assert_eq!(desc.size, 4);
        assert!(desc.uncompressed_digest().is_some());
        r.release().unwrap();
    }

    #[tokio::test]
    async fn export_failure_injection() {
        let worker = MemoryWorker::new("w1");
        worker.put_with_blobs("r1", b"data", &[CompressionType::Gzip]).unwrap();
        worker.fail_exports("r1", "registry unreachable");
        let r = worker.load_ref(&ctx(), "r1", true).await.unwrap();

        let err = r
            .get_remotes(&ctx(), false, &CompressionOpt::default(), false, &Group::empty())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("registry unreachable"));
        r.release().unwrap();
    }

    #[test]
    fn insert_generates_id() {
        let worker = MemoryWorker::new("w1");
        let a = worker.insert(b"a");
        let b = worker.insert(b"b");
        assert_ne!(a, b);
        assert!(!a.contains("::"));
        assert!(worker.contains(&a));
        assert!(identity::is_valid_component(&b));
    }

    #[test]
    fn put_rejects_ambiguous_ref_id() {
        let worker = MemoryWorker::new("w1");
        for ref_id in [":b", "b:", "x::y"] {
            let err = worker.put(ref_id, b"data").unwrap_err();
            assert!(matches!(err, WorkrefError::InvalidComponent { kind: "reference", .. }));
            assert!(!worker.contains(ref_id));
        }

        worker.put("sha256:ab", b"data").unwrap();
        assert!(worker.contains("sha256:ab"));
    }

    #[test]
    fn blob_digests_differ_by_compression() {
        let gzip = blob_descriptor(b"data", CompressionType::Gzip);
        let zstd = blob_descriptor(b"data", CompressionType::Zstd);
        assert_ne!(gzip.digest, zstd.digest);
        assert_eq!(gzip.uncompressed_digest(), zstd.uncompressed_digest());
        assert_eq!(
            blob_descriptor(b"data", CompressionType::Estargz).compression(),
            Some(CompressionType::Estargz)
        );
    }
}
