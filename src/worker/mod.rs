//! Worker abstraction
//!
//! Workers own a content store of immutable references. This crate only
//! needs three things from them: loading a reference by id, changing the
//! retain policy of a reference, and exporting a reference as remote blobs.
//!
//! - [`Worker`]: loads references, optionally hidden
//! - [`ImmutableRef`]: a loaded handle that must be released exactly once
//! - [`WorkerRegistry`]: resolves worker ids ([`WorkerController`] is the
//!   in-process implementation)

mod controller;
pub mod memory;
mod workerref;

pub use controller::{WorkerController, WorkerRegistry};
pub use memory::MemoryWorker;
pub use workerref::{ScopedRef, WorkerRef, WorkerResult};

use crate::compression::CompressionOpt;
use crate::error::WorkrefResult;
use crate::remote::Remote;
use crate::session::Group;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// An execution backend owning its own content store
#[async_trait]
pub trait Worker: Send + Sync {
    /// Stable worker id, unique within a registry
    fn id(&self) -> &str;

    /// Load a reference by id.
    ///
    /// `hidden` loads are read-only probes that the store keeps out of its
    /// normal enumeration. The flag is passed through without interpretation.
    async fn load_ref(
        &self,
        ctx: &CancellationToken,
        id: &str,
        hidden: bool,
    ) -> WorkrefResult<Box<dyn ImmutableRef>>;
}

/// Handle to immutable content in a worker's store
///
/// Every handle returned by [`Worker::load_ref`] must be released exactly
/// once. Release is synchronous so it can run from a drop guard.
#[async_trait]
pub trait ImmutableRef: Send + Sync {
    /// Reference id inside the owning store
    fn id(&self) -> &str;

    /// Release this handle
    fn release(&self) -> WorkrefResult<()>;

    /// Whether the store keeps this reference out of garbage collection
    fn has_cache_policy_retain(&self) -> bool;

    /// Mark the reference as retained
    async fn set_cache_policy_retain(&self) -> WorkrefResult<()>;

    /// Export the reference as remote blob descriptors.
    ///
    /// The first remote matches `compression`. With `all` set, every other
    /// available variant follows. `create_if_needed` allows the store to
    /// compute missing blobs.
    async fn get_remotes(
        &self,
        ctx: &CancellationToken,
        create_if_needed: bool,
        compression: &CompressionOpt,
        all: bool,
        group: &Group,
    ) -> WorkrefResult<Vec<Remote>>;
}
