//! workref - worker-qualified cache result storage
//!
//! Lets a build-graph solver treat a fleet of workers as one
//! content-addressable cache: save a computed result as a durable
//! identity, load it back, probe for it, and export it as remote blobs.

pub mod cache;
pub mod cli;
pub mod compression;
pub mod config;
pub mod error;
pub mod identity;
pub mod remote;
pub mod session;
pub mod worker;

pub use cache::{CacheResult, CacheResultStorage, SolverResult, WorkerCacheStorage};
pub use error::{WorkrefError, WorkrefResult};
