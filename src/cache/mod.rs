//! Cache result storage backed by workers
//!
//! Lets a solver treat many workers as one content-addressable cache.
//! A saved result is a worker-qualified identity (`<worker>::<ref>`) that
//! can be resolved again after a restart.
//!
//! # Handle Ownership
//!
//! | Operation | Load mode | Released by |
//! |-----------|-----------|-------------|
//! | `load` | visible | caller |
//! | `exists` | hidden | the call itself |
//! | `load_remotes` | hidden | the call itself (scope guard) |
//!
//! # Failure Policy
//!
//! Identity, worker lookup and load failures are real errors. `exists`
//! reports every failure as `false`, and a failed export in
//! `load_remotes` yields an empty list so the caller falls back to local
//! materialization.

pub mod result;
pub mod storage;

pub use result::{CacheResult, CacheResultStorage, SolverResult};
pub use storage::WorkerCacheStorage;
