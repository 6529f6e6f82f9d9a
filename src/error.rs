//! Error types for workref
//!
//! All modules use `WorkrefResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for workref operations
pub type WorkrefResult<T> = Result<T, WorkrefError>;

/// All errors that can occur in workref
#[derive(Error, Debug)]
pub enum WorkrefError {
    // Identity errors
    #[error("invalid workerref id: {id}")]
    MalformedIdentity { id: String },

    #[error("invalid {kind} id {value:?}: must not contain '::' or begin or end with ':'")]
    InvalidComponent { kind: &'static str, value: String },

    // Registry errors
    #[error("worker {0} not found")]
    UnknownWorker(String),

    #[error("worker {0} is already registered")]
    DuplicateWorker(String),

    // Storage errors
    #[error("invalid result: {0}")]
    InvalidResultType(String),

    #[error("failed to load reference {ref_id}: {source}")]
    ReferenceLoadFailed {
        ref_id: String,
        #[source]
        source: Box<WorkrefError>,
    },

    #[error("failed to set retain policy on {ref_id}: {source}")]
    RetainPolicyFailed {
        ref_id: String,
        #[source]
        source: Box<WorkrefError>,
    },

    #[error("failed to export remotes for {ref_id}: {source}")]
    ExportFailed {
        ref_id: String,
        #[source]
        source: Box<WorkrefError>,
    },

    // Content store errors reported by workers
    #[error("reference not found: {0}")]
    RefNotFound(String),

    #[error("reference already released: {0}")]
    RefReleased(String),

    #[error("no {compression} blob for {ref_id}")]
    BlobMissing { ref_id: String, compression: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("content store error: {0}")]
    Store(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkrefError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a malformed identity error
    pub fn malformed(id: impl Into<String>) -> Self {
        Self::MalformedIdentity { id: id.into() }
    }

    /// Wrap a worker failure raised while materializing a reference
    pub fn reference_load(ref_id: impl Into<String>, source: WorkrefError) -> Self {
        Self::ReferenceLoadFailed {
            ref_id: ref_id.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a store failure raised while marking a reference as retained
    pub fn retain_policy(ref_id: impl Into<String>, source: WorkrefError) -> Self {
        Self::RetainPolicyFailed {
            ref_id: ref_id.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a failure raised while exporting remote blobs
    pub fn export(ref_id: impl Into<String>, source: WorkrefError) -> Self {
        Self::ExportFailed {
            ref_id: ref_id.into(),
            source: Box::new(source),
        }
    }

    /// Check if the error means the cache entry is unusable and the
    /// result has to be recomputed
    pub fn is_cache_miss(&self) -> bool {
        matches!(
            self,
            Self::MalformedIdentity { .. }
                | Self::UnknownWorker(_)
                | Self::ReferenceLoadFailed { .. }
                | Self::RefNotFound(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MalformedIdentity { .. } => {
                Some("Identities have the form <worker>::<ref>, with exactly one '::'")
            }
            Self::InvalidComponent { .. } => {
                Some("Pick an id without '::' and without a colon at either end")
            }
            Self::UnknownWorker(_) => Some("Check that the worker is registered with the controller"),
            Self::ConfigInvalid { .. } => Some("Run: workref config init --force"),
            _ => None,
        }
    }
}
