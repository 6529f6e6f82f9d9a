//! Worker-qualified cache identities
//!
//! A cache identity is the single string a solver persists to find a
//! computed result again: `<worker id>::<ref id>`. A worker-only entry
//! (no content) keeps the separator and leaves the ref part empty.

use crate::error::{WorkrefError, WorkrefResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between the worker id and the reference id
pub const SEPARATOR: &str = "::";

/// Whether `value` can be used as one side of a cache identity.
///
/// A component must not contain [`SEPARATOR`] nor begin or end with `:`.
/// Otherwise `"a:" + "b"` and `"a" + ":b"` would both encode to `a:::b`.
pub fn is_valid_component(value: &str) -> bool {
    !value.contains(SEPARATOR) && !value.starts_with(':') && !value.ends_with(':')
}

/// Check a worker or reference id before it is handed out.
///
/// `kind` names the component in the error (`"worker"` or `"reference"`).
pub fn validate_component(kind: &'static str, value: &str) -> WorkrefResult<()> {
    if is_valid_component(value) {
        Ok(())
    } else {
        Err(WorkrefError::InvalidComponent {
            kind,
            value: value.to_string(),
        })
    }
}

/// Encode a worker id and reference id into a cache identity.
///
/// Both components must pass [`validate_component`]. Workers and the
/// controller enforce that when ids are created, so encoding never fails.
pub fn encode(worker_id: &str, ref_id: &str) -> String {
    format!("{}{}{}", worker_id, SEPARATOR, ref_id)
}

/// Split a cache identity into `(worker_id, ref_id)`.
///
/// Fails unless the identity contains exactly one separator and both parts
/// are valid components. Whether the worker or the reference exist is not
/// checked here.
pub fn decode(id: &str) -> WorkrefResult<(&str, &str)> {
    let mut parts = id.split(SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(worker_id), Some(ref_id), None)
            if is_valid_component(worker_id) && is_valid_component(ref_id) =>
        {
            Ok((worker_id, ref_id))
        }
        _ => Err(WorkrefError::malformed(id)),
    }
}

/// Owned, typed form of a cache identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerRefId {
    /// Worker that owns the reference
    pub worker_id: String,
    /// Reference id inside the worker's store (empty for worker-only entries)
    pub ref_id: String,
}

impl WorkerRefId {
    pub fn new(worker_id: impl Into<String>, ref_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ref_id: ref_id.into(),
        }
    }

    /// Whether this identity names a worker only, without content
    pub fn is_contentless(&self) -> bool {
        self.ref_id.is_empty()
    }
}

impl fmt::Display for WorkerRefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.worker_id, SEPARATOR, self.ref_id)
    }
}

impl FromStr for WorkerRefId {
    type Err = WorkrefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (worker_id, ref_id) = decode(s)?;
        Ok(Self::new(worker_id, ref_id))
    }
}
