//! Session groups
//!
//! A group scopes blob export to the client sessions that may supply
//! credentials for it. Workers and references receive it unchanged.

use serde::{Deserialize, Serialize};

/// Opaque set of client session ids forwarded to workers during export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    session_ids: Vec<String>,
}

impl Group {
    pub fn new(session_ids: Vec<String>) -> Self {
        Self { session_ids }
    }

    /// Group with no sessions attached
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn session_ids(&self) -> &[String] {
        &self.session_ids
    }

    pub fn is_empty(&self) -> bool {
        self.session_ids.is_empty()
    }
}

impl FromIterator<String> for Group {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
