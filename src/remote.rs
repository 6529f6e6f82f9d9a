//! Portable descriptions of exported blobs

use crate::compression::{CompressionType, ANNOTATION_ESTARGZ_TOC};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annotation carrying the digest of the uncompressed content
pub const ANNOTATION_UNCOMPRESSED: &str = "containerd.io/uncompressed";

/// One blob of an exported reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// OCI media type of the blob
    pub media_type: String,
    /// Content digest (`sha256:<hex>`)
    pub digest: String,
    /// Blob size in bytes
    pub size: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Descriptor {
    /// Compression of this blob, derived from media type and annotations
    pub fn compression(&self) -> Option<CompressionType> {
        match CompressionType::from_media_type(&self.media_type)? {
            CompressionType::Gzip if self.annotations.contains_key(ANNOTATION_ESTARGZ_TOC) => {
                Some(CompressionType::Estargz)
            }
            other => Some(other),
        }
    }

    /// Digest of the uncompressed content, if recorded
    pub fn uncompressed_digest(&self) -> Option<&str> {
        self.annotations.get(ANNOTATION_UNCOMPRESSED).map(String::as_str)
    }
}

/// One exportable representation of a reference: its blob chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub descriptors: Vec<Descriptor>,
}

impl Remote {
    pub fn new(descriptors: Vec<Descriptor>) -> Self {
        Self { descriptors }
    }

    /// Compression of the topmost blob
    pub fn compression(&self) -> Option<CompressionType> {
        self.descriptors.last().and_then(Descriptor::compression)
    }
}
