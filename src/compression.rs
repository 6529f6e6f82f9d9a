//! Blob compression selection for remote export

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Media type of an uncompressed OCI layer
pub const MEDIA_TYPE_LAYER: &str = "application/vnd.oci.image.layer.v1.tar";
/// Media type of a gzip-compressed OCI layer (also used for estargz)
pub const MEDIA_TYPE_LAYER_GZIP: &str = "application/vnd.oci.image.layer.v1.tar+gzip";
/// Media type of a zstd-compressed OCI layer
pub const MEDIA_TYPE_LAYER_ZSTD: &str = "application/vnd.oci.image.layer.v1.tar+zstd";

/// Annotation marking a gzip blob as seekable estargz
pub const ANNOTATION_ESTARGZ_TOC: &str = "containerd.io/snapshot/stargz/toc.digest";

/// Compression algorithm of an exported blob
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    Uncompressed,
    /// Used when the caller expresses no preference
    #[default]
    Gzip,
    Estargz,
    Zstd,
}

impl CompressionType {
    /// All compression types in export preference order
    pub fn all() -> &'static [Self] {
        &[Self::Uncompressed, Self::Gzip, Self::Estargz, Self::Zstd]
    }

    /// OCI media type of a layer blob in this compression
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Uncompressed => MEDIA_TYPE_LAYER,
            Self::Gzip | Self::Estargz => MEDIA_TYPE_LAYER_GZIP,
            Self::Zstd => MEDIA_TYPE_LAYER_ZSTD,
        }
    }

    /// Best guess from a media type. Estargz is indistinguishable from gzip
    /// by media type alone and needs the TOC annotation.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            MEDIA_TYPE_LAYER => Some(Self::Uncompressed),
            MEDIA_TYPE_LAYER_GZIP => Some(Self::Gzip),
            MEDIA_TYPE_LAYER_ZSTD => Some(Self::Zstd),
            _ => None,
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uncompressed => "uncompressed",
            Self::Gzip => "gzip",
            Self::Estargz => "estargz",
            Self::Zstd => "zstd",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for CompressionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uncompressed" => Ok(Self::Uncompressed),
            "gzip" => Ok(Self::Gzip),
            "estargz" => Ok(Self::Estargz),
            "zstd" => Ok(Self::Zstd),
            other => Err(format!("unknown compression type: {}", other)),
        }
    }
}

/// Caller preference for the blob representation to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompressionOpt {
    pub compression_type: CompressionType,
}

impl CompressionOpt {
    pub fn new(compression_type: CompressionType) -> Self {
        Self { compression_type }
    }
}
