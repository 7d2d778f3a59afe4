use crate::{AtlasRect, ResourceKind};
use ballpit_utils::OutOfRange;
use std::{io, path::PathBuf};
use thiserror::Error;

/// Everything that can go wrong while discovering, decoding or looking up a resource.
///
/// None of these are retried, and none of them are papered over with placeholder data.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("couldn't read `{path}`: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("couldn't decompress `{path}` (error code {code})")]
    Decompression { path: PathBuf, code: u64 },
    #[error("`{path}` is truncated or malformed: {source}")]
    MalformedData {
        path: PathBuf,
        #[source]
        source: OutOfRange,
    },
    #[error("invalid JSON in `{path}`: {detail}")]
    JsonDeserialize { path: PathBuf, detail: String },
    #[error("invalid XML in `{path}`: {detail}")]
    XmlDeserialize { path: PathBuf, detail: String },
    #[error("sprite `{id}` covers {rect:?}, which doesn't fit its {width}x{height} atlas")]
    RegionOutOfBounds {
        id: String,
        rect: AtlasRect,
        width: u32,
        height: u32,
    },
    #[error("resource `{id}` not found")]
    ResourceNotFound { id: String },
    #[error("resource `{id}` is a {found}, not a {expected}")]
    TypeMismatch {
        id: String,
        expected: ResourceKind,
        found: ResourceKind,
    },
}

impl ResourceError {
    pub(crate) fn file_open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileOpen {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, source: OutOfRange) -> Self {
        Self::MalformedData {
            path: path.into(),
            source,
        }
    }

    /// Path of the file that caused the error, if the error concerns a file at all.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::FileOpen { path, .. }
            | Self::Decompression { path, .. }
            | Self::MalformedData { path, .. }
            | Self::JsonDeserialize { path, .. }
            | Self::XmlDeserialize { path, .. } => Some(path),
            Self::RegionOutOfBounds { .. }
            | Self::ResourceNotFound { .. }
            | Self::TypeMismatch { .. } => None,
        }
    }
}
