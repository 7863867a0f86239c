use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The subject under test.
///
/// Pulling and unpacking the image happens before an `ImageReference` exists;
/// checks only ever read from `image_fs_path`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageReference {
    pub image_uri: String,
    pub image_fs_path: PathBuf,
    pub image_info: Option<ImageInfo>,
}

/// Structured image metadata, when the caller has it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageInfo {
    pub config_digest: Option<String>,
    pub architecture: Option<String>,
    pub labels: BTreeMap<String, String>,
    /// Layer digests, base layer first.
    pub layers: Vec<String>,
}

impl ImageReference {
    pub fn new(image_uri: impl Into<String>, image_fs_path: impl Into<PathBuf>) -> Self {
        Self {
            image_uri: image_uri.into(),
            image_fs_path: image_fs_path.into(),
            image_info: None,
        }
    }

    pub fn with_info(mut self, info: ImageInfo) -> Self {
        self.image_info = Some(info);
        self
    }

    pub fn fs_path(&self) -> &Path {
        &self.image_fs_path
    }

    /// Digest the image URI is pinned to, if any.
    pub fn digest(&self) -> Option<&str> {
        digest_of(&self.image_uri)
    }
}

/// Extracts the `sha256:` digest from a `repo@sha256:...` pull spec.
///
/// Tag-only references have no digest and yield `None`.
pub fn digest_of(reference: &str) -> Option<&str> {
    let (_, digest) = reference.rsplit_once('@')?;
    let hex = digest.strip_prefix("sha256:")?;
    if hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(digest)
    } else {
        None
    }
}
