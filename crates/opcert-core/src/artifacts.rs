use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A file written into the artifacts directory, with a fingerprint of the
/// exact bytes written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub hash: ArtifactHash,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactHash {
    pub algorithm: String,
    pub value: String,
}

/// Fingerprint depends only on the bytes, never on filesystem metadata.
pub fn fingerprint(bytes: &[u8]) -> ArtifactHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ArtifactHash {
        algorithm: "sha256".to_string(),
        value: hex::encode(hasher.finalize()),
    }
}

/// Write `bytes` to `dir/filename`, creating `dir` if needed.
pub fn write_artifact(dir: &Path, filename: &str, bytes: &[u8]) -> io::Result<ArtifactInfo> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    std::fs::write(&path, bytes)?;

    Ok(ArtifactInfo {
        path,
        size_bytes: bytes.len() as u64,
        hash: fingerprint(bytes),
    })
}
