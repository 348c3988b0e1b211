#![forbid(unsafe_code)]

use crate::store::StoreError;
use dl_core::{ArtifactFormat, ArtifactId};
use sha2::Digest as _;
use std::fmt::Write as _;
use std::io::Read as _;
use std::path::{Path, PathBuf};

/// Content-addressed file store: the sole writer of files under its root.
///
/// An object's location is a pure function of its bytes, so byte-identical
/// content always lands at the same path and is stored exactly once. The
/// destination's existence proves durability; no lock is needed on the
/// discard path.
#[derive(Debug)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic destination: two-level shard of the digest bounds
    /// directory fan-out, full digest plus format suffix names the file.
    pub fn path_for(&self, artifact_id: &ArtifactId, format: &ArtifactFormat) -> PathBuf {
        let digest = artifact_id.as_str();
        self.root
            .join(&digest[..2])
            .join(&digest[2..4])
            .join(format!("{digest}.{}", format.as_str()))
    }

    /// Ingests a finished temporary file: hashes its full byte stream, then
    /// atomically renames it into place. If the destination already exists the
    /// temp file is discarded and the existing identifier is returned.
    ///
    /// Any other failure aborts before the caller records metadata, so either
    /// both the file and its row exist or neither does. A file left orphaned
    /// by a later metadata failure is recoverable garbage: re-running `put`
    /// yields the same id.
    pub fn put(
        &self,
        temp_path: &Path,
        format: &ArtifactFormat,
    ) -> Result<(ArtifactId, PathBuf), StoreError> {
        let digest = sha256_file_hex(temp_path)?;
        let artifact_id = ArtifactId::try_new(digest)
            .map_err(|err| StoreError::InvalidInput(err.message()))?;
        let destination = self.path_for(&artifact_id, format);

        if destination.exists() {
            // Already durable; reclaim the temp file's space.
            let _ = std::fs::remove_file(temp_path);
            return Ok((artifact_id, destination));
        }

        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Atomic relocation: a concurrent reader never observes partial bytes.
        std::fs::rename(temp_path, &destination)?;
        Ok((artifact_id, destination))
    }
}

fn sha256_file_hex(path: &Path) -> Result<String, StoreError> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mut hasher = sha2::Sha256::new();

    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest {
        let _ = write!(&mut out, "{b:02x}");
    }
    Ok(out)
}
