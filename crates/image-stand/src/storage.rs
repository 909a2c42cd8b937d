//! Artifact storage: persisted generated images addressed by id.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::decode::sniff_extension;
use crate::types::{ArtifactId, StandError, StandResult};

/// Persistence for generated artifacts.
///
/// `store` is atomic: either the artifact becomes fully visible under its
/// new id, or nothing does.
pub trait ArtifactStore: Send + Sync {
    fn store(&self, bytes: &[u8]) -> StandResult<ArtifactId>;

    fn retrieve(&self, id: &ArtifactId) -> StandResult<Vec<u8>>;

    /// Human-readable location of an artifact (path or pseudo-URI).
    fn location(&self, id: &ArtifactId) -> String;

    fn list(&self) -> StandResult<Vec<ArtifactId>>;

    fn delete(&self, id: &ArtifactId) -> StandResult<()>;
}

fn new_id(bytes: &[u8]) -> ArtifactId {
    ArtifactId(format!("{}.{}", uuid::Uuid::new_v4(), sniff_extension(bytes)))
}

/// Ids are single path components: no separators, no leading dot.
fn validate_id(id: &ArtifactId) -> StandResult<()> {
    let s = id.as_str();
    let ok = !s.is_empty()
        && !s.starts_with('.')
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StandError::ArtifactNotFound(s.to_string()))
    }
}

/// Filesystem store rooted at one directory.
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    /// Open (and create if needed) the store directory.
    pub fn open(root: impl Into<PathBuf>) -> StandResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            StandError::Storage(format!("cannot create {}: {e}", root.display()))
        })?;
        tracing::info!("Artifact store at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, id: &ArtifactId) -> PathBuf {
        self.root.join(id.as_str())
    }
}

impl ArtifactStore for FileArtifactStore {
    fn store(&self, bytes: &[u8]) -> StandResult<ArtifactId> {
        let id = new_id(bytes);
        let target = self.path_of(&id);

        // Write beside the target, then rename into place.
        let mut tmp = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(&self.root)
            .map_err(|e| StandError::Storage(format!("cannot create temp file: {e}")))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| StandError::Storage(format!("write failed: {e}")))?;
        tmp.persist(&target)
            .map_err(|e| StandError::Storage(format!("rename failed: {}", e.error)))?;

        tracing::info!("Stored artifact {id} ({} bytes)", bytes.len());
        Ok(id)
    }

    fn retrieve(&self, id: &ArtifactId) -> StandResult<Vec<u8>> {
        validate_id(id)?;
        match std::fs::read(self.path_of(id)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StandError::ArtifactNotFound(id.to_string()))
            }
            Err(e) => Err(StandError::Storage(format!("read {id} failed: {e}"))),
        }
    }

    fn location(&self, id: &ArtifactId) -> String {
        self.path_of(id).display().to_string()
    }

    fn list(&self) -> StandResult<Vec<ArtifactId>> {
        let entries = std::fs::read_dir(&self.root)
            .map_err(|e| StandError::Storage(format!("cannot list {}: {e}", self.root.display())))?;

        let mut ids = Vec::new();
        for entry in entries.flatten() {
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_file && !name.starts_with('.') {
                ids.push(ArtifactId(name));
            }
        }
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ids)
    }

    fn delete(&self, id: &ArtifactId) -> StandResult<()> {
        validate_id(id)?;
        match std::fs::remove_file(self.path_of(id)) {
            Ok(()) => {
                tracing::info!("Deleted artifact {id}");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StandError::ArtifactNotFound(id.to_string()))
            }
            Err(e) => Err(StandError::Storage(format!("delete {id} failed: {e}"))),
        }
    }
}

/// In-process store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<HashMap<ArtifactId, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.artifacts.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StandError {
    StandError::Storage("artifact map lock poisoned".to_string())
}

impl ArtifactStore for MemoryArtifactStore {
    fn store(&self, bytes: &[u8]) -> StandResult<ArtifactId> {
        let id = new_id(bytes);
        self.artifacts
            .write()
            .map_err(poisoned)?
            .insert(id.clone(), bytes.to_vec());
        Ok(id)
    }

    fn retrieve(&self, id: &ArtifactId) -> StandResult<Vec<u8>> {
        self.artifacts
            .read()
            .map_err(poisoned)?
            .get(id)
            .cloned()
            .ok_or_else(|| StandError::ArtifactNotFound(id.to_string()))
    }

    fn location(&self, id: &ArtifactId) -> String {
        format!("memory://{id}")
    }

    fn list(&self) -> StandResult<Vec<ArtifactId>> {
        let mut ids: Vec<_> = self.artifacts.read().map_err(poisoned)?.keys().cloned().collect();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ids)
    }

    fn delete(&self, id: &ArtifactId) -> StandResult<()> {
        self.artifacts
            .write()
            .map_err(poisoned)?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StandError::ArtifactNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::new_rgb8(4, 4);
        let mut buf = Vec::new();
        img.write_with_encoder(image::codecs::png::PngEncoder::new(&mut buf))
            .unwrap();
        buf
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::open(dir.path().join("images")).unwrap();
        let bytes = png_bytes();

        let id = store.store(&bytes).unwrap();
        assert!(id.as_str().ends_with(".png"));
        assert_eq!(store.retrieve(&id).unwrap(), bytes);
        assert!(store.path_of(&id).exists());
        assert_eq!(store.list().unwrap(), vec![id.clone()]);

        store.delete(&id).unwrap();
        assert!(matches!(store.retrieve(&id), Err(StandError::ArtifactNotFound(_))));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::open(dir.path()).unwrap();
        store.store(b"not an image").unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".bin"));
    }

    #[test]
    fn test_file_store_rejects_path_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::open(dir.path()).unwrap();
        for bad in ["../secret", ".hidden", "a/b", ""] {
            assert!(matches!(
                store.retrieve(&ArtifactId::from(bad)),
                Err(StandError::ArtifactNotFound(_))
            ));
        }
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryArtifactStore::new();
        assert!(store.is_empty());
        let id = store.store(&png_bytes()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.location(&id).starts_with("memory://"));
        assert!(store.retrieve(&id).is_ok());
        store.delete(&id).unwrap();
        assert!(store.delete(&id).is_err());
    }
}
