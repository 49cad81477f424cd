//! Object storage backends: a directory per bucket on disk, or a map in memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::collab::{Bucket, ObjectStorage};
use crate::error::{EngineError, EngineResult};

/// Public locator for a stored object.
pub fn locator(bucket: Bucket, key: &str) -> String {
    format!("/files/{}/{}", bucket, key)
}

/// Strip a locator down to its key; bare keys pass through.
fn key_of<'a>(bucket: Bucket, key_or_locator: &'a str) -> &'a str {
    let prefix = format!("/files/{}/", bucket);
    key_or_locator.strip_prefix(prefix.as_str()).unwrap_or(key_or_locator)
}

fn check_key(key: &str) -> EngineResult<()> {
    let bad = key.is_empty()
        || key.starts_with('.')
        || key.contains(['/', '\\'])
        || key.contains("..");
    if bad {
        return Err(EngineError::Storage(format!("invalid object key '{}'", key)));
    }
    Ok(())
}

pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, bucket: Bucket, key: &str) -> EngineResult<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(bucket.as_str()).join(key))
    }
}

impl ObjectStorage for FsStorage {
    fn save(&self, bucket: Bucket, key: &str, bytes: &[u8]) -> EngineResult<String> {
        let path = self.path_for(bucket, key)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| EngineError::Storage(format!("cannot create {}: {}", dir.display(), e)))?;
        }
        std::fs::write(&path, bytes)
            .map_err(|e| EngineError::Storage(format!("cannot write {}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "object saved");
        Ok(locator(bucket, key))
    }

    fn read(&self, bucket: Bucket, key_or_locator: &str) -> EngineResult<Vec<u8>> {
        let key = key_of(bucket, key_or_locator);
        let path = self.path_for(bucket, key)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EngineError::not_found("object", locator(bucket, key)),
            _ => EngineError::Storage(format!("cannot read {}: {}", path.display(), e)),
        })
    }
}

/// Map-backed storage for tests and dry runs.
#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<HashMap<(Bucket, String), Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, bucket: Bucket) -> usize {
        self.objects
            .read()
            .map(|m| m.keys().filter(|(b, _)| *b == bucket).count())
            .unwrap_or(0)
    }
}

impl ObjectStorage for MemoryStorage {
    fn save(&self, bucket: Bucket, key: &str, bytes: &[u8]) -> EngineResult<String> {
        check_key(key)?;
        self.objects
            .write()
            .map_err(|_| EngineError::Storage("object map lock poisoned".into()))?
            .insert((bucket, key.to_string()), bytes.to_vec());
        Ok(locator(bucket, key))
    }

    fn read(&self, bucket: Bucket, key_or_locator: &str) -> EngineResult<Vec<u8>> {
        let key = key_of(bucket, key_or_locator);
        self.objects
            .read()
            .map_err(|_| EngineError::Storage("object map lock poisoned".into()))?
            .get(&(bucket, key.to_string()))
            .cloned()
            .ok_or_else(|| EngineError::not_found("object", locator(bucket, key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_round_trip_by_locator() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let loc = storage.save(Bucket::Generated, "rr_1.png", b"png").unwrap();
        assert_eq!(loc, "/files/generated/rr_1.png");
        assert!(dir.path().join("generated").join("rr_1.png").is_file());
        assert_eq!(storage.read(Bucket::Generated, &loc).unwrap(), b"png");
        assert_eq!(storage.read(Bucket::Generated, "rr_1.png").unwrap(), b"png");
    }

    #[test]
    fn test_fs_missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let err = storage.read(Bucket::Originals, "img_x.png").unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "object", .. }));
    }

    #[test]
    fn test_keys_cannot_escape_bucket() {
        let storage = MemoryStorage::new();
        for key in ["../etc/passwd", "a/b.png", "", ".hidden"] {
            assert!(matches!(
                storage.save(Bucket::Originals, key, b"x"),
                Err(EngineError::Storage(_))
            ));
        }
    }

    #[test]
    fn test_memory_buckets_are_separate() {
        let storage = MemoryStorage::new();
        storage.save(Bucket::Originals, "a.png", b"1").unwrap();
        assert!(storage.read(Bucket::Generated, "a.png").is_err());
        assert_eq!(storage.len(Bucket::Originals), 1);
        assert_eq!(storage.len(Bucket::Generated), 0);
    }
}
