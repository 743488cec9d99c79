use super::{ObjectMeta, ObjectStore};
use crate::error::{PipelineError, Result};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Filesystem-backed object store: objects live at `root/bucket/key`, with
/// slash-separated keys mapped onto directories.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let mut path = self.root.join(bucket);
        for part in key.split('/').filter(|p| !p.is_empty()) {
            path = path.join(part);
        }
        path
    }
}

impl ObjectStore for FsStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key);
        if !path.exists() {
            return Err(PipelineError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        Ok(fs::read(path)?)
    }

    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<ObjectMeta> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        let meta = ObjectMeta::for_bytes(bytes);
        debug!(
            "Wrote {}/{} ({} bytes, sha256 {})",
            bucket, key, meta.size_bytes, meta.sha256
        );
        Ok(meta)
    }
}
