use super::{ObjectMeta, ObjectStore};
use crate::error::{PipelineError, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// In-memory object store for development/testing.
#[derive(Default)]
pub struct InMemoryStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectStore for InMemoryStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| PipelineError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<ObjectMeta> {
        let meta = ObjectMeta::for_bytes(bytes);
        let mut objects = self.objects.lock().unwrap();
        objects.insert((bucket.to_string(), key.to_string()), bytes.to_vec());
        debug!("Stored {}/{} ({} bytes)", bucket, key, meta.size_bytes);
        Ok(meta)
    }
}
