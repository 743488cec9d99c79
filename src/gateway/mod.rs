// Persistence gateway: durable storage of pipeline inputs and outputs,
// addressed by (bucket, key). No versioning, no conditional writes; the
// last write to a key wins.

mod fs;
mod in_memory;

pub use fs::FsStore;
pub use in_memory::InMemoryStore;

use crate::error::Result;
use sha2::{Digest, Sha256};

/// Metadata recorded for every stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub size_bytes: u64,
    pub sha256: String,
}

impl ObjectMeta {
    pub fn for_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self {
            size_bytes: bytes.len() as u64,
            sha256: hex::encode(hasher.finalize()),
        }
    }
}

/// Object store the pipeline persists artifacts through. Implementations
/// are synchronous; a single failed read or write fails the run.
pub trait ObjectStore: Send + Sync {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<ObjectMeta>;
}
