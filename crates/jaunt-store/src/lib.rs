pub mod disk;
pub mod key;

use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;

pub use disk::DiskStore;

/// Upload credentials expire after this long.
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// Object storage as an opaque capability: hand out a time-limited upload
/// URL for a key, or move bytes directly. Signing performs no existence
/// check — a signed key may never be uploaded, which the orphan sweep
/// reconciles later.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Time-limited URL the client PUTs the object to.
    async fn presign_upload(&self, key: &str, expires_in: Duration) -> Result<String>;

    /// Relay upload: write the object synchronously.
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// `None` when no object exists under the key.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Keys of stored objects last modified longer than `min_age` ago.
    async fn list_stale_keys(&self, min_age: Duration) -> Result<Vec<String>>;

    /// Public (CDN) URL for a key.
    fn public_url(&self, key: &str) -> String;
}
