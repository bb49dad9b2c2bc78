use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Result, bail};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::ObjectStore;
use crate::key::validate_key;

type HmacSha256 = Hmac<Sha256>;

/// Local-disk object store. Objects live at `{dir}/{key}`; upload URLs point
/// back at this server's `/storage` routes, signed with HMAC-SHA256 over
/// `key\nexpiry` so only holders of a fresh signature can write.
pub struct DiskStore {
    dir: PathBuf,
    upload_base: String,
    public_base: String,
    secret: String,
}

impl DiskStore {
    pub async fn new(
        dir: PathBuf,
        upload_base: String,
        public_base: String,
        secret: String,
    ) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Object storage directory: {}", dir.display());
        Ok(Self {
            dir,
            upload_base: upload_base.trim_end_matches('/').to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
            secret,
        })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        if !validate_key(key) {
            bail!("Invalid storage key: {}", key);
        }
        Ok(self.dir.join(key))
    }

    fn signature(&self, key: &str, expires: u64) -> String {
        // HMAC accepts any key length, so this cannot fail.
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC key of any length");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Check an upload signature produced by `presign_upload`: the key must
    /// be valid, the expiry still in the future and the MAC genuine.
    pub fn verify_upload(&self, key: &str, expires: u64, sig: &str) -> bool {
        if !validate_key(key) {
            return false;
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(u64::MAX);
        if expires < now {
            return false;
        }

        let mut mac = match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());

        match hex::decode(sig) {
            Ok(bytes) => mac.verify_slice(&bytes).is_ok(),
            Err(_) => false,
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for DiskStore {
    async fn presign_upload(&self, key: &str, expires_in: Duration) -> Result<String> {
        if !validate_key(key) {
            bail!("Invalid storage key: {}", key);
        }
        let expires = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() + expires_in.as_secs();
        let sig = self.signature(key, expires);
        Ok(format!(
            "{}/{}?expires={}&sig={}",
            self.upload_base, key, expires, sig
        ))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let path = self.object_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.object_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted object {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Object {} already gone", key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_stale_keys(&self, min_age: Duration) -> Result<Vec<String>> {
        let cutoff = SystemTime::now()
            .checked_sub(min_age)
            .unwrap_or(UNIX_EPOCH);

        let mut stale = Vec::new();
        let mut stack = vec![self.dir.clone()];
        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let meta = entry.metadata().await?;
                if meta.is_dir() {
                    stack.push(path);
                    continue;
                }
                if meta.modified()? >= cutoff {
                    continue;
                }
                if let Ok(rel) = path.strip_prefix(&self.dir) {
                    let key = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    stale.push(key);
                }
            }
        }
        Ok(stale)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store(dir: &tempfile::TempDir) -> DiskStore {
        DiskStore::new(
            dir.path().to_path_buf(),
            "http://localhost:3000/storage".into(),
            "http://localhost:3000/storage".into(),
            "test-secret".into(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        let key = "trips/t-1/media/ab_beach.jpg";
        store.put(key, Bytes::from_static(b"jpeg bytes")).await.unwrap();

        let got = store.get(key).await.unwrap().expect("stored");
        assert_eq!(&got[..], b"jpeg bytes");

        store.delete(key).await.unwrap();
        assert!(store.get(key).await.unwrap().is_none());

        // Deleting again is a no-op, not an error.
        store.delete(key).await.unwrap();
    }

    #[tokio::test]
    async fn presigned_url_verifies_and_rejects_tampering() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        let key = "trips/t-1/media/ab_beach.jpg";
        let url = store
            .presign_upload(key, Duration::from_secs(600))
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:3000/storage/trips/t-1/media/"));

        let query = url.split_once('?').unwrap().1;
        let mut expires = 0u64;
        let mut sig = String::new();
        for pair in query.split('&') {
            match pair.split_once('=').unwrap() {
                ("expires", v) => expires = v.parse().unwrap(),
                ("sig", v) => sig = v.to_string(),
                _ => {}
            }
        }

        assert!(store.verify_upload(key, expires, &sig));
        assert!(!store.verify_upload("trips/t-1/media/other.jpg", expires, &sig));
        assert!(!store.verify_upload(key, expires + 1, &sig));
        assert!(!store.verify_upload(key, expires, "deadbeef"));
    }

    #[tokio::test]
    async fn expired_signature_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        let key = "trips/t-1/media/ab_beach.jpg";
        let past = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            - 10;
        let sig = store.signature(key, past);
        assert!(!store.verify_upload(key, past, &sig));
    }

    #[tokio::test]
    async fn traversal_keys_never_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        assert!(store.put("../escape", Bytes::from_static(b"x")).await.is_err());
        assert!(store.presign_upload("/abs", Duration::from_secs(60)).await.is_err());
        assert!(!store.verify_upload("trips/../x", u64::MAX, "00"));
    }

    #[tokio::test]
    async fn stale_listing_honors_min_age() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        store
            .put("trips/t-1/media/ab_a.jpg", Bytes::from_static(b"x"))
            .await
            .unwrap();

        // A fresh object is not stale for any positive age...
        let stale = store.list_stale_keys(Duration::from_secs(3600)).await.unwrap();
        assert!(stale.is_empty());

        // ...but shows up when no grace period applies.
        let stale = store.list_stale_keys(Duration::ZERO).await.unwrap();
        assert_eq!(stale, vec!["trips/t-1/media/ab_a.jpg".to_string()]);
    }
}
