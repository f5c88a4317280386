use crate::core::cache::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use fjall::PartitionHandle;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<SystemTime>,
}

/// Collection persisted in a fjall partition.
pub struct DiskCollection {
    partition: PartitionHandle,
}

impl DiskCollection {
    /// Wraps `partition`, dropping entries that expired since the last run.
    pub fn new(partition: PartitionHandle) -> Self {
        let collection = Self { partition };
        match collection.purge_expired() {
            Ok(0) => {}
            Ok(purged) => debug!("Purged {} expired cache entries", purged),
            Err(e) => debug!("DiskCollection purge error: {}", e),
        }
        collection
    }

    fn is_expired(entry: &CacheEntry, now: SystemTime) -> bool {
        entry.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    /// Removes expired and unreadable entries, returning how many went.
    pub fn purge_expired(&self) -> Result<usize> {
        let now = SystemTime::now();
        let mut stale = Vec::new();
        for item in self.partition.iter() {
            let (key, raw) = item?;
            match serde_json::from_slice::<CacheEntry>(&raw) {
                Ok(entry) if !Self::is_expired(&entry, now) => {}
                _ => stale.push(key),
            }
        }
        for key in &stale {
            self.partition.remove(&**key)?;
        }
        Ok(stale.len())
    }

    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let Some(raw) = self.partition.get(key)? else {
            return Ok(None);
        };
        let entry: CacheEntry = serde_json::from_slice(&raw)?;
        if Self::is_expired(&entry, SystemTime::now()) {
            debug!("Cache entry expired for key: {}", String::from_utf8_lossy(key));
            self.partition.remove(key)?;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn write(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let entry = CacheEntry {
            value: value.to_vec(),
            expires_at: ttl.map(|d| SystemTime::now() + d),
        };
        self.partition.insert(key, serde_json::to_vec(&entry)?)?;
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        let keys = self
            .partition
            .keys()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for key in keys {
            self.partition.remove(&*key)?;
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let key_str = String::from_utf8_lossy(key);
        match self.read(key) {
            Ok(Some(value)) => {
                debug!("Cache HIT for key: {}", key_str);
                Some(value)
            }
            Ok(None) => {
                debug!("Cache MISS for key: {}", key_str);
                None
            }
            Err(e) => {
                debug!("DiskCollection get error for key {}: {}", key_str, e);
                None
            }
        }
    }

    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) {
        match self.write(key, value, ttl) {
            Ok(()) => debug!("Cache PUT for key: {}", String::from_utf8_lossy(key)),
            Err(e) => debug!("DiskCollection put error: {}", e),
        }
    }

    async fn remove(&self, key: &[u8]) {
        if let Err(e) = self.partition.remove(key) {
            debug!("DiskCollection remove error: {}", e);
        }
    }

    async fn clear(&self) {
        if let Err(e) = self.clear_all() {
            debug!("DiskCollection clear error: {}", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fjall::PartitionCreateOptions;
    use tempfile::tempdir;
    use tokio::time::sleep;

    fn open(path: &std::path::Path) -> (fjall::Keyspace, DiskCollection) {
        let keyspace = fjall::Config::new(path).open().unwrap();
        let partition = keyspace
            .open_partition("test", PartitionCreateOptions::default())
            .unwrap();
        (keyspace, DiskCollection::new(partition))
    }

    #[tokio::test]
    async fn test_disk_cache_get_put() {
        let dir = tempdir().unwrap();
        let (_keyspace, cache) = open(dir.path());

        assert!(cache.get(b"key1").await.is_none());

        cache.put(b"key1", b"123", None).await;
        assert_eq!(cache.get(b"key1").await.as_deref(), Some(&b"123"[..]));

        assert!(cache.get(b"key2").await.is_none());
    }

    #[tokio::test]
    async fn test_disk_cache_ttl_expiration() {
        let dir = tempdir().unwrap();
        let (_keyspace, cache) = open(dir.path());

        cache
            .put(b"key1", b"123", Some(Duration::from_millis(10)))
            .await;
        assert!(cache.get(b"key1").await.is_some());

        sleep(Duration::from_millis(20)).await;
        assert!(cache.get(b"key1").await.is_none());
    }

    #[tokio::test]
    async fn test_disk_cache_remove_and_clear() {
        let dir = tempdir().unwrap();
        let (_keyspace, cache) = open(dir.path());

        cache.put(b"key1", b"1", None).await;
        cache.put(b"key2", b"2", None).await;
        cache.put(b"key3", b"3", None).await;

        cache.remove(b"key1").await;
        assert!(cache.get(b"key1").await.is_none());
        assert!(cache.get(b"key2").await.is_some());

        cache.clear().await;
        assert!(cache.get(b"key2").await.is_none());
        assert!(cache.get(b"key3").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_purged_on_open() {
        let dir = tempdir().unwrap();
        let (keyspace, cache) = open(dir.path());

        for day in 1..=30 {
            let key = format!("yahoo|AAPL|NASDAQ|2024-01-01|2024-06-{day:02}");
            cache
                .put(key.as_bytes(), b"[]", Some(Duration::from_millis(10)))
                .await;
        }
        cache.put(b"yahoo|AAPL|NASDAQ|2024-01-01|2024-01-31", b"[]", None).await;
        cache.put(b"fresh", b"[]", Some(Duration::from_secs(3600))).await;
        assert_eq!(keyspace_len(&keyspace), 32);

        sleep(Duration::from_millis(20)).await;
        drop(cache);
        let partition = keyspace
            .open_partition("test", PartitionCreateOptions::default())
            .unwrap();
        let reopened = DiskCollection::new(partition);

        // Expired entries go without ever being read again
        assert_eq!(keyspace_len(&keyspace), 2);
        assert!(
            reopened
                .get(b"yahoo|AAPL|NASDAQ|2024-01-01|2024-01-31")
                .await
                .is_some()
        );
        assert!(reopened.get(b"fresh").await.is_some());
        assert_eq!(reopened.purge_expired().unwrap(), 0);
    }

    fn keyspace_len(keyspace: &fjall::Keyspace) -> usize {
        keyspace
            .open_partition("test", PartitionCreateOptions::default())
            .unwrap()
            .keys()
            .count()
    }
}
