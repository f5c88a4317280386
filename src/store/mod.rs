pub mod disk;
pub mod memory;

use crate::core::cache::{KeyValueCollection, Store};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions, PersistMode};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::{debug, warn};

/// A thread-safe key-value store that can hold multiple collections.
///
/// Persistent collections live in a fjall keyspace. Without a keyspace every
/// collection is kept in memory.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Keyspace>,
}

impl KeyValueStore {
    pub fn in_memory() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: None,
        }
    }

    /// Opens the on-disk cache under `data_path/cache`, degrading to memory
    /// when the keyspace cannot be opened.
    pub fn open(data_path: &Path) -> Self {
        let cache_dir = data_path.join("cache");
        let keyspace = match fjall::Config::new(&cache_dir).open() {
            Ok(keyspace) => Some(keyspace),
            Err(e) => {
                warn!(
                    "Could not open cache at {}: {}. Responses will not be persisted",
                    cache_dir.display(),
                    e
                );
                None
            }
        };

        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.keyspace.is_some()
    }

    /// Flushes pending writes of persistent collections to disk.
    pub fn persist(&self) {
        if let Some(keyspace) = &self.keyspace
            && let Err(e) = keyspace.persist(PersistMode::SyncAll)
        {
            warn!("Failed to flush cache to disk: {}", e);
        }
    }

    fn create_collection(&self, name: &str, persist: bool) -> Arc<dyn KeyValueCollection> {
        if persist && let Some(keyspace) = &self.keyspace {
            match keyspace.open_partition(name, PartitionCreateOptions::default()) {
                Ok(partition) => return Arc::new(DiskCollection::new(partition)),
                Err(e) => warn!("Failed to open cache partition {}: {}", name, e),
            }
        }
        debug!("Using in-memory collection for {}", name);
        Arc::new(MemoryCollection::new())
    }
}

impl Store for KeyValueStore {
    fn get_collection(
        &self,
        name: &str,
        persist: bool,
        create_if_missing: bool,
    ) -> Option<Arc<dyn KeyValueCollection>> {
        if let Some(collection) = self
            .collections
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
        {
            return Some(Arc::clone(collection));
        }
        if !create_if_missing {
            return None;
        }

        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| self.create_collection(name, persist));
        Some(Arc::clone(collection))
    }

    fn remove_collection(&self, name: &str) -> bool {
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        collections.remove(name).is_some()
    }
}
