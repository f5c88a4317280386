use crate::core::cache::Store;
use crate::store::KeyValueStore;
use anyhow::Result;
use tracing::info;

/// Drops every cached provider response in `collections`.
pub async fn clear(store: &KeyValueStore, collections: &[&str]) -> Result<()> {
    if !store.is_persistent() {
        println!("No persistent cache to clear");
        return Ok(());
    }

    for name in collections {
        if let Some(collection) = store.get_collection(name, true, true) {
            collection.clear().await;
            info!("Cleared cache collection {}", name);
        }
    }
    store.persist();
    println!("Cache cleared");
    Ok(())
}
