//! Cache abstractions for provider responses.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A byte-oriented key-value collection with optional per-entry expiry.
///
/// Implementations swallow their own storage errors: a failing cache
/// degrades to a miss instead of failing the caller.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>);
    async fn remove(&self, key: &[u8]);
    async fn clear(&self);
}

/// Owner of named collections.
pub trait Store: Send + Sync {
    /// Returns the collection called `name`. Persistent collections survive
    /// across runs when the store has a backing keyspace.
    fn get_collection(
        &self,
        name: &str,
        persist: bool,
        create_if_missing: bool,
    ) -> Option<Arc<dyn KeyValueCollection>>;

    fn remove_collection(&self, name: &str) -> bool;
}
