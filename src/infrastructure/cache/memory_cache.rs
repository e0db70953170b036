use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::domain::entities::UserProfile;
use crate::domain::value_objects::AccountEmail;

#[derive(Clone)]
struct CacheEntry<T> {
    data: T,
    expires_at: Instant,
}

/// In-memory TTL cache in front of the durable store.
///
/// Purely an optimization: eviction or process restart costs one store read.
pub struct MemoryCache<T: Clone> {
    cache: Arc<RwLock<HashMap<String, CacheEntry<T>>>>,
    default_ttl: Duration,
}

impl<T> MemoryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(default_ttl_seconds: u64) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            default_ttl: Duration::from_secs(default_ttl_seconds),
        }
    }

    pub async fn set(&self, key: String, value: T) {
        let entry = CacheEntry {
            data: value,
            expires_at: Instant::now() + self.default_ttl,
        };

        let mut cache = self.cache.write().await;
        cache.insert(key, entry);
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        let cache = self.cache.read().await;

        if let Some(entry) = cache.get(key) {
            if entry.expires_at > Instant::now() {
                return Some(entry.data.clone());
            }
        }

        None
    }

    pub async fn delete(&self, key: &str) {
        let mut cache = self.cache.write().await;
        cache.remove(key);
    }

    pub async fn cleanup_expired(&self) {
        let mut cache = self.cache.write().await;
        let now = Instant::now();

        cache.retain(|_, entry| entry.expires_at > now);
    }

    pub async fn size(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }
}

/// Profile cache keyed by normalized account email.
pub struct ProfileCache {
    cache: MemoryCache<UserProfile>,
}

impl ProfileCache {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            cache: MemoryCache::new(ttl_seconds),
        }
    }

    pub async fn set(&self, profile: UserProfile) {
        let key = format!("profile:{}", profile.email);
        self.cache.set(key, profile).await;
    }

    pub async fn get(&self, email: &AccountEmail) -> Option<UserProfile> {
        let key = format!("profile:{email}");
        self.cache.get(&key).await
    }

    pub async fn invalidate(&self, email: &AccountEmail) {
        let key = format!("profile:{email}");
        self.cache.delete(&key).await;
    }
}
