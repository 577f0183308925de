//! Process-wide model cache.
//!
//! Loading a classifier means downloading weights and building the network,
//! so each model is constructed at most once per options/device combination
//! and every later request receives a clone sharing the same weights.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::error::Result;

/// Trait implemented by model option types to generate a stable cache key.
pub trait ModelOptions {
    fn cache_key(&self) -> String;
}

type CacheStorage = HashMap<(TypeId, String), Arc<dyn Any + Send + Sync>>;

/// A thread-safe cache for model instances.
///
/// Entries are keyed by model type and a string key, so two model types never
/// collide even when their option keys happen to match.
pub struct ModelCache {
    cache: Arc<Mutex<CacheStorage>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get a model from the cache, running `loader` only when nothing is
    /// stored under `key` yet.
    ///
    /// The lock is held across the load so concurrent callers asking for the
    /// same model wait for the first load instead of starting their own.
    pub async fn get_or_create<M, Fut, F>(&self, key: &str, loader: F) -> Result<M>
    where
        M: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<M>>,
    {
        let cache_key = (TypeId::of::<M>(), key.to_string());

        let mut cache = self.cache.lock().await;
        if let Some(model) = cache
            .get(&cache_key)
            .and_then(|cached| cached.downcast_ref::<M>())
        {
            tracing::debug!(key, "model cache hit");
            return Ok(model.clone());
        }

        tracing::info!(key, "loading model");
        let model = loader().await?;
        cache.insert(cache_key, Arc::new(model.clone()) as Arc<dyn Any + Send + Sync>);

        Ok(model)
    }

    /// Clear all cached models.
    pub async fn clear(&self) {
        self.cache.lock().await.clear();
    }

    /// Get the number of cached models.
    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.lock().await.is_empty()
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_MODEL_CACHE: once_cell::sync::Lazy<ModelCache> =
    once_cell::sync::Lazy::new(ModelCache::new);

/// Get a reference to the global model cache.
pub fn global_cache() -> &'static ModelCache {
    &GLOBAL_MODEL_CACHE
}
