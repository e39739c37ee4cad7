//! Response caching keyed by method and arguments.

use async_trait::async_trait;
use bytes::Bytes;
use rpcgate_traits::{Cache, CacheError, ResponseStore};
use rpcgate_types::{Params, Response, Value};

/// Cache key of a call: the method name followed by its JSON encoded
/// arguments.
pub fn cache_key(method: &str, params: &Params) -> String {
    let encoded = serde_json::to_string(params).unwrap_or_default();
    format!("{method}:{encoded}")
}

/// Stores gateway responses under the cache tag they were annotated with.
///
/// Responses without a tag are not cacheable and are never stored.
#[derive(Debug)]
pub struct ResponseCache<C> {
    cache: C,
}

impl<C: Cache> ResponseCache<C> {
    /// Wrap a cache backend.
    pub const fn new(cache: C) -> Self {
        Self { cache }
    }

    /// The underlying backend.
    pub const fn inner(&self) -> &C {
        &self.cache
    }

    /// Cached result of `method` called with `params`, if still live.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or holds an undecodable value.
    pub async fn get_response(
        &self,
        method: &str,
        params: &Params,
    ) -> Result<Option<Value>, CacheError> {
        let key = cache_key(method, params);
        let Some(bytes) = self.cache.get(&key).await? else {
            trace!(%key, "cache miss");
            return Ok(None);
        };
        trace!(%key, "cache hit");
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| CacheError(format!("undecodable entry {key}: {e}")))
    }

    /// Store `response` if it carries cache metadata. Returns whether it was
    /// stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn put_response(
        &self,
        method: &str,
        params: &Params,
        response: &Response,
    ) -> Result<bool, CacheError> {
        let Some(tag) = &response.cache else {
            return Ok(false);
        };
        let encoded = serde_json::to_vec(&response.value)
            .map_err(|e| CacheError(format!("unencodable response: {e}")))?;
        self.cache.put(&cache_key(method, params), Bytes::from(encoded), tag).await?;
        Ok(true)
    }

    /// Invalidate every response stored under `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn purge(&self, tag: &str) -> Result<usize, CacheError> {
        let removed = self.cache.purge(tag).await?;
        debug!(tag, removed, "invalidated cached responses");
        Ok(removed)
    }
}

#[async_trait]
impl<C: Cache> ResponseStore for ResponseCache<C> {
    async fn lookup(&self, method: &str, params: &Params) -> Result<Option<Value>, CacheError> {
        self.get_response(method, params).await
    }

    async fn store(
        &self,
        method: &str,
        params: &Params,
        response: &Response,
    ) -> Result<bool, CacheError> {
        self.put_response(method, params, response).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rpcgate_types::CacheTag;
    use serde_json::json;

    use super::*;
    use crate::MemoryCache;

    fn response(value: Value, tag: Option<&str>) -> Response {
        Response { value, cache: tag.map(|tag| CacheTag::new(tag, Duration::from_secs(60))) }
    }

    #[test]
    fn test_cache_key_distinguishes_arguments() {
        let a = cache_key("package_releases", &Params::positional(vec![json!("foo")]));
        let b = cache_key("package_releases", &Params::positional(vec![json!("bar")]));
        let c = cache_key("release_data", &Params::positional(vec![json!("foo")]));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("package_releases:"));
    }

    #[tokio::test]
    async fn test_round_trip_tagged_response() {
        let cache = ResponseCache::new(MemoryCache::new(16));
        let params = Params::positional(vec![json!("foo")]);
        let value = json!(["1.0", "2.0"]);

        assert_eq!(cache.get_response("package_releases", &params).await.unwrap(), None);
        let stored = cache
            .put_response("package_releases", &params, &response(value.clone(), Some("project/foo")))
            .await
            .unwrap();
        assert!(stored);
        assert_eq!(cache.get_response("package_releases", &params).await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_untagged_response_not_stored() {
        let cache = ResponseCache::new(MemoryCache::new(16));
        let params = Params::new();
        let stored =
            cache.put_response("changelog_last_serial", &params, &response(json!(7), None)).await.unwrap();
        assert!(!stored);
        assert!(cache.inner().is_empty());
    }

    #[tokio::test]
    async fn test_purge_invalidates_project() {
        let cache = ResponseCache::new(MemoryCache::new(16));
        let foo = Params::positional(vec![json!("foo")]);
        let bar = Params::positional(vec![json!("bar")]);
        cache.put_response("package_roles", &foo, &response(json!([]), Some("project/foo"))).await.unwrap();
        cache.put_response("package_releases", &foo, &response(json!([]), Some("project/foo"))).await.unwrap();
        cache.put_response("package_roles", &bar, &response(json!([]), Some("project/bar"))).await.unwrap();

        assert_eq!(cache.purge("project/foo").await.unwrap(), 2);
        assert!(cache.get_response("package_roles", &foo).await.unwrap().is_none());
        assert!(cache.get_response("package_roles", &bar).await.unwrap().is_some());
    }
}
