//! Cache traits for tagged result caching.

use async_trait::async_trait;
use bytes::Bytes;
use derive_more::{Debug, Display, Error};
use rpcgate_types::{CacheTag, Params, Response, Value};

/// Error type for cache operations.
#[derive(Debug, Display, Error)]
#[display("cache error: {_0}")]
#[error(ignore)]
pub struct CacheError(pub String);

/// Storage for encoded results, grouped by [`CacheTag`].
///
/// Entries expire after the tag's TTL and can be dropped in bulk by purging
/// their tag.
pub trait Cache: Send + Sync + 'static {
    /// Get a live value from the cache.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<Bytes>, CacheError>> + Send;

    /// Store a value under `key`, grouped under `tag.tag` for `tag.ttl`.
    fn put(
        &self,
        key: &str,
        value: Bytes,
        tag: &CacheTag,
    ) -> impl std::future::Future<Output = Result<(), CacheError>> + Send;

    /// Drop every entry stored under `tag`, returning how many were removed.
    fn purge(&self, tag: &str)
    -> impl std::future::Future<Output = Result<usize, CacheError>> + Send;
}

/// Cached call results, consulted by the call pipeline once a call has been
/// counted, admitted by the rate limiter and validated.
#[async_trait]
pub trait ResponseStore: Send + Sync + 'static {
    /// Cached result of `method` called with `params`, if still live.
    async fn lookup(&self, method: &str, params: &Params) -> Result<Option<Value>, CacheError>;

    /// Store `response` if it carries a cache tag. Returns whether it was stored.
    async fn store(
        &self,
        method: &str,
        params: &Params,
        response: &Response,
    ) -> Result<bool, CacheError>;
}
