// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use bcesign_core::hash::hex_sha256;
use bcesign_core::time::{now, DateTime};
use bcesign_core::{Context, Error, ErrorKind, KvStore, MemoryKvStore, Result};

use crate::constants::{DEFAULT_TOKEN_TTL_IN_SECONDS, TOKEN_CACHE_NAMESPACE};
use crate::{ApiKey, IssueToken, OAuthTokenIssuer};

type Clock = Arc<dyn Fn() -> DateTime + Send + Sync>;

/// TokenCache hands out access tokens, issuing a new one only when the cached
/// one is missing or expired.
///
/// Expiry is checked against the clock on every read, the store's own TTL is
/// never trusted alone. Concurrent misses are serialized so that one expiry
/// triggers one issue.
pub struct TokenCache {
    store: Arc<dyn KvStore>,
    issuer: Arc<dyn IssueToken>,
    key_prefix: String,
    default_ttl: Duration,
    clock: Clock,

    refresh: Mutex<()>,
}

impl Debug for TokenCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("store", &self.store)
            .field("issuer", &self.issuer)
            .field("key_prefix", &self.key_prefix)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()), Arc::new(OAuthTokenIssuer::new()))
    }
}

impl TokenCache {
    /// Create a cache over `store`, issuing tokens with `issuer`.
    pub fn new(store: Arc<dyn KvStore>, issuer: Arc<dyn IssueToken>) -> Self {
        Self {
            store,
            issuer,
            key_prefix: String::new(),
            default_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_IN_SECONDS),
            clock: Arc::new(now),
            refresh: Mutex::new(()),
        }
    }

    /// Prefix every key written to the store.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Lifetime used when the issuer doesn't report one.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Replace the clock used to check expiry.
    ///
    /// Only use this function for testing.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Key of `key`'s token in the store.
    pub fn cache_key(&self, key: &ApiKey) -> String {
        let digest = hex_sha256(
            format!("{TOKEN_CACHE_NAMESPACE}{}{}", key.api_key, key.secret_key).as_bytes(),
        );
        format!("{}{digest}", self.key_prefix)
    }

    /// Get a live token for `key`, issuing one if needed.
    pub async fn get(&self, ctx: &Context, key: &ApiKey) -> Result<String> {
        let cache_key = self.cache_key(key);
        if let Some(token) = self.load(&cache_key, false).await? {
            debug!("token cache hit");
            return Ok(token);
        }

        let _guard = self.refresh.lock().await;
        // Another task may have refreshed the token while we were waiting.
        if let Some(token) = self.load(&cache_key, true).await? {
            debug!("token cache hit after waiting for refresh");
            return Ok(token);
        }

        debug!("token cache miss, issuing a new token");
        let token = self.issuer.issue_token(ctx, key).await.map_err(|e| {
            if e.kind() == ErrorKind::TokenAcquisition {
                e
            } else {
                Error::token_acquisition("failed to issue access token").with_source(e)
            }
        })?;

        let ttl = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(self.default_ttl);
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|d| (self.clock)().checked_add_signed(d))
            .ok_or_else(|| {
                Error::token_acquisition(format!("token lifetime out of range: {ttl:?}"))
            })?;
        let entry = CachedToken {
            access_token: token.access_token,
            expires_at: expires_at.timestamp(),
        };
        let value = serde_json::to_string(&entry)
            .map_err(|e| Error::unexpected("failed to encode cached token").with_source(e))?;
        self.store.set(&cache_key, &value, Some(ttl)).await?;

        Ok(entry.access_token)
    }

    /// Drop the cached token of `key`, the next `get` issues a new one.
    pub async fn invalidate(&self, key: &ApiKey) -> Result<bool> {
        self.store.delete(&self.cache_key(key)).await
    }

    /// Read the live token under `cache_key`.
    ///
    /// Stale entries are only removed when `purge` is set, which callers do
    /// while holding the refresh lock. Otherwise a reader could remove a token
    /// that was stored after its read.
    async fn load(&self, cache_key: &str, purge: bool) -> Result<Option<String>> {
        let Some(value) = self.store.get(cache_key).await? else {
            return Ok(None);
        };

        let entry: CachedToken = match serde_json::from_str(&value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("ignoring undecodable cached token: {e}");
                if purge {
                    self.store.delete(cache_key).await?;
                }
                return Ok(None);
            }
        };

        if entry.expires_at <= (self.clock)().timestamp() {
            debug!("cached token expired");
            if purge {
                self.store.delete(cache_key).await?;
            }
            return Ok(None);
        }

        Ok(Some(entry.access_token))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedToken {
    access_token: String,
    /// Unix timestamp in seconds.
    expires_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Token;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingIssuer {
        calls: AtomicUsize,
        expires_in: Option<u64>,
        fail: bool,
    }

    #[async_trait]
    impl IssueToken for CountingIssuer {
        async fn issue_token(&self, _: &Context, _: &ApiKey) -> Result<Token> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(Error::transport("connection refused"));
            }
            Ok(Token {
                access_token: format!("token-{n}"),
                expires_in: self.expires_in,
            })
        }
    }

    /// A clock that only moves when told to.
    #[derive(Clone, Default)]
    struct ManualClock(Arc<AtomicI64>);

    impl ManualClock {
        fn advance(&self, secs: i64) {
            self.0.fetch_add(secs, Ordering::SeqCst);
        }

        fn now(&self) -> DateTime {
            Utc.timestamp_opt(1_700_000_000 + self.0.load(Ordering::SeqCst), 0)
                .single()
                .expect("time must be valid")
        }
    }

    fn cache_with(issuer: Arc<CountingIssuer>, clock: &ManualClock) -> TokenCache {
        let clock = clock.clone();
        TokenCache::new(Arc::new(MemoryKvStore::new()), issuer).with_clock(move || clock.now())
    }

    #[tokio::test]
    async fn test_get_within_ttl_issues_once() -> Result<()> {
        let issuer = Arc::new(CountingIssuer::default());
        let clock = ManualClock::default();
        let cache = cache_with(issuer.clone(), &clock);
        let key = ApiKey::new("ak", "sk");
        let ctx = Context::new();

        assert_eq!(cache.get(&ctx, &key).await?, "token-1");
        clock.advance(3599);
        assert_eq!(cache.get(&ctx, &key).await?, "token-1");
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_after_ttl_refreshes_once() -> Result<()> {
        let issuer = Arc::new(CountingIssuer {
            expires_in: Some(60),
            ..Default::default()
        });
        let clock = ManualClock::default();
        let cache = cache_with(issuer.clone(), &clock);
        let key = ApiKey::new("ak", "sk");
        let ctx = Context::new();

        assert_eq!(cache.get(&ctx, &key).await?, "token-1");
        clock.advance(60);
        assert_eq!(cache.get(&ctx, &key).await?, "token-2");
        assert_eq!(cache.get(&ctx, &key).await?, "token-2");
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_misses_issue_once() -> Result<()> {
        let issuer = Arc::new(CountingIssuer::default());
        let clock = ManualClock::default();
        let cache = Arc::new(cache_with(issuer.clone(), &clock));
        let key = ApiKey::new("ak", "sk");

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let key = key.clone();
            tasks.push(tokio::spawn(async move {
                cache.get(&Context::new(), &key).await
            }));
        }
        for task in tasks {
            assert_eq!(task.await.expect("task must finish")?, "token-1");
        }
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() -> Result<()> {
        let issuer = Arc::new(CountingIssuer {
            fail: true,
            ..Default::default()
        });
        let clock = ManualClock::default();
        let cache = cache_with(issuer.clone(), &clock);
        let key = ApiKey::new("ak", "sk");
        let ctx = Context::new();

        let err = cache.get(&ctx, &key).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenAcquisition);
        assert!(cache.get(&ctx, &key).await.is_err());
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalidate() -> Result<()> {
        let issuer = Arc::new(CountingIssuer::default());
        let clock = ManualClock::default();
        let cache = cache_with(issuer.clone(), &clock);
        let key = ApiKey::new("ak", "sk");
        let ctx = Context::new();

        assert_eq!(cache.get(&ctx, &key).await?, "token-1");
        assert!(cache.invalidate(&key).await?);
        assert!(!cache.invalidate(&key).await?);
        assert_eq!(cache.get(&ctx, &key).await?, "token-2");
        Ok(())
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() -> Result<()> {
        let store = Arc::new(MemoryKvStore::new());
        let issuer = Arc::new(CountingIssuer::default());
        let cache = TokenCache::new(store.clone(), issuer.clone());
        let key = ApiKey::new("ak", "sk");

        store.set(&cache.cache_key(&key), "not json", None).await?;
        assert_eq!(cache.get(&Context::new(), &key).await?, "token-1");
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_huge_lifetime_is_an_error() -> Result<()> {
        let issuer = Arc::new(CountingIssuer {
            expires_in: Some(1_000_000_000_000_000),
            ..Default::default()
        });
        let clock = ManualClock::default();
        let cache = cache_with(issuer.clone(), &clock);
        let key = ApiKey::new("ak", "sk");

        let err = cache.get(&Context::new(), &key).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenAcquisition);
        assert!(!cache.store.has(&cache.cache_key(&key)).await?);
        Ok(())
    }

    /// Serves one stale entry on demand, as if it was read right before
    /// another task stored a fresh token.
    #[derive(Debug, Default)]
    struct StaleOnceStore {
        inner: MemoryKvStore,
        stale: AtomicBool,
    }

    #[async_trait]
    impl KvStore for StaleOnceStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            if self.stale.swap(false, Ordering::SeqCst) {
                return Ok(Some(r#"{"access_token":"old","expires_at":0}"#.to_string()));
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
            self.inner.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<bool> {
            self.inner.delete(key).await
        }

        async fn clear(&self) -> Result<()> {
            self.inner.clear().await
        }
    }

    #[tokio::test]
    async fn test_stale_read_keeps_fresh_token() -> Result<()> {
        let store = Arc::new(StaleOnceStore::default());
        let issuer = Arc::new(CountingIssuer::default());
        let clock = ManualClock::default();
        let cache = {
            let clock = clock.clone();
            TokenCache::new(store.clone(), issuer.clone()).with_clock(move || clock.now())
        };
        let key = ApiKey::new("ak", "sk");
        let ctx = Context::new();

        assert_eq!(cache.get(&ctx, &key).await?, "token-1");
        store.stale.store(true, Ordering::SeqCst);
        assert_eq!(cache.get(&ctx, &key).await?, "token-1");
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn test_cache_key() {
        let cache = TokenCache::default().with_key_prefix("qianfan:");
        let a = cache.cache_key(&ApiKey::new("ak", "sk"));
        let b = cache.cache_key(&ApiKey::new("ak", "other"));

        assert!(a.starts_with("qianfan:"));
        assert_eq!(a.len(), "qianfan:".len() + 64);
        assert_ne!(a, b);
    }
}
