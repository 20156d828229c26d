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

//! Key/value storage used to persist short-lived values such as bearer tokens.

use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// KvStore is the narrow storage interface bcesign relies on.
///
/// Adapters over external stores (redis, memcached, ...) implement this trait.
/// The store is a persistence backend only: callers keep their own invariants,
/// like checking token expiry on read.
#[async_trait::async_trait]
pub trait KvStore: Debug + Send + Sync + 'static {
    /// Get the value of `key`, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set `key` to `value`, expiring after `ttl` if given.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Delete `key`, returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Check whether `key` exists and is not expired.
    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Remove every entry.
    async fn clear(&self) -> Result<()>;
}

type Entries = HashMap<String, (String, Option<Instant>)>;

/// MemoryKvStore keeps entries in process memory.
///
/// Expired entries are dropped when they are read.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<Entries>,
}

impl MemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>> {
        self.entries
            .lock()
            .map_err(|_| Error::unexpected("memory kv store lock poisoned"))
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.lock()?;
        let expired = match entries.get(key) {
            None => return Ok(None),
            Some((_, Some(deadline))) => *deadline <= Instant::now(),
            Some((_, None)) => false,
        };
        if expired {
            entries.remove(key);
            return Ok(None);
        }

        Ok(entries.get(key).map(|(v, _)| v.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        // A ttl past what `Instant` can hold never expires.
        let deadline = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.lock()?
            .insert(key.to_string(), (value.to_string(), deadline));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.remove(key).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_kv_store() -> Result<()> {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("token").await?, None);
        assert!(!store.has("token").await?);

        store.set("token", "24.abc", None).await?;
        assert_eq!(store.get("token").await?.as_deref(), Some("24.abc"));
        assert!(store.has("token").await?);

        assert!(store.delete("token").await?);
        assert!(!store.delete("token").await?);

        store.set("a", "1", None).await?;
        store.set("b", "2", None).await?;
        store.clear().await?;
        assert!(!store.has("a").await?);
        assert!(!store.has("b").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_kv_store_expiry() -> Result<()> {
        let store = MemoryKvStore::new();
        store.set("token", "24.abc", Some(Duration::ZERO)).await?;
        assert_eq!(store.get("token").await?, None);

        store
            .set("token", "24.abc", Some(Duration::from_secs(3600)))
            .await?;
        assert_eq!(store.get("token").await?.as_deref(), Some("24.abc"));

        store.set("token", "24.abc", Some(Duration::MAX)).await?;
        assert_eq!(store.get("token").await?.as_deref(), Some("24.abc"));
        Ok(())
    }
}
