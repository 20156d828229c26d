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


//! Redis backed key/value storage for bcesign.
//!
//! This crate provides `RedisKvStore`, which implements the `KvStore` trait
//! from `bcesign_core` so that cached access tokens are shared by every process
//! talking to the same redis database.
//!
//! ## Example
//!
//! ```no_run
//! use bcesign_kv_redis::RedisKvStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> bcesign_core::Result<()> {
//! let store = RedisKvStore::connect("redis://127.0.0.1:6379/0")
//!     .await?
//!     .with_key_prefix("bcesign:");
//! let store = Arc::new(store);
//! # Ok(())
//! # }
//! ```

use std::fmt::{Debug, Formatter};
use std::time::Duration;

use async_trait::async_trait;
use bcesign_core::{Error, KvStore, Result};
use log::debug;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};

/// Longest expiry sent to redis, longer ttls are stored without one.
const MAX_EXPIRE_SECONDS: u64 = i32::MAX as u64;

/// RedisKvStore keeps entries in redis.
///
/// Every key is prefixed with `key_prefix`. [`KvStore::clear`] runs `FLUSHDB`,
/// so it drops the whole selected database, not only the prefixed keys.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl Debug for RedisKvStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKvStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl RedisKvStore {
    /// Create a store over an established connection.
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            key_prefix: String::new(),
        }
    }

    /// Connect to `url`, like `redis://:password@127.0.0.1:6379/2`.
    ///
    /// Password and database are taken from the url.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::config_invalid("invalid redis url").with_source(e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| map_redis_error("failed to connect to redis", e))?;
        Ok(Self::new(conn))
    }

    /// Prefix every key with `prefix`.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(self.key(key))
            .await
            .map_err(|e| map_redis_error("failed to get key from redis", e))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        let result = match expiry(ttl) {
            Expiry::Never => conn.set::<_, _, ()>(key, value).await,
            Expiry::In(secs) => conn.set_ex::<_, _, ()>(key, value, secs).await,
            Expiry::Now => {
                debug!("ttl is zero, removing {key} instead of setting it");
                conn.del::<_, ()>(key).await
            }
        };
        result.map_err(|e| map_redis_error("failed to set key in redis", e))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn
            .del(self.key(key))
            .await
            .map_err(|e| map_redis_error("failed to delete key from redis", e))?;
        Ok(removed > 0)
    }

    async fn has(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(self.key(key))
            .await
            .map_err(|e| map_redis_error("failed to check key in redis", e))
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("FLUSHDB")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to flush redis database", e))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Expiry {
    Never,
    Now,
    In(u64),
}

/// Redis expires in whole seconds, so partial seconds are rounded up.
fn expiry(ttl: Option<Duration>) -> Expiry {
    let Some(ttl) = ttl else {
        return Expiry::Never;
    };
    if ttl.is_zero() {
        return Expiry::Now;
    }

    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    if secs > MAX_EXPIRE_SECONDS {
        Expiry::Never
    } else {
        Expiry::In(secs)
    }
}

fn map_redis_error(message: &str, err: RedisError) -> Error {
    if err.is_io_error()
        || err.is_timeout()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
    {
        Error::transport(message).with_source(err)
    } else {
        Error::unexpected(message).with_source(err)
    }
}
