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


use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bcesign_bce_token::{ApiKey, IssueToken, Token, TokenCache};
use bcesign_core::{Context, KvStore};
use bcesign_kv_redis::RedisKvStore;
use log::warn;
use pretty_assertions::assert_eq;

async fn init_store() -> Option<RedisKvStore> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("BCESIGN_KV_REDIS_TEST").ok().as_deref() != Some("on") {
        return None;
    }

    let url = env::var("BCESIGN_KV_REDIS_URL").expect("env BCESIGN_KV_REDIS_URL must set");
    let store = RedisKvStore::connect(&url)
        .await
        .expect("redis must be reachable")
        .with_key_prefix("bcesign-test:");
    Some(store)
}

#[tokio::test]
async fn test_redis_kv_store() -> Result<()> {
    let Some(store) = init_store().await else {
        warn!("BCESIGN_KV_REDIS_TEST is not set, skipped");
        return Ok(());
    };

    store.set("token", "24.abc", None).await?;
    assert_eq!(store.get("token").await?.as_deref(), Some("24.abc"));
    assert!(store.has("token").await?);

    assert!(store.delete("token").await?);
    assert!(!store.delete("token").await?);
    assert_eq!(store.get("token").await?, None);

    store.set("short", "1", Some(Duration::from_secs(1))).await?;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!store.has("short").await?);

    store.set("gone", "1", Some(Duration::ZERO)).await?;
    assert!(!store.has("gone").await?);
    Ok(())
}

#[derive(Debug)]
struct FixedIssuer;

#[async_trait]
impl IssueToken for FixedIssuer {
    async fn issue_token(&self, _: &Context, _: &ApiKey) -> bcesign_core::Result<Token> {
        Ok(Token {
            access_token: "24.shared".to_string(),
            expires_in: Some(60),
        })
    }
}

#[derive(Debug)]
struct FailingIssuer;

#[async_trait]
impl IssueToken for FailingIssuer {
    async fn issue_token(&self, _: &Context, _: &ApiKey) -> bcesign_core::Result<Token> {
        Err(bcesign_core::Error::token_acquisition("must not be called"))
    }
}

#[tokio::test]
async fn test_token_shared_across_caches() -> Result<()> {
    let Some(store) = init_store().await else {
        warn!("BCESIGN_KV_REDIS_TEST is not set, skipped");
        return Ok(());
    };
    let store: Arc<dyn KvStore> = Arc::new(store);
    let key = ApiKey::new("api", "secret");
    let ctx = Context::new();

    let writer = TokenCache::new(store.clone(), Arc::new(FixedIssuer));
    writer.invalidate(&key).await?;
    assert_eq!(writer.get(&ctx, &key).await?, "24.shared");

    // A second cache over the same database reads the token without issuing.
    let reader = TokenCache::new(store.clone(), Arc::new(FailingIssuer));
    assert_eq!(reader.get(&ctx, &key).await?, "24.shared");

    writer.invalidate(&key).await?;
    Ok(())
}
