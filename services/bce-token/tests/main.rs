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

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use bcesign_bce_token::{ApiKey, OAuthTokenIssuer, TokenCache};
use bcesign_core::{Context, ErrorKind, HttpSend, MemoryKvStore};
use bytes::Bytes;
use http::StatusCode;
use pretty_assertions::assert_eq;

/// Replies with a fixed response and records every request it sees.
#[derive(Debug)]
struct MockTokenEndpoint {
    status: StatusCode,
    body: &'static str,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockTokenEndpoint {
    fn new(status: StatusCode, body: &'static str) -> (Self, Arc<Mutex<Vec<String>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                status,
                body,
                requests: requests.clone(),
            },
            requests,
        )
    }
}

#[async_trait]
impl HttpSend for MockTokenEndpoint {
    async fn http_send(
        &self,
        req: http::Request<Bytes>,
    ) -> bcesign_core::Result<http::Response<Bytes>> {
        self.requests
            .lock()
            .expect("lock must be held")
            .push(format!("{} {}", req.method(), req.uri()));

        Ok(http::Response::builder()
            .status(self.status)
            .header("content-type", "application/json")
            .body(Bytes::from_static(self.body.as_bytes()))?)
    }
}

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[tokio::test]
async fn test_token_is_issued_once_and_cached() -> Result<()> {
    init();

    let (endpoint, requests) = MockTokenEndpoint::new(
        StatusCode::OK,
        r#"{"access_token":"24.cached","expires_in":2592000}"#,
    );
    let ctx = Context::new().with_http_send(endpoint);
    let cache = TokenCache::new(
        Arc::new(MemoryKvStore::new()),
        Arc::new(OAuthTokenIssuer::new().with_endpoint("http://127.0.0.1:9/oauth/2.0/token")),
    );
    let key = ApiKey::new("api", "secret");

    assert_eq!(cache.get(&ctx, &key).await?, "24.cached");
    assert_eq!(cache.get(&ctx, &key).await?, "24.cached");

    let requests = requests.lock().expect("lock must be held").clone();
    assert_eq!(
        requests,
        vec!["POST http://127.0.0.1:9/oauth/2.0/token?grant_type=client_credentials&client_id=api&client_secret=secret".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_wrapped_envelope_is_accepted() -> Result<()> {
    init();

    let (endpoint, _) = MockTokenEndpoint::new(
        StatusCode::OK,
        r#"{"status":200,"msg":"success","data":{"access_token":"24.wrapped","expires_in":60}}"#,
    );
    let ctx = Context::new().with_http_send(endpoint);

    let token = TokenCache::default()
        .get(&ctx, &ApiKey::new("api", "secret"))
        .await?;
    assert_eq!(token, "24.wrapped");
    Ok(())
}

#[tokio::test]
async fn test_rejected_key_is_not_cached() -> Result<()> {
    init();

    let (endpoint, requests) = MockTokenEndpoint::new(
        StatusCode::UNAUTHORIZED,
        r#"{"error":"invalid_client","error_description":"unknown client id"}"#,
    );
    let ctx = Context::new().with_http_send(endpoint);
    let cache = TokenCache::default();
    let key = ApiKey::new("api", "secret");

    for _ in 0..2 {
        let err = cache.get(&ctx, &key).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenAcquisition);
        assert_eq!(err.code(), Some("invalid_client"));
    }
    assert_eq!(requests.lock().expect("lock must be held").len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_endpoint_is_token_acquisition() -> Result<()> {
    init();

    // The default context can't send anything.
    let err = TokenCache::default()
        .get(&Context::new(), &ApiKey::new("api", "secret"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TokenAcquisition);
    Ok(())
}
