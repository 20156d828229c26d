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

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;

use bcesign_bce_token::TokenCache;
use bcesign_bce_v1::constants::X_BCE_REQUEST_ID;
use bcesign_bce_v1::DefaultCredentialProvider;
use bcesign_core::{Context, Error, ProvideCredential, Result};

use crate::auth::Authorizer;
use crate::transport::{Endpoint, Transport};
use crate::{AuthMode, Config, Request, Response};

/// Client sends authenticated requests to one service endpoint and decodes
/// the result.
///
/// Client is cheap to clone, clones share the same token cache.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    ctx: Context,
    transport: Transport,
    auth: Authorizer,
}

impl Client {
    /// Create a client, the endpoint and the credential are validated here.
    pub fn new(ctx: Context, config: Config, mode: AuthMode) -> Result<Self> {
        Self::build(ctx, config, mode, None)
    }

    /// Create a token mode client sharing `cache` with other clients.
    pub fn with_token_cache(
        ctx: Context,
        config: Config,
        key: bcesign_bce_token::ApiKey,
        cache: Arc<TokenCache>,
    ) -> Result<Self> {
        Self::build(ctx, config, AuthMode::BearerToken(key), Some(cache))
    }

    /// Create a signature mode client from the environment.
    ///
    /// The endpoint and timeouts are loaded with [`Config::from_env`], the
    /// credential with [`DefaultCredentialProvider`].
    pub async fn from_env(ctx: Context, config: Config) -> Result<Self> {
        let config = config.from_env(&ctx);
        let credential = DefaultCredentialProvider::default()
            .provide_credential(&ctx)
            .await?
            .ok_or_else(|| Error::config_invalid("no credential found in env"))?;

        Self::new(ctx, config, AuthMode::Signature(credential))
    }

    fn build(
        ctx: Context,
        config: Config,
        mode: AuthMode,
        cache: Option<Arc<TokenCache>>,
    ) -> Result<Self> {
        let endpoint = Endpoint::parse(&config.endpoint)?;
        let auth = Authorizer::new(mode, &config, cache)?;

        Ok(Self {
            inner: Arc::new(Inner {
                ctx,
                transport: Transport::new(endpoint, config.timeout),
                auth,
            }),
        })
    }

    /// Send `req` and return the raw successful response.
    ///
    /// Non-success statuses are returned as `Service` errors.
    pub async fn send(&self, mut req: Request) -> Result<Response> {
        let inner = &self.inner;

        inner.auth.prepare(&inner.ctx, &mut req).await?;
        let req = inner.transport.build(req)?;
        let req = inner.auth.authorize(&inner.ctx, req).await?;

        match inner.transport.send(&inner.ctx, req).await {
            Ok(resp) => Ok(resp),
            Err(err) => {
                inner.auth.on_error(&err).await;
                Err(err)
            }
        }
    }

    /// Send a request and decode the JSON result.
    ///
    /// `{"error_code": .., "error_msg": ..}` and `{"status": .., "msg": ..}` with
    /// a status other than 200 are turned into `Service` errors even when the
    /// HTTP status is a success.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: impl Into<Bytes>,
        params: &[(String, String)],
        headers: HeaderMap,
    ) -> Result<Value> {
        let req = Request {
            method,
            path: path.to_string(),
            body: body.into(),
            params: params.to_vec(),
            headers,
        };
        self.send_json(req).await
    }

    /// Send a request and decode the JSON result into `T`.
    pub async fn send_as<T: DeserializeOwned>(&self, req: Request) -> Result<T> {
        let value = self.send_json(req).await?;
        serde_json::from_value(value)
            .map_err(|e| Error::unexpected("failed to decode response").with_source(e))
    }

    async fn send_json(&self, req: Request) -> Result<Value> {
        let resp = self.send(req).await?;
        match decode(&resp) {
            Ok(v) => Ok(v),
            Err(err) => {
                self.inner.auth.on_error(&err).await;
                Err(err)
            }
        }
    }
}

/// Decode a successful response, surfacing errors reported in the body.
fn decode(resp: &Response) -> Result<Value> {
    let value = match serde_json::from_slice::<Value>(&resp.body) {
        Ok(Value::Null) => return Err(Error::empty_response("response body is null")),
        Ok(v) => v,
        Err(e) if resp.body.iter().all(u8::is_ascii_whitespace) => {
            return Err(Error::empty_response("response body is empty").with_source(e))
        }
        Err(e) => {
            return Err(Error::empty_response("response body is not json").with_source(e))
        }
    };

    let request_id = resp
        .headers
        .get(X_BCE_REQUEST_ID)
        .and_then(|v| v.to_str().ok());

    let reported = match (value.get("error_code"), value.get("status")) {
        (Some(code), _) => Some((code, value.get("error_msg"))),
        (None, Some(status)) if status.is_number() && status.as_i64() != Some(200) => {
            Some((status, value.get("msg")))
        }
        _ => None,
    }
    .map(|(code, message)| {
        let code = match code {
            Value::String(s) => s.clone(),
            v => v.to_string(),
        };
        let message = message
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        (code, message)
    });

    let Some((code, message)) = reported else {
        return Ok(value);
    };

    let mut err = Error::service(resp.status, message).with_code(code);
    if let Some(request_id) = request_id {
        err = err.with_request_id(request_id);
    }
    Err(err)
}
