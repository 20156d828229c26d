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

use std::time::Duration;

use bcesign_bce_token::constants::{DEFAULT_TOKEN_TTL_IN_SECONDS, TOKEN_ENDPOINT};
use bcesign_bce_v1::constants::DEFAULT_EXPIRATION_IN_SECONDS;
use bcesign_core::Context;
use log::warn;

use crate::constants::*;

/// Config for [`crate::Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Service endpoint, like `bcc.bj.baidubce.com` or `https://aip.baidubce.com`.
    ///
    /// `http://` is assumed when no scheme is given.
    ///
    /// Loaded from env value [`BCE_ENDPOINT`] if empty.
    pub endpoint: String,
    /// Connect timeout, `5s` by default.
    ///
    /// Loaded from env value [`BCE_CONNECT_TIMEOUT_MS`].
    pub connect_timeout: Duration,
    /// Timeout of a whole request, `10s` by default.
    ///
    /// Loaded from env value [`BCE_TIMEOUT_MS`].
    pub timeout: Duration,
    /// Validity window of signatures in seconds, `1800` by default.
    pub expiration_in_seconds: u64,
    /// Headers bound into signatures, see [`bcesign_bce_v1::SignOptions`].
    pub headers_to_sign: Option<Vec<String>>,
    /// OAuth2 endpoint used in token mode.
    pub token_endpoint: String,
    /// Token lifetime used when the issuer doesn't report one, `3600s` by default.
    pub token_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
            expiration_in_seconds: DEFAULT_EXPIRATION_IN_SECONDS,
            headers_to_sign: None,
            token_endpoint: TOKEN_ENDPOINT.to_string(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_IN_SECONDS),
        }
    }
}

impl Config {
    /// Create a new Config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the validity window of signatures.
    pub fn with_expiration_in_seconds(mut self, v: u64) -> Self {
        self.expiration_in_seconds = v;
        self
    }

    /// Set the headers bound into signatures.
    pub fn with_headers_to_sign<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers_to_sign = Some(headers.into_iter().map(Into::into).collect());
        self
    }

    /// Set the OAuth2 token endpoint.
    pub fn with_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = endpoint.into();
        self
    }

    /// Set the fallback token lifetime.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Load config from env.
    ///
    /// An endpoint already set is kept. Timeouts that fail to parse are ignored.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        if self.endpoint.is_empty() {
            if let Some(v) = ctx.env_var(BCE_ENDPOINT) {
                self.endpoint = v;
            }
        }
        if let Some(v) = duration_from_env(ctx, BCE_CONNECT_TIMEOUT_MS) {
            self.connect_timeout = v;
        }
        if let Some(v) = duration_from_env(ctx, BCE_TIMEOUT_MS) {
            self.timeout = v;
        }

        self
    }
}

fn duration_from_env(ctx: &Context, key: &str) -> Option<Duration> {
    let v = ctx.env_var(key)?;
    match v.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(e) => {
            warn!("ignoring env {key}={v}: {e}");
            None
        }
    }
}
