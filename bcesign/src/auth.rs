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
use std::time::Duration;

use bytes::Bytes;
use log::{debug, warn};

use bcesign_bce_token::constants::ACCESS_TOKEN_PARAM;
use bcesign_bce_token::{ApiKey, OAuthTokenIssuer, TokenCache};
use bcesign_bce_v1::{Credential, RequestSigner};
use bcesign_core::{
    Context, Error, ErrorKind, MemoryKvStore, Result, SignRequest, SigningCredential,
};

use crate::constants::INVALID_TOKEN_CODES;
use crate::{Config, Request};

/// AuthMode selects how a client authenticates its requests.
///
/// The two modes are mutually exclusive, a client uses exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Sign every request with `bce-auth-v1`.
    Signature(Credential),
    /// Send an OAuth2 access token, exchanged from the api key, as the
    /// `access_token` query parameter.
    BearerToken(ApiKey),
}

#[derive(Debug)]
pub(crate) enum Authorizer {
    Signature {
        credential: Credential,
        signer: RequestSigner,
        expires_in: Duration,
    },
    BearerToken {
        key: ApiKey,
        cache: Arc<TokenCache>,
    },
}

impl Authorizer {
    /// Validate the credential of `mode` and build its authorizer.
    ///
    /// A token mode client without `cache` gets its own in-memory one.
    pub(crate) fn new(
        mode: AuthMode,
        config: &Config,
        cache: Option<Arc<TokenCache>>,
    ) -> Result<Self> {
        match mode {
            AuthMode::Signature(credential) => {
                if !credential.is_valid() {
                    return Err(Error::config_invalid(
                        "access key id and secret access key are required",
                    ));
                }

                let mut signer = RequestSigner::new();
                if let Some(headers) = &config.headers_to_sign {
                    signer = signer.with_headers_to_sign(headers.iter().cloned());
                }
                Ok(Self::Signature {
                    credential,
                    signer,
                    expires_in: Duration::from_secs(config.expiration_in_seconds),
                })
            }
            AuthMode::BearerToken(key) => {
                if !key.is_valid() {
                    return Err(Error::config_invalid("api key and secret key are required"));
                }

                let cache = cache.unwrap_or_else(|| {
                    Arc::new(
                        TokenCache::new(
                            Arc::new(MemoryKvStore::new()),
                            Arc::new(
                                OAuthTokenIssuer::new().with_endpoint(&config.token_endpoint),
                            ),
                        )
                        .with_default_ttl(config.token_ttl),
                    )
                });
                Ok(Self::BearerToken { key, cache })
            }
        }
    }

    /// Attach what must be known before the url is built.
    pub(crate) async fn prepare(&self, ctx: &Context, req: &mut Request) -> Result<()> {
        if let Self::BearerToken { key, cache } = self {
            let token = cache.get(ctx, key).await?;
            req.params.retain(|(k, _)| k != ACCESS_TOKEN_PARAM);
            req.params.push((ACCESS_TOKEN_PARAM.to_string(), token));
        }
        Ok(())
    }

    /// Authorize the assembled HTTP request.
    pub(crate) async fn authorize(
        &self,
        ctx: &Context,
        req: http::Request<Bytes>,
    ) -> Result<http::Request<Bytes>> {
        match self {
            Self::Signature {
                credential,
                signer,
                expires_in,
            } => {
                let (mut parts, body) = req.into_parts();
                signer
                    .sign_request(ctx, &mut parts, Some(credential), Some(*expires_in))
                    .await?;
                Ok(http::Request::from_parts(parts, body))
            }
            Self::BearerToken { .. } => Ok(req),
        }
    }

    /// React to a failed call, a rejected token is dropped from the cache.
    pub(crate) async fn on_error(&self, err: &Error) {
        let Self::BearerToken { key, cache } = self else {
            return;
        };
        if err.kind() != ErrorKind::Service {
            return;
        }
        let Some(code) = err.code() else {
            return;
        };

        if INVALID_TOKEN_CODES.contains(&code) {
            debug!("access token rejected with code {code}, invalidating");
            if let Err(e) = cache.invalidate(key).await {
                warn!("failed to invalidate access token: {e}");
            }
        }
    }
}
