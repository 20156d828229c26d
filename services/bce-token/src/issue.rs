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

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, StatusCode};
use log::debug;
use serde::Deserialize;

use bcesign_core::utils::Redact;
use bcesign_core::{Context, Error, Result};

use crate::constants::TOKEN_ENDPOINT;
use crate::ApiKey;

/// Token is a freshly issued access token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    /// The opaque bearer value.
    pub access_token: String,
    /// Lifetime reported by the issuer, in seconds.
    pub expires_in: Option<u64>,
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &Redact::from(&self.access_token))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// IssueToken exchanges an [`ApiKey`] for a [`Token`].
#[async_trait]
pub trait IssueToken: Debug + Send + Sync + 'static {
    /// Issue a new token, failures are reported as `TokenAcquisition`.
    async fn issue_token(&self, ctx: &Context, key: &ApiKey) -> Result<Token>;
}

/// OAuthTokenIssuer talks to the OAuth2 `client_credentials` endpoint.
#[derive(Debug, Clone)]
pub struct OAuthTokenIssuer {
    endpoint: String,
}

impl Default for OAuthTokenIssuer {
    fn default() -> Self {
        Self {
            endpoint: TOKEN_ENDPOINT.to_string(),
        }
    }
}

impl OAuthTokenIssuer {
    /// Create an issuer for the default endpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another token endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_request(&self, key: &ApiKey) -> Result<http::Request<Bytes>> {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "client_credentials")
            .append_pair("client_id", &key.api_key)
            .append_pair("client_secret", &key.secret_key)
            .finish();

        let req = http::Request::builder()
            .method(Method::POST)
            .uri(format!("{}?{query}", self.endpoint))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(CONTENT_LENGTH, 0)
            .body(Bytes::new())?;
        Ok(req)
    }
}

#[async_trait]
impl IssueToken for OAuthTokenIssuer {
    async fn issue_token(&self, ctx: &Context, key: &ApiKey) -> Result<Token> {
        let req = self.build_request(key)?;
        debug!("issuing access token from {}", self.endpoint);

        let resp = ctx.http_send(req).await.map_err(|e| {
            Error::token_acquisition("failed to request access token").with_source(e)
        })?;
        let status = resp.status();
        parse_token_response(status, resp.body())
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default)]
struct TokenResponse {
    // Wrapped envelope: `{status, data, msg}`.
    status: Option<i64>,
    msg: Option<String>,
    data: Option<TokenData>,

    // Bare envelope: `{access_token, expires_in}`.
    access_token: Option<String>,
    expires_in: Option<u64>,

    // OAuth2 error envelope.
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default)]
struct TokenData {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

fn parse_token_response(status: StatusCode, body: &[u8]) -> Result<Token> {
    let resp: Option<TokenResponse> = serde_json::from_slice(body).ok();

    if let Some(TokenResponse {
        error: Some(error),
        error_description,
        ..
    }) = &resp
    {
        let message = error_description.as_deref().unwrap_or(error);
        return Err(Error::token_acquisition(format!(
            "token endpoint rejected the request: {message}"
        ))
        .with_status(status)
        .with_code(error));
    }

    if !status.is_success() {
        return Err(Error::token_acquisition(format!(
            "token endpoint responded {status}: {}",
            String::from_utf8_lossy(body)
        ))
        .with_status(status));
    }

    let Some(resp) = resp else {
        return Err(Error::token_acquisition(
            "token endpoint returned an undecodable response",
        ));
    };

    let (access_token, expires_in) = match resp.status {
        Some(200) => match resp.data {
            Some(data) => (data.access_token, data.expires_in),
            None => (None, None),
        },
        Some(code) => {
            return Err(Error::token_acquisition(format!(
                "token endpoint returned status {code}: {}",
                resp.msg.as_deref().unwrap_or("unknown error")
            ))
            .with_code(code.to_string()));
        }
        None => (resp.access_token, resp.expires_in),
    };

    match access_token {
        Some(access_token) if !access_token.is_empty() => Ok(Token {
            access_token,
            expires_in,
        }),
        _ => Err(Error::token_acquisition(
            "token endpoint returned no access_token",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcesign_core::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_request() -> Result<()> {
        let issuer = OAuthTokenIssuer::new().with_endpoint("http://127.0.0.1/oauth/2.0/token");
        let req = issuer.build_request(&ApiKey::new("my key", "s&k"))?;

        assert_eq!(req.method(), Method::POST);
        assert_eq!(
            req.uri().to_string(),
            "http://127.0.0.1/oauth/2.0/token?grant_type=client_credentials&client_id=my+key&client_secret=s%26k"
        );
        assert_eq!(req.headers()[CONTENT_LENGTH], "0");
        Ok(())
    }

    #[test]
    fn test_parse_bare_envelope() -> Result<()> {
        let token = parse_token_response(
            StatusCode::OK,
            br#"{"access_token":"24.abc","expires_in":2592000,"scope":"public"}"#,
        )?;
        assert_eq!(token.access_token, "24.abc");
        assert_eq!(token.expires_in, Some(2592000));
        Ok(())
    }

    #[test]
    fn test_parse_wrapped_envelope() -> Result<()> {
        let token = parse_token_response(
            StatusCode::OK,
            br#"{"status":200,"msg":"ok","data":{"access_token":"24.def"}}"#,
        )?;
        assert_eq!(token.access_token, "24.def");
        assert_eq!(token.expires_in, None);
        Ok(())
    }

    #[test]
    fn test_parse_wrapped_envelope_failure() {
        let err = parse_token_response(
            StatusCode::OK,
            br#"{"status":400,"msg":"invalid client"}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenAcquisition);
        assert_eq!(err.code(), Some("400"));
        assert!(err.message().contains("invalid client"));
    }

    #[test]
    fn test_parse_oauth_error() {
        let err = parse_token_response(
            StatusCode::UNAUTHORIZED,
            br#"{"error":"invalid_client","error_description":"unknown client id"}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenAcquisition);
        assert_eq!(err.code(), Some("invalid_client"));
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(err.message().contains("unknown client id"));
    }

    #[test]
    fn test_parse_non_json() {
        let err = parse_token_response(StatusCode::OK, b"<html></html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenAcquisition);

        let err = parse_token_response(StatusCode::BAD_GATEWAY, b"bad gateway").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenAcquisition);
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
    }

    #[test]
    fn test_parse_missing_token() {
        let err = parse_token_response(StatusCode::OK, br#"{"expires_in":10}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenAcquisition);
    }
}
