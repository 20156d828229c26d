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

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use http::request::Parts;
use http::{header, HeaderMap, HeaderValue, Method};
use log::debug;

use bcesign_core::hash::hex_hmac_sha256;
use bcesign_core::time::{format_iso8601, now, parse_rfc3339, DateTime};
use bcesign_core::{Context, Error, Result, SignRequest, SigningCredential, SigningRequest};

use crate::canonical::{canonical_headers, canonical_query_string, canonical_uri_path};
use crate::constants::*;
use crate::Credential;

/// SignOptions controls the validity window of a signature and the headers bound into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOptions {
    /// How long the signature stays valid, `1800` by default.
    pub expiration_in_seconds: u64,
    /// Signing time, `now` when unset.
    pub timestamp: Option<DateTime>,
    /// Headers to sign, matched case-insensitively.
    ///
    /// When unset, `host`, `content-length`, `content-type`, `content-md5` and every
    /// `x-bce-*` header are signed, and their names are not echoed in the auth string.
    pub headers_to_sign: Option<Vec<String>>,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            expiration_in_seconds: DEFAULT_EXPIRATION_IN_SECONDS,
            timestamp: None,
            headers_to_sign: None,
        }
    }
}

impl SignOptions {
    /// Set the validity window.
    pub fn with_expiration_in_seconds(mut self, v: u64) -> Self {
        self.expiration_in_seconds = v;
        self
    }

    /// Set the signing time.
    pub fn with_timestamp(mut self, v: DateTime) -> Self {
        self.timestamp = Some(v);
        self
    }

    /// Set the headers to sign.
    pub fn with_headers_to_sign<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers_to_sign = Some(headers.into_iter().map(Into::into).collect());
        self
    }
}

/// Compute the `bce-auth-v1` authorization string of a request.
///
/// ```text
/// bce-auth-v1/{accessKeyId}/{timestamp}/{expirationInSeconds}/{signedHeaders}/{signature}
/// ```
///
/// `path` is the raw, not yet encoded path and `params` the raw query parameters.
pub fn sign(
    cred: &Credential,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    params: &[(String, String)],
    options: &SignOptions,
) -> Result<String> {
    if cred.access_key_id.is_empty() {
        return Err(Error::config_invalid(
            "access key id is required for signing",
        ));
    }
    if cred.secret_access_key.is_empty() {
        return Err(Error::config_invalid(
            "secret access key is required for signing",
        ));
    }

    let timestamp = options.timestamp.unwrap_or_else(now);
    let auth_string_prefix = format!(
        "{BCE_AUTH_VERSION}/{}/{}/{}",
        cred.access_key_id,
        format_iso8601(timestamp),
        options.expiration_in_seconds
    );

    // The hex digest, not the raw bytes, is the key of the second round.
    let signing_key = hex_hmac_sha256(
        cred.secret_access_key.as_bytes(),
        auth_string_prefix.as_bytes(),
    );

    let selected = headers_to_sign(headers, options.headers_to_sign.as_deref())?;
    let canonical_request = format!(
        "{}\n{}\n{}\n{}",
        method.as_str(),
        canonical_uri_path(path),
        canonical_query_string(params, true),
        canonical_headers(&selected)
    );
    debug!("calculated canonical request: {canonical_request}");

    let signature = hex_hmac_sha256(signing_key.as_bytes(), canonical_request.as_bytes());

    let signed_headers = if options.headers_to_sign.is_some() {
        selected
            .iter()
            .map(|(k, _)| *k)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>()
            .join(";")
    } else {
        String::new()
    };

    Ok(format!("{auth_string_prefix}/{signed_headers}/{signature}"))
}

/// Select the headers bound into the signature.
///
/// Headers with an empty value are never signed.
fn headers_to_sign<'a>(
    headers: &'a HeaderMap,
    explicit: Option<&[String]>,
) -> Result<Vec<(&'a str, &'a str)>> {
    let explicit: Option<BTreeSet<String>> =
        explicit.map(|hs| hs.iter().map(|h| h.trim().to_lowercase()).collect());

    let mut selected = Vec::new();
    for name in headers.keys() {
        // HeaderName is always lowercase.
        let name = name.as_str();
        let wanted = match &explicit {
            Some(hs) => hs.contains(name),
            None => DEFAULT_HEADERS_TO_SIGN.contains(name) || name.starts_with(BCE_PREFIX),
        };
        if !wanted {
            continue;
        }

        // The server verifies against one value per header.
        let mut values = headers.get_all(name).iter();
        let (Some(value), None) = (values.next(), values.next()) else {
            return Err(Error::request_invalid(format!(
                "header {name} has multiple values and can't be signed"
            )));
        };
        let value = value.to_str().map_err(|e| {
            Error::signature(format!("header {name} has a value that can't be signed"))
                .with_source(e)
        })?;
        if value.trim().is_empty() {
            continue;
        }
        selected.push((name, value));
    }

    Ok(selected)
}

/// RequestSigner that implements the BCE `bce-auth-v1` signing protocol.
///
/// It signs [`http::request::Parts`] in place by adding the `Authorization` header.
#[derive(Debug, Default)]
pub struct RequestSigner {
    headers_to_sign: Option<Vec<String>>,

    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign exactly these headers and echo their names in the auth string.
    pub fn with_headers_to_sign<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers_to_sign = Some(headers.into_iter().map(Into::into).collect());
        self
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let cred = credential.ok_or_else(|| Error::config_invalid("missing credential"))?;
        if !cred.is_valid() {
            return Err(Error::config_invalid(
                "access key id and secret access key are required for signing",
            ));
        }

        let mut signed_req = SigningRequest::build(req)?;
        canonicalize_header(&mut signed_req, cred)?;

        // Prefer the request's own x-bce-date so the header and the auth string agree.
        let timestamp = self.time.or_else(|| {
            signed_req
                .headers
                .get(X_BCE_DATE)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| parse_rfc3339(v).ok())
        });
        let options = SignOptions {
            expiration_in_seconds: expires_in
                .map(|d| d.as_secs())
                .unwrap_or(DEFAULT_EXPIRATION_IN_SECONDS),
            timestamp,
            headers_to_sign: self.headers_to_sign.clone(),
        };

        let path = signed_req.path_percent_decoded().into_owned();
        let authorization = sign(
            cred,
            &signed_req.method,
            &path,
            &signed_req.headers,
            &signed_req.query,
            &options,
        )?;

        let mut value = HeaderValue::from_str(&authorization).map_err(|e| {
            Error::signature("failed to create authorization header").with_source(e)
        })?;
        value.set_sensitive(true);
        signed_req.headers.insert(header::AUTHORIZATION, value);

        signed_req.apply(req)
    }
}

fn canonicalize_header(ctx: &mut SigningRequest, cred: &Credential) -> Result<()> {
    for (_, value) in ctx.headers.iter_mut() {
        SigningRequest::header_value_normalize(value)
    }

    // Insert HOST header if not present.
    if ctx.headers.get(header::HOST).is_none() {
        let host = HeaderValue::from_str(ctx.authority.as_str())?;
        ctx.headers.insert(header::HOST, host);
    }

    // Insert session token so that it's bound into the signature.
    if let Some(token) = &cred.session_token {
        let mut value = HeaderValue::from_str(token)?;
        value.set_sensitive(true);
        ctx.headers.insert(X_BCE_SECURITY_TOKEN, value);
    }

    Ok(())
}
