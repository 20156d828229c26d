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

//! Request assembly and response classification shared by both auth modes.

use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST, TRANSFER_ENCODING, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use bcesign_bce_token::constants::ACCESS_TOKEN_PARAM;
use bcesign_bce_v1::constants::{X_BCE_DATE, X_BCE_REQUEST_ID};
use bcesign_bce_v1::{canonical_query_string, canonical_uri_path};
use bcesign_core::time::{format_iso8601, now};
use bcesign_core::utils::Redact;
use bcesign_core::{Context, Error, RequestTimeout, Result};

use crate::constants::{JSON_CONTENT_TYPE, USER_AGENT as USER_AGENT_VALUE};

/// Request is one logical call against a service.
///
/// `path` is the raw resource path, it's percent-encoded when the url is built.
/// A parameter with an empty value is sent as a bare key.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// HTTP method, `GET` by default.
    pub method: Method,
    /// Raw resource path, like `/v2/instance`.
    pub path: String,
    /// Request body.
    pub body: Bytes,
    /// Query parameters.
    pub params: Vec<(String, String)>,
    /// Extra headers, they win over the defaults except `Host` and `User-Agent`.
    pub headers: HeaderMap,
}

impl Request {
    /// Create a request for `path`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value).map_err(|e| {
            Error::request_invalid("failed to serialize request body").with_source(e)
        })?;
        self.body = body.into();
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        Ok(self)
    }

    /// Add a query parameter, an empty value is sent as a bare key.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Response is a successful (2xx or 304) response.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw response body.
    pub body: Bytes,
}

/// Endpoint is a parsed service endpoint.
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    /// `scheme://authority[/prefix]` without trailing slash.
    base: String,
    host: HeaderValue,
}

impl Endpoint {
    pub(crate) fn parse(endpoint: &str) -> Result<Self> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(Error::config_invalid("endpoint is required"));
        }

        let full = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{endpoint}")
        };
        let uri: Uri = full.parse().map_err(|e| {
            Error::config_invalid(format!("invalid endpoint: {endpoint}")).with_source(e)
        })?;
        let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) else {
            return Err(Error::config_invalid(format!(
                "endpoint has no host: {endpoint}"
            )));
        };

        let host = HeaderValue::from_str(authority.as_str()).map_err(|e| {
            Error::config_invalid(format!("invalid endpoint host: {authority}")).with_source(e)
        })?;
        Ok(Self {
            base: format!("{scheme}://{authority}{}", uri.path().trim_end_matches('/')),
            host,
        })
    }
}

/// Transport turns a [`Request`] into an HTTP request and classifies the response.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    endpoint: Endpoint,
    timeout: Duration,
}

impl Transport {
    pub(crate) fn new(endpoint: Endpoint, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    /// Build the unsigned HTTP request.
    pub(crate) fn build(&self, req: Request) -> Result<http::Request<Bytes>> {
        let Request {
            method,
            path,
            body,
            params,
            mut headers,
        } = req;

        headers.insert(USER_AGENT, HeaderValue::from_str(&USER_AGENT_VALUE)?);
        if !headers.contains_key(X_BCE_DATE) {
            headers.insert(X_BCE_DATE, HeaderValue::from_str(&format_iso8601(now()))?);
        }
        headers.insert(HOST, self.endpoint.host.clone());
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }
        // A zero length is kept so that the server doesn't wait for a body.
        if !headers.contains_key(CONTENT_LENGTH) {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        }

        let mut url = format!("{}{}", self.endpoint.base, canonical_uri_path(&path));
        let query = canonical_query_string(&params, false);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        let mut req = http::Request::builder()
            .method(method)
            .uri(url)
            .body(body)?;
        *req.headers_mut() = headers;
        Ok(req)
    }

    /// Send the request and classify the response.
    ///
    /// Only 2xx and 304 are returned, everything else becomes an error.
    pub(crate) async fn send(
        &self,
        ctx: &Context,
        mut req: http::Request<Bytes>,
    ) -> Result<Response> {
        req.extensions_mut().insert(RequestTimeout(self.timeout));
        debug!("sending request: {} {}", req.method(), loggable_uri(req.uri()));

        let (parts, body) = ctx.http_send(req).await?.into_parts();
        let mut status = parts.status;
        debug!("received response: {status}");

        if status.is_informational() {
            return Err(
                Error::transport(format!("can't handle informational status {status}"))
                    .with_status(status),
            );
        }

        // The status of a chunked response can't be trusted, the body tells the truth.
        if is_chunked(&parts.headers)
            && is_json(&parts.headers)
            && body_field(&body, "code").as_deref() == Some("InternalError")
        {
            status = StatusCode::INTERNAL_SERVER_ERROR;
        }

        if !(status.is_success() || status == StatusCode::NOT_MODIFIED) {
            return Err(service_error(status, &parts.headers, &body));
        }

        Ok(Response {
            status,
            headers: parts.headers,
            body,
        })
    }
}

/// Render `uri` for logs with the bearer token redacted.
fn loggable_uri(uri: &Uri) -> String {
    let Some(query) = uri.query() else {
        return uri.to_string();
    };

    let query = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) if k == ACCESS_TOKEN_PARAM => format!("{k}={:?}", Redact::from(v)),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");
    let base = uri.to_string();
    let base = base.split_once('?').map_or(base.as_str(), |(b, _)| b);
    format!("{base}?{query}")
}

fn is_chunked(headers: &HeaderMap) -> bool {
    headers
        .get_all(TRANSFER_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains("chunked"))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains(JSON_CONTENT_TYPE))
        .unwrap_or(false)
}

/// Read a string or number field of a JSON object body.
fn body_field(body: &[u8], field: &str) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn service_error(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Error {
    let mut message = status
        .canonical_reason()
        .unwrap_or("unknown status")
        .to_string();
    let mut code = None;

    if is_json(headers) {
        match serde_json::from_slice::<Value>(body) {
            Ok(_) => {
                if let Some(v) = body_field(body, "message") {
                    message = v;
                }
                code = body_field(body, "code");
            }
            Err(e) => warn!("failed to parse error response body: {e}"),
        }
    }

    let mut err = Error::service(status, message);
    if let Some(code) = code {
        err = err.with_code(code);
    }
    if let Some(request_id) = headers.get(X_BCE_REQUEST_ID).and_then(|v| v.to_str().ok()) {
        err = err.with_request_id(request_id);
    }
    err
}
