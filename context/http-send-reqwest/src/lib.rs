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

//! Reqwest-based HTTP sending implementation for bcesign.
//!
//! This crate provides `ReqwestHttpSend`, which implements the `HttpSend` trait
//! from `bcesign_core` on top of a [`reqwest::Client`].
//!
//! ## Example
//!
//! ```no_run
//! use bcesign_core::Context;
//! use bcesign_http_send_reqwest::ReqwestHttpSend;
//! use std::time::Duration;
//!
//! # fn example() -> bcesign_core::Result<()> {
//! let http = ReqwestHttpSend::with_timeouts(Duration::from_secs(5), Duration::from_secs(10))?;
//! let ctx = Context::new().with_http_send(http);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bcesign_core::{Error, HttpSend, RequestTimeout, Result};
use bytes::Bytes;
use log::debug;
use reqwest::{Client, Request};
use std::time::Duration;

/// ReqwestHttpSend sends requests with a [`reqwest::Client`].
///
/// Non-2xx responses are returned as-is. A [`RequestTimeout`] found in the request
/// extensions overrides the client wide timeout for that request.
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a new ReqwestHttpSend whose client carries explicit connect and
    /// whole-request timeouts.
    pub fn with_timeouts(connect_timeout: Duration, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config_invalid("failed to build http client").with_source(e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let timeout = req.extensions().get::<RequestTimeout>().copied();

        let mut req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert request").with_source(e))?;
        if let Some(RequestTimeout(d)) = timeout {
            *req.timeout_mut() = Some(d);
        }

        let resp = self.client.execute(req).await.map_err(transport_error)?;

        let status = resp.status();
        let version = resp.version();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(transport_error)?;
        debug!("got response with status {status}, {} bytes", body.len());

        let mut http_resp = http::Response::new(body);
        *http_resp.status_mut() = status;
        *http_resp.version_mut() = version;
        *http_resp.headers_mut() = headers;
        Ok(http_resp)
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    let message = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "failed to connect"
    } else {
        "failed to send request"
    };
    Error::transport(message).with_source(err)
}
