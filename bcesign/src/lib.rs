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

//! Signing and sending Baidu Cloud (BCE) API requests without effort.
//!
//! A [`Client`] is bound to one service endpoint and one [`AuthMode`]:
//!
//! - [`AuthMode::Signature`] signs every request with `bce-auth-v1`, used by
//!   BCC, VPC and most other services.
//! - [`AuthMode::BearerToken`] exchanges an api key for an OAuth2 access token
//!   and sends it as the `access_token` query parameter, used by the Qianfan
//!   LLM endpoints.
//!
//! Errors reported by services, either through the HTTP status or inside a
//! successful body, come back as [`Error`]s of kind [`ErrorKind::Service`].
//!
//! ## Example
//!
//! ```no_run
//! use bcesign::{default_context, AuthMode, Client, Config};
//! use http::{HeaderMap, Method};
//!
//! # async fn example() -> bcesign::Result<()> {
//! let config = Config::new().with_endpoint("bcc.bj.baidubce.com");
//! let ctx = default_context(&config)?;
//! let cred = bcesign::bce_v1::Credential::new("my-ak", "my-sk");
//! let client = Client::new(ctx, config, AuthMode::Signature(cred))?;
//!
//! let instances = client
//!     .request(
//!         Method::GET,
//!         "/v2/instance",
//!         "",
//!         &[("maxKeys".to_string(), "10".to_string())],
//!         HeaderMap::new(),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub use bcesign_core::*;

/// `bce-auth-v1` signing.
pub mod bce_v1 {
    pub use bcesign_bce_v1::*;
}

/// Access-token authentication.
pub mod bce_token {
    pub use bcesign_bce_token::*;
}

mod constants;

mod config;
pub use config::Config;

mod auth;
pub use auth::AuthMode;

mod transport;
pub use transport::Request;
pub use transport::Response;

mod client;
pub use client::Client;

#[cfg(feature = "default-context")]
mod context;
#[cfg(feature = "default-context")]
pub use context::default_context;
