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

//! Baidu Cloud (BCE) `bce-auth-v1` signing for bcesign.
//!
//! This crate produces the `Authorization` value expected by BCE services:
//!
//! ```text
//! bce-auth-v1/{access_key_id}/{timestamp}/{expiration}/{signed_headers}/{signature}
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use bcesign_bce_v1::{Credential, RequestSigner};
//! use bcesign_core::{Context, SignRequest};
//!
//! # async fn example() -> bcesign_core::Result<()> {
//! let ctx = Context::new();
//! let cred = Credential::new("my-ak", "my-sk");
//!
//! let req = http::Request::get("https://bcc.bj.baidubce.com/v2/instance")
//!     .body(())?;
//! let (mut parts, _) = req.into_parts();
//!
//! RequestSigner::new()
//!     .sign_request(&ctx, &mut parts, Some(&cred), None)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod constants;

mod canonical;
pub use canonical::canonical_headers;
pub use canonical::canonical_query_string;
pub use canonical::canonical_uri_path;
pub use canonical::uri_encode;

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::sign;
pub use sign_request::RequestSigner;
pub use sign_request::SignOptions;

mod provide_credential;
pub use provide_credential::*;
