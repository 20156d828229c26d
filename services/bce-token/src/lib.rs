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

//! Access-token authentication for bcesign.
//!
//! Some Baidu services, like the Qianfan LLM endpoints, don't take `bce-auth-v1`
//! signatures. They authenticate with an OAuth2 access token passed as the
//! `access_token` query parameter, exchanged from an api key pair.
//!
//! [`TokenCache`] owns that exchange: it keeps tokens in a [`bcesign_core::KvStore`]
//! and only calls the issuer again once the cached token has expired.
//!
//! ```no_run
//! use bcesign_bce_token::{ApiKey, TokenCache};
//! use bcesign_core::Context;
//!
//! # async fn example(ctx: Context) -> bcesign_core::Result<()> {
//! let cache = TokenCache::default();
//! let token = cache.get(&ctx, &ApiKey::new("api_key", "secret_key")).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod constants;

mod credential;
pub use credential::ApiKey;

mod issue;
pub use issue::IssueToken;
pub use issue::OAuthTokenIssuer;
pub use issue::Token;

mod provide_credential;
pub use provide_credential::EnvApiKeyProvider;

mod token_cache;
pub use token_cache::TokenCache;
