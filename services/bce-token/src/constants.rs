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

/// OAuth2 endpoint issuing access tokens for token-authenticated services.
pub const TOKEN_ENDPOINT: &str = "https://aip.baidubce.com/oauth/2.0/token";

/// Namespace mixed into the cache key of every token.
pub const TOKEN_CACHE_NAMESPACE: &str = "baidubce_";

/// Lifetime of a token when the issuer doesn't report one, in seconds.
pub const DEFAULT_TOKEN_TTL_IN_SECONDS: u64 = 3600;

/// Query parameter carrying the token on authenticated requests.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

// Env values used by token-authenticated services.
pub const QIANFAN_API_KEY: &str = "QIANFAN_API_KEY";
pub const QIANFAN_SECRET_KEY: &str = "QIANFAN_SECRET_KEY";
