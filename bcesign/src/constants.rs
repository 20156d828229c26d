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

use once_cell::sync::Lazy;

/// `User-Agent` sent with every request.
pub static USER_AGENT: Lazy<String> = Lazy::new(|| {
    format!(
        "bce-sdk-rust/{}/{}/{}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
});

pub const JSON_CONTENT_TYPE: &str = "application/json";

// Env values used to configure the client.
pub const BCE_ENDPOINT: &str = "BCE_ENDPOINT";
pub const BCE_CONNECT_TIMEOUT_MS: &str = "BCE_CONNECT_TIMEOUT_MS";
pub const BCE_TIMEOUT_MS: &str = "BCE_TIMEOUT_MS";

/// Error codes reported by token-authenticated services for a bad or expired token.
pub const INVALID_TOKEN_CODES: [&str; 2] = ["110", "111"];
