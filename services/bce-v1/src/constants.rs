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

use std::collections::HashSet;

use once_cell::sync::Lazy;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

/// Version tag that starts every auth string.
pub const BCE_AUTH_VERSION: &str = "bce-auth-v1";

/// Default validity window of a signature in seconds.
pub const DEFAULT_EXPIRATION_IN_SECONDS: u64 = 1800;

// Headers used in bce services.
pub const BCE_PREFIX: &str = "x-bce-";
pub const X_BCE_DATE: &str = "x-bce-date";
pub const X_BCE_SECURITY_TOKEN: &str = "x-bce-security-token";
pub const X_BCE_REQUEST_ID: &str = "x-bce-request-id";
pub const CONTENT_MD5: &str = "content-md5";

// Env values used in bce services.
pub const BCE_ACCESS_KEY_ID: &str = "BCE_ACCESS_KEY_ID";
pub const BCE_SECRET_ACCESS_KEY: &str = "BCE_SECRET_ACCESS_KEY";
pub const BCE_SESSION_TOKEN: &str = "BCE_SESSION_TOKEN";

/// Headers signed when the caller doesn't pick them explicitly.
///
/// Every `x-bce-*` header is signed as well.
pub static DEFAULT_HEADERS_TO_SIGN: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["host", "content-length", "content-type", CONTENT_MD5]));

/// AsciiSet for BCE UriEncode
///
/// - URI encode every byte except the unreserved characters: 'A'-'Z', 'a'-'z', '0'-'9', '-', '.', '_', and '~'.
pub static BCE_QUERY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// AsciiSet for BCE UriEncode
///
/// But used in path, where `/` is kept as the segment separator.
pub static BCE_URI_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
