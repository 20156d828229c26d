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

//! Canonicalization rules of the `bce-auth-v1` protocol.
//!
//! All functions here are pure: the signer and the transport must produce
//! byte-identical strings or the server side signature check fails.

use percent_encoding::utf8_percent_encode;

use crate::constants::{BCE_QUERY_ENCODE_SET, BCE_URI_ENCODE_SET};

/// Percent-encode `s`, keeping only `A-Za-z0-9-_.~` (and `/` unless `encode_slash`).
pub fn uri_encode(s: &str, encode_slash: bool) -> String {
    if encode_slash {
        utf8_percent_encode(s, &BCE_QUERY_ENCODE_SET).to_string()
    } else {
        utf8_percent_encode(s, &BCE_URI_ENCODE_SET).to_string()
    }
}

/// Build the canonical uri path.
///
/// ```
/// use bcesign_bce_v1::canonical_uri_path;
///
/// assert_eq!(canonical_uri_path(""), "/");
/// assert_eq!(canonical_uri_path("v2/instance"), "/v2/instance");
/// assert_eq!(canonical_uri_path("/v2/my file"), "/v2/my%20file");
/// ```
pub fn canonical_uri_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let encoded = uri_encode(path, false);
    if encoded.starts_with('/') {
        encoded
    } else {
        format!("/{encoded}")
    }
}

/// Build the canonical query string.
///
/// Keys and values are percent-encoded and sorted by key. The `authorization`
/// parameter is never included.
///
/// A parameter with an empty value is emitted as `key=` when `encode_equals` is
/// true (the form bound into the signature) and as a bare `key` otherwise (the
/// form used in the request url).
pub fn canonical_query_string(params: &[(String, String)], encode_equals: bool) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .filter(|(k, _)| !k.eq_ignore_ascii_case("authorization"))
        .map(|(k, v)| (uri_encode(k, true), uri_encode(v, true)))
        .collect();
    pairs.sort();

    let mut s = String::with_capacity(pairs.iter().map(|(k, v)| k.len() + v.len() + 2).sum());
    for (idx, (k, v)) in pairs.into_iter().enumerate() {
        if idx != 0 {
            s.push('&');
        }

        s.push_str(&k);
        if !v.is_empty() || encode_equals {
            s.push('=');
            s.push_str(&v);
        }
    }

    s
}

/// Build the canonical header block.
///
/// Names are trimmed and lower-cased, values trimmed, both percent-encoded;
/// lines are `name:value`, sorted and joined by `\n`.
pub fn canonical_headers<K, V>(headers: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut lines: Vec<String> = headers
        .iter()
        .map(|(k, v)| {
            format!(
                "{}:{}",
                uri_encode(&k.as_ref().trim().to_lowercase(), true),
                uri_encode(v.as_ref().trim(), true)
            )
        })
        .collect();
    lines.sort();

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn params(input: &[(&str, &str)]) -> Vec<(String, String)> {
        input
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test_case("", "/"; "empty path")]
    #[test_case("/", "/"; "root")]
    #[test_case("/v2/instance", "/v2/instance"; "leading slash kept once")]
    #[test_case("v2/instance", "/v2/instance"; "missing slash")]
    #[test_case("/v2/instance/i-abc:def", "/v2/instance/i-abc%3Adef"; "reserved char")]
    #[test_case("/v1/数据", "/v1/%E6%95%B0%E6%8D%AE"; "utf8")]
    #[test_case("/a b/~c_d.e-f", "/a%20b/~c_d.e-f"; "unreserved kept")]
    fn test_canonical_uri_path(input: &str, expected: &str) {
        assert_eq!(canonical_uri_path(input), expected);
    }

    #[test]
    fn test_uri_encode() {
        assert_eq!(uri_encode("a/b c+d*e", true), "a%2Fb%20c%2Bd%2Ae");
        assert_eq!(uri_encode("a/b c+d*e", false), "a/b%20c%2Bd%2Ae");
        assert_eq!(uri_encode("AZaz09-_.~", true), "AZaz09-_.~");
        assert_eq!(uri_encode("application/json", true), "application%2Fjson");
    }

    #[test]
    fn test_canonical_query_string_sorted() {
        let input = params(&[
            ("maxKeys", "10"),
            ("a-b", "2"),
            ("a", "1"),
            ("marker", "i-x"),
            ("Zone", "cn-bj-a"),
        ]);
        let expected = "Zone=cn-bj-a&a=1&a-b=2&marker=i-x&maxKeys=10";
        assert_eq!(canonical_query_string(&input, true), expected);

        let mut reversed = input.clone();
        reversed.reverse();
        assert_eq!(canonical_query_string(&reversed, true), expected);
    }

    #[test]
    fn test_canonical_query_string_keys_ascending() {
        let input = params(&[("c", "3"), ("b", ""), ("a", "x y"), ("b-c", "/")]);
        let s = canonical_query_string(&input, true);
        let keys: Vec<&str> = s
            .split('&')
            .map(|kv| kv.split('=').next().unwrap_or_default())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_canonical_query_string_encode_equals() {
        let input = params(&[("marker", ""), ("maxKeys", "10"), ("clientToken", "abc")]);
        assert_eq!(
            canonical_query_string(&input, true),
            "clientToken=abc&marker=&maxKeys=10"
        );
        assert_eq!(
            canonical_query_string(&input, false),
            "clientToken=abc&marker&maxKeys=10"
        );
    }

    #[test]
    fn test_canonical_query_string_skips_authorization() {
        let input = params(&[("Authorization", "x"), ("a", "b c/d")]);
        assert_eq!(canonical_query_string(&input, true), "a=b%20c%2Fd");
        assert_eq!(canonical_query_string(&[], true), "");
    }

    #[test]
    fn test_canonical_headers() {
        let headers = [
            ("Host", " bcc.bj.baidubce.com "),
            ("Content-Type", "application/json"),
            ("x-bce-date", "2024-01-01T00:00:00Z"),
        ];
        assert_eq!(
            canonical_headers(&headers),
            "content-type:application%2Fjson\nhost:bcc.bj.baidubce.com\nx-bce-date:2024-01-01T00%3A00%3A00Z"
        );

        let empty: [(&str, &str); 0] = [];
        assert_eq!(canonical_headers(&empty), "");
    }
}
