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

//! Time related utils.

use crate::{Error, Result};
use chrono::SecondsFormat;
use chrono::Utc;

/// DateTime is the UTC instant used across bcesign.
pub type DateTime = chrono::DateTime<Utc>;

/// Create the current time in UTC.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into ISO 8601 with `Z` suffix: "2024-01-02T03:04:05Z"
///
/// This is the format used by `x-bce-date` and the `bce-auth-v1` auth string.
pub fn format_iso8601(t: DateTime) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC 3339 string (which includes "2024-01-02T03:04:05Z") into UTC time.
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|e| Error::unexpected(format!("invalid rfc3339 time: {s}")).with_source(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_iso8601() {
        let t = Utc
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .single()
            .expect("time must be valid");
        assert_eq!(format_iso8601(t), "2024-01-02T03:04:05Z");
    }

    #[test]
    fn test_parse_rfc3339() -> Result<()> {
        let t = parse_rfc3339("2024-01-01T00:00:00Z")?;
        assert_eq!(t.timestamp(), 1704067200);
        assert!(parse_rfc3339("not a time").is_err());
        Ok(())
    }
}
