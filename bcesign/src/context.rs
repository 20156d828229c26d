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

use bcesign_core::{Context, OsEnv, Result};
use bcesign_http_send_reqwest::ReqwestHttpSend;

use crate::Config;

/// Create a context sending requests with reqwest and reading the OS environment.
///
/// The HTTP client carries the connect and request timeouts of `config`.
pub fn default_context(config: &Config) -> Result<Context> {
    let http = ReqwestHttpSend::with_timeouts(config.connect_timeout, config.timeout)?;
    Ok(Context::new().with_http_send(http).with_env(OsEnv))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_reads_os_env() -> Result<()> {
        let ctx = default_context(&Config::default())?;
        assert!(ctx.env_var("PATH").is_some());
        Ok(())
    }
}
