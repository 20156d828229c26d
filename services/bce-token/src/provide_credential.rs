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

use async_trait::async_trait;
use bcesign_core::{Context, ProvideCredential, Result};

use crate::constants::{QIANFAN_API_KEY, QIANFAN_SECRET_KEY};
use crate::ApiKey;

/// EnvApiKeyProvider loads the api key pair from `QIANFAN_API_KEY` and `QIANFAN_SECRET_KEY`.
#[derive(Debug, Default)]
pub struct EnvApiKeyProvider;

impl EnvApiKeyProvider {
    /// Create a new EnvApiKeyProvider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideCredential for EnvApiKeyProvider {
    type Credential = ApiKey;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        match (ctx.env_var(QIANFAN_API_KEY), ctx.env_var(QIANFAN_SECRET_KEY)) {
            (Some(api_key), Some(secret_key)) if !api_key.is_empty() && !secret_key.is_empty() => {
                Ok(Some(ApiKey::new(api_key, secret_key)))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcesign_core::StaticEnv;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_env_api_key_provider() -> anyhow::Result<()> {
        let ctx = Context::new().with_env(StaticEnv {
            envs: HashMap::from([
                (QIANFAN_API_KEY.to_string(), "api".to_string()),
                (QIANFAN_SECRET_KEY.to_string(), "secret".to_string()),
            ]),
        });

        let key = EnvApiKeyProvider::new().provide_credential(&ctx).await?;
        assert_eq!(key, Some(ApiKey::new("api", "secret")));

        let key = EnvApiKeyProvider::new()
            .provide_credential(&Context::new())
            .await?;
        assert!(key.is_none());
        Ok(())
    }
}
