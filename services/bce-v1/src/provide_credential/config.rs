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

use crate::{Config, Credential};
use async_trait::async_trait;
use bcesign_core::{Context, ProvideCredential, Result};
use log::debug;
use std::sync::Arc;

/// Static configuration based provider.
///
/// Values already set in [`Config`] win over the environment.
#[derive(Debug)]
pub struct ConfigCredentialProvider {
    config: Arc<Config>,
}

impl ConfigCredentialProvider {
    /// Create a new ConfigCredentialProvider
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ProvideCredential for ConfigCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let config = self.config.as_ref().clone().from_env(ctx);

        match (config.access_key_id, config.secret_access_key) {
            (Some(ak), Some(sk)) if !ak.is_empty() && !sk.is_empty() => {
                debug!("loading credential from config");
                Ok(Some(Credential {
                    access_key_id: ak,
                    secret_access_key: sk,
                    session_token: config.session_token,
                }))
            }
            _ => {
                debug!("incomplete config, skipping");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use bcesign_core::StaticEnv;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_config_credential_provider() -> anyhow::Result<()> {
        let config = Config::new()
            .with_access_key_id("ak")
            .with_secret_access_key("sk");
        let provider = ConfigCredentialProvider::new(Arc::new(config));

        let cred = provider.provide_credential(&Context::new()).await?.unwrap();
        assert_eq!(cred.access_key_id, "ak");
        assert_eq!(cred.secret_access_key, "sk");
        Ok(())
    }

    #[tokio::test]
    async fn test_config_credential_provider_merges_env() -> anyhow::Result<()> {
        let ctx = Context::new().with_env(StaticEnv {
            envs: HashMap::from([
                (BCE_ACCESS_KEY_ID.to_string(), "env_ak".to_string()),
                (BCE_SECRET_ACCESS_KEY.to_string(), "env_sk".to_string()),
            ]),
        });
        let config = Config::new().with_access_key_id("ak");
        let provider = ConfigCredentialProvider::new(Arc::new(config));

        let cred = provider.provide_credential(&ctx).await?.unwrap();
        assert_eq!(cred.access_key_id, "ak");
        assert_eq!(cred.secret_access_key, "env_sk");
        Ok(())
    }

    #[tokio::test]
    async fn test_config_credential_provider_incomplete() -> anyhow::Result<()> {
        let provider =
            ConfigCredentialProvider::new(Arc::new(Config::new().with_access_key_id("ak")));
        assert!(provider.provide_credential(&Context::new()).await?.is_none());
        Ok(())
    }
}
