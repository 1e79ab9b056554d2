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

use crate::provide_credential::{ConfigCredentialProvider, EnvCredentialProvider};
use crate::{Config, Credential};
use async_trait::async_trait;
use flexfetch_core::{Context, ProvideCredential, ProvideCredentialChain, Result};
use std::sync::Arc;

/// DefaultCredentialProvider is the base credential provider of a process.
///
/// It tries, in order:
///
/// - the access key pair set in [`Config`]
/// - the `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` env values
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain<Credential>,
}

impl DefaultCredentialProvider {
    /// Create a new DefaultCredentialProvider.
    pub fn new(config: Arc<Config>) -> Self {
        let chain = ProvideCredentialChain::new()
            .push(ConfigCredentialProvider::new(config))
            .push(EnvCredentialProvider::new());

        Self { chain }
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use flexfetch_core::StaticEnv;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn ctx() -> Context {
        Context::new().with_env(StaticEnv {
            envs: HashMap::from([
                (AWS_ACCESS_KEY_ID.to_string(), "env_access_key".to_string()),
                (
                    AWS_SECRET_ACCESS_KEY.to_string(),
                    "env_secret_key".to_string(),
                ),
            ]),
        })
    }

    #[tokio::test]
    async fn test_default_prefers_config() -> anyhow::Result<()> {
        let loader = DefaultCredentialProvider::new(
            Config {
                access_key_id: Some("config_access_key".to_string()),
                secret_access_key: Some("config_secret_key".to_string()),
                session_token: Some("config_token".to_string()),
                ..Default::default()
            }
            .into(),
        );

        let cred = loader.provide_credential(&ctx()).await?.unwrap();
        assert_eq!(cred.access_key_id, "config_access_key");
        assert_eq!(cred.session_token.as_deref(), Some("config_token"));
        Ok(())
    }

    #[tokio::test]
    async fn test_default_falls_back_to_env() -> anyhow::Result<()> {
        let loader = DefaultCredentialProvider::new(Config::default().into());

        let cred = loader.provide_credential(&ctx()).await?.unwrap();
        assert_eq!(cred.access_key_id, "env_access_key");
        assert_eq!(cred.secret_access_key, "env_secret_key");
        Ok(())
    }

    #[tokio::test]
    async fn test_default_without_any_credential() -> anyhow::Result<()> {
        let loader = DefaultCredentialProvider::new(Config::default().into());

        assert!(loader.provide_credential(&Context::new()).await?.is_none());
        Ok(())
    }
}
