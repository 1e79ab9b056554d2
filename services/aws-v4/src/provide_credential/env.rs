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

use crate::{constants::*, Credential};
use async_trait::async_trait;
use flexfetch_core::{Context, ProvideCredential, Result};

/// EnvCredentialProvider loads AWS credentials from environment variables.
///
/// This provider looks for the following environment variables:
/// - `AWS_ACCESS_KEY_ID`: The AWS access key ID
/// - `AWS_SECRET_ACCESS_KEY`: The AWS secret access key
/// - `AWS_SESSION_TOKEN`: The AWS session token (optional)
#[derive(Debug, Default, Clone)]
pub struct EnvCredentialProvider;

impl EnvCredentialProvider {
    /// Create a new EnvCredentialProvider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideCredential for EnvCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let envs = ctx.env_vars();

        match (envs.get(AWS_ACCESS_KEY_ID), envs.get(AWS_SECRET_ACCESS_KEY)) {
            (Some(ak), Some(sk)) => Ok(Some(Credential {
                access_key_id: ak.clone(),
                secret_access_key: sk.clone(),
                session_token: envs.get(AWS_SESSION_TOKEN).cloned(),
                expires_in: None,
            })),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexfetch_core::StaticEnv;
    use std::collections::HashMap;
    use test_case::test_case;

    #[test_case(&[(AWS_ACCESS_KEY_ID, "ak"), (AWS_SECRET_ACCESS_KEY, "sk")], Some(("ak", "sk", None)); "key pair")]
    #[test_case(&[(AWS_ACCESS_KEY_ID, "ak"), (AWS_SECRET_ACCESS_KEY, "sk"), (AWS_SESSION_TOKEN, "token")], Some(("ak", "sk", Some("token"))); "with session token")]
    #[test_case(&[(AWS_ACCESS_KEY_ID, "ak")], None; "partial credentials")]
    #[test_case(&[], None; "missing credentials")]
    #[tokio::test]
    async fn test_env_credential_provider(
        envs: &[(&str, &str)],
        expected: Option<(&str, &str, Option<&str>)>,
    ) {
        let ctx = Context::new().with_env(StaticEnv {
            envs: envs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        });

        let cred = EnvCredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .expect("load must succeed");

        assert_eq!(
            cred.as_ref().map(|c| (
                c.access_key_id.as_str(),
                c.secret_access_key.as_str(),
                c.session_token.as_deref()
            )),
            expected
        );
    }
}
