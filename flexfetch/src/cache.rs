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

use flexfetch_aws_v4::{
    AssumeRoleCredentialProvider, Config, Credential, DefaultCredentialProvider, RequestSigner,
};
use flexfetch_core::{Context, ProvideCredential, Signer};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A credential provider shared between fetchers.
pub type SharedProvider = Arc<dyn ProvideCredential<Credential = Credential>>;

type CacheKey = (String, String);

/// CredentialCache keeps one assume-role provider per `(role_arn, external_id)`.
///
/// Providers are created lazily on first lookup and live as long as the
/// cache unless evicted. Clones of a cache share the same entries.
#[derive(Debug, Clone)]
pub struct CredentialCache {
    ctx: Context,
    config: Arc<Config>,
    base: SharedProvider,
    providers: Arc<Mutex<HashMap<CacheKey, SharedProvider>>>,
}

impl CredentialCache {
    /// Create a cache whose base credential comes from [`DefaultCredentialProvider`].
    pub fn new(ctx: Context, config: Arc<Config>) -> Self {
        let base: SharedProvider = Arc::new(DefaultCredentialProvider::new(config.clone()));
        Self {
            ctx,
            config,
            base,
            providers: Arc::default(),
        }
    }

    /// Replace the base credential provider.
    ///
    /// The base credential signs unassumed calls and the STS requests of
    /// every assume-role provider created afterwards.
    pub fn with_base_provider(
        mut self,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        self.base = Arc::new(provider);
        self
    }

    /// The base credential provider.
    pub fn base_provider(&self) -> SharedProvider {
        self.base.clone()
    }

    /// The config used to build providers.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the provider for `role_arn`, creating it on first use.
    ///
    /// `None` and `Some("")` are the same external id.
    pub fn get_or_create(&self, role_arn: &str, external_id: Option<&str>) -> SharedProvider {
        let key = Self::key(role_arn, external_id);
        self.lock()
            .entry(key)
            .or_insert_with(|| self.build(role_arn, external_id))
            .clone()
    }

    /// Drop the provider for `role_arn`, returning it if present.
    pub fn evict(&self, role_arn: &str, external_id: Option<&str>) -> Option<SharedProvider> {
        self.lock().remove(&Self::key(role_arn, external_id))
    }

    /// Number of cached providers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if no provider is cached.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn key(role_arn: &str, external_id: Option<&str>) -> CacheKey {
        (
            role_arn.to_string(),
            external_id.unwrap_or_default().to_string(),
        )
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, SharedProvider>> {
        // Entries are inserted whole, a poisoned map is still consistent.
        self.providers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn build(&self, role_arn: &str, external_id: Option<&str>) -> SharedProvider {
        log::debug!("creating assume role credential provider for {role_arn}");

        let sts_signer = Signer::new(
            self.ctx.clone(),
            self.base.clone(),
            RequestSigner::new("sts", self.config.sts_signing_region()),
        );

        let mut provider = AssumeRoleCredentialProvider::new(role_arn, sts_signer)
            .with_role_session_name(self.config.role_session_name.clone())
            .with_duration_seconds(self.config.duration_seconds);
        if let Some(region) = &self.config.region {
            provider = provider.with_region(region);
        }
        if self.config.use_regional_sts_endpoint() {
            provider = provider.with_regional_sts_endpoint();
        }
        if let Some(external_id) = external_id {
            provider = provider.with_external_id(external_id);
        }

        Arc::new(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexfetch_aws_v4::StaticCredentialProvider;
    use pretty_assertions::assert_eq;

    fn cache() -> CredentialCache {
        CredentialCache::new(Context::new(), Config::default().into())
            .with_base_provider(StaticCredentialProvider::new("ak", "sk"))
    }

    const ROLE: &str = "arn:aws:iam::123456789012:role/consumer";

    #[test]
    fn test_get_or_create_reuses_provider() {
        let cache = cache();

        let a = cache.get_or_create(ROLE, None);
        let b = cache.get_or_create(ROLE, Some(""));
        let c = cache.clone().get_or_create(ROLE, None);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_or_create_keys_by_external_id() {
        let cache = cache();

        let a = cache.get_or_create(ROLE, Some("tenant-a"));
        let b = cache.get_or_create(ROLE, Some("tenant-b"));
        let other =
            cache.get_or_create("arn:aws:iam::123456789012:role/other", Some("tenant-a"));
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_evict() {
        let cache = cache();
        assert!(cache.is_empty());

        let a = cache.get_or_create(ROLE, None);
        assert!(cache.evict(ROLE, Some("")).is_some());
        assert!(cache.is_empty());

        let b = cache.get_or_create(ROLE, None);
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(cache.evict("arn:aws:iam::123456789012:role/missing", None).is_none());
    }
}
