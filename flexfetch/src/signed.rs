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

use crate::cache::{CredentialCache, SharedProvider};
use crate::fetch::{FetchHandle, FetchOptions, Fetcher};
use crate::request::{build_url, serialize_body, QueryParams};
use async_trait::async_trait;
use bytes::Bytes;
use flexfetch_aws_v4::{
    Credential, RequestSigner, StaticCredentialProvider, EXECUTE_API, X_AMZ_CONTENT_SHA_256,
};
use flexfetch_core::hash::hex_sha256;
use flexfetch_core::{Error, HttpSend, Result, Signer};
use http::header::{ACCEPT, CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Attempts used by signed calls that don't set `retry_attempts`.
pub const DEFAULT_SIGNED_RETRY_ATTEMPTS: u32 = 3;

/// Credentials used to sign a call.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A fixed credential.
    Static(Credential),
    /// A provider, for example one returned by [`CredentialCache::get_or_create`].
    Provider(SharedProvider),
}

impl From<Credential> for Credentials {
    fn from(v: Credential) -> Self {
        Credentials::Static(v)
    }
}

impl From<SharedProvider> for Credentials {
    fn from(v: SharedProvider) -> Self {
        Credentials::Provider(v)
    }
}

/// Everything describing a signed call.
///
/// All fields are optional so that a config can serve as defaults for
/// later calls, see [`SignedCallConfig::merge`].
#[derive(Debug, Clone, Default)]
pub struct SignedCallConfig {
    /// Signing region, required.
    pub region: Option<String>,
    /// Base url, required. A path prefix like a stage name is kept.
    pub base_url: Option<String>,
    /// Method, default to `GET`.
    pub method: Option<Method>,
    /// Path resolved against `base_url`.
    pub path: Option<String>,
    /// Query parameters.
    pub query: Option<QueryParams>,
    /// JSON body, `null` sends no body.
    pub body: Option<Value>,
    /// Extra headers, layered over the default ones.
    pub headers: BTreeMap<String, String>,
    /// Value of the `Host` header, default to the url's host and port.
    pub host: Option<String>,
    /// Credentials, default to the cache's base provider.
    pub credentials: Option<Credentials>,
    /// Total attempts, default to [`DEFAULT_SIGNED_RETRY_ATTEMPTS`]; `0` disables retry.
    pub retry_attempts: Option<u32>,
    /// Cap of a single backoff delay.
    pub max_retry_delay: Option<Duration>,
}

impl SignedCallConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the base url.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the query parameters.
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = Some(query);
        self
    }

    /// Set the body from any serializable value.
    pub fn with_body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Insert a header, names are stored in lower case.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the `Host` header.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the credentials.
    pub fn with_credentials(mut self, credentials: impl Into<Credentials>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    /// Set the total attempts.
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = Some(attempts);
        self
    }

    /// Set the cap of a single backoff delay.
    pub fn with_max_retry_delay(mut self, delay: Duration) -> Self {
        self.max_retry_delay = Some(delay);
        self
    }

    /// Layer `per_call` over `self`.
    ///
    /// Headers merge key by key with `per_call` winning, every other field
    /// is taken from `per_call` when set.
    pub fn merge(&self, per_call: SignedCallConfig) -> SignedCallConfig {
        let mut headers = self.headers.clone();
        headers.extend(per_call.headers);

        SignedCallConfig {
            region: per_call.region.or_else(|| self.region.clone()),
            base_url: per_call.base_url.or_else(|| self.base_url.clone()),
            method: per_call.method.or_else(|| self.method.clone()),
            path: per_call.path.or_else(|| self.path.clone()),
            query: per_call.query.or_else(|| self.query.clone()),
            body: per_call.body.or_else(|| self.body.clone()),
            headers,
            host: per_call.host.or_else(|| self.host.clone()),
            credentials: per_call.credentials.or_else(|| self.credentials.clone()),
            retry_attempts: per_call.retry_attempts.or(self.retry_attempts),
            max_retry_delay: per_call.max_retry_delay.or(self.max_retry_delay),
        }
    }
}

/// SignedHttpSend signs every request before handing it to the inner transport.
///
/// The credential is loaded once by the [`Signer`] and reused for every
/// request until it is no longer valid, so retries re-sign without loading.
#[derive(Debug, Clone)]
pub struct SignedHttpSend {
    inner: Arc<dyn HttpSend>,
    signer: Signer<Credential>,
}

impl SignedHttpSend {
    /// Create a signed transport over `inner`.
    pub fn new(inner: Arc<dyn HttpSend>, signer: Signer<Credential>) -> Self {
        Self { inner, signer }
    }
}

#[async_trait]
impl HttpSend for SignedHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let (mut parts, body) = req.into_parts();
        parts.headers.insert(
            X_AMZ_CONTENT_SHA_256,
            HeaderValue::try_from(hex_sha256(&body))?,
        );
        self.signer.sign(&mut parts).await?;

        self.inner
            .http_send(http::Request::from_parts(parts, body))
            .await
    }
}

/// SignedFetcher sends SigV4 signed calls to API Gateway (`execute-api`).
///
/// ```no_run
/// use flexfetch::{CredentialCache, Fetcher, SignedCallConfig, SignedFetcher};
/// use flexfetch::aws::Config;
/// use http::Method;
///
/// # async fn example(ctx: flexfetch::Context) -> flexfetch::Result<()> {
/// let config = Config::default().from_env(&ctx);
/// let fetcher = SignedFetcher::new(
///     Fetcher::new(ctx.clone()),
///     CredentialCache::new(ctx, config.into()),
/// );
///
/// let users = fetcher.bind_with_assumed_role(
///     SignedCallConfig::new()
///         .with_region("eu-west-2")
///         .with_base_url("https://abc123.execute-api.eu-west-2.amazonaws.com/prod"),
///     "arn:aws:iam::123456789012:role/users-consumer",
///     None,
/// );
///
/// let resp = users
///     .call(SignedCallConfig::new().with_method(Method::GET).with_path("/v1/users"))?
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SignedFetcher {
    fetcher: Fetcher,
    cache: CredentialCache,
    service: String,
}

impl SignedFetcher {
    /// Create a signed fetcher for `execute-api`.
    pub fn new(fetcher: Fetcher, cache: CredentialCache) -> Self {
        Self {
            fetcher,
            cache,
            service: EXECUTE_API.to_string(),
        }
    }

    /// The credential cache of this fetcher.
    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    /// Start a signed call.
    ///
    /// Returns [`flexfetch_core::ErrorKind::ConfigInvalid`] without sending
    /// anything if `region` or `base_url` is missing.
    pub fn call(&self, cfg: SignedCallConfig) -> Result<FetchHandle> {
        let region = required(cfg.region.as_deref(), "region")?;
        let base_url = required(cfg.base_url.as_deref(), "base_url")?;

        let url = build_url(
            base_url,
            cfg.path.as_deref().unwrap_or_default(),
            &cfg.query.unwrap_or_default(),
        )?;
        // A `null` payload is no payload.
        let body = serialize_body(cfg.body.as_ref().filter(|v| !v.is_null()))?;

        let host = match cfg.host {
            Some(host) => host,
            None => host_of(&url)?,
        };
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(HOST, HeaderValue::try_from(host)?);
        for (name, value) in cfg.headers {
            headers.insert(HeaderName::try_from(name)?, HeaderValue::try_from(value)?);
        }

        let provider: SharedProvider = match cfg.credentials {
            None => self.cache.base_provider(),
            Some(Credentials::Static(cred)) => Arc::new(StaticCredentialProvider::from(cred)),
            Some(Credentials::Provider(provider)) => provider,
        };
        let ctx = self.fetcher.context();
        let signer = Signer::new(
            ctx.clone(),
            provider,
            RequestSigner::new(&self.service, region),
        );

        let options = FetchOptions {
            method: Some(cfg.method.unwrap_or(Method::GET)),
            headers,
            body,
            retry_attempts: match cfg.retry_attempts {
                None => Some(DEFAULT_SIGNED_RETRY_ATTEMPTS),
                Some(0) => None,
                Some(n) => Some(n),
            },
            max_retry_delay: cfg.max_retry_delay,
            transport: Some(Arc::new(SignedHttpSend::new(ctx.transport(), signer))),
        };

        Ok(self.fetcher.execute(url, options))
    }

    /// Bind `base` as the defaults of later calls.
    pub fn bind(&self, base: SignedCallConfig) -> BoundFetcher {
        BoundFetcher {
            fetcher: self.clone(),
            base,
        }
    }

    /// Bind `base` with the credentials of an assumed role.
    ///
    /// The provider is resolved once through the cache; nothing is fetched
    /// until the first call.
    pub fn bind_with_assumed_role(
        &self,
        base: SignedCallConfig,
        role_arn: &str,
        external_id: Option<&str>,
    ) -> BoundFetcher {
        let provider = self.cache.get_or_create(role_arn, external_id);
        self.bind(base.with_credentials(provider))
    }
}

/// A [`SignedFetcher`] with default call settings.
#[derive(Debug, Clone)]
pub struct BoundFetcher {
    fetcher: SignedFetcher,
    base: SignedCallConfig,
}

impl BoundFetcher {
    /// Start a signed call with `per_call` layered over the bound defaults.
    pub fn call(&self, per_call: SignedCallConfig) -> Result<FetchHandle> {
        self.fetcher.call(self.base.merge(per_call))
    }

    /// The bound defaults.
    pub fn base(&self) -> &SignedCallConfig {
        &self.base
    }
}

fn required<'a>(v: Option<&'a str>, name: &str) -> Result<&'a str> {
    v.filter(|v| !v.is_empty())
        .ok_or_else(|| Error::config_invalid(format!("{name} is required for signed calls")))
}

fn host_of(url: &Url) -> Result<String> {
    let host = url.host_str().ok_or_else(|| {
        Error::request_invalid("url has no host").with_context(format!("url: {url}"))
    })?;

    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
