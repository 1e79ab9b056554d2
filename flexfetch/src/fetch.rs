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

use crate::request::Response;
use crate::retry::{run_with_retry, Backoff, FullJitter, RetryPolicy};
use bytes::Bytes;
use flexfetch_core::{Context, Error, HttpSend, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Target of a fetch: a url, or a request built by the caller.
#[derive(Debug)]
pub enum Target {
    /// Bare url string.
    Url(String),
    /// Parsed url.
    Parsed(Url),
    /// Full request, its method, headers and body are used unless the options override them.
    Request(http::Request<Bytes>),
}

impl Target {
    /// The url string identifying this target in logs and errors.
    pub fn url_string(&self) -> String {
        match self {
            Target::Url(v) => v.clone(),
            Target::Parsed(v) => v.to_string(),
            Target::Request(v) => v.uri().to_string(),
        }
    }
}

impl From<&str> for Target {
    fn from(v: &str) -> Self {
        Target::Url(v.to_string())
    }
}

impl From<String> for Target {
    fn from(v: String) -> Self {
        Target::Url(v)
    }
}

impl From<Url> for Target {
    fn from(v: Url) -> Self {
        Target::Parsed(v)
    }
}

impl From<&Url> for Target {
    fn from(v: &Url) -> Self {
        Target::Parsed(v.clone())
    }
}

impl From<http::Request<Bytes>> for Target {
    fn from(v: http::Request<Bytes>) -> Self {
        Target::Request(v)
    }
}

/// Options of one logical request.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Method, default to the target's method or `GET`.
    pub method: Option<Method>,
    /// Headers layered over the target's headers.
    pub headers: HeaderMap,
    /// Body, replaces the target's body.
    pub body: Option<Bytes>,
    /// Total attempts, absent or `0` means a single attempt.
    pub retry_attempts: Option<u32>,
    /// Cap of a single backoff delay.
    pub max_retry_delay: Option<Duration>,
    /// Transport for this request instead of the context one.
    pub transport: Option<Arc<dyn HttpSend>>,
}

impl FetchOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Insert a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
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

    /// Use another transport for this request.
    pub fn with_transport(mut self, transport: impl HttpSend) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }
}

/// Fetcher executes logical requests with bounded retry and cancellation.
///
/// ```no_run
/// use flexfetch::{Fetcher, FetchOptions};
/// use flexfetch::Context;
///
/// # async fn example(ctx: Context) -> flexfetch::Result<()> {
/// let handle = Fetcher::new(ctx).execute(
///     "https://api.example.com/v1/health",
///     FetchOptions::new().with_retry_attempts(3),
/// );
/// let canceller = handle.canceller();
/// # drop(canceller);
/// let resp = handle.await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Fetcher {
    ctx: Context,
    backoff: Arc<dyn Backoff>,
}

impl Fetcher {
    /// Create a fetcher using [`FullJitter`] backoff.
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            backoff: Arc::new(FullJitter),
        }
    }

    /// Replace the backoff.
    pub fn with_backoff(mut self, backoff: impl Backoff) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    /// The context of this fetcher.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Start one logical request.
    ///
    /// Nothing is sent until the returned handle is polled. Every attempt
    /// shares one cancellation token, see [`FetchHandle::cancel`].
    pub fn execute(&self, target: impl Into<Target>, options: FetchOptions) -> FetchHandle {
        let token = CancellationToken::new();
        let request = run(
            self.ctx.clone(),
            self.backoff.clone(),
            target.into(),
            options,
            token.clone(),
        )
        .boxed();

        FetchHandle {
            request,
            canceller: Canceller { token },
        }
    }
}

async fn run(
    ctx: Context,
    backoff: Arc<dyn Backoff>,
    target: Target,
    options: FetchOptions,
    token: CancellationToken,
) -> Result<Response> {
    let url = target.url_string();
    let logger = ctx.logger();
    logger.info("fetch called", &[("url", &url)]);
    logger.debug("fetch options", &[("url", &url), ("options", &DebugField(&options))]);

    let res = tokio::select! {
        biased;

        _ = token.cancelled() => Err(Error::cancelled("request cancelled")),
        res = attempts(&ctx, backoff.as_ref(), target, options, &token, &url) => res,
    };

    res.map_err(|err| {
        let err = err.with_context(format!("url: {url}"));
        logger.error("fetch failed", &[("url", &url), ("error", &err)]);
        err
    })
}

async fn attempts(
    ctx: &Context,
    backoff: &dyn Backoff,
    target: Target,
    options: FetchOptions,
    token: &CancellationToken,
    url: &str,
) -> Result<Response> {
    let transport = options.transport.clone().unwrap_or_else(|| ctx.transport());
    let policy = RetryPolicy::from_options(options.retry_attempts, options.max_retry_delay);
    let template = Template::new(target, options)?;

    let send = |_attempt: u32| {
        let transport = transport.clone();
        let req = template.build();
        async move { transport.http_send(req?).await }
    };

    let Some(policy) = policy else {
        return send(1).await;
    };

    run_with_retry(&policy, backoff, send, |err, attempt| {
        ctx.logger().warn(
            "fetch attempt failed",
            &[("url", &url), ("error", err), ("attempt", &attempt)],
        );
        !token.is_cancelled()
    })
    .await
}

/// The request prepared once and rebuilt for every attempt.
struct Template {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl Template {
    fn new(target: Target, options: FetchOptions) -> Result<Self> {
        let (method, uri, mut headers, body) = match target {
            Target::Url(v) => (Method::GET, Uri::try_from(v)?, HeaderMap::new(), Bytes::new()),
            Target::Parsed(v) => (
                Method::GET,
                Uri::try_from(v.as_str())?,
                HeaderMap::new(),
                Bytes::new(),
            ),
            Target::Request(req) => {
                let (parts, body) = req.into_parts();
                (parts.method, parts.uri, parts.headers, body)
            }
        };
        if uri.host().is_none() {
            return Err(Error::request_invalid("fetch target must be an absolute url"));
        }

        for (name, value) in &options.headers {
            headers.insert(name, value.clone());
        }

        Ok(Self {
            method: options.method.unwrap_or(method),
            uri,
            headers,
            body: options.body.unwrap_or(body),
        })
    }

    fn build(&self) -> Result<http::Request<Bytes>> {
        let mut req = http::Request::new(self.body.clone());
        *req.method_mut() = self.method.clone();
        *req.uri_mut() = self.uri.clone();
        *req.headers_mut() = self.headers.clone();
        Ok(req)
    }
}

struct DebugField<'a, T: Debug>(&'a T);

impl<T: Debug> fmt::Display for DebugField<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Handle of one logical request.
///
/// Await it to get the response. The request can be cancelled through
/// [`FetchHandle::cancel`] or a [`Canceller`] taken before awaiting.
pub struct FetchHandle {
    request: BoxFuture<'static, Result<Response>>,
    canceller: Canceller,
}

impl FetchHandle {
    /// Cancel the request.
    pub fn cancel(&self) {
        self.canceller.cancel()
    }

    /// A canceller that outlives the handle.
    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    /// Split the handle, for example to spawn the request.
    pub fn into_parts(self) -> (BoxFuture<'static, Result<Response>>, Canceller) {
        (self.request, self.canceller)
    }
}

impl Debug for FetchHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchHandle")
            .field("canceller", &self.canceller)
            .finish_non_exhaustive()
    }
}

impl Future for FetchHandle {
    type Output = Result<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        self.request.poll_unpin(cx)
    }
}

/// Canceller signals the cancellation token of one logical request.
///
/// Cancelling is idempotent and can happen at any time: before the first
/// attempt, during an attempt or during a backoff delay.
#[derive(Debug, Clone)]
pub struct Canceller {
    token: CancellationToken,
}

impl Canceller {
    /// Cancel the request.
    pub fn cancel(&self) {
        self.token.cancel()
    }

    /// Check if the request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
