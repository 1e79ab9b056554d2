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

use std::collections::HashMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use flexfetch::aws::{Config, Credential};
use flexfetch::hash::hex_sha256;
use flexfetch::{
    validate_with, ApiResult, Backoff, Canceller, Context, CredentialCache, Credentials, Error,
    ErrorKind, FetchOptions, Fetcher, HttpSend, Json, Level, Logger, ProvideCredential,
    QueryParams, Response, Result, RetryPolicy, SharedProvider, SignedCallConfig, SignedFetcher,
};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HOST};
use http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use test_case::test_case;

type Handler = Box<dyn Fn(&http::request::Parts, usize) -> Result<Response> + Send + Sync>;

/// A transport answering with `handler` and recording every request.
struct MockHttpSend {
    handler: Handler,
    calls: AtomicUsize,
    requests: Mutex<Vec<(http::request::Parts, Bytes)>>,
}

impl MockHttpSend {
    fn new(
        handler: impl Fn(&http::request::Parts, usize) -> Result<Response> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn always_failing() -> Arc<Self> {
        Self::new(|_, _| failure())
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn request(&self, idx: usize) -> (http::request::Parts, Bytes) {
        let requests = self.requests.lock().unwrap();
        let (parts, body) = &requests[idx];
        let mut req = http::Request::new(body.clone());
        *req.method_mut() = parts.method.clone();
        *req.uri_mut() = parts.uri.clone();
        *req.headers_mut() = parts.headers.clone();
        req.into_parts()
    }
}

impl Debug for MockHttpSend {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockHttpSend")
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpSend for MockHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<Response> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        let (parts, body) = req.into_parts();
        let resp = (self.handler)(&parts, idx);
        self.requests.lock().unwrap().push((parts, body));
        resp
    }
}

/// A transport that cancels its request and never answers.
#[derive(Debug, Default)]
struct HangingHttpSend {
    calls: AtomicUsize,
    canceller: Mutex<Option<Canceller>>,
}

#[async_trait]
impl HttpSend for HangingHttpSend {
    async fn http_send(&self, _: http::Request<Bytes>) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let canceller = self.canceller.lock().unwrap().take();
        if let Some(canceller) = canceller {
            canceller.cancel();
        }
        futures::future::pending().await
    }
}

#[derive(Debug, Default, Clone)]
struct RecordingLogger {
    records: Arc<Mutex<Vec<(Level, String)>>>,
}

impl RecordingLogger {
    fn count(&self, level: Level, message: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, m)| *l == level && m == message)
            .count()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: Level, message: &str, _: &[(&str, &dyn Display)]) {
        self.records
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}

/// Records the policy it is asked about and never waits.
#[derive(Debug, Default, Clone)]
struct RecordingBackoff {
    seen: Arc<Mutex<Vec<(RetryPolicy, u32)>>>,
}

impl RecordingBackoff {
    fn seen(&self) -> Vec<(RetryPolicy, u32)> {
        self.seen.lock().unwrap().clone()
    }
}

impl Backoff for RecordingBackoff {
    fn delay(&self, policy: &RetryPolicy, attempt: u32) -> Duration {
        self.seen.lock().unwrap().push((*policy, attempt));
        Duration::ZERO
    }
}

#[derive(Debug)]
struct FixedBackoff(Duration);

impl Backoff for FixedBackoff {
    fn delay(&self, _: &RetryPolicy, _: u32) -> Duration {
        self.0
    }
}

#[derive(Debug, Default, Clone)]
struct CountingProvider {
    loads: Arc<AtomicUsize>,
}

#[async_trait]
impl ProvideCredential for CountingProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Credential>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Credential::new("AKIDCOUNTING", "secret_access_key")))
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn failure() -> Result<Response> {
    Err(Error::unexpected("connection reset").set_retryable(true))
}

fn json(status: u16, body: &'static str) -> Result<Response> {
    Ok(http::Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Bytes::from_static(body.as_bytes()))?)
}

fn context(transport: Arc<MockHttpSend>, logger: &RecordingLogger) -> Context {
    Context::new()
        .with_http_send(transport)
        .with_logger(logger.clone())
}

const URL: &str = "https://api.example.com/v1/data";

#[test_case(None; "absent")]
#[test_case(Some(0); "zero")]
#[tokio::test]
async fn test_single_attempt_without_retry(retry_attempts: Option<u32>) {
    init_logger();
    let transport = MockHttpSend::always_failing();
    let logger = RecordingLogger::default();
    let backoff = RecordingBackoff::default();
    let fetcher = Fetcher::new(context(transport.clone(), &logger)).with_backoff(backoff.clone());

    let options = FetchOptions {
        retry_attempts,
        ..Default::default()
    };
    let err = fetcher.execute(URL, options).await.unwrap_err();

    assert_eq!(err.message(), "connection reset");
    assert_eq!(transport.calls(), 1);
    assert!(backoff.seen().is_empty());
    assert_eq!(logger.count(Level::Warn, "fetch attempt failed"), 0);
    assert_eq!(logger.count(Level::Error, "fetch failed"), 1);
}

#[test_case(1, 1; "one")]
#[test_case(3, 3; "three")]
#[test_case(6, 6; "ceiling")]
#[test_case(10, 6; "above ceiling")]
#[tokio::test]
async fn test_retry_attempts_are_capped(requested: u32, expected: usize) {
    init_logger();
    let transport = MockHttpSend::always_failing();
    let logger = RecordingLogger::default();
    let backoff = RecordingBackoff::default();
    let fetcher = Fetcher::new(context(transport.clone(), &logger)).with_backoff(backoff.clone());

    let res = fetcher
        .execute(URL, FetchOptions::new().with_retry_attempts(requested))
        .await;

    assert!(res.is_err());
    assert_eq!(transport.calls(), expected);
    assert_eq!(backoff.seen().len(), expected - 1);
    assert!(backoff
        .seen()
        .iter()
        .all(|(policy, _)| policy.max_attempts() == expected as u32));
    assert_eq!(logger.count(Level::Warn, "fetch attempt failed"), expected);
    assert_eq!(logger.count(Level::Error, "fetch failed"), 1);
}

#[tokio::test]
async fn test_retry_until_success() -> Result<()> {
    let transport = MockHttpSend::new(|_, idx| match idx {
        0 | 1 => failure(),
        _ => json(200, r#"{"ok":true}"#),
    });
    let logger = RecordingLogger::default();
    let fetcher = Fetcher::new(context(transport.clone(), &logger))
        .with_backoff(RecordingBackoff::default());

    let resp = fetcher
        .execute(URL, FetchOptions::new().with_retry_attempts(5))
        .await?;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(transport.calls(), 3);
    assert_eq!(logger.count(Level::Error, "fetch failed"), 0);
    Ok(())
}

#[tokio::test]
async fn test_error_status_is_not_retried() -> Result<()> {
    let transport = MockHttpSend::new(|_, _| json(500, r#"{"message":"boom"}"#));
    let fetcher = Fetcher::new(context(transport.clone(), &RecordingLogger::default()));

    let resp = fetcher
        .execute(URL, FetchOptions::new().with_retry_attempts(3))
        .await?;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(transport.calls(), 1);
    Ok(())
}

#[test_case(None, 10; "default")]
#[test_case(Some(Duration::from_millis(1)), 10; "below minimum")]
#[test_case(Some(Duration::from_millis(300)), 300; "in range")]
#[test_case(Some(Duration::from_secs(60)), 1000; "above maximum")]
#[tokio::test]
async fn test_max_retry_delay_is_clamped(max_retry_delay: Option<Duration>, expected_ms: u64) {
    let transport = MockHttpSend::always_failing();
    let backoff = RecordingBackoff::default();
    let fetcher = Fetcher::new(context(transport, &RecordingLogger::default()))
        .with_backoff(backoff.clone());

    let options = FetchOptions {
        retry_attempts: Some(2),
        max_retry_delay,
        ..Default::default()
    };
    let _ = fetcher.execute(URL, options).await;

    let seen = backoff.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0.max_delay(), Duration::from_millis(expected_ms));
    assert_eq!(seen[0].1, 1);
}

#[tokio::test]
async fn test_cancel_before_start() {
    let transport = MockHttpSend::always_failing();
    let fetcher = Fetcher::new(context(transport.clone(), &RecordingLogger::default()));

    let handle = fetcher.execute(URL, FetchOptions::new().with_retry_attempts(3));
    handle.cancel();
    let err = handle.await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_cancel_during_attempt() {
    let transport = Arc::new(HangingHttpSend::default());
    let fetcher = Fetcher::new(Context::new().with_http_send(transport.clone()));

    let handle = fetcher.execute(URL, FetchOptions::new().with_retry_attempts(3));
    *transport.canceller.lock().unwrap() = Some(handle.canceller());
    let err = handle.await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_during_backoff() -> anyhow::Result<()> {
    let transport = MockHttpSend::always_failing();
    let logger = RecordingLogger::default();
    let fetcher = Fetcher::new(context(transport.clone(), &logger))
        .with_backoff(FixedBackoff(Duration::from_secs(30)));

    let (request, canceller) = fetcher
        .execute(URL, FetchOptions::new().with_retry_attempts(6))
        .into_parts();
    let task = tokio::spawn(request);

    for _ in 0..200 {
        if transport.calls() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    canceller.cancel();
    canceller.cancel();

    let err = tokio::time::timeout(Duration::from_secs(5), task)
        .await??
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(transport.calls(), 1);
    assert_eq!(logger.count(Level::Error, "fetch failed"), 1);
    Ok(())
}

#[tokio::test]
async fn test_transport_override_and_prebuilt_request() -> Result<()> {
    let transport = MockHttpSend::new(|_, _| json(201, r#"{"id":7}"#));
    let fetcher = Fetcher::new(Context::new());

    let req = http::Request::post(URL)
        .header("x-tenant", "acme")
        .body(Bytes::from_static(br#"{"name":"ferris"}"#))?;
    let resp = fetcher
        .execute(req, FetchOptions::new().with_transport(transport.clone()))
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let (parts, body) = transport.request(0);
    assert_eq!(parts.method, Method::POST);
    assert_eq!(parts.uri, URL);
    assert_eq!(parts.headers["x-tenant"], "acme");
    assert_eq!(body, r#"{"name":"ferris"}"#);
    Ok(())
}

fn signed_fetcher(transport: Arc<MockHttpSend>) -> SignedFetcher {
    let ctx = context(transport, &RecordingLogger::default());
    let cache = CredentialCache::new(ctx.clone(), Config::default().into());
    SignedFetcher::new(
        Fetcher::new(ctx).with_backoff(RecordingBackoff::default()),
        cache,
    )
}

fn static_credentials() -> Credentials {
    Credential::new("AKIDEXAMPLE", "secret_access_key")
        .with_session_token("session_token")
        .into()
}

#[tokio::test]
async fn test_signed_call() -> Result<()> {
    init_logger();
    let transport = MockHttpSend::new(|_, _| json(200, r#"{"id":1}"#));
    let fetcher = signed_fetcher(transport.clone());

    let body = json!({"name": "ferris"});
    let resp = fetcher
        .call(
            SignedCallConfig::new()
                .with_region("eu-west-2")
                .with_base_url("https://api.example.com/gw")
                .with_method(Method::POST)
                .with_path("/v1/data")
                .with_query(QueryParams::new().with("status", "active"))
                .with_body(&body)?
                .with_header("X-Tenant", "acme")
                .with_credentials(static_credentials()),
        )?
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let (parts, sent) = transport.request(0);
    assert_eq!(parts.method, Method::POST);
    assert_eq!(
        parts.uri,
        "https://api.example.com/gw/v1/data?status=active"
    );
    assert_eq!(sent, serde_json::to_vec(&body).unwrap());
    assert_eq!(parts.headers[CONTENT_TYPE], "application/json");
    assert_eq!(parts.headers[ACCEPT], "application/json");
    assert_eq!(parts.headers[HOST], "api.example.com");
    assert_eq!(parts.headers["x-tenant"], "acme");
    assert_eq!(parts.headers["x-amz-content-sha256"], hex_sha256(&sent));
    assert_eq!(parts.headers["x-amz-security-token"], "session_token");

    let auth = parts.headers[AUTHORIZATION].to_str().unwrap();
    assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
    assert!(auth.contains("/eu-west-2/execute-api/aws4_request"));
    assert!(auth.contains("SignedHeaders=accept;content-type;host;"));
    Ok(())
}

#[tokio::test]
async fn test_signed_call_explicit_host() -> Result<()> {
    let transport = MockHttpSend::new(|_, _| json(200, "{}"));
    let fetcher = signed_fetcher(transport.clone());

    fetcher
        .call(
            SignedCallConfig::new()
                .with_region("eu-west-2")
                .with_base_url("http://127.0.0.1:9000")
                .with_path("v1/data")
                .with_host("internal.example.com")
                .with_credentials(static_credentials()),
        )?
        .await?;

    let (parts, _) = transport.request(0);
    assert_eq!(parts.uri, "http://127.0.0.1:9000/v1/data");
    assert_eq!(parts.headers[HOST], "internal.example.com");
    Ok(())
}

#[tokio::test]
async fn test_signed_call_stays_on_base_origin() {
    let transport = MockHttpSend::new(|_, _| json(200, "{}"));
    let fetcher = signed_fetcher(transport.clone());

    let err = fetcher
        .call(
            SignedCallConfig::new()
                .with_region("eu-west-2")
                .with_base_url("https://api.example.com/gw")
                .with_path("https://elsewhere.example.net/collect")
                .with_credentials(static_credentials()),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_signed_call_without_path_or_payload() -> Result<()> {
    let transport = MockHttpSend::new(|_, _| json(200, "{}"));
    let fetcher = signed_fetcher(transport.clone());

    fetcher
        .call(
            SignedCallConfig::new()
                .with_region("eu-west-2")
                .with_base_url("https://api.example.com/gw")
                .with_method(Method::POST)
                .with_body(&None::<u64>)?
                .with_credentials(static_credentials()),
        )?
        .await?;

    let (parts, body) = transport.request(0);
    assert_eq!(parts.uri, "https://api.example.com/gw");
    assert!(body.is_empty());
    assert_eq!(parts.headers["x-amz-content-sha256"], hex_sha256(b""));
    Ok(())
}

#[tokio::test]
async fn test_signed_call_resigns_without_reloading() -> Result<()> {
    let transport = MockHttpSend::new(|_, idx| match idx {
        0 | 1 => failure(),
        _ => json(200, "{}"),
    });
    let fetcher = signed_fetcher(transport.clone());
    let provider = CountingProvider::default();
    let shared: SharedProvider = Arc::new(provider.clone());

    fetcher
        .call(
            SignedCallConfig::new()
                .with_region("eu-west-2")
                .with_base_url("https://api.example.com")
                .with_path("/v1/data")
                .with_credentials(shared),
        )?
        .await?;

    assert_eq!(transport.calls(), 3);
    assert_eq!(provider.loads.load(Ordering::SeqCst), 1);
    for idx in 0..3 {
        let (parts, _) = transport.request(idx);
        assert!(parts.headers[AUTHORIZATION]
            .to_str()
            .unwrap()
            .contains("Credential=AKIDCOUNTING/"));
    }
    Ok(())
}

#[test_case(None, 3; "default attempts")]
#[test_case(Some(0), 1; "zero disables retry")]
#[test_case(Some(2), 2; "explicit attempts")]
#[tokio::test]
async fn test_signed_call_retry_attempts(retry_attempts: Option<u32>, expected: usize) {
    let transport = MockHttpSend::always_failing();
    let fetcher = signed_fetcher(transport.clone());

    let cfg = SignedCallConfig {
        retry_attempts,
        ..SignedCallConfig::new()
            .with_region("eu-west-2")
            .with_base_url("https://api.example.com")
            .with_credentials(static_credentials())
    };
    let err = fetcher.call(cfg).unwrap().await.unwrap_err();

    assert_eq!(err.message(), "connection reset");
    assert_eq!(transport.calls(), expected);
}

#[tokio::test]
async fn test_bound_fetcher_merges_per_call_config() -> Result<()> {
    let transport = MockHttpSend::new(|_, _| json(200, "{}"));
    let bound = signed_fetcher(transport.clone()).bind(
        SignedCallConfig::new()
            .with_region("eu-west-2")
            .with_base_url("https://api.example.com/prod")
            .with_path("/v1/base")
            .with_header("x-tenant", "acme")
            .with_header("x-trace", "base")
            .with_credentials(static_credentials()),
    );

    bound
        .call(
            SignedCallConfig::new()
                .with_path("/v1/users")
                .with_header("x-trace", "call"),
        )?
        .await?;
    bound.call(SignedCallConfig::new())?.await?;

    let (parts, _) = transport.request(0);
    assert_eq!(parts.uri, "https://api.example.com/prod/v1/users");
    assert_eq!(parts.headers["x-tenant"], "acme");
    assert_eq!(parts.headers["x-trace"], "call");

    let (parts, _) = transport.request(1);
    assert_eq!(parts.uri, "https://api.example.com/prod/v1/base");
    assert_eq!(parts.headers["x-trace"], "base");
    Ok(())
}

const ASSUME_ROLE_RESPONSE: &str = r#"<AssumeRoleResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleResult>
    <Credentials>
      <AccessKeyId>ASIAASSUMED</AccessKeyId>
      <SecretAccessKey>assumed_secret_key</SecretAccessKey>
      <SessionToken>assumed_session_token</SessionToken>
      <Expiration>2099-01-01T00:00:00Z</Expiration>
    </Credentials>
  </AssumeRoleResult>
</AssumeRoleResponse>"#;

#[tokio::test]
async fn test_bind_with_assumed_role() -> Result<()> {
    init_logger();
    let transport = MockHttpSend::new(|parts, _| {
        if parts.uri.host() == Some("sts.amazonaws.com") {
            Ok(http::Response::builder()
                .status(200)
                .header(CONTENT_TYPE, "text/xml")
                .body(Bytes::from_static(ASSUME_ROLE_RESPONSE.as_bytes()))?)
        } else {
            json(200, r#"{"id":1}"#)
        }
    });
    let ctx = Context::new().with_http_send(transport.clone());
    let cache = CredentialCache::new(
        ctx.clone(),
        Config {
            region: Some("eu-west-2".to_string()),
            access_key_id: Some("AKIDBASE".to_string()),
            secret_access_key: Some("base_secret_key".to_string()),
            ..Default::default()
        }
        .into(),
    );
    let fetcher = SignedFetcher::new(Fetcher::new(ctx), cache.clone());

    let role_arn = "arn:aws:iam::123456789012:role/users-consumer";
    let bound = fetcher.bind_with_assumed_role(
        SignedCallConfig::new()
            .with_region("eu-west-2")
            .with_base_url("https://api.example.com"),
        role_arn,
        Some("tenant-a"),
    );
    // Binding alone fetches nothing.
    assert_eq!(transport.calls(), 0);
    assert_eq!(cache.len(), 1);

    bound.call(SignedCallConfig::new().with_path("/v1/a"))?.await?;
    bound.call(SignedCallConfig::new().with_path("/v1/b"))?.await?;

    // One STS call, then two API calls.
    assert_eq!(transport.calls(), 3);

    let (sts, _) = transport.request(0);
    let query: HashMap<String, String> =
        form_urlencoded::parse(sts.uri.query().unwrap_or_default().as_bytes())
            .into_owned()
            .collect();
    assert_eq!(query["RoleArn"], role_arn);
    assert_eq!(query["ExternalId"], "tenant-a");
    assert_eq!(query["RoleSessionName"], "consumer-session");
    let sts_auth = sts.headers[AUTHORIZATION].to_str().unwrap();
    assert!(sts_auth.contains("Credential=AKIDBASE/"));
    // The global endpoint is signed for us-east-1 even with a region configured.
    assert!(sts_auth.contains("/us-east-1/sts/aws4_request"));

    for idx in 1..3 {
        let (parts, _) = transport.request(idx);
        assert!(parts.headers[AUTHORIZATION]
            .to_str()
            .unwrap()
            .contains("Credential=ASIAASSUMED/"));
        assert_eq!(
            parts.headers["x-amz-security-token"],
            "assumed_session_token"
        );
    }

    let again = fetcher.cache().get_or_create(role_arn, Some("tenant-a"));
    let Some(Credentials::Provider(bound_provider)) = bound.base().credentials.clone() else {
        panic!("bound config must carry the assumed role provider");
    };
    assert!(Arc::ptr_eq(&again, &bound_provider));
    Ok(())
}

#[derive(Debug, PartialEq, Deserialize)]
struct User {
    id: u64,
    name: String,
}

#[tokio::test]
async fn test_signed_call_validated() -> Result<()> {
    let transport = MockHttpSend::new(|parts, _| match parts.uri.path() {
        "/v1/users/1" => json(200, r#"{"id":1,"name":"ferris"}"#),
        "/v1/users/2" => json(404, r#"{"message":"user not found"}"#),
        _ => json(200, r#"{"id":"three"}"#),
    });
    let bound = signed_fetcher(transport).bind(
        SignedCallConfig::new()
            .with_region("eu-west-2")
            .with_base_url("https://api.example.com")
            .with_credentials(static_credentials()),
    );
    let schema = Json::<User>::new();

    let res = validate_with(
        bound.call(SignedCallConfig::new().with_path("/v1/users/1"))?,
        &schema,
    )
    .await?;
    assert_eq!(
        res,
        ApiResult::Ok {
            status: StatusCode::OK,
            data: User {
                id: 1,
                name: "ferris".to_string()
            }
        }
    );

    let res = validate_with(
        bound.call(SignedCallConfig::new().with_path("/v1/users/2"))?,
        &schema,
    )
    .await?;
    let err = res.into_result().unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.message, "user not found");

    let res = validate_with(
        bound.call(SignedCallConfig::new().with_path("/v1/users/3"))?,
        &schema,
    )
    .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}
