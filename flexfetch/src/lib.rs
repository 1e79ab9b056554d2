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

//! Resilient, authenticated HTTP fetching.
//!
//! flexfetch sends requests through a pluggable transport with bounded
//! retry, full jitter backoff and cancellation, signs service to service
//! calls with AWS SigV4 using cached assume-role credentials, and turns
//! responses into a uniform [`ApiResult`] checked against a [`Schema`].
//!
//! ## Example
//!
//! ```no_run
//! use flexfetch::aws::Config;
//! use flexfetch::{validate_with, CredentialCache, Fetcher, Json, SignedCallConfig, SignedFetcher};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! # async fn example() -> flexfetch::Result<()> {
//! let ctx = flexfetch::default_context();
//! let config = Config::default().from_env(&ctx);
//! let fetcher = SignedFetcher::new(
//!     Fetcher::new(ctx.clone()),
//!     CredentialCache::new(ctx, config.into()),
//! );
//!
//! let handle = fetcher.call(
//!     SignedCallConfig::new()
//!         .with_region("eu-west-2")
//!         .with_base_url("https://abc123.execute-api.eu-west-2.amazonaws.com/prod")
//!         .with_path("/v1/users/1"),
//! )?;
//!
//! match validate_with(handle, &Json::<User>::new()).await? {
//!     flexfetch::ApiResult::Ok { data, .. } => println!("got user {}", data.name),
//!     flexfetch::ApiResult::Err(err) => println!("call failed: {err}"),
//! }
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub use flexfetch_core::*;

/// AWS SigV4 signing and credentials.
pub mod aws {
    pub use flexfetch_aws_v4::*;
}

mod request;
pub use request::{
    build_request, build_url, parse_response_body, serialize_body, QueryParams, Response,
};

pub mod retry;
pub use retry::{Backoff, FullJitter, RetryPolicy};

mod fetch;
pub use fetch::{Canceller, FetchHandle, FetchOptions, Fetcher, Target};

mod cache;
pub use cache::{CredentialCache, SharedProvider};

mod signed;
pub use signed::{
    BoundFetcher, Credentials, SignedCallConfig, SignedFetcher, SignedHttpSend,
    DEFAULT_SIGNED_RETRY_ATTEMPTS,
};

mod typed;
pub use typed::{
    validate, validate_with, ApiError, ApiResult, Json, Schema, Unchecked, ValidationError,
    ValidationIssue, VALIDATION_FAILED,
};

/// Create a context with the reqwest transport and the OS environment.
#[cfg(feature = "default-context")]
pub fn default_context() -> Context {
    Context::new()
        .with_env(OsEnv)
        .with_http_send(flexfetch_http_send_reqwest::ReqwestHttpSend::default())
}
