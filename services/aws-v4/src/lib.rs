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

//! AWS SigV4 signing for flexfetch.
//!
//! This crate signs requests for AWS services (API Gateway's `execute-api`
//! in particular) and loads the credentials to sign them with: static keys,
//! environment variables, or temporary credentials from STS `AssumeRole`.
//!
//! ```no_run
//! use flexfetch_aws_v4::{Config, DefaultCredentialProvider, RequestSigner};
//! use flexfetch_core::{Context, OsEnv, Signer};
//!
//! # async fn example() -> flexfetch_core::Result<()> {
//! let ctx = Context::new().with_env(OsEnv);
//! let config = Config::default().from_env(&ctx);
//!
//! let signer = Signer::new(
//!     ctx,
//!     DefaultCredentialProvider::new(config.into()),
//!     RequestSigner::new("execute-api", "eu-west-2"),
//! );
//!
//! let mut parts = http::Request::get("https://api.example.com/v1/data")
//!     .body(())?
//!     .into_parts()
//!     .0;
//! signer.sign(&mut parts).await?;
//! # Ok(())
//! # }
//! ```

mod constants;
pub use constants::{EXECUTE_API, X_AMZ_CONTENT_SHA_256};

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::RequestSigner;

mod provide_credential;
pub use provide_credential::*;
