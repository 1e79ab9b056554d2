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

use crate::constants::X_AMZ_CONTENT_SHA_256;
use crate::credential::Credential;
use crate::provide_credential::utils::{parse_sts_error, sts_endpoint};
use async_trait::async_trait;
use bytes::Bytes;
use flexfetch_core::hash::EMPTY_STRING_SHA256;
use flexfetch_core::time::parse_rfc3339;
use flexfetch_core::{Context, Error, ProvideCredential, Result, Signer, SigningCredential};
use quick_xml::de;
use serde::Deserialize;
use std::sync::Mutex;

/// AssumeRoleCredentialProvider loads temporary credential via STS `AssumeRole`.
///
/// The STS request itself is signed by `sts_signer`, which carries the base
/// credential of the process. The assumed credential is kept and reused until
/// it gets close to expiry.
#[derive(Debug)]
pub struct AssumeRoleCredentialProvider {
    role_arn: String,
    role_session_name: String,
    external_id: Option<String>,
    duration_seconds: Option<u32>,

    region: Option<String>,
    use_regional_sts_endpoint: bool,

    sts_signer: Signer<Credential>,
    credential: Mutex<Option<Credential>>,
}

impl AssumeRoleCredentialProvider {
    /// Create a new assume role loader.
    pub fn new(role_arn: impl Into<String>, sts_signer: Signer<Credential>) -> Self {
        Self {
            role_arn: role_arn.into(),
            role_session_name: "consumer-session".to_string(),
            external_id: None,
            duration_seconds: Some(3600),
            region: None,
            use_regional_sts_endpoint: false,
            sts_signer,
            credential: Mutex::new(None),
        }
    }

    /// Set the role session name.
    pub fn with_role_session_name(mut self, name: impl Into<String>) -> Self {
        self.role_session_name = name.into();
        self
    }

    /// Set the external ID.
    ///
    /// An empty external ID is the same as no external ID.
    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.external_id = (!id.is_empty()).then_some(id);
        self
    }

    /// Set the duration in seconds.
    pub fn with_duration_seconds(mut self, seconds: u32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Use regional STS endpoint.
    pub fn with_regional_sts_endpoint(mut self) -> Self {
        self.use_regional_sts_endpoint = true;
        self
    }

    /// The role this provider assumes.
    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    fn cached(&self) -> Option<Credential> {
        match self.credential.lock() {
            Ok(guard) => guard.clone().filter(|c| c.is_valid()),
            Err(_) => None,
        }
    }

    async fn assume_role(&self, ctx: &Context) -> Result<Credential> {
        let endpoint = sts_endpoint(self.region.as_deref(), self.use_regional_sts_endpoint)
            .map_err(|e| e.with_context(format!("role_arn: {}", self.role_arn)))?;

        let query = {
            let mut s = form_urlencoded::Serializer::new(String::new());
            s.append_pair("Action", "AssumeRole")
                .append_pair("RoleArn", &self.role_arn)
                .append_pair("RoleSessionName", &self.role_session_name)
                .append_pair("Version", "2011-06-15");
            if let Some(external_id) = &self.external_id {
                s.append_pair("ExternalId", external_id);
            }
            if let Some(duration_seconds) = self.duration_seconds {
                s.append_pair("DurationSeconds", &duration_seconds.to_string());
            }
            s.finish()
        };

        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri(format!("https://{endpoint}/?{query}"))
            .header(
                http::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .header(X_AMZ_CONTENT_SHA_256, EMPTY_STRING_SHA256)
            .body(Bytes::new())
            .map_err(|e| {
                Error::request_invalid("failed to build STS AssumeRole request")
                    .with_source(e)
                    .with_context(format!("role_arn: {}", self.role_arn))
            })?;

        let (mut parts, body) = req.into_parts();
        self.sts_signer.sign(&mut parts).await?;
        let req = http::Request::from_parts(parts, body);

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            Error::unexpected("failed to send AssumeRole request to STS")
                .with_source(e)
                .with_context(format!("role_arn: {}", self.role_arn))
                .with_context(format!("endpoint: https://{endpoint}"))
                .set_retryable(true)
        })?;

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("x-amzn-requestid")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if status != http::StatusCode::OK {
            return Err(parse_sts_error(
                "AssumeRole",
                status,
                resp.body(),
                request_id.as_deref(),
            )
            .with_context(format!("role_arn: {}", self.role_arn))
            .with_context(format!("session_name: {}", self.role_session_name)));
        }

        let body = resp.into_body();
        let resp: AssumeRoleResponse = de::from_str(&body).map_err(|e| {
            Error::unexpected("failed to parse STS AssumeRole response")
                .with_source(e)
                .with_context(format!("response_length: {}", body.len()))
                .with_context(format!("role_arn: {}", self.role_arn))
        })?;
        let resp_cred = resp.result.credentials;

        Ok(Credential {
            access_key_id: resp_cred.access_key_id,
            secret_access_key: resp_cred.secret_access_key,
            session_token: Some(resp_cred.session_token.trim().to_string()),
            expires_in: Some(parse_rfc3339(&resp_cred.expiration).map_err(|e| {
                e.with_context(format!("role_arn: {}", self.role_arn))
            })?),
        })
    }
}

#[async_trait]
impl ProvideCredential for AssumeRoleCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        if let Some(cred) = self.cached() {
            return Ok(Some(cred));
        }

        log::debug!("assuming role {} via STS", self.role_arn);
        let cred = self.assume_role(ctx).await?;
        if let Ok(mut guard) = self.credential.lock() {
            *guard = Some(cred.clone());
        }

        Ok(Some(cred))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleResponse {
    #[serde(rename = "AssumeRoleResult")]
    result: AssumeRoleResult,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleResult {
    credentials: AssumeRoleCredentials,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: String,
}
