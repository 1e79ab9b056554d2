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

use flexfetch_core::{Error, Result};
use http::StatusCode;
use serde::Deserialize;

/// Get the sts endpoint.
///
/// The returning format may look like `sts.{region}.amazonaws.com`
///
/// # Notes
///
/// AWS could have different sts endpoint based on it's region.
/// We can check them by region name.
///
/// ref: https://github.com/awslabs/aws-sdk-rust/blob/31cfae2cf23be0c68a47357070dea1aee9227e3a/sdk/sts/src/aws_endpoint.rs
pub fn sts_endpoint(region: Option<&str>, use_regional: bool) -> Result<String> {
    if use_regional {
        let region =
            region.ok_or_else(|| Error::config_invalid("regional STS endpoint requires region"))?;
        if region.starts_with("cn-") {
            Ok(format!("sts.{region}.amazonaws.com.cn"))
        } else {
            Ok(format!("sts.{region}.amazonaws.com"))
        }
    } else {
        let region = region.unwrap_or_default();
        if region.starts_with("cn") {
            Ok("sts.amazonaws.com.cn".to_string())
        } else {
            Ok("sts.amazonaws.com".to_string())
        }
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsErrorResponse {
    error: StsError,
    request_id: String,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsError {
    code: String,
    message: String,
}

/// Turn a non-200 STS response into an [`Error`].
///
/// Throttling and server side failures are marked retryable.
pub fn parse_sts_error(
    action: &str,
    status: StatusCode,
    body: &str,
    request_id: Option<&str>,
) -> Error {
    let parsed: StsErrorResponse = quick_xml::de::from_str(body).unwrap_or_default();
    let code = parsed.error.code.as_str();

    let message = if parsed.error.message.is_empty() {
        format!("{action} failed with status {status}")
    } else {
        format!("{action} failed: {}", parsed.error.message)
    };

    let err = match code {
        "AccessDenied" | "InvalidClientTokenId" | "SignatureDoesNotMatch" => {
            Error::credential_denied(message)
        }
        "ExpiredToken" | "ExpiredTokenException" => Error::credential_expired(message),
        "InvalidParameterValue" | "ValidationError" | "MalformedPolicyDocument" => {
            Error::request_invalid(message)
        }
        _ => Error::unexpected(message),
    };

    let retryable = status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || matches!(code, "Throttling" | "ThrottlingException" | "IDPCommunicationError");

    let mut err = err
        .with_context(format!("status: {status}"))
        .set_retryable(retryable);
    if !code.is_empty() {
        err = err.with_context(format!("code: {code}"));
    }
    match request_id.filter(|v| !v.is_empty()) {
        Some(id) => err.with_context(format!("request_id: {id}")),
        None if !parsed.request_id.is_empty() => {
            err.with_context(format!("request_id: {}", parsed.request_id))
        }
        None => err,
    }
}
