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

use crate::request::{parse_response_body, Response};
use flexfetch_core::{ReasonPhrase, Result};
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

/// Message of the error returned when a successful response fails its schema.
pub const VALIDATION_FAILED: &str = "Response validation failed";

/// Uniform result of a validated call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    /// The call succeeded and its body matched the schema.
    Ok {
        /// Status of the response.
        status: StatusCode,
        /// Body parsed by the schema.
        data: T,
    },
    /// The call got a non-2xx response, or a body the schema rejected.
    Err(ApiError),
}

impl<T> ApiResult<T> {
    /// Check if the call succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, ApiResult::Ok { .. })
    }

    /// Status of the response, `422` for schema failures.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiResult::Ok { status, .. } => *status,
            ApiResult::Err(err) => err.status,
        }
    }

    /// Convert into a std result, dropping the status of successful calls.
    pub fn into_result(self) -> std::result::Result<T, ApiError> {
        match self {
            ApiResult::Ok { data, .. } => Ok(data),
            ApiResult::Err(err) => Err(err),
        }
    }
}

/// A failed call as reported by [`validate_with`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    /// Status of the response.
    pub status: StatusCode,
    /// `message` from the body, else the status reason.
    pub message: String,
    /// Parsed body, or the validation issues for schema failures.
    pub body: Option<Value>,
}

/// One problem found by a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Where the problem is, empty for the whole body.
    pub path: String,
    /// What is wrong.
    pub message: String,
}

/// The issues that made a body fail its schema.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationError {
    /// Every issue found.
    pub errors: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Create an error with a single issue.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![ValidationIssue {
                path: path.into(),
                message: message.into(),
            }],
        }
    }

    /// Add another issue.
    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        for (i, issue) in self.errors.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { "; " })?;
            if !issue.path.is_empty() {
                write!(f, "{}: ", issue.path)?;
            }
            f.write_str(&issue.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::new("", err.to_string())
    }
}

/// Schema checks a parsed body and turns it into a typed value.
///
/// `body` is `None` when the response has no body.
pub trait Schema {
    /// Value produced by a valid body.
    type Output;

    /// Check `body`.
    fn parse(&self, body: Option<&Value>) -> std::result::Result<Self::Output, ValidationError>;
}

/// Deserialize the body into `T` with serde, a missing body reads as `null`.
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T> Json<T> {
    /// Create the schema.
    pub fn new() -> Self {
        Json(PhantomData)
    }
}

impl<T> Default for Json<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Json<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Json<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned> Schema for Json<T> {
    type Output = T;

    fn parse(&self, body: Option<&Value>) -> std::result::Result<T, ValidationError> {
        let value = body.cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }
}

/// Accept any body as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unchecked;

impl Schema for Unchecked {
    type Output = Option<Value>;

    fn parse(&self, body: Option<&Value>) -> std::result::Result<Option<Value>, ValidationError> {
        Ok(body.cloned())
    }
}

impl<F, T> Schema for F
where
    F: Fn(Option<&Value>) -> std::result::Result<T, ValidationError>,
{
    type Output = T;

    fn parse(&self, body: Option<&Value>) -> std::result::Result<T, ValidationError> {
        self(body)
    }
}

/// Await `request` and return its parsed body without any schema.
pub async fn validate<F>(request: F) -> Result<ApiResult<Option<Value>>>
where
    F: Future<Output = Result<Response>>,
{
    validate_with(request, &Unchecked).await
}

/// Await `request` and check its body against `schema`.
///
/// Transport failures (including cancellation) are returned as `Err`.
/// Every response becomes an [`ApiResult`]:
///
/// - non-2xx: [`ApiError`] with the body's `message` or the status reason,
///   the schema is not run.
/// - 2xx with a body the schema rejects: [`ApiError`] with status `422`.
pub async fn validate_with<F, S>(request: F, schema: &S) -> Result<ApiResult<S::Output>>
where
    F: Future<Output = Result<Response>>,
    S: Schema + ?Sized,
{
    let resp = request.await?;
    let status = resp.status();
    let body = parse_response_body(&resp);

    if !status.is_success() {
        let message = body
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| status_text(&resp));
        return Ok(ApiResult::Err(ApiError {
            status,
            message,
            body,
        }));
    }

    match schema.parse(body.as_ref()) {
        Ok(data) => Ok(ApiResult::Ok { status, data }),
        Err(err) => {
            log::warn!("response of status {status} failed validation: {err}");
            Ok(ApiResult::Err(ApiError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: VALIDATION_FAILED.to_string(),
                body: serde_json::to_value(&err).ok(),
            }))
        }
    }
}

/// The server's reason phrase, else the canonical one.
fn status_text(resp: &Response) -> String {
    if let Some(ReasonPhrase(reason)) = resp.extensions().get::<ReasonPhrase>() {
        return reason.clone();
    }
    resp.status()
        .canonical_reason()
        .unwrap_or("Unknown Error")
        .to_string()
}
