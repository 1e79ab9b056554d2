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

//! Request assembly helpers shared by plain and signed fetches.

use bytes::Bytes;
use flexfetch_core::{Error, Result};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Response returned by every transport, with the body fully read.
pub type Response = http::Response<Bytes>;

/// Ordered query parameters.
///
/// Keys may repeat: a list value is exploded into one pair per element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Create an empty set of query parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single `key=value` pair.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    /// Append one `key=value` pair per element of `values`.
    pub fn with_all<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let key = key.into();
        for value in values {
            self.0.push((key.clone(), value.to_string()));
        }
        self
    }

    /// Append a single `key=value` pair in place.
    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.push((key.into(), value.to_string()));
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for QueryParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = QueryParams::new();
        for (k, v) in iter {
            params.push(k, v);
        }
        params
    }
}

/// Resolve `path` against `base` and attach `query`.
///
/// The base and the path are joined with exactly one slash, so a base with
/// a path prefix (`https://host/stage`) keeps its prefix. An empty `path`
/// leaves the base path untouched. A query embedded in `path` is kept unless
/// `query` is non-empty, in which case it replaces it.
///
/// The result always stays on the origin of `base`: a `path` that resolves
/// to another scheme, host or port is rejected.
pub fn build_url(base: &str, path: &str, query: &QueryParams) -> Result<Url> {
    let mut base = Url::parse(base).map_err(|e| {
        Error::request_invalid("base url is invalid")
            .with_source(e)
            .with_context(format!("base_url: {base}"))
    })?;

    let path = path.trim_start_matches('/');
    let mut url = if path.is_empty() {
        base.clone()
    } else {
        if !base.path().ends_with('/') {
            let prefix = format!("{}/", base.path());
            base.set_path(&prefix);
        }
        base.join(path).map_err(|e| {
            Error::request_invalid("path can't be joined with base url")
                .with_source(e)
                .with_context(format!("path: {path}"))
        })?
    };
    if url.origin() != base.origin() {
        return Err(Error::request_invalid("path must stay on the base url origin")
            .with_context(format!("base_url: {base}"))
            .with_context(format!("path: {path}")));
    }

    if !query.is_empty() {
        url.set_query(None);
        url.query_pairs_mut().extend_pairs(query.iter());
    }

    Ok(url)
}

/// Serialize an optional body as JSON.
pub fn serialize_body<T: Serialize + ?Sized>(body: Option<&T>) -> Result<Option<Bytes>> {
    body.map(|v| serde_json::to_vec(v).map(Bytes::from))
        .transpose()
        .map_err(|e| Error::request_invalid("failed to serialize request body").with_source(e))
}

/// Build a request with a JSON content type unless `headers` sets another one.
pub fn build_request(
    url: &Url,
    method: Method,
    body: Option<Bytes>,
    headers: &HeaderMap,
) -> Result<http::Request<Bytes>> {
    let mut req = http::Request::builder()
        .method(method)
        .uri(url.as_str())
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .body(body.unwrap_or_default())?;

    for (name, value) in headers {
        req.headers_mut().insert(name, value.clone());
    }

    Ok(req)
}

/// Parse a response body into a JSON value.
///
/// - `None` for `204 No Content`, `content-length: 0` or an empty body.
/// - A JSON content type is parsed, falling back to the raw text when it is
///   not valid JSON.
/// - Any other content type yields the raw text.
pub fn parse_response_body(resp: &Response) -> Option<Value> {
    if resp.status() == StatusCode::NO_CONTENT {
        return None;
    }
    if resp
        .headers()
        .get(CONTENT_LENGTH)
        .is_some_and(|v| v.as_bytes() == b"0")
    {
        return None;
    }

    let text = String::from_utf8_lossy(resp.body());
    if text.is_empty() {
        return None;
    }

    let is_json = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            let v = v.to_ascii_lowercase();
            v.contains("application/json") || v.contains("+json")
        });

    if is_json {
        match serde_json::from_str(&text) {
            Ok(v) => Some(v),
            Err(e) => {
                log::debug!("response body is not valid json, fallback to text: {e}");
                Some(Value::String(text.into_owned()))
            }
        }
    } else {
        Some(Value::String(text.into_owned()))
    }
}
