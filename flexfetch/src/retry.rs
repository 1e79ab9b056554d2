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

//! Bounded retry with full jitter backoff.

use flexfetch_core::{Error, Result};
use rand::Rng;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

/// Hard ceiling of attempts for one logical request.
pub const MAX_ATTEMPTS: u32 = 6;
/// Lower bound of the backoff delays.
pub const MIN_DELAY: Duration = Duration::from_millis(10);
/// Upper bound of the backoff delays.
pub const MAX_DELAY: Duration = Duration::from_millis(1000);
/// Base delay used when growing the backoff cap.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// RetryPolicy bounds the attempts and delays of one logical request.
///
/// Every value is clamped on the way in: attempts into `[1, MAX_ATTEMPTS]`
/// and delays into `[MIN_DELAY, MAX_DELAY]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy allowing `max_attempts` attempts in total.
    ///
    /// The max delay starts at [`MIN_DELAY`].
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS),
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: MIN_DELAY,
        }
    }

    /// Build the policy described by fetch options.
    ///
    /// Returns `None` when `retry_attempts` is absent or zero: the request
    /// is then sent exactly once without any retry machinery.
    pub fn from_options(
        retry_attempts: Option<u32>,
        max_retry_delay: Option<Duration>,
    ) -> Option<Self> {
        let attempts = retry_attempts.filter(|v| *v > 0)?;
        let policy = Self::new(attempts);
        Some(match max_retry_delay {
            Some(delay) => policy.with_max_delay(delay),
            None => policy,
        })
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay.clamp(MIN_DELAY, MAX_DELAY);
        self
    }

    /// Set the max delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay.clamp(MIN_DELAY, MAX_DELAY);
        self
    }

    /// Total attempts allowed, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Base delay, never above [`RetryPolicy::max_delay`].
    pub fn base_delay(&self) -> Duration {
        self.base_delay.min(self.max_delay)
    }

    /// Cap of any single delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }
}

/// Backoff decides how long to wait before the next attempt.
pub trait Backoff: Debug + Send + Sync + 'static {
    /// Delay after the failed `attempt` (starting from 1).
    fn delay(&self, policy: &RetryPolicy, attempt: u32) -> Duration;
}

/// FullJitter waits a uniformly random time in `[0, min(base * 2^(attempt-1), max)]`.
///
/// - [Exponential Backoff And Jitter](https://aws.amazon.com/blogs/architecture/exponential-backoff-and-jitter/)
#[derive(Debug, Clone, Copy, Default)]
pub struct FullJitter;

impl FullJitter {
    fn cap(policy: &RetryPolicy, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        policy
            .base_delay()
            .saturating_mul(1 << exp)
            .min(policy.max_delay())
    }
}

impl Backoff for FullJitter {
    fn delay(&self, policy: &RetryPolicy, attempt: u32) -> Duration {
        let cap = Self::cap(policy, attempt).as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=cap))
    }
}

/// Run `op` until it succeeds, `should_retry` says no, or the policy runs out of attempts.
///
/// `should_retry` sees every failure, including the last one. Attempts are
/// numbered from 1 and never overlap.
pub async fn run_with_retry<T, F, Fut, P>(
    policy: &RetryPolicy,
    backoff: &dyn Backoff,
    mut op: F,
    mut should_retry: P,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    P: FnMut(&Error, u32) -> bool,
{
    let mut attempt = 1;
    loop {
        let err = match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(err) => err,
        };

        if !should_retry(&err, attempt) || attempt >= policy.max_attempts() {
            return Err(err);
        }

        tokio::time::sleep(backoff.delay(policy, attempt)).await;
        attempt += 1;
    }
}
