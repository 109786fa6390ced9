// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transport-side retry with exponential backoff.
//!
//! The router itself never retries; a transport may wrap a single submission
//! in [`retry`] to ride out transient failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
	/// Total attempts including the first one. `1` disables retries.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

impl RetryPolicy {
	/// A policy that makes exactly one attempt.
	pub fn none() -> Self {
		Self {
			max_attempts: 1,
			..Self::default()
		}
	}

	/// Delay before retry number `retry` (0-based).
	fn delay(&self, retry: u32) -> Duration {
		let exponential = self.base_delay.as_secs_f64() * self.backoff_factor.powi(retry as i32);
		let capped = exponential.min(self.max_delay.as_secs_f64());

		let delay = if self.jitter {
			capped * (0.5 + fastrand::f64())
		} else {
			capped
		};

		Duration::from_secs_f64(delay)
	}
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up. Returns the last error in the latter cases.
///
/// A rate limit whose `Retry-After` is longer than `max_delay` is returned
/// immediately instead of being retried early.
pub async fn retry<F, Fut, T>(policy: &RetryPolicy, mut op: F) -> Result<T, TransportError>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, TransportError>>,
{
	let max_attempts = policy.max_attempts.max(1);
	let mut attempt = 0;

	loop {
		attempt += 1;
		let err = match op().await {
			Ok(value) => return Ok(value),
			Err(err) => err,
		};

		if !err.is_retryable() || attempt >= max_attempts {
			return Err(err);
		}

		let retry_after_secs = match &err {
			TransportError::RateLimited { retry_after_secs } => *retry_after_secs,
			_ => None,
		};

		let delay = match retry_after_secs {
			Some(secs) => {
				let retry_after = Duration::from_secs(secs);
				if retry_after > policy.max_delay {
					warn!(
						retry_after_secs = secs,
						max_delay_ms = policy.max_delay.as_millis() as u64,
						"Retry-After exceeds max delay, giving up"
					);
					return Err(err);
				}
				retry_after
			}
			None => policy.delay(attempt - 1),
		};

		warn!(
			error = %err,
			attempt,
			max_attempts,
			delay_ms = delay.as_millis() as u64,
			"Retrying submission after error"
		);
		tokio::time::sleep(delay).await;
	}
}
