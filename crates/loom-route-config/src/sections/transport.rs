// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transport configuration section.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 200;
const DEFAULT_MAX_DELAY_MS: u64 = 5_000;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TransportConfigLayer {
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
	#[serde(default)]
	pub max_attempts: Option<u32>,
	#[serde(default)]
	pub base_delay_ms: Option<u64>,
	#[serde(default)]
	pub max_delay_ms: Option<u64>,
}

impl TransportConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
		if other.max_attempts.is_some() {
			self.max_attempts = other.max_attempts;
		}
		if other.base_delay_ms.is_some() {
			self.base_delay_ms = other.base_delay_ms;
		}
		if other.max_delay_ms.is_some() {
			self.max_delay_ms = other.max_delay_ms;
		}
	}

	pub fn finalize(self) -> TransportConfig {
		TransportConfig {
			request_timeout: Duration::from_secs(
				self
					.request_timeout_secs
					.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
			),
			max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
			base_delay: Duration::from_millis(self.base_delay_ms.unwrap_or(DEFAULT_BASE_DELAY_MS)),
			max_delay: Duration::from_millis(self.max_delay_ms.unwrap_or(DEFAULT_MAX_DELAY_MS)),
		}
	}
}

/// Raw transport settings. The CLI maps these onto the HTTP transport and its
/// retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
	pub request_timeout: Duration,
	/// Attempts per submission, including the first.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
}

impl Default for TransportConfig {
	fn default() -> Self {
		TransportConfigLayer::default().finalize()
	}
}
