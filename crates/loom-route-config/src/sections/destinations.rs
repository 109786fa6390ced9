// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Destination configuration section.
//!
//! ```toml
//! [destinations.old]
//! dsn = "https://514d5e38a4003c2c@o1.ingest.example.com/42"
//! ```

use std::fmt;

use loom_route_core::{Dsn, SecretString, REDACTED};
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Clone, Default, Deserialize, PartialEq)]
pub struct DestinationConfigLayer {
	#[serde(default)]
	pub dsn: Option<String>,
}

impl fmt::Debug for DestinationConfigLayer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DestinationConfigLayer")
			.field("dsn", &self.dsn.as_ref().map(|_| REDACTED))
			.finish()
	}
}

impl DestinationConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.dsn.is_some() {
			self.dsn = other.dsn;
		}
	}

	/// Resolve the layer for destination `name`, checking that the DSN parses.
	pub fn finalize(self, name: &str) -> Result<DestinationConfig, ConfigError> {
		let key = format!("destinations.{name}.dsn");
		let dsn = self.dsn.ok_or_else(|| ConfigError::Validation(format!("{key} is not set")))?;

		dsn.parse::<Dsn>().map_err(|e| ConfigError::InvalidValue {
			key,
			message: e.to_string(),
		})?;

		Ok(DestinationConfig {
			dsn: SecretString::new(dsn),
		})
	}
}

/// A resolved destination. The DSN is kept as written so it can be
/// handed to `Router::register` unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationConfig {
	pub dsn: SecretString,
}
