// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Destination names.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Name of a registered destination, e.g. `old` or `new`.
///
/// Names are non-empty and compared exactly (case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DestinationName(String);

impl DestinationName {
	pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
		let name = name.into();
		if name.trim().is_empty() {
			return Err(CoreError::EmptyDestinationName);
		}
		Ok(Self(name))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for DestinationName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for DestinationName {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

impl TryFrom<String> for DestinationName {
	type Error = CoreError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl From<DestinationName> for String {
	fn from(value: DestinationName) -> Self {
		value.0
	}
}

// Lets `HashMap<DestinationName, _>` be queried with a plain `&str`.
impl Borrow<str> for DestinationName {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl AsRef<str> for DestinationName {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
