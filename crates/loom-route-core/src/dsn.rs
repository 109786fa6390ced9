// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! DSN parsing.
//!
//! A DSN identifies one ingest endpoint and carries the key used to
//! authenticate against it:
//!
//! ```text
//! https://<public_key>[:<secret_key>]@<host>[:<port>][/<path>]/<project_id>
//! ```
//!
//! The keys are stored as [`Secret`]s; neither `Debug` nor `Display` of a
//! [`Dsn`] reveal them.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::DsnError;
use crate::secret::{SecretString, REDACTED};

/// Transport scheme of a DSN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
	Http,
	Https,
}

impl Scheme {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Http => "http",
			Self::Https => "https",
		}
	}
}

impl fmt::Display for Scheme {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A parsed endpoint credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Dsn {
	scheme: Scheme,
	public_key: SecretString,
	secret_key: Option<SecretString>,
	host: String,
	port: Option<u16>,
	path: String,
	project_id: String,
}

impl Dsn {
	pub fn scheme(&self) -> Scheme {
		self.scheme
	}

	pub fn public_key(&self) -> &str {
		self.public_key.expose()
	}

	pub fn secret_key(&self) -> Option<&str> {
		self.secret_key.as_ref().map(|s| s.expose().as_str())
	}

	pub fn host(&self) -> &str {
		&self.host
	}

	/// Explicit port, `None` when the scheme default applies.
	pub fn port(&self) -> Option<u16> {
		self.port
	}

	pub fn project_id(&self) -> &str {
		&self.project_id
	}

	/// Scheme, host, port and path prefix, without a trailing slash.
	pub fn base_url(&self) -> String {
		match self.port {
			Some(port) => format!("{}://{}:{}{}", self.scheme, self.host, port, self.path),
			None => format!("{}://{}{}", self.scheme, self.host, self.path),
		}
	}

	/// The endpoint events for this project are posted to.
	pub fn store_url(&self) -> String {
		format!("{}/api/{}/store/", self.base_url(), self.project_id)
	}
}

impl FromStr for Dsn {
	type Err = DsnError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.is_empty() {
			return Err(DsnError::Empty);
		}

		let url = Url::parse(s).map_err(|e| DsnError::Malformed(e.to_string()))?;

		let scheme = match url.scheme() {
			"http" => Scheme::Http,
			"https" => Scheme::Https,
			other => return Err(DsnError::UnsupportedScheme(other.to_string())),
		};

		if url.username().is_empty() {
			return Err(DsnError::MissingPublicKey);
		}
		let public_key = SecretString::from(url.username());
		let secret_key = url
			.password()
			.filter(|p| !p.is_empty())
			.map(SecretString::from);

		let host = match url.host_str() {
			Some(host) if !host.is_empty() => host.to_string(),
			_ => return Err(DsnError::MissingHost),
		};

		let mut segments: Vec<&str> = url
			.path_segments()
			.map(|segments| segments.filter(|s| !s.is_empty()).collect())
			.unwrap_or_default();
		let project_id = segments.pop().ok_or(DsnError::MissingProjectId)?.to_string();
		let path = segments.iter().map(|s| format!("/{s}")).collect::<String>();

		Ok(Self {
			scheme,
			public_key,
			secret_key,
			host,
			port: url.port(),
			path,
			project_id,
		})
	}
}

impl fmt::Display for Dsn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}://{}@", self.scheme, REDACTED)?;
		f.write_str(&self.host)?;
		if let Some(port) = self.port {
			write!(f, ":{port}")?;
		}
		write!(f, "{}/{}", self.path, self.project_id)
	}
}

impl fmt::Debug for Dsn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Dsn").field(&self.to_string()).finish()
	}
}
