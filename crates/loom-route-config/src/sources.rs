// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::RouteConfigLayer;
use crate::sections::{
	DestinationConfigLayer, LogFormat, LoggingConfigLayer, TransportConfigLayer,
};

/// Prefix of per-destination DSN variables, e.g. `LOOM_ROUTE_DSN_OLD`.
pub const DSN_ENV_PREFIX: &str = "LOOM_ROUTE_DSN_";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<RouteConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<RouteConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(RouteConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/loom/route.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<RouteConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(RouteConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: RouteConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!(
			destinations = layer.destinations.len(),
			"parsed config layer from TOML"
		);
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `LOOM_ROUTE_<FIELD>`, plus one `LOOM_ROUTE_DSN_<NAME>` per
/// destination. `<NAME>` is lower-cased to form the destination name; it
/// still overrides a file destination spelled with different case.
#[derive(Debug, Default)]
pub struct EnvSource {
	vars: Option<BTreeMap<String, String>>,
}

impl EnvSource {
	/// Reads the process environment.
	pub fn new() -> Self {
		Self::default()
	}

	/// Reads a fixed set of variables instead of the process environment.
	pub fn with_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: Some(
				vars
					.into_iter()
					.map(|(k, v)| (k.into(), v.into()))
					.collect(),
			),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		let value = match &self.vars {
			Some(vars) => vars.get(name).cloned(),
			None => std::env::var(name).ok(),
		};
		value.filter(|s| !s.is_empty())
	}

	fn var_u32(&self, name: &str) -> Result<Option<u32>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid u32 value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn var_u64(&self, name: &str) -> Result<Option<u64>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid u64 value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn dsn_vars(&self) -> Vec<(String, String)> {
		match &self.vars {
			Some(vars) => vars
				.iter()
				.map(|(k, v)| (k.clone(), v.clone()))
				.collect(),
			None => std::env::vars().collect(),
		}
	}

	fn load_destinations(&self) -> Result<BTreeMap<String, DestinationConfigLayer>, ConfigError> {
		let mut destinations = BTreeMap::new();

		for (key, value) in self.dsn_vars() {
			let Some(suffix) = key.strip_prefix(DSN_ENV_PREFIX) else {
				continue;
			};
			if value.is_empty() {
				continue;
			}
			if suffix.is_empty() {
				return Err(ConfigError::InvalidValue {
					key,
					message: "missing destination name after prefix".to_string(),
				});
			}

			trace!(destination = %suffix.to_lowercase(), "destination DSN from environment");
			destinations.insert(
				suffix.to_lowercase(),
				DestinationConfigLayer { dsn: Some(value) },
			);
		}

		Ok(destinations)
	}

	fn load_transport(&self) -> Result<TransportConfigLayer, ConfigError> {
		Ok(TransportConfigLayer {
			request_timeout_secs: self.var_u64("LOOM_ROUTE_REQUEST_TIMEOUT_SECS")?,
			max_attempts: self.var_u32("LOOM_ROUTE_MAX_ATTEMPTS")?,
			base_delay_ms: self.var_u64("LOOM_ROUTE_RETRY_BASE_DELAY_MS")?,
			max_delay_ms: self.var_u64("LOOM_ROUTE_RETRY_MAX_DELAY_MS")?,
		})
	}

	fn load_logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		let format = match self.var("LOOM_ROUTE_LOG_FORMAT") {
			Some(v) => Some(v.parse::<LogFormat>().map_err(|message| {
				ConfigError::InvalidValue {
					key: "LOOM_ROUTE_LOG_FORMAT".to_string(),
					message,
				}
			})?),
			None => None,
		};

		Ok(LoggingConfigLayer {
			level: self.var("LOOM_ROUTE_LOG_LEVEL"),
			format,
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<RouteConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(RouteConfigLayer {
			destinations: self.load_destinations()?,
			release: self.var("LOOM_ROUTE_RELEASE"),
			environment: self.var("LOOM_ROUTE_ENVIRONMENT"),
			server_name: self.var("LOOM_ROUTE_SERVER_NAME"),
			transport: Some(self.load_transport()?),
			logging: Some(self.load_logging()?),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn test_toml_source_missing_file_is_skipped() {
		let source = TomlSource::new("/nonexistent/loom/route.toml");
		let layer = source.load().unwrap();
		assert!(layer.destinations.is_empty());
	}

	#[test]
	fn test_toml_source_reads_file() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
environment = "staging"

[destinations.old]
dsn = "https://key@o1.ingest.example.com/42"
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(layer.environment.as_deref(), Some("staging"));
		assert_eq!(
			layer.destinations["old"].dsn.as_deref(),
			Some("https://key@o1.ingest.example.com/42")
		);
	}

	#[test]
	fn test_toml_source_parse_error() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "[destinations.old\ndsn = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_env_source_reads_fields() {
		let source = EnvSource::with_vars([
			("LOOM_ROUTE_DSN_OLD", "https://a@one.example.com/1"),
			("LOOM_ROUTE_DSN_NEW", "https://b@two.example.com/2"),
			("LOOM_ROUTE_RELEASE", "2.0.0"),
			("LOOM_ROUTE_ENVIRONMENT", "qa"),
			("LOOM_ROUTE_REQUEST_TIMEOUT_SECS", "12"),
			("LOOM_ROUTE_MAX_ATTEMPTS", "1"),
			("LOOM_ROUTE_LOG_LEVEL", "debug"),
			("LOOM_ROUTE_LOG_FORMAT", "json"),
			("UNRELATED", "ignored"),
		]);

		let layer = source.load().unwrap();
		assert_eq!(layer.destinations.len(), 2);
		assert_eq!(
			layer.destinations["old"].dsn.as_deref(),
			Some("https://a@one.example.com/1")
		);
		assert!(layer.destinations.contains_key("new"));
		assert_eq!(layer.release.as_deref(), Some("2.0.0"));
		assert_eq!(layer.environment.as_deref(), Some("qa"));

		let transport = layer.transport.unwrap();
		assert_eq!(transport.request_timeout_secs, Some(12));
		assert_eq!(transport.max_attempts, Some(1));

		let logging = layer.logging.unwrap();
		assert_eq!(logging.level.as_deref(), Some("debug"));
		assert_eq!(logging.format, Some(LogFormat::Json));
	}

	#[test]
	fn test_env_source_empty_values_ignored() {
		let source = EnvSource::with_vars([("LOOM_ROUTE_ENVIRONMENT", ""), ("LOOM_ROUTE_DSN_OLD", "")]);
		let layer = source.load().unwrap();
		assert!(layer.environment.is_none());
		assert!(layer.destinations.is_empty());
	}

	#[test]
	fn test_env_source_invalid_number() {
		let source = EnvSource::with_vars([("LOOM_ROUTE_MAX_ATTEMPTS", "many")]);
		let err = source.load().unwrap_err();
		match err {
			ConfigError::InvalidValue { key, .. } => assert_eq!(key, "LOOM_ROUTE_MAX_ATTEMPTS"),
			other => panic!("expected InvalidValue, got {other:?}"),
		}
	}

	#[test]
	fn test_env_source_invalid_format() {
		let source = EnvSource::with_vars([("LOOM_ROUTE_LOG_FORMAT", "yaml")]);
		assert!(matches!(
			source.load(),
			Err(ConfigError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_env_source_dsn_prefix_without_name() {
		let source = EnvSource::with_vars([("LOOM_ROUTE_DSN_", "https://a@one.example.com/1")]);
		assert!(matches!(
			source.load(),
			Err(ConfigError::InvalidValue { .. })
		));
	}
}
