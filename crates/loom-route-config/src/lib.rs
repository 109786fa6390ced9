// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the Loom event router.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Validation of destination names and DSNs before anything is registered
//! - Consistent environment variable naming (`LOOM_ROUTE_*`)
//!
//! # Usage
//!
//! ```ignore
//! use loom_route_config::load_config;
//!
//! let config = load_config()?;
//! for (name, destination) in &config.destinations {
//!     router.register(name.as_str(), destination.dsn.expose())?;
//! }
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::RouteConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::collections::BTreeMap;

use loom_route_core::DestinationName;
use tracing::{debug, info};

fn default_environment() -> String {
	"production".to_string()
}

/// Fully resolved router configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteConfig {
	pub destinations: BTreeMap<DestinationName, DestinationConfig>,
	pub release: Option<String>,
	pub environment: String,
	pub server_name: Option<String>,
	pub transport: TransportConfig,
	pub logging: LoggingConfig,
}

impl Default for RouteConfig {
	fn default() -> Self {
		Self {
			destinations: BTreeMap::new(),
			release: None,
			environment: default_environment(),
			server_name: None,
			transport: TransportConfig::default(),
			logging: LoggingConfig::default(),
		}
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`LOOM_ROUTE_*`)
/// 2. Config file (`/etc/loom/route.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<RouteConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::new()),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<RouteConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::new()),
	])
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<RouteConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = RouteConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: RouteConfigLayer) -> Result<RouteConfig, ConfigError> {
	let mut destinations: BTreeMap<DestinationName, DestinationConfig> = BTreeMap::new();
	for (name, destination) in layer.destinations {
		if let Some(existing) = destinations
			.keys()
			.find(|existing| existing.as_str().eq_ignore_ascii_case(&name))
		{
			return Err(ConfigError::Validation(format!(
				"destinations '{existing}' and '{name}' differ only by case"
			)));
		}

		let config = destination.finalize(&name)?;
		let name = DestinationName::new(name.as_str()).map_err(|e| ConfigError::InvalidValue {
			key: format!("destinations.{name}"),
			message: e.to_string(),
		})?;
		destinations.insert(name, config);
	}

	let transport = layer.transport.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&transport, &logging)?;

	let config = RouteConfig {
		destinations,
		release: layer.release,
		environment: layer.environment.unwrap_or_else(default_environment),
		server_name: layer.server_name,
		transport,
		logging,
	};

	info!(
		destinations = config.destinations.len(),
		environment = %config.environment,
		release = ?config.release,
		request_timeout_secs = config.transport.request_timeout.as_secs(),
		max_attempts = config.transport.max_attempts,
		"Router configuration loaded"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(transport: &TransportConfig, logging: &LoggingConfig) -> Result<(), ConfigError> {
	if transport.request_timeout.is_zero() {
		return Err(ConfigError::Validation(
			"transport.request_timeout_secs must be greater than 0".to_string(),
		));
	}

	if transport.max_attempts == 0 {
		return Err(ConfigError::Validation(
			"transport.max_attempts must be at least 1".to_string(),
		));
	}

	if transport.base_delay > transport.max_delay {
		return Err(ConfigError::Validation(format!(
			"transport.base_delay_ms ({}) exceeds transport.max_delay_ms ({})",
			transport.base_delay.as_millis(),
			transport.max_delay.as_millis()
		)));
	}

	if logging.level.trim().is_empty() {
		return Err(ConfigError::Validation(
			"logging.level must not be empty".to_string(),
		));
	}

	Ok(())
}
