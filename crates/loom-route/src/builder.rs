// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Building a router from code or from loaded configuration.

use std::sync::Arc;

use loom_route_config::RouteConfig;
use loom_route_core::SecretString;
use tracing::info;

use crate::client::ClientFactory;
use crate::error::ConfigError;
use crate::router::{EventDefaults, Router};

/// Builder for constructing a [`Router`].
///
/// Destinations are registered in the order they were added; the first
/// registration error aborts the build.
pub struct RouterBuilder {
	factory: Arc<dyn ClientFactory>,
	destinations: Vec<(String, SecretString)>,
	release: Option<String>,
	environment: Option<String>,
	server_name: Option<String>,
}

impl RouterBuilder {
	pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
		Self {
			factory,
			destinations: Vec::new(),
			release: None,
			environment: None,
			server_name: None,
		}
	}

	/// Adds a destination.
	pub fn destination(mut self, name: impl Into<String>, dsn: impl Into<String>) -> Self {
		self
			.destinations
			.push((name.into(), SecretString::new(dsn.into())));
		self
	}

	/// Sets the release stamped on events that carry none.
	pub fn release(mut self, release: impl Into<String>) -> Self {
		self.release = Some(release.into());
		self
	}

	pub fn environment(mut self, environment: impl Into<String>) -> Self {
		self.environment = Some(environment.into());
		self
	}

	pub fn server_name(mut self, server_name: impl Into<String>) -> Self {
		self.server_name = Some(server_name.into());
		self
	}

	pub fn build(self) -> Result<Router, ConfigError> {
		let mut router = Router::new(self.factory).with_defaults(EventDefaults {
			release: self.release,
			environment: self.environment,
			server_name: self.server_name,
		});

		for (name, dsn) in &self.destinations {
			router.register(name.as_str(), dsn.expose())?;
		}

		info!(destinations = self.destinations.len(), "Router built");
		Ok(router)
	}
}

impl Router {
	/// Creates a new builder for constructing a Router.
	pub fn builder(factory: Arc<dyn ClientFactory>) -> RouterBuilder {
		RouterBuilder::new(factory)
	}

	/// Registers every configured destination and stamps the configured
	/// release, environment and server name on outgoing events.
	pub fn from_config(
		config: &RouteConfig,
		factory: Arc<dyn ClientFactory>,
	) -> Result<Router, ConfigError> {
		let mut builder = RouterBuilder::new(factory).environment(config.environment.as_str());
		if let Some(release) = &config.release {
			builder = builder.release(release.as_str());
		}
		if let Some(server_name) = &config.server_name {
			builder = builder.server_name(server_name.as_str());
		}

		for (name, destination) in &config.destinations {
			builder = builder.destination(name.as_str(), destination.dsn.expose().as_str());
		}

		builder.build()
	}
}
