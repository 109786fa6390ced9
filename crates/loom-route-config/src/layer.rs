// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::sections::{DestinationConfigLayer, LoggingConfigLayer, TransportConfigLayer};

/// Router configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteConfigLayer {
	#[serde(default)]
	pub destinations: BTreeMap<String, DestinationConfigLayer>,
	#[serde(default)]
	pub release: Option<String>,
	#[serde(default)]
	pub environment: Option<String>,
	#[serde(default)]
	pub server_name: Option<String>,
	#[serde(default)]
	pub transport: Option<TransportConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl RouteConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	///
	/// Destinations merge by name, compared case-insensitively so that
	/// `LOOM_ROUTE_DSN_NEWVERSION` overrides `[destinations.NewVersion]`. The
	/// name already present keeps its spelling. A destination only present in
	/// `self` is kept.
	pub fn merge(&mut self, other: RouteConfigLayer) {
		// Only names from earlier layers are folded; case clashes inside one
		// layer are left for validation.
		let known: Vec<String> = self.destinations.keys().cloned().collect();
		for (name, destination) in other.destinations {
			let key = known
				.iter()
				.find(|existing| existing.eq_ignore_ascii_case(&name))
				.cloned()
				.unwrap_or(name);
			self
				.destinations
				.entry(key)
				.or_default()
				.merge(destination);
		}

		if other.release.is_some() {
			self.release = other.release;
		}
		if other.environment.is_some() {
			self.environment = other.environment;
		}
		if other.server_name.is_some() {
			self.server_name = other.server_name;
		}

		merge_option(
			&mut self.transport,
			other.transport,
			TransportConfigLayer::merge,
		);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}
