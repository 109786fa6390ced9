// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The destination client capability the router depends on.
//!
//! Any error-reporting transport can be plugged in by implementing these two
//! traits; [`HttpClientFactory`](crate::HttpClientFactory) is the bundled one.

use std::sync::Arc;

use async_trait::async_trait;
use loom_route_core::{DestinationName, Dsn, Event, EventId};

use crate::error::TransportError;

/// Builds a client for one destination.
///
/// The router calls this at most once per destination for every successful
/// construction; a failed construction is retried on the next capture.
#[async_trait]
pub trait ClientFactory: Send + Sync {
	async fn construct(
		&self,
		destination: &DestinationName,
		dsn: &Dsn,
	) -> Result<Arc<dyn DestinationClient>, TransportError>;
}

/// Transmits fully tagged events to one destination.
#[async_trait]
pub trait DestinationClient: Send + Sync {
	/// Submits one event and returns the id assigned by the destination.
	async fn submit(&self, event: &Event) -> Result<EventId, TransportError>;

	/// Releases the client. Called once, when the router closes.
	async fn release(&self) -> Result<(), TransportError>;
}
