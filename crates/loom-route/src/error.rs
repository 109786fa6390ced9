// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the router and its transports.

use loom_route_core::{CoreError, DestinationName, DsnError};
use reqwest::StatusCode;
use thiserror::Error;

/// Errors from registering a destination.
///
/// A failed registration leaves the router and its other destinations usable.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// A destination with this name is already registered.
	#[error("destination '{0}' is already registered")]
	DuplicateDestination(DestinationName),

	/// The endpoint credential could not be parsed.
	#[error("invalid endpoint for destination '{name}': {source}")]
	InvalidEndpoint {
		name: String,
		#[source]
		source: DsnError,
	},

	/// The destination name is empty.
	#[error("destination name must not be empty")]
	InvalidName,

	/// The router has been closed.
	#[error("router has been closed")]
	RouterClosed,
}

/// Errors from capturing an event.
#[derive(Debug, Error)]
pub enum RouteError {
	/// No destination with this name is registered.
	#[error("unknown destination '{0}'")]
	UnknownDestination(String),

	/// The destination client could not be constructed. The next capture for
	/// this destination tries again.
	#[error("failed to initialize client for destination '{destination}': {source}")]
	ClientInit {
		destination: DestinationName,
		#[source]
		source: TransportError,
	},

	/// The destination client failed to submit the event.
	#[error("failed to submit event to destination '{destination}': {source}")]
	Transport {
		destination: DestinationName,
		#[source]
		source: TransportError,
	},

	/// The router has been closed.
	#[error("router has been closed")]
	RouterClosed,

	/// The event is already bound to another destination.
	#[error("event is bound to destination '{bound}', cannot route it to '{requested}'")]
	AlreadyBound { bound: String, requested: String },

	/// The event could not be prepared for routing.
	#[error("invalid event: {0}")]
	InvalidEvent(#[source] CoreError),
}

impl From<CoreError> for RouteError {
	fn from(err: CoreError) -> Self {
		match err {
			CoreError::AlreadyBound { bound, requested } => RouteError::AlreadyBound { bound, requested },
			other => RouteError::InvalidEvent(other),
		}
	}
}

/// Errors reported by a destination client.
#[derive(Debug, Error)]
pub enum TransportError {
	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	Request(#[from] reqwest::Error),

	/// Server returned an error.
	#[error("server error (status {status}): {message}")]
	Server { status: u16, message: String },

	/// Rate limited by server.
	#[error("rate limited, retry after {retry_after_secs:?} seconds")]
	RateLimited { retry_after_secs: Option<u64> },

	/// Failed to serialize or parse a payload.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// The client has already been released.
	#[error("destination client has been released")]
	Released,

	/// Any other failure, for clients that are not HTTP based.
	#[error("{0}")]
	Other(String),
}

impl TransportError {
	/// Whether a transport may sensibly try the same submission again.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Request(e) => {
				e.is_timeout()
					|| e.is_connect()
					|| e.status().is_some_and(|status| is_retryable_status(status.as_u16()))
			}
			Self::Server { status, .. } => is_retryable_status(*status),
			Self::RateLimited { .. } => true,
			Self::Serialization(_) | Self::Released | Self::Other(_) => false,
		}
	}
}

fn is_retryable_status(status: u16) -> bool {
	matches!(
		StatusCode::from_u16(status),
		Ok(StatusCode::TOO_MANY_REQUESTS
			| StatusCode::REQUEST_TIMEOUT
			| StatusCode::INTERNAL_SERVER_ERROR
			| StatusCode::BAD_GATEWAY
			| StatusCode::SERVICE_UNAVAILABLE
			| StatusCode::GATEWAY_TIMEOUT)
	)
}
