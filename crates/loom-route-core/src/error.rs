// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the router data model.

use thiserror::Error;

/// Errors raised while building or binding core types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
	#[error("destination name must not be empty")]
	EmptyDestinationName,

	#[error("event is bound to destination '{bound}', cannot route it to '{requested}'")]
	AlreadyBound { bound: String, requested: String },

	#[error("invalid level: {0}")]
	InvalidLevel(String),

	#[error("invalid event id: {0}")]
	InvalidEventId(String),
}

/// Reasons a DSN string is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DsnError {
	#[error("DSN is empty")]
	Empty,

	#[error("malformed DSN: {0}")]
	Malformed(String),

	#[error("unsupported scheme '{0}' (expected http or https)")]
	UnsupportedScheme(String),

	#[error("DSN has no public key")]
	MissingPublicKey,

	#[error("DSN has no host")]
	MissingHost,

	#[error("DSN has no project id")]
	MissingProjectId,
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
