// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Events: exception reports and text messages.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::destination::DestinationName;
use crate::error::CoreError;

/// Tag key recording which destination an event is bound for.
pub const DESTINATION_TAG: &str = "hub";

/// Key/value labels attached to an event.
pub type Tags = HashMap<String, String>;

/// Identifier of a submitted event (32 lowercase hex digits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(#[serde(with = "uuid::serde::simple")] pub Uuid);

impl EventId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for EventId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for EventId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.simple())
	}
}

impl FromStr for EventId {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Uuid::parse_str(s)
			.map(Self)
			.map_err(|_| CoreError::InvalidEventId(s.to_string()))
	}
}

/// Severity of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
	Debug,
	#[default]
	Info,
	Warning,
	Error,
	Fatal,
}

impl fmt::Display for Level {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Debug => write!(f, "debug"),
			Self::Info => write!(f, "info"),
			Self::Warning => write!(f, "warning"),
			Self::Error => write!(f, "error"),
			Self::Fatal => write!(f, "fatal"),
		}
	}
}

impl FromStr for Level {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"debug" => Ok(Self::Debug),
			"info" => Ok(Self::Info),
			"warning" | "warn" => Ok(Self::Warning),
			"error" => Ok(Self::Error),
			"fatal" => Ok(Self::Fatal),
			_ => Err(CoreError::InvalidLevel(s.to_string())),
		}
	}
}

/// A single stack frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
	pub function: Option<String>,
	pub module: Option<String>,
	pub filename: Option<String>,
	pub lineno: Option<u32>,
	pub colno: Option<u32>,
	pub in_app: bool,
}

/// Frames ordered from the outermost call to the innermost one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stacktrace {
	pub frames: Vec<Frame>,
}

/// The error part of an exception event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionPayload {
	/// Type name, e.g. `IllegalStateException` or `std::io::Error`.
	pub exception_type: String,
	pub value: String,
	/// Display strings of the `source()` chain, outermost first.
	#[serde(default)]
	pub causes: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stacktrace: Option<Stacktrace>,
}

impl ExceptionPayload {
	pub fn new(exception_type: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			exception_type: exception_type.into(),
			value: value.into(),
			causes: Vec::new(),
			stacktrace: None,
		}
	}

	/// Builds a payload from a Rust error, walking its `source()` chain.
	pub fn from_error<E>(error: &E) -> Self
	where
		E: std::error::Error + ?Sized,
	{
		let mut causes = Vec::new();
		let mut source = error.source();
		while let Some(cause) = source {
			causes.push(cause.to_string());
			source = cause.source();
		}

		Self {
			exception_type: std::any::type_name_of_val(error).to_string(),
			value: error.to_string(),
			causes,
			stacktrace: None,
		}
	}

	pub fn with_stacktrace(mut self, stacktrace: Stacktrace) -> Self {
		self.stacktrace = Some(stacktrace);
		self
	}
}

/// What an event reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
	Exception(ExceptionPayload),
	Message { text: String },
}

/// A single event on its way to one destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
	pub event_id: EventId,
	pub timestamp: DateTime<Utc>,
	#[serde(flatten)]
	pub kind: EventKind,
	pub level: Level,
	#[serde(default)]
	pub tags: Tags,
	#[serde(default)]
	pub extra: serde_json::Map<String, serde_json::Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub release: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub environment: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub server_name: Option<String>,
	#[serde(skip)]
	destination: Option<DestinationName>,
}

impl Event {
	fn new(kind: EventKind, level: Level) -> Self {
		Self {
			event_id: EventId::new(),
			timestamp: Utc::now(),
			kind,
			level,
			tags: Tags::new(),
			extra: serde_json::Map::new(),
			release: None,
			environment: None,
			server_name: None,
			destination: None,
		}
	}

	/// A plain text message.
	pub fn message(text: impl Into<String>, level: Level) -> Self {
		Self::new(EventKind::Message { text: text.into() }, level)
	}

	/// An exception report, at [`Level::Error`].
	pub fn exception(payload: ExceptionPayload) -> Self {
		Self::new(EventKind::Exception(payload), Level::Error)
	}

	pub fn with_level(mut self, level: Level) -> Self {
		self.level = level;
		self
	}

	pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.tags.insert(key.into(), value.into());
		self
	}

	pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.tags
			.extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
		self
	}

	pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
		self.extra.insert(key.into(), value);
		self
	}

	/// The destination this event is bound for, if any.
	pub fn destination(&self) -> Option<&DestinationName> {
		self.destination.as_ref()
	}

	/// Binds the event to `destination` and sets the [`DESTINATION_TAG`].
	///
	/// The destination tag always replaces a caller-supplied `hub` tag. Binding
	/// again to the same destination is a no-op; binding to another one fails
	/// and leaves the event untouched.
	pub fn bind_destination(&mut self, destination: &DestinationName) -> Result<(), CoreError> {
		if let Some(bound) = &self.destination {
			if bound != destination {
				return Err(CoreError::AlreadyBound {
					bound: bound.to_string(),
					requested: destination.to_string(),
				});
			}
		}

		self.destination = Some(destination.clone());
		self.tags
			.insert(DESTINATION_TAG.to_string(), destination.to_string());
		Ok(())
	}

	/// Short human-readable summary, used in logs.
	pub fn summary(&self) -> &str {
		match &self.kind {
			EventKind::Exception(payload) => &payload.value,
			EventKind::Message { text } => text,
		}
	}
}
