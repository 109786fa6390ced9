// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Loom event router.
//!
//! This crate provides the data model shared by the router (`loom-route`), its
//! configuration loader (`loom-route-config`) and the CLI:
//!
//! - [`Event`]: an exception report or a text message with a severity [`Level`]
//! - [`DestinationName`]: the unique name of a registered destination
//! - [`Dsn`]: a parsed endpoint credential (`https://key@host/project`)
//! - [`Secret`]: a redacting wrapper for credential material
//!
//! An event is bound to exactly one destination. Binding records the destination
//! in the `hub` tag ([`DESTINATION_TAG`]) and refuses to rebind the same event
//! to a different destination.

pub mod destination;
pub mod dsn;
pub mod error;
pub mod event;
pub mod secret;

pub use destination::DestinationName;
pub use dsn::{Dsn, Scheme};
pub use error::{CoreError, DsnError, Result};
pub use event::{
	Event, EventId, EventKind, ExceptionPayload, Frame, Level, Stacktrace, Tags, DESTINATION_TAG,
};
pub use secret::{Secret, SecretString, REDACTED};
