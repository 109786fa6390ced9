// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Routes error events to several named error-tracking destinations from a
//! single process.
//!
//! Every capture names its destination explicitly. The [`Router`] tags the
//! event with `hub=<destination>`, lazily constructs one
//! [`DestinationClient`] per destination through a [`ClientFactory`], and
//! submits the event through it. There is no implicit default destination.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use loom_route::{HttpClientFactory, Level, Router, Tags};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut router = Router::new(Arc::new(HttpClientFactory::default()));
//!     router.register("old", "https://key@o1.ingest.example.com/42")?;
//!     router.register("new", "https://key@o1.ingest.example.com/43")?;
//!
//!     let event_id = router
//!         .capture_message("new", "Message from New Version UI", Level::Info, Tags::new())
//!         .await?;
//!     println!("sent {event_id}");
//!
//!     if let Err(e) = std::fs::read_to_string("/missing") {
//!         router.capture_error("old", &e, Tags::new()).await?;
//!     }
//!
//!     // Releases every constructed client; later captures fail with RouterClosed.
//!     router.close().await;
//!     Ok(())
//! }
//! ```

pub mod backtrace;
pub mod builder;
pub mod client;
pub mod error;
pub mod retry;
pub mod router;
pub mod transport;

pub use backtrace::capture_backtrace;
pub use builder::RouterBuilder;
pub use client::{ClientFactory, DestinationClient};
pub use error::{ConfigError, RouteError, TransportError};
pub use retry::RetryPolicy;
pub use router::{CloseReport, EventDefaults, ReleaseFailure, Router};
pub use transport::{HttpClientFactory, HttpDestinationClient, HttpTransportConfig};

pub use loom_route_core::{
	DestinationName, Dsn, Event, EventId, EventKind, ExceptionPayload, Frame, Level, Stacktrace,
	Tags, DESTINATION_TAG,
};
