// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for loom-route.

pub mod destinations;
pub mod logging;
pub mod transport;

pub use destinations::{DestinationConfig, DestinationConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use transport::{TransportConfig, TransportConfigLayer};
