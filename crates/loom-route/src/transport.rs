// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP destination client speaking the Sentry-compatible store protocol.
//!
//! Each destination gets its own client posting to
//! `{base}/api/{project_id}/store/` with an `X-Sentry-Auth` header built from
//! the DSN keys.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use loom_route_config::TransportConfig;
use loom_route_core::{
	DestinationName, Dsn, Event, EventId, EventKind, Level, SecretString, Stacktrace, Tags,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::{ClientFactory, DestinationClient};
use crate::error::TransportError;
use crate::retry::{retry, RetryPolicy};

/// SDK version for identification.
const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
/// SDK name for identification.
const SDK_NAME: &str = "loom-route-rust";
/// Store protocol version sent in the auth header.
const PROTOCOL_VERSION: u8 = 7;

/// Configuration shared by every HTTP destination client.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
	/// Timeout for a single HTTP request.
	pub request_timeout: Duration,
	/// Retry policy for a single submission.
	pub retry: RetryPolicy,
	pub user_agent: String,
}

impl Default for HttpTransportConfig {
	fn default() -> Self {
		Self {
			request_timeout: Duration::from_secs(30),
			retry: RetryPolicy::default(),
			user_agent: format!("{SDK_NAME}/{SDK_VERSION}"),
		}
	}
}

impl From<&TransportConfig> for HttpTransportConfig {
	fn from(config: &TransportConfig) -> Self {
		Self {
			request_timeout: config.request_timeout,
			retry: RetryPolicy {
				max_attempts: config.max_attempts,
				base_delay: config.base_delay,
				max_delay: config.max_delay,
				..RetryPolicy::default()
			},
			..Self::default()
		}
	}
}

/// Builds an [`HttpDestinationClient`] per destination.
#[derive(Debug, Clone, Default)]
pub struct HttpClientFactory {
	config: HttpTransportConfig,
}

impl HttpClientFactory {
	pub fn new(config: HttpTransportConfig) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &HttpTransportConfig {
		&self.config
	}
}

#[async_trait]
impl ClientFactory for HttpClientFactory {
	async fn construct(
		&self,
		destination: &DestinationName,
		dsn: &Dsn,
	) -> Result<Arc<dyn DestinationClient>, TransportError> {
		let client = HttpDestinationClient::new(destination.clone(), dsn, &self.config)?;
		Ok(Arc::new(client))
	}
}

/// Submits events for one destination over HTTP.
pub struct HttpDestinationClient {
	destination: DestinationName,
	store_url: String,
	auth_header: SecretString,
	http: Client,
	retry: RetryPolicy,
	released: AtomicBool,
}

impl HttpDestinationClient {
	pub fn new(
		destination: DestinationName,
		dsn: &Dsn,
		config: &HttpTransportConfig,
	) -> Result<Self, TransportError> {
		let http = Client::builder()
			.user_agent(config.user_agent.as_str())
			.timeout(config.request_timeout)
			.build()?;

		let store_url = dsn.store_url();
		info!(destination = %destination, store_url = %store_url, "HTTP destination client initialized");

		Ok(Self {
			destination,
			store_url,
			auth_header: auth_header(dsn),
			http,
			retry: config.retry.clone(),
			released: AtomicBool::new(false),
		})
	}

	pub fn store_url(&self) -> &str {
		&self.store_url
	}

	pub fn is_released(&self) -> bool {
		self.released.load(Ordering::SeqCst)
	}

	async fn post(&self, body: &[u8]) -> Result<Response, TransportError> {
		let response = self
			.http
			.post(&self.store_url)
			.header("X-Sentry-Auth", self.auth_header.expose().as_str())
			.header(CONTENT_TYPE, "application/json")
			.body(body.to_vec())
			.send()
			.await?;
		check_status(response).await
	}
}

#[async_trait]
impl DestinationClient for HttpDestinationClient {
	async fn submit(&self, event: &Event) -> Result<EventId, TransportError> {
		if self.is_released() {
			return Err(TransportError::Released);
		}

		let body = serde_json::to_vec(&StorePayload::from_event(event))?;

		debug!(
			destination = %self.destination,
			url = %self.store_url,
			event_id = %event.event_id,
			"Sending event"
		);

		let response = retry(&self.retry, || self.post(&body)).await?;
		let text = response.text().await?;

		let event_id = match parse_event_id(&text) {
			Some(id) => id,
			None => {
				debug!(destination = %self.destination, "Store response carried no event id");
				event.event_id
			}
		};

		info!(destination = %self.destination, event_id = %event_id, "Event stored");
		Ok(event_id)
	}

	async fn release(&self) -> Result<(), TransportError> {
		if !self.released.swap(true, Ordering::SeqCst) {
			info!(destination = %self.destination, "HTTP destination client released");
		}
		Ok(())
	}
}

fn auth_header(dsn: &Dsn) -> SecretString {
	let mut header = format!(
		"Sentry sentry_version={PROTOCOL_VERSION}, sentry_client={SDK_NAME}/{SDK_VERSION}, sentry_key={}",
		dsn.public_key()
	);
	if let Some(secret) = dsn.secret_key() {
		header.push_str(", sentry_secret=");
		header.push_str(secret);
	}
	SecretString::new(header)
}

async fn check_status(response: Response) -> Result<Response, TransportError> {
	let status = response.status();

	if status == StatusCode::TOO_MANY_REQUESTS {
		let retry_after_secs = response
			.headers()
			.get("Retry-After")
			.and_then(|v| v.to_str().ok())
			.and_then(|s| s.trim().parse().ok());
		return Err(TransportError::RateLimited { retry_after_secs });
	}

	if !status.is_success() {
		let message = response.text().await.unwrap_or_default();
		return Err(TransportError::Server {
			status: status.as_u16(),
			message,
		});
	}

	Ok(response)
}

fn parse_event_id(body: &str) -> Option<EventId> {
	let response: StoreResponse = serde_json::from_str(body).ok()?;
	response.id?.parse().ok()
}

#[derive(Debug, Deserialize)]
struct StoreResponse {
	#[serde(default)]
	id: Option<String>,
}

/// Request body of the store endpoint.
#[derive(Debug, Serialize)]
struct StorePayload<'a> {
	event_id: String,
	timestamp: String,
	level: Level,
	platform: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	message: Option<StoreMessage<'a>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	exception: Option<StoreExceptions<'a>>,
	tags: &'a Tags,
	extra: &'a serde_json::Map<String, serde_json::Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	release: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	environment: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	server_name: Option<&'a str>,
	sdk: StoreSdk,
}

#[derive(Debug, Serialize)]
struct StoreMessage<'a> {
	formatted: &'a str,
}

#[derive(Debug, Serialize)]
struct StoreExceptions<'a> {
	/// Root cause first, the reported error last.
	values: Vec<StoreException<'a>>,
}

#[derive(Debug, Serialize)]
struct StoreException<'a> {
	#[serde(rename = "type")]
	exception_type: &'a str,
	value: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	stacktrace: Option<&'a Stacktrace>,
}

#[derive(Debug, Serialize)]
struct StoreSdk {
	name: &'static str,
	version: &'static str,
}

impl<'a> StorePayload<'a> {
	fn from_event(event: &'a Event) -> Self {
		let (message, exception) = match &event.kind {
			EventKind::Message { text } => (Some(StoreMessage { formatted: text }), None),
			EventKind::Exception(payload) => {
				let mut values: Vec<StoreException<'a>> = payload
					.causes
					.iter()
					.rev()
					.map(|cause| StoreException {
						exception_type: "Error",
						value: cause,
						stacktrace: None,
					})
					.collect();
				values.push(StoreException {
					exception_type: &payload.exception_type,
					value: &payload.value,
					stacktrace: payload.stacktrace.as_ref(),
				});
				(None, Some(StoreExceptions { values }))
			}
		};

		Self {
			event_id: event.event_id.to_string(),
			timestamp: event.timestamp.to_rfc3339(),
			level: event.level,
			platform: "rust",
			message,
			exception,
			tags: &event.tags,
			extra: &event.extra,
			release: event.release.as_deref(),
			environment: event.environment.as_deref(),
			server_name: event.server_name.as_deref(),
			sdk: StoreSdk {
				name: SDK_NAME,
				version: SDK_VERSION,
			},
		}
	}
}
