// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The event router.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use loom_route_core::{DestinationName, Dsn, Event, EventId, ExceptionPayload, Level, Tags};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::backtrace::capture_backtrace;
use crate::client::{ClientFactory, DestinationClient};
use crate::error::{ConfigError, RouteError};

/// Values stamped on every event that does not carry its own.
#[derive(Debug, Clone, Default)]
pub struct EventDefaults {
	pub release: Option<String>,
	pub environment: Option<String>,
	pub server_name: Option<String>,
}

impl EventDefaults {
	fn apply(&self, event: &mut Event) {
		if event.release.is_none() {
			event.release = self.release.clone();
		}
		if event.environment.is_none() {
			event.environment = self.environment.clone();
		}
		if event.server_name.is_none() {
			event.server_name = self.server_name.clone();
		}
	}
}

/// A client release that failed during [`Router::close`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFailure {
	pub destination: DestinationName,
	pub error: String,
}

/// Outcome of [`Router::close`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseReport {
	/// Destinations whose client was released cleanly.
	pub released: Vec<DestinationName>,
	/// Destinations whose client failed to release.
	pub failures: Vec<ReleaseFailure>,
}

impl CloseReport {
	pub fn is_clean(&self) -> bool {
		self.failures.is_empty()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouterState {
	Open,
	Closed,
}

struct Destination {
	name: DestinationName,
	dsn: Dsn,
	// Held across construction so racing first captures share one client.
	client: Mutex<Option<Arc<dyn DestinationClient>>>,
}

impl Destination {
	async fn client(
		&self,
		factory: &dyn ClientFactory,
	) -> Result<Arc<dyn DestinationClient>, RouteError> {
		let mut slot = self.client.lock().await;
		if let Some(client) = slot.as_ref() {
			return Ok(Arc::clone(client));
		}

		debug!(destination = %self.name, dsn = %self.dsn, "Constructing destination client");
		let client = factory
			.construct(&self.name, &self.dsn)
			.await
			.map_err(|source| {
				error!(destination = %self.name, error = %source, "Failed to construct destination client");
				RouteError::ClientInit {
					destination: self.name.clone(),
					source,
				}
			})?;

		*slot = Some(Arc::clone(&client));
		info!(destination = %self.name, "Destination client constructed");
		Ok(client)
	}
}

/// Routes events to named destinations.
///
/// Destinations are registered during initialization (`&mut self`); once the
/// router is shared the destination set is fixed. Captures may run
/// concurrently. [`Router::close`] waits for in-flight captures, releases every
/// constructed client and makes all later captures fail with
/// [`RouteError::RouterClosed`].
pub struct Router {
	factory: Arc<dyn ClientFactory>,
	destinations: HashMap<DestinationName, Destination>,
	defaults: EventDefaults,
	state: RwLock<RouterState>,
}

impl Router {
	/// Creates an open router with no destinations.
	pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
		Self {
			factory,
			destinations: HashMap::new(),
			defaults: EventDefaults::default(),
			state: RwLock::new(RouterState::Open),
		}
	}

	/// Sets the release/environment/server name stamped on events.
	pub fn with_defaults(mut self, defaults: EventDefaults) -> Self {
		self.defaults = defaults;
		self
	}

	/// Registers a destination. No client is constructed until the first capture.
	pub fn register(&mut self, name: impl Into<String>, dsn: &str) -> Result<(), ConfigError> {
		if *self.state.get_mut() == RouterState::Closed {
			return Err(ConfigError::RouterClosed);
		}

		let name = DestinationName::new(name).map_err(|_| ConfigError::InvalidName)?;
		if self.destinations.contains_key(&name) {
			return Err(ConfigError::DuplicateDestination(name));
		}

		let dsn: Dsn = dsn.parse().map_err(|source| ConfigError::InvalidEndpoint {
			name: name.to_string(),
			source,
		})?;

		info!(destination = %name, dsn = %dsn, "Destination registered");
		self.destinations.insert(
			name.clone(),
			Destination {
				name,
				dsn,
				client: Mutex::new(None),
			},
		);
		Ok(())
	}

	/// Registered destination names, sorted.
	pub fn destinations(&self) -> Vec<&DestinationName> {
		let mut names: Vec<_> = self.destinations.keys().collect();
		names.sort();
		names
	}

	pub fn contains(&self, destination: &str) -> bool {
		self.destinations.contains_key(destination)
	}

	/// The parsed endpoint of a destination.
	pub fn dsn(&self, destination: &str) -> Option<&Dsn> {
		self.destinations.get(destination).map(|d| &d.dsn)
	}

	pub async fn is_closed(&self) -> bool {
		*self.state.read().await == RouterState::Closed
	}

	/// Reports an exception to `destination`.
	pub async fn capture_exception(
		&self,
		destination: &str,
		exception: ExceptionPayload,
		extra_tags: Tags,
	) -> Result<EventId, RouteError> {
		self.capture_event(destination, Event::exception(exception).with_tags(extra_tags))
			.await
	}

	/// Reports a Rust error value to `destination`, with its source chain and
	/// a backtrace of the calling thread.
	pub async fn capture_error<E>(
		&self,
		destination: &str,
		error: &E,
		extra_tags: Tags,
	) -> Result<EventId, RouteError>
	where
		E: std::error::Error + Sync + ?Sized,
	{
		let exception = ExceptionPayload::from_error(error).with_stacktrace(capture_backtrace());
		self.capture_exception(destination, exception, extra_tags)
			.await
	}

	/// Reports a text message to `destination`.
	pub async fn capture_message(
		&self,
		destination: &str,
		text: &str,
		level: Level,
		extra_tags: Tags,
	) -> Result<EventId, RouteError> {
		self.capture_event(destination, Event::message(text, level).with_tags(extra_tags))
			.await
	}

	/// Routes a caller-built event to `destination`.
	///
	/// The `hub` tag is set to the destination name, replacing any value the
	/// caller put there. An event already bound to another destination is
	/// rejected with [`RouteError::AlreadyBound`]. Transport failures are
	/// returned as-is; the router never retries a submission.
	pub async fn capture_event(
		&self,
		destination: &str,
		mut event: Event,
	) -> Result<EventId, RouteError> {
		// Held until the submission finishes so close() cannot release the
		// client underneath it.
		let state = self.state.read().await;
		if *state == RouterState::Closed {
			return Err(RouteError::RouterClosed);
		}

		let Some(dest) = self.destinations.get(destination) else {
			debug!(destination, "Capture for unknown destination");
			return Err(RouteError::UnknownDestination(destination.to_string()));
		};

		event.bind_destination(&dest.name)?;
		self.defaults.apply(&mut event);

		let client = dest.client(self.factory.as_ref()).await?;

		debug!(
			destination = %dest.name,
			event_id = %event.event_id,
			level = %event.level,
			"Submitting event"
		);

		match client.submit(&event).await {
			Ok(event_id) => {
				debug!(destination = %dest.name, event_id = %event_id, "Event submitted");
				Ok(event_id)
			}
			Err(source) => {
				error!(
					destination = %dest.name,
					event_id = %event.event_id,
					error = %source,
					"Failed to submit event"
				);
				Err(RouteError::Transport {
					destination: dest.name.clone(),
					source,
				})
			}
		}
	}

	/// Closes the router and releases every constructed client.
	///
	/// Waits for in-flight captures to finish first. Release failures are
	/// logged and collected in the report, never returned as errors. Closing
	/// an already closed router does nothing.
	pub async fn close(&self) -> CloseReport {
		let mut state = self.state.write().await;
		if *state == RouterState::Closed {
			debug!("Router already closed");
			return CloseReport::default();
		}
		*state = RouterState::Closed;

		let mut report = CloseReport::default();
		for dest in self.destinations.values() {
			let Some(client) = dest.client.lock().await.take() else {
				continue;
			};

			match client.release().await {
				Ok(()) => report.released.push(dest.name.clone()),
				Err(e) => {
					error!(destination = %dest.name, error = %e, "Failed to release destination client");
					report.failures.push(ReleaseFailure {
						destination: dest.name.clone(),
						error: e.to_string(),
					});
				}
			}
		}

		report.released.sort();
		report.failures.sort_by(|a, b| a.destination.cmp(&b.destination));

		info!(
			released = report.released.len(),
			failed = report.failures.len(),
			"Router closed"
		);
		report
	}
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// `None` while close() holds the write guard.
		let state = self.state.try_read().ok().map(|s| *s);
		f.debug_struct("Router")
			.field("destinations", &self.destinations())
			.field("defaults", &self.defaults)
			.field("state", &state)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::TransportError;
	use async_trait::async_trait;
	use futures::future::join_all;
	use loom_route_core::DESTINATION_TAG;
	use proptest::prelude::*;
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	use std::time::Duration;

	const OLD_DSN: &str = "https://oldkey@o1.ingest.example.com/1";
	const NEW_DSN: &str = "https://newkey@o1.ingest.example.com/2";

	#[derive(Default)]
	struct RecordingClient {
		events: std::sync::Mutex<Vec<Event>>,
		released: AtomicBool,
		fail_submit: AtomicBool,
		fail_release: bool,
		submit_delay: Option<Duration>,
	}

	impl RecordingClient {
		fn events(&self) -> Vec<Event> {
			self.events.lock().unwrap().clone()
		}

		fn is_released(&self) -> bool {
			self.released.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl DestinationClient for RecordingClient {
		async fn submit(&self, event: &Event) -> Result<EventId, TransportError> {
			if let Some(delay) = self.submit_delay {
				tokio::time::sleep(delay).await;
			}
			if self.is_released() {
				return Err(TransportError::Released);
			}
			if self.fail_submit.load(Ordering::SeqCst) {
				return Err(TransportError::Server {
					status: 500,
					message: "mock failure".to_string(),
				});
			}
			self.events.lock().unwrap().push(event.clone());
			Ok(event.event_id)
		}

		async fn release(&self) -> Result<(), TransportError> {
			self.released.store(true, Ordering::SeqCst);
			if self.fail_release {
				return Err(TransportError::Other("mock release failure".to_string()));
			}
			Ok(())
		}
	}

	#[derive(Default)]
	struct MockFactory {
		constructed: AtomicUsize,
		failures_left: AtomicUsize,
		construct_delay: Option<Duration>,
		submit_delay: Option<Duration>,
		fail_release_for: Option<&'static str>,
		clients: std::sync::Mutex<HashMap<String, Arc<RecordingClient>>>,
	}

	impl MockFactory {
		fn constructed(&self) -> usize {
			self.constructed.load(Ordering::SeqCst)
		}

		fn client(&self, name: &str) -> Arc<RecordingClient> {
			Arc::clone(&self.clients.lock().unwrap()[name])
		}

		fn has_client(&self, name: &str) -> bool {
			self.clients.lock().unwrap().contains_key(name)
		}
	}

	#[async_trait]
	impl ClientFactory for MockFactory {
		async fn construct(
			&self,
			destination: &DestinationName,
			_dsn: &Dsn,
		) -> Result<Arc<dyn DestinationClient>, TransportError> {
			if let Some(delay) = self.construct_delay {
				tokio::time::sleep(delay).await;
			}
			let fail = self
				.failures_left
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
				.is_ok();
			if fail {
				return Err(TransportError::Other("mock construct failure".to_string()));
			}

			self.constructed.fetch_add(1, Ordering::SeqCst);
			let client = Arc::new(RecordingClient {
				fail_release: self.fail_release_for == Some(destination.as_str()),
				submit_delay: self.submit_delay,
				..Default::default()
			});
			self.clients
				.lock()
				.unwrap()
				.insert(destination.to_string(), Arc::clone(&client));
			Ok(client)
		}
	}

	fn router_with(factory: &Arc<MockFactory>) -> Router {
		let mut router = Router::new(Arc::clone(factory) as Arc<dyn ClientFactory>);
		router.register("old", OLD_DSN).unwrap();
		router.register("new", NEW_DSN).unwrap();
		router
	}

	fn tags(pairs: &[(&str, &str)]) -> Tags {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[tokio::test]
	async fn test_old_and_new_scenario() {
		let factory = Arc::new(MockFactory::default());
		let router = router_with(&factory);

		router
			.capture_message("old", "hello", Level::Info, Tags::new())
			.await
			.unwrap();
		router
			.capture_exception(
				"new",
				ExceptionPayload::new("RuntimeException", "Error from New Version UI"),
				Tags::new(),
			)
			.await
			.unwrap();

		let old_events = factory.client("old").events();
		assert_eq!(old_events.len(), 1);
		assert_eq!(old_events[0].tags, tags(&[(DESTINATION_TAG, "old")]));

		let new_events = factory.client("new").events();
		assert_eq!(new_events.len(), 1);
		assert_eq!(new_events[0].tags, tags(&[(DESTINATION_TAG, "new")]));
		assert_eq!(new_events[0].level, Level::Error);

		let report = router.close().await;
		assert!(report.is_clean());
		assert_eq!(report.released.len(), 2);
		assert!(factory.client("old").is_released());
		assert!(factory.client("new").is_released());
	}

	#[tokio::test]
	async fn test_events_never_reach_other_destination() {
		let factory = Arc::new(MockFactory::default());
		let router = router_with(&factory);

		for i in 0..5 {
			router
				.capture_message("old", &format!("old {i}"), Level::Info, Tags::new())
				.await
				.unwrap();
		}
		router
			.capture_message("new", "new 0", Level::Warning, Tags::new())
			.await
			.unwrap();

		assert!(factory
			.client("old")
			.events()
			.iter()
			.all(|e| e.tags[DESTINATION_TAG] == "old" && e.summary().starts_with("old")));
		assert!(factory
			.client("new")
			.events()
			.iter()
			.all(|e| e.tags[DESTINATION_TAG] == "new" && e.summary().starts_with("new")));
		assert_eq!(factory.client("new").events().len(), 1);
	}

	#[tokio::test]
	async fn test_extra_tags_cannot_override_hub() {
		let factory = Arc::new(MockFactory::default());
		let router = router_with(&factory);

		router
			.capture_message(
				"old",
				"hi",
				Level::Info,
				tags(&[(DESTINATION_TAG, "new"), ("screen", "main")]),
			)
			.await
			.unwrap();

		let events = factory.client("old").events();
		assert_eq!(events[0].tags[DESTINATION_TAG], "old");
		assert_eq!(events[0].tags["screen"], "main");
		assert!(!factory.has_client("new"));
	}

	#[tokio::test]
	async fn test_unknown_destination_constructs_nothing() {
		let factory = Arc::new(MockFactory::default());
		let router = router_with(&factory);

		let result = router
			.capture_message("staging", "hi", Level::Info, Tags::new())
			.await;

		assert!(matches!(result, Err(RouteError::UnknownDestination(name)) if name == "staging"));
		assert_eq!(factory.constructed(), 0);
	}

	#[tokio::test]
	async fn test_duplicate_registration_keeps_first() {
		let factory = Arc::new(MockFactory::default());
		let mut router = Router::new(Arc::clone(&factory) as Arc<dyn ClientFactory>);
		router.register("old", OLD_DSN).unwrap();

		let result = router.register("old", NEW_DSN);
		assert!(matches!(result, Err(ConfigError::DuplicateDestination(name)) if name.as_str() == "old"));
		assert_eq!(router.dsn("old").unwrap().project_id(), "1");
		assert_eq!(router.destinations().len(), 1);
	}

	#[test]
	fn test_register_rejects_invalid_endpoint_and_name() {
		let mut router = Router::new(Arc::new(MockFactory::default()));

		assert!(matches!(
			router.register("old", ""),
			Err(ConfigError::InvalidEndpoint { name, .. }) if name == "old"
		));
		assert!(matches!(
			router.register("", OLD_DSN),
			Err(ConfigError::InvalidName)
		));
		assert!(!router.contains("old"));

		router.register("new", NEW_DSN).unwrap();
		assert!(router.contains("new"));
	}

	#[tokio::test]
	async fn test_concurrent_first_use_constructs_once() {
		let factory = Arc::new(MockFactory {
			construct_delay: Some(Duration::from_millis(20)),
			..Default::default()
		});
		let router = Arc::new(router_with(&factory));

		let handles: Vec<_> = (0..16)
			.map(|i| {
				let router = Arc::clone(&router);
				tokio::spawn(async move {
					router
						.capture_message("old", &format!("msg {i}"), Level::Info, Tags::new())
						.await
				})
			})
			.collect();

		for handle in handles {
			handle.await.unwrap().unwrap();
		}

		assert_eq!(factory.constructed(), 1);
		assert_eq!(factory.client("old").events().len(), 16);
	}

	#[tokio::test]
	async fn test_construct_failure_is_retried() {
		let factory = Arc::new(MockFactory {
			failures_left: AtomicUsize::new(1),
			..Default::default()
		});
		let router = router_with(&factory);

		let first = router
			.capture_message("new", "first", Level::Info, Tags::new())
			.await;
		assert!(matches!(first, Err(RouteError::ClientInit { .. })));
		assert_eq!(factory.constructed(), 0);

		router
			.capture_message("new", "second", Level::Info, Tags::new())
			.await
			.unwrap();
		assert_eq!(factory.constructed(), 1);
		assert_eq!(factory.client("new").events()[0].summary(), "second");
	}

	#[tokio::test]
	async fn test_transport_error_is_surfaced_not_retried() {
		let factory = Arc::new(MockFactory::default());
		let router = router_with(&factory);

		router
			.capture_message("old", "warm up", Level::Info, Tags::new())
			.await
			.unwrap();
		factory.client("old").fail_submit.store(true, Ordering::SeqCst);

		let result = router
			.capture_message("old", "lost?", Level::Error, Tags::new())
			.await;
		assert!(matches!(
			result,
			Err(RouteError::Transport {
				source: TransportError::Server { status: 500, .. },
				..
			})
		));
		assert_eq!(factory.client("old").events().len(), 1);
		assert_eq!(factory.constructed(), 1);
	}

	#[tokio::test]
	async fn test_closed_router_rejects_captures_and_registration() {
		let factory = Arc::new(MockFactory::default());
		let mut router = router_with(&factory);

		router.close().await;
		assert!(router.is_closed().await);

		let result = router
			.capture_message("old", "late", Level::Info, Tags::new())
			.await;
		assert!(matches!(result, Err(RouteError::RouterClosed)));

		let result = router
			.capture_message("staging", "late", Level::Info, Tags::new())
			.await;
		assert!(matches!(result, Err(RouteError::RouterClosed)));

		assert!(matches!(
			router.register("staging", OLD_DSN),
			Err(ConfigError::RouterClosed)
		));
		assert_eq!(factory.constructed(), 0);
	}

	#[tokio::test]
	async fn test_close_waits_for_in_flight_capture() {
		let factory = Arc::new(MockFactory {
			submit_delay: Some(Duration::from_millis(50)),
			..Default::default()
		});
		let router = Arc::new(router_with(&factory));

		let in_flight = {
			let router = Arc::clone(&router);
			tokio::spawn(async move {
				router
					.capture_message("old", "in flight", Level::Info, Tags::new())
					.await
			})
		};
		// Let the capture take the read guard before closing.
		tokio::time::sleep(Duration::from_millis(10)).await;

		let report = router.close().await;

		assert!(in_flight.await.unwrap().is_ok());
		assert_eq!(factory.client("old").events().len(), 1);
		assert_eq!(report.released, vec![DestinationName::new("old").unwrap()]);
		assert!(matches!(
			router
				.capture_message("old", "after", Level::Info, Tags::new())
				.await,
			Err(RouteError::RouterClosed)
		));
	}

	#[tokio::test]
	async fn test_release_failures_are_reported_not_propagated() {
		let factory = Arc::new(MockFactory {
			fail_release_for: Some("new"),
			..Default::default()
		});
		let router = router_with(&factory);

		router
			.capture_message("old", "a", Level::Info, Tags::new())
			.await
			.unwrap();
		router
			.capture_message("new", "b", Level::Info, Tags::new())
			.await
			.unwrap();

		let report = router.close().await;
		assert!(!report.is_clean());
		assert_eq!(report.released, vec![DestinationName::new("old").unwrap()]);
		assert_eq!(report.failures.len(), 1);
		assert_eq!(report.failures[0].destination.as_str(), "new");
		assert!(factory.client("new").is_released());

		assert_eq!(router.close().await, CloseReport::default());
	}

	#[tokio::test]
	async fn test_close_skips_unconstructed_clients() {
		let factory = Arc::new(MockFactory::default());
		let router = router_with(&factory);

		let report = router.close().await;
		assert!(report.released.is_empty());
		assert!(report.is_clean());
	}

	#[tokio::test]
	async fn test_prebound_event_is_rejected_for_other_destination() {
		let factory = Arc::new(MockFactory::default());
		let router = router_with(&factory);

		let mut event = Event::message("bound", Level::Info);
		event
			.bind_destination(&DestinationName::new("old").unwrap())
			.unwrap();

		let result = router.capture_event("new", event.clone()).await;
		assert!(matches!(
			result,
			Err(RouteError::AlreadyBound { bound, requested }) if bound == "old" && requested == "new"
		));
		assert!(!factory.has_client("new"));

		router.capture_event("old", event).await.unwrap();
		assert_eq!(factory.client("old").events().len(), 1);
	}

	#[tokio::test]
	async fn test_defaults_are_stamped_without_overriding() {
		let factory = Arc::new(MockFactory::default());
		let router = router_with(&factory).with_defaults(EventDefaults {
			release: Some("1.4.0".to_string()),
			environment: Some("production".to_string()),
			server_name: None,
		});

		let mut event = Event::message("hi", Level::Info);
		event.environment = Some("staging".to_string());
		router.capture_event("old", event).await.unwrap();

		let sent = &factory.client("old").events()[0];
		assert_eq!(sent.release.as_deref(), Some("1.4.0"));
		assert_eq!(sent.environment.as_deref(), Some("staging"));
		assert_eq!(sent.server_name, None);
	}

	#[tokio::test]
	async fn test_capture_error_records_type_and_causes() {
		#[derive(Debug)]
		struct Wrapped(std::io::Error);

		impl std::fmt::Display for Wrapped {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				write!(f, "Error from Old Version UI")
			}
		}

		impl std::error::Error for Wrapped {
			fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
				Some(&self.0)
			}
		}

		let factory = Arc::new(MockFactory::default());
		let router = router_with(&factory);
		let error = Wrapped(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));

		router
			.capture_error("old", &error, Tags::new())
			.await
			.unwrap();

		let sent = &factory.client("old").events()[0];
		match &sent.kind {
			loom_route_core::EventKind::Exception(payload) => {
				assert!(payload.exception_type.ends_with("Wrapped"));
				assert_eq!(payload.value, "Error from Old Version UI");
				assert_eq!(payload.causes, vec!["disk full".to_string()]);
				assert!(payload.stacktrace.is_some());
			}
			other => panic!("expected exception, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_interleaved_captures_construct_one_client_per_destination() {
		let factory = Arc::new(MockFactory {
			construct_delay: Some(Duration::from_millis(10)),
			..Default::default()
		});
		let router = router_with(&factory);

		let captures = (0..10).map(|i| {
			let destination = if i % 2 == 0 { "old" } else { "new" };
			let router = &router;
			async move {
				let text = format!("{destination} {i}");
				router
					.capture_message(destination, &text, Level::Info, Tags::new())
					.await
			}
		});

		for result in join_all(captures).await {
			result.unwrap();
		}

		assert_eq!(factory.constructed(), 2);
		assert_eq!(factory.client("old").events().len(), 5);
		assert_eq!(factory.client("new").events().len(), 5);
	}

	#[tokio::test]
	async fn test_debug_lists_destinations_without_keys() {
		let factory = Arc::new(MockFactory::default());
		let router = router_with(&factory);

		let debug = format!("{router:?}");
		assert!(debug.contains("\"new\""));
		assert!(debug.contains("\"old\""));
		assert!(debug.contains("Open"));
		assert!(!debug.contains("oldkey"));

		router.close().await;
		assert!(format!("{router:?}").contains("Closed"));
	}

	proptest! {
		#[test]
		fn extra_tags_never_redirect_an_event(
			extra in proptest::collection::hash_map("[a-z]{1,6}", "[a-z]{0,6}", 0..6),
			spoofed in prop_oneof![Just("new".to_string()), Just("staging".to_string()), "[a-z]{1,8}"],
		) {
			let runtime = tokio::runtime::Builder::new_current_thread()
				.enable_time()
				.build()
				.unwrap();

			runtime.block_on(async {
				let factory = Arc::new(MockFactory::default());
				let router = router_with(&factory);

				let mut tags: Tags = extra.clone();
				tags.insert(DESTINATION_TAG.to_string(), spoofed.clone());

				router
					.capture_message("old", "hi", Level::Info, tags)
					.await
					.unwrap();

				let events = factory.client("old").events();
				assert_eq!(events.len(), 1);
				assert_eq!(events[0].tags[DESTINATION_TAG], "old");
				for (key, value) in &extra {
					if key != DESTINATION_TAG {
						assert_eq!(&events[0].tags[key], value);
					}
				}
				assert!(!factory.has_client("new"));
				assert_eq!(factory.constructed(), 1);
			});
		}
	}
}
