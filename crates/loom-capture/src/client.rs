// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Clients: what a hub hands captures to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use loom_capture_core::{Event, EventHint, ExceptionRef, Level};
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::{CaptureError, Result};
use crate::host::HostInfo;
use crate::scope::Scope;
use crate::sink::EventSink;
use crate::tracekit::StackTraceComputer;

/// SDK version for identification.
const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
/// SDK name for identification.
const SDK_NAME: &str = "loom-capture-rust";

/// The capture operations a client may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientMethod {
	CaptureException,
	CaptureMessage,
	CaptureEvent,
}

/// Capability interface between a hub and whatever turns captures into
/// delivered events.
///
/// A hub only calls methods for which [`Client::supports`] returns true; the
/// rest keep their no-op defaults. `scope` is the hub's top scope, for the
/// client to apply to the event it builds.
#[async_trait]
pub trait Client: Send + Sync {
	fn supports(&self, method: ClientMethod) -> bool;

	async fn capture_exception(&self, _exception: ExceptionRef, _hint: EventHint, _scope: &Scope) -> Result<()> {
		Ok(())
	}

	async fn capture_message(
		&self,
		_message: String,
		_level: Option<Level>,
		_hint: EventHint,
		_scope: &Scope,
	) -> Result<()> {
		Ok(())
	}

	async fn capture_event(&self, _event: Event, _hint: EventHint, _scope: &Scope) -> Result<()> {
		Ok(())
	}

	/// Breadcrumb cap applied by the hub, if any.
	fn max_breadcrumbs(&self) -> Option<usize> {
		None
	}
}

/// Builder for constructing a [`SinkClient`].
pub struct SinkClientBuilder {
	config: ClientConfig,
	host: HostInfo,
	sink: Option<Arc<dyn EventSink>>,
}

impl SinkClientBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self {
			config: ClientConfig::default(),
			host: HostInfo::default(),
			sink: None,
		}
	}

	/// Replaces the whole configuration, e.g. with [`ClientConfig::from_env`].
	pub fn config(mut self, config: ClientConfig) -> Self {
		self.config = config;
		self
	}

	/// Sets the release version.
	///
	/// Example: `1.2.3` or a git commit SHA
	pub fn release(mut self, release: impl Into<String>) -> Self {
		self.config.release = Some(release.into());
		self
	}

	/// Sets the environment name.
	pub fn environment(mut self, env: impl Into<String>) -> Self {
		self.config.environment = env.into();
		self
	}

	pub fn dist(mut self, dist: impl Into<String>) -> Self {
		self.config.dist = Some(dist.into());
		self
	}

	/// Sets the maximum number of breadcrumbs kept per scope.
	pub fn max_breadcrumbs(mut self, max: usize) -> Self {
		self.config.max_breadcrumbs = max;
		self
	}

	pub fn host(mut self, host: HostInfo) -> Self {
		self.host = host;
		self
	}

	pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
		self.sink = Some(sink);
		self
	}

	/// Builds the client. A sink is required.
	pub fn build(self) -> Result<SinkClient> {
		let sink = self
			.sink
			.ok_or_else(|| CaptureError::Config("an event sink is required".to_string()))?;

		info!(environment = %self.config.environment, release = ?self.config.release, "capture client initialized");

		Ok(SinkClient {
			inner: Arc::new(SinkClientInner {
				config: self.config,
				computer: StackTraceComputer::new(self.host),
				sink,
				closed: AtomicBool::new(false),
			}),
		})
	}
}

impl Default for SinkClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

struct SinkClientInner {
	config: ClientConfig,
	computer: StackTraceComputer,
	sink: Arc<dyn EventSink>,
	closed: AtomicBool,
}

/// Client that builds events, applies the scope and hands the result to an
/// [`EventSink`].
///
/// # Example
///
/// ```ignore
/// let sink = Arc::new(MemorySink::new());
/// let client = SinkClient::builder()
///     .release(env!("CARGO_PKG_VERSION"))
///     .environment("staging")
///     .sink(sink.clone())
///     .build()?;
///
/// let hub = Hub::new(Some(Arc::new(client)), None);
/// hub.capture_message("checkout failed", None, None).await;
/// ```
#[derive(Clone)]
pub struct SinkClient {
	inner: Arc<SinkClientInner>,
}

impl SinkClient {
	pub fn builder() -> SinkClientBuilder {
		SinkClientBuilder::new()
	}

	pub fn config(&self) -> &ClientConfig {
		&self.inner.config
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}

	/// Flushes the sink and stops accepting captures.
	pub async fn shutdown(&self) -> Result<()> {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return Ok(());
		}
		self.inner.sink.flush().await?;
		info!("capture client shut down");
		Ok(())
	}

	fn check_closed(&self) -> Result<()> {
		if self.is_closed() {
			warn!("capture attempted after client shutdown");
			return Err(CaptureError::ClientShutdown);
		}
		Ok(())
	}

	fn prepare(&self, mut event: Event, hint: &EventHint) -> Event {
		let config = &self.inner.config;
		if let Some(event_id) = hint.event_id {
			event.event_id = Some(event_id);
		}
		event.timestamp.get_or_insert_with(Utc::now);
		if event.release.is_none() {
			event.release = config.release.clone();
		}
		if event.environment.is_none() {
			event.environment = Some(config.environment.clone());
		}
		if event.dist.is_none() {
			event.dist = config.dist.clone();
		}
		event
			.tags
			.entry("sdk.name".to_string())
			.or_insert_with(|| SDK_NAME.to_string());
		event
			.tags
			.entry("sdk.version".to_string())
			.or_insert_with(|| SDK_VERSION.to_string());
		event
	}

	async fn process(&self, event: Event, hint: EventHint, scope: &Scope) -> Result<()> {
		self.check_closed()?;

		let event = self.prepare(event, &hint);
		let Some(event) = scope.apply_to_event(event, Some(&hint)).await? else {
			debug!(event_id = ?hint.event_id, "event dropped by processor");
			return Ok(());
		};

		if let Err(e) = self.inner.sink.send(event).await {
			error!(error = %e, "failed to send event to sink");
			return Err(e);
		}
		Ok(())
	}
}

#[async_trait]
impl Client for SinkClient {
	fn supports(&self, _method: ClientMethod) -> bool {
		true
	}

	async fn capture_exception(&self, exception: ExceptionRef, hint: EventHint, scope: &Scope) -> Result<()> {
		let trace = self.inner.computer.compute(&exception, 0);
		self.process(Event::from_trace(&trace), hint, scope).await
	}

	async fn capture_message(
		&self,
		message: String,
		level: Option<Level>,
		hint: EventHint,
		scope: &Scope,
	) -> Result<()> {
		let event = Event {
			level: Some(level.unwrap_or(Level::Info)),
			..Event::message(message)
		};
		self.process(event, hint, scope).await
	}

	async fn capture_event(&self, event: Event, hint: EventHint, scope: &Scope) -> Result<()> {
		self.process(event, hint, scope).await
	}

	fn max_breadcrumbs(&self) -> Option<usize> {
		Some(self.inner.config.max_breadcrumbs)
	}
}
