// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! A stack of (client, scope) layers and capture dispatch.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use loom_capture_core::{Breadcrumb, Event, EventHint, EventId, ExceptionRef, Level};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::client::{Client, ClientMethod};
use crate::registry;
use crate::scope::Scope;

/// One entry of a hub's stack.
#[derive(Clone, Default)]
pub struct Layer {
	pub client: Option<Arc<dyn Client>>,
	pub scope: Scope,
}

impl fmt::Debug for Layer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Layer")
			.field("client", &self.client.is_some())
			.field("scope", &self.scope)
			.finish()
	}
}

/// Routes captures to the client bound at the top of a stack of layers.
///
/// The stack always holds at least one layer; popping the bottom layer is
/// refused.
pub struct Hub {
	stack: RwLock<Vec<Layer>>,
	created_at: DateTime<Utc>,
	last_event_id: Mutex<Option<EventId>>,
}

impl fmt::Debug for Hub {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hub")
			.field("stack", &self.stack.read().len())
			.field("created_at", &self.created_at)
			.field("last_event_id", &*self.last_event_id.lock())
			.finish()
	}
}

impl Default for Hub {
	fn default() -> Self {
		Self::new(None, None)
	}
}

impl Hub {
	/// A hub with a single layer. The scope defaults to an empty one.
	pub fn new(client: Option<Arc<dyn Client>>, scope: Option<Scope>) -> Self {
		Self {
			stack: RwLock::new(vec![Layer {
				client,
				scope: scope.unwrap_or_default(),
			}]),
			created_at: Utc::now(),
			last_event_id: Mutex::new(None),
		}
	}

	/// The process-wide current hub.
	pub fn current() -> Arc<Hub> {
		registry::current_hub()
	}

	pub fn created_at(&self) -> DateTime<Utc> {
		self.created_at
	}

	pub fn is_older_than(&self, timestamp: DateTime<Utc>) -> bool {
		self.created_at < timestamp
	}

	/// Pushes a layer with a clone of the top scope and the same client.
	pub fn push_scope(&self) {
		let mut stack = self.stack.write();
		let layer = stack.last().cloned().unwrap_or_default();
		stack.push(layer);
		debug!(depth = stack.len(), "pushed scope");
	}

	/// Pops the top layer. Returns false, leaving the stack untouched, when
	/// it is the only one.
	pub fn pop_scope(&self) -> bool {
		let mut stack = self.stack.write();
		if stack.len() <= 1 {
			return false;
		}
		stack.pop();
		true
	}

	/// Runs `f` inside a freshly pushed scope. The scope is popped however
	/// `f` exits, unwinding included.
	pub fn with_scope<R>(&self, f: impl FnOnce(&Hub) -> R) -> R {
		struct PopOnDrop<'a>(&'a Hub);

		impl Drop for PopOnDrop<'_> {
			fn drop(&mut self) {
				self.0.pop_scope();
			}
		}

		self.push_scope();
		let _guard = PopOnDrop(self);
		f(self)
	}

	/// Replaces the client of the top layer only.
	pub fn bind_client(&self, client: Option<Arc<dyn Client>>) {
		if let Some(top) = self.stack.write().last_mut() {
			top.client = client;
		}
	}

	pub fn client(&self) -> Option<Arc<dyn Client>> {
		self.stack.read().last().and_then(|layer| layer.client.clone())
	}

	/// Snapshot of every layer, bottom first.
	pub fn stack(&self) -> Vec<Layer> {
		self.stack.read().clone()
	}

	/// Snapshot of the top layer.
	pub fn stack_top(&self) -> Layer {
		self.stack.read().last().cloned().unwrap_or_default()
	}

	pub fn stack_len(&self) -> usize {
		self.stack.read().len()
	}

	/// Calls `f` with the top scope, but only while a client is bound.
	///
	/// The stack is locked while `f` runs; `f` must not call back into this
	/// hub.
	pub fn configure_scope(&self, f: impl FnOnce(&mut Scope)) {
		let mut stack = self.stack.write();
		if let Some(top) = stack.last_mut() {
			if top.client.is_some() {
				f(&mut top.scope);
			}
		}
	}

	/// Records a breadcrumb on the top scope, capped by the client's limit.
	pub fn add_breadcrumb(&self, breadcrumb: Breadcrumb) {
		let mut stack = self.stack.write();
		if let Some(top) = stack.last_mut() {
			let max = top.client.as_ref().and_then(|client| client.max_breadcrumbs());
			top.scope.add_breadcrumb(breadcrumb, max);
		}
	}

	pub fn last_event_id(&self) -> Option<EventId> {
		*self.last_event_id.lock()
	}

	pub async fn capture_exception(&self, exception: ExceptionRef, hint: Option<EventHint>) -> EventId {
		let event_id = self.next_event_id();
		let mut hint = hint.unwrap_or_default();
		hint.event_id = Some(event_id);
		hint.original_exception.get_or_insert_with(|| exception.clone());

		if let Some((client, scope)) = self.client_for(ClientMethod::CaptureException) {
			if let Err(e) = client.capture_exception(exception, hint, &scope).await {
				warn!(error = %e, %event_id, "client failed to capture exception");
			}
		}
		event_id
	}

	pub async fn capture_message(
		&self,
		message: impl Into<String>,
		level: Option<Level>,
		hint: Option<EventHint>,
	) -> EventId {
		let message = message.into();
		let event_id = self.next_event_id();
		let mut hint = hint.unwrap_or_default();
		hint.event_id = Some(event_id);
		hint.original_message.get_or_insert_with(|| message.clone());

		if let Some((client, scope)) = self.client_for(ClientMethod::CaptureMessage) {
			if let Err(e) = client.capture_message(message, level, hint, &scope).await {
				warn!(error = %e, %event_id, "client failed to capture message");
			}
		}
		event_id
	}

	pub async fn capture_event(&self, event: Event, hint: Option<EventHint>) -> EventId {
		let event_id = self.next_event_id();
		let mut hint = hint.unwrap_or_default();
		hint.event_id = Some(event_id);

		if let Some((client, scope)) = self.client_for(ClientMethod::CaptureEvent) {
			if let Err(e) = client.capture_event(event, hint, &scope).await {
				warn!(error = %e, %event_id, "client failed to capture event");
			}
		}
		event_id
	}

	/// Makes this hub the process-wide current hub while `f` runs, then
	/// restores the previous one, unwinding included.
	pub fn run<R>(self: &Arc<Self>, f: impl FnOnce() -> R) -> R {
		struct Restore(Option<Arc<Hub>>);

		impl Drop for Restore {
			fn drop(&mut self) {
				registry::swap_current_hub(self.0.take());
			}
		}

		let _restore = Restore(registry::swap_current_hub(Some(self.clone())));
		f()
	}

	fn next_event_id(&self) -> EventId {
		let event_id = EventId::new();
		*self.last_event_id.lock() = Some(event_id);
		event_id
	}

	/// The top client and a snapshot of the top scope, if a client is bound
	/// and implements `method`.
	fn client_for(&self, method: ClientMethod) -> Option<(Arc<dyn Client>, Scope)> {
		let stack = self.stack.read();
		let top = stack.last()?;
		let client = top.client.as_ref()?;
		if !client.supports(method) {
			debug!(?method, "client does not implement capture method, skipping");
			return None;
		}
		Some((client.clone(), top.scope.clone()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::Result;
	use crate::client::SinkClient;
	use crate::processor::processor_fn;
	use crate::sink::MemorySink;
	use async_trait::async_trait;
	use loom_capture_core::RawException;
	use std::panic::{catch_unwind, AssertUnwindSafe};

	#[derive(Default)]
	struct RecordingClient {
		supported: Vec<ClientMethod>,
		calls: Mutex<Vec<(ClientMethod, EventHint)>>,
		events: Mutex<Vec<Event>>,
	}

	impl RecordingClient {
		fn supporting(methods: &[ClientMethod]) -> Arc<Self> {
			Arc::new(Self {
				supported: methods.to_vec(),
				..Default::default()
			})
		}

		fn all() -> Arc<Self> {
			Self::supporting(&[
				ClientMethod::CaptureException,
				ClientMethod::CaptureMessage,
				ClientMethod::CaptureEvent,
			])
		}

		fn calls(&self) -> Vec<(ClientMethod, EventHint)> {
			self.calls.lock().clone()
		}
	}

	#[async_trait]
	impl Client for RecordingClient {
		fn supports(&self, method: ClientMethod) -> bool {
			self.supported.contains(&method)
		}

		async fn capture_exception(&self, _exception: ExceptionRef, hint: EventHint, _scope: &Scope) -> Result<()> {
			self.calls.lock().push((ClientMethod::CaptureException, hint));
			Ok(())
		}

		async fn capture_message(
			&self,
			_message: String,
			_level: Option<Level>,
			hint: EventHint,
			_scope: &Scope,
		) -> Result<()> {
			self.calls.lock().push((ClientMethod::CaptureMessage, hint));
			Ok(())
		}

		async fn capture_event(&self, event: Event, hint: EventHint, scope: &Scope) -> Result<()> {
			if let Some(event) = scope.apply_to_event(event, Some(&hint)).await? {
				self.events.lock().push(event);
			}
			self.calls.lock().push((ClientMethod::CaptureEvent, hint));
			Ok(())
		}
	}

	fn as_client(client: &Arc<RecordingClient>) -> Option<Arc<dyn Client>> {
		Some(client.clone())
	}

	fn same_client(a: &Option<Arc<dyn Client>>, b: &Arc<RecordingClient>) -> bool {
		a.as_ref()
			.is_some_and(|a| Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ())
	}

	#[test]
	fn starts_with_one_layer() {
		let client = RecordingClient::all();
		let hub = Hub::new(as_client(&client), None);
		assert_eq!(hub.stack_len(), 1);
		assert!(same_client(&hub.stack_top().client, &client));
	}

	#[test]
	fn accepts_filled_scope() {
		let mut scope = Scope::new();
		scope.set_tag("a", "b");
		let hub = Hub::new(None, Some(scope));
		assert_eq!(hub.stack_top().scope.tags()["a"], "b");
	}

	#[tokio::test]
	async fn skips_methods_client_does_not_implement() {
		let client = RecordingClient::supporting(&[ClientMethod::CaptureMessage]);
		let hub = Hub::new(as_client(&client), None);

		hub.capture_exception(Arc::new(RawException::value("x")), None).await;
		hub.capture_event(Event::default(), None).await;
		assert!(client.calls().is_empty());

		hub.capture_message("hi", None, None).await;
		assert_eq!(client.calls().len(), 1);
	}

	#[test]
	fn is_older_than() {
		let hub = Hub::default();
		assert!(!hub.is_older_than(hub.created_at()));
		assert!(hub.is_older_than(hub.created_at() + chrono::Duration::milliseconds(1)));
	}

	#[test]
	fn push_scope_clones_top() {
		let hub = Hub::default();
		hub.configure_scope(|_| unreachable!("no client bound"));
		hub.bind_client(as_client(&RecordingClient::all()));
		hub.configure_scope(|scope| {
			scope.set_extra("a", &"b");
		});

		hub.push_scope();
		assert_eq!(hub.stack_len(), 2);
		let stack = hub.stack();
		assert_eq!(stack[1].scope.extra()["a"], "b");

		hub.configure_scope(|scope| {
			scope.set_extra("only_top", &1);
		});
		assert!(!hub.stack()[0].scope.extra().contains_key("only_top"));
	}

	#[test]
	fn push_scope_inherits_client() {
		let client = RecordingClient::all();
		let hub = Hub::new(as_client(&client), None);
		hub.push_scope();
		let stack = hub.stack();
		assert!(same_client(&stack[0].client, &client));
		assert!(same_client(&stack[1].client, &client));
	}

	#[test]
	fn bind_client_affects_top_only() {
		let first = RecordingClient::all();
		let second = RecordingClient::all();
		let hub = Hub::new(as_client(&first), None);
		hub.push_scope();
		hub.bind_client(as_client(&second));

		let stack = hub.stack();
		assert!(same_client(&stack[0].client, &first));
		assert!(same_client(&stack[1].client, &second));
		assert!(same_client(&hub.client(), &second));
	}

	#[test]
	fn pop_scope_never_empties_stack() {
		let hub = Hub::default();
		hub.push_scope();
		assert!(hub.pop_scope());
		for _ in 0..5 {
			assert!(!hub.pop_scope());
		}
		assert_eq!(hub.stack_len(), 1);
	}

	#[test]
	fn with_scope_restores_depth() {
		let hub = Hub::default();
		let inner_depth = hub.with_scope(|hub| hub.stack_len());
		assert_eq!(inner_depth, 2);
		assert_eq!(hub.stack_len(), 1);

		let result = catch_unwind(AssertUnwindSafe(|| {
			hub.with_scope(|_| panic!("callback failed"));
		}));
		assert!(result.is_err());
		assert_eq!(hub.stack_len(), 1);
	}

	#[test]
	fn with_scope_bind_client_is_scoped() {
		let client = RecordingClient::all();
		let hub = Hub::default();
		hub.with_scope(|hub| {
			hub.bind_client(as_client(&client));
			assert!(same_client(&hub.client(), &client));
		});
		assert!(hub.client().is_none());
	}

	#[tokio::test]
	async fn captures_put_event_id_in_hint() {
		let client = RecordingClient::all();
		let hub = Hub::new(as_client(&client), None);
		let ex = Arc::new(RawException::error("Error", "boom"));

		let exception_id = hub.capture_exception(ex.clone(), None).await;
		let message_id = hub.capture_message("hi", Some(Level::Warning), None).await;
		let event_id = hub.capture_event(Event::message("e"), None).await;

		let calls = client.calls();
		assert_eq!(calls[0].1.event_id, Some(exception_id));
		assert!(Arc::ptr_eq(calls[0].1.original_exception.as_ref().unwrap(), &ex));
		assert_eq!(calls[1].1.event_id, Some(message_id));
		assert_eq!(calls[1].1.original_message.as_deref(), Some("hi"));
		assert_eq!(calls[2].1.event_id, Some(event_id));
		assert_eq!(hub.last_event_id(), Some(event_id));
	}

	#[tokio::test]
	async fn last_event_id_tracks_capture_message() {
		let hub = Hub::default();
		assert_eq!(hub.last_event_id(), None);
		let id = hub.capture_message("hi", None, None).await;
		assert_eq!(hub.last_event_id(), Some(id));
	}

	#[tokio::test]
	async fn pushed_scope_inherits_processors() {
		let client = RecordingClient::all();
		let hub = Hub::new(as_client(&client), None);
		hub.configure_scope(|scope| {
			scope.add_event_processor(processor_fn(|mut event, _| {
				event.tags.insert("processed".to_string(), "yes".to_string());
				Ok(Some(event))
			}));
		});

		hub.push_scope();
		hub.capture_event(Event::message("inner"), None).await;
		let events = client.events.lock();
		assert_eq!(events[0].tags["processed"], "yes");
	}

	#[test]
	fn breadcrumbs_capped_by_client() {
		struct Capped;

		#[async_trait]
		impl Client for Capped {
			fn supports(&self, _method: ClientMethod) -> bool {
				false
			}

			fn max_breadcrumbs(&self) -> Option<usize> {
				Some(2)
			}
		}

		let hub = Hub::new(Some(Arc::new(Capped)), None);
		for n in 0..5 {
			hub.add_breadcrumb(Breadcrumb::new("test", n.to_string()));
		}
		let top = hub.stack_top();
		let messages: Vec<_> = top
			.scope
			.breadcrumbs()
			.iter()
			.map(|b| b.message.clone().unwrap())
			.collect();
		assert_eq!(messages, vec!["3", "4"]);
	}

	#[test]
	fn concurrent_scopes_leave_one_layer() {
		let hub = Arc::new(Hub::new(as_client(&RecordingClient::all()), None));
		let barrier = Arc::new(std::sync::Barrier::new(8));

		let threads: Vec<_> = (0..8)
			.map(|n| {
				let hub = hub.clone();
				let barrier = barrier.clone();
				std::thread::spawn(move || {
					barrier.wait();
					for i in 0..200 {
						hub.with_scope(|hub| {
							hub.configure_scope(|scope| {
								scope.set_tag("thread", n.to_string());
							});
							hub.add_breadcrumb(Breadcrumb::new("test", i.to_string()));
						});
						hub.push_scope();
						assert!(hub.stack_len() >= 2);
						hub.pop_scope();
					}
				})
			})
			.collect();
		for thread in threads {
			thread.join().unwrap();
		}

		assert_eq!(hub.stack_len(), 1);
		let bottom = hub.stack_top();
		assert!(bottom.scope.tags().is_empty());
		assert!(bottom.scope.breadcrumbs().is_empty());
	}

	#[tokio::test]
	async fn shut_down_client_failures_are_not_surfaced() {
		let sink = Arc::new(MemorySink::new());
		let client = SinkClient::builder().sink(sink.clone()).build().unwrap();
		client.shutdown().await.unwrap();
		let hub = Hub::new(Some(Arc::new(client)), None);

		let exception_id = hub
			.capture_exception(Arc::new(RawException::error("Error", "late")), None)
			.await;
		assert_eq!(hub.last_event_id(), Some(exception_id));

		let message_id = hub.capture_message("late", None, None).await;
		assert_ne!(message_id, exception_id);
		assert_eq!(hub.last_event_id(), Some(message_id));

		let event_id = hub.capture_event(Event::message("late"), None).await;
		assert_eq!(hub.last_event_id(), Some(event_id));
		assert!(sink.is_empty());
	}

	#[test]
	fn run_swaps_current_hub_and_restores() {
		let outer = Arc::new(Hub::default());
		let inner = Arc::new(Hub::default());
		let before = Hub::current();

		outer.run(|| {
			assert!(Arc::ptr_eq(&Hub::current(), &outer));
			inner.run(|| assert!(Arc::ptr_eq(&Hub::current(), &inner)));
			assert!(Arc::ptr_eq(&Hub::current(), &outer));
		});
		assert!(Arc::ptr_eq(&Hub::current(), &before));
	}
}
