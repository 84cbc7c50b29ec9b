// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Contextual metadata merged into outgoing events.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use loom_capture_core::{normalize, normalize_map, Breadcrumb, Event, EventHint, Fingerprint, Level};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::processor::{run_processors, EventProcessor};
use crate::registry;

/// Callback told about every change made through a scope's setters.
pub type ScopeListener = Arc<dyn Fn(&Scope) + Send + Sync>;

/// A snapshot of context: user, tags, extra data, fingerprint, level,
/// breadcrumbs, and the scope's own event processors.
///
/// Cloning deep-copies every collection and gives the clone an empty
/// listener list.
#[derive(Default)]
pub struct Scope {
	tags: HashMap<String, String>,
	extra: Map<String, Value>,
	user: Map<String, Value>,
	fingerprint: Option<Vec<String>>,
	level: Option<Level>,
	breadcrumbs: Vec<Breadcrumb>,
	event_processors: Vec<Arc<dyn EventProcessor>>,
	scope_listeners: Vec<ScopeListener>,
}

impl Clone for Scope {
	fn clone(&self) -> Self {
		Self {
			tags: self.tags.clone(),
			extra: self.extra.clone(),
			user: self.user.clone(),
			fingerprint: self.fingerprint.clone(),
			level: self.level,
			breadcrumbs: self.breadcrumbs.clone(),
			event_processors: self.event_processors.clone(),
			scope_listeners: Vec::new(),
		}
	}
}

impl fmt::Debug for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scope")
			.field("tags", &self.tags)
			.field("extra", &self.extra)
			.field("user", &self.user)
			.field("fingerprint", &self.fingerprint)
			.field("level", &self.level)
			.field("breadcrumbs", &self.breadcrumbs.len())
			.field("event_processors", &self.event_processors.len())
			.finish()
	}
}

impl Scope {
	pub fn new() -> Self {
		Self::default()
	}

	/// A copy of `source`, or an empty scope.
	pub fn from_parent(source: Option<&Scope>) -> Self {
		source.cloned().unwrap_or_default()
	}

	pub fn add_scope_listener(&mut self, listener: ScopeListener) {
		self.scope_listeners.push(listener);
	}

	pub fn add_event_processor(&mut self, processor: Arc<dyn EventProcessor>) -> &mut Self {
		self.event_processors.push(processor);
		self
	}

	pub fn set_user<T: Serialize + ?Sized>(&mut self, user: &T) -> &mut Self {
		self.user = normalize_map(user);
		self.notify_listeners();
		self
	}

	pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
		self.tags.insert(key.into(), value.into());
		self.notify_listeners();
		self
	}

	pub fn set_extra<T: Serialize + ?Sized>(&mut self, key: impl Into<String>, extra: &T) -> &mut Self {
		self.extra.insert(key.into(), normalize(extra));
		self.notify_listeners();
		self
	}

	pub fn set_fingerprint<I, S>(&mut self, fingerprint: I) -> &mut Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.fingerprint = Some(fingerprint.into_iter().map(Into::into).collect());
		self.notify_listeners();
		self
	}

	pub fn set_level(&mut self, level: Level) -> &mut Self {
		self.level = Some(level);
		self.notify_listeners();
		self
	}

	/// Appends `breadcrumb`, then keeps only the newest `max_breadcrumbs`.
	pub fn add_breadcrumb(&mut self, mut breadcrumb: Breadcrumb, max_breadcrumbs: Option<usize>) {
		breadcrumb.data = normalize(&breadcrumb.data);
		self.breadcrumbs.push(breadcrumb);
		if let Some(max) = max_breadcrumbs {
			let excess = self.breadcrumbs.len().saturating_sub(max);
			self.breadcrumbs.drain(..excess);
		}
		self.notify_listeners();
	}

	/// Resets all context. Processors and listeners are kept.
	pub fn clear(&mut self) {
		self.breadcrumbs.clear();
		self.tags.clear();
		self.extra.clear();
		self.user.clear();
		self.level = None;
		self.fingerprint = None;
		self.notify_listeners();
	}

	pub fn tags(&self) -> &HashMap<String, String> {
		&self.tags
	}

	pub fn extra(&self) -> &Map<String, Value> {
		&self.extra
	}

	pub fn user(&self) -> &Map<String, Value> {
		&self.user
	}

	pub fn fingerprint(&self) -> Option<&[String]> {
		self.fingerprint.as_deref()
	}

	pub fn level(&self) -> Option<Level> {
		self.level
	}

	pub fn breadcrumbs(&self) -> &[Breadcrumb] {
		&self.breadcrumbs
	}

	pub fn event_processors(&self) -> &[Arc<dyn EventProcessor>] {
		&self.event_processors
	}

	/// Merges this scope into `event` and runs the global processors, then
	/// this scope's processors.
	///
	/// Values already on the event win over the scope's. Returns `None` when
	/// a processor dropped the event.
	pub async fn apply_to_event(&self, mut event: Event, hint: Option<&EventHint>) -> Result<Option<Event>> {
		if !self.extra.is_empty() {
			let mut extra = self.extra.clone();
			extra.extend(std::mem::take(&mut event.extra));
			event.extra = extra;
		}
		if !self.tags.is_empty() {
			let mut tags = self.tags.clone();
			tags.extend(std::mem::take(&mut event.tags));
			event.tags = tags;
		}
		if !self.user.is_empty() {
			let mut user = self.user.clone();
			user.extend(std::mem::take(&mut event.user));
			event.user = user;
		}
		if let Some(level) = self.level {
			event.level = Some(level);
		}

		self.apply_fingerprint(&mut event);

		if event.breadcrumbs.is_empty() && !self.breadcrumbs.is_empty() {
			event.breadcrumbs = self.breadcrumbs.clone();
		}

		let mut processors = registry::global_event_processors();
		processors.extend(self.event_processors.iter().cloned());
		run_processors(&processors, event, hint).await
	}

	fn apply_fingerprint(&self, event: &mut Event) {
		let mut fingerprint = event
			.fingerprint
			.take()
			.map(Fingerprint::into_vec)
			.unwrap_or_default();

		if let Some(scope_fingerprint) = &self.fingerprint {
			fingerprint.extend(scope_fingerprint.iter().cloned());
		} else if let Some(message) = event.message.as_ref().filter(|m| !m.is_empty()) {
			fingerprint.push(message.clone());
		}

		event.fingerprint = (!fingerprint.is_empty()).then_some(Fingerprint::Many(fingerprint));
	}

	fn notify_listeners(&self) {
		for listener in self.scope_listeners.clone() {
			listener(self);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::processor::processor_fn;
	use proptest::prelude::*;
	use serde_json::json;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn crumb(n: usize) -> Breadcrumb {
		Breadcrumb::new("test", n.to_string())
	}

	proptest! {
		#[test]
		fn breadcrumb_cap_keeps_newest(count in 0usize..40, cap in 0usize..20) {
			let mut scope = Scope::new();
			for n in 0..count {
				scope.add_breadcrumb(crumb(n), Some(cap));
			}
			let kept: Vec<String> = scope
				.breadcrumbs()
				.iter()
				.map(|b| b.message.clone().unwrap())
				.collect();
			let expected: Vec<String> = (count.saturating_sub(cap)..count).map(|n| n.to_string()).collect();
			prop_assert_eq!(kept, expected);
		}
	}

	#[test]
	fn uncapped_breadcrumbs_grow() {
		let mut scope = Scope::new();
		for n in 0..150 {
			scope.add_breadcrumb(crumb(n), None);
		}
		assert_eq!(scope.breadcrumbs().len(), 150);
	}

	#[test]
	fn setters_chain_and_normalize() {
		let mut scope = Scope::new();
		scope
			.set_tag("a", "1")
			.set_extra("nested", &json!({"k": [1, 2, 3]}))
			.set_user(&json!({"id": "u1"}))
			.set_level(Level::Warning)
			.set_fingerprint(["group"]);

		assert_eq!(scope.tags()["a"], "1");
		assert_eq!(scope.extra()["nested"], json!({"k": [1, 2, 3]}));
		assert_eq!(scope.user()["id"], "u1");
		assert_eq!(scope.level(), Some(Level::Warning));
		assert_eq!(scope.fingerprint(), Some(&["group".to_string()][..]));

		scope.set_user(&"not an object");
		assert!(scope.user().is_empty());
	}

	#[test]
	fn clone_is_independent_and_drops_listeners() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let mut parent = Scope::new();
		parent.add_scope_listener(Arc::new(move |_: &Scope| {
			counter.fetch_add(1, Ordering::SeqCst);
		}));
		parent.set_tag("a", "1");
		parent.add_breadcrumb(crumb(0), None);
		parent.add_event_processor(processor_fn(|e, _| Ok(Some(e))));
		assert_eq!(calls.load(Ordering::SeqCst), 2);

		let mut child = Scope::from_parent(Some(&parent));
		child.set_tag("b", "2");
		child.set_extra("x", &1);
		child.add_breadcrumb(crumb(1), None);
		child.add_event_processor(processor_fn(|e, _| Ok(Some(e))));

		assert_eq!(calls.load(Ordering::SeqCst), 2);
		assert!(!parent.tags().contains_key("b"));
		assert!(parent.extra().is_empty());
		assert_eq!(parent.breadcrumbs().len(), 1);
		assert_eq!(parent.event_processors().len(), 1);
		assert_eq!(child.tags().len(), 2);
		assert_eq!(child.event_processors().len(), 2);

		assert!(Scope::from_parent(None).tags().is_empty());
	}

	#[test]
	fn clear_keeps_processors() {
		let mut scope = Scope::new();
		scope.set_tag("a", "1").set_level(Level::Fatal).set_fingerprint(["f"]);
		scope.add_breadcrumb(crumb(0), None);
		scope.add_event_processor(processor_fn(|e, _| Ok(Some(e))));

		scope.clear();
		assert!(scope.tags().is_empty());
		assert!(scope.breadcrumbs().is_empty());
		assert_eq!(scope.level(), None);
		assert_eq!(scope.fingerprint(), None);
		assert_eq!(scope.event_processors().len(), 1);
	}

	#[tokio::test]
	async fn event_values_win_on_conflict() {
		let mut scope = Scope::new();
		scope.set_tag("env", "scope").set_tag("only_scope", "yes");
		scope.set_extra("k", &"scope");
		scope.set_user(&json!({"id": "scope", "email": "s@example.com"}));

		let mut event = Event::default();
		event.tags.insert("env".to_string(), "event".to_string());
		event.extra.insert("k".to_string(), json!("event"));
		event.user.insert("id".to_string(), json!("event"));

		let event = scope.apply_to_event(event, None).await.unwrap().unwrap();
		assert_eq!(event.tags["env"], "event");
		assert_eq!(event.tags["only_scope"], "yes");
		assert_eq!(event.extra["k"], "event");
		assert_eq!(event.user["id"], "event");
		assert_eq!(event.user["email"], "s@example.com");
	}

	#[tokio::test]
	async fn scope_level_overrides_event_level() {
		let mut scope = Scope::new();
		scope.set_level(Level::Debug);
		let event = Event {
			level: Some(Level::Error),
			..Default::default()
		};
		let event = scope.apply_to_event(event, None).await.unwrap().unwrap();
		assert_eq!(event.level, Some(Level::Debug));
	}

	#[tokio::test]
	async fn fingerprint_policy() {
		let scope = Scope::new();

		let event = scope.apply_to_event(Event::default(), None).await.unwrap().unwrap();
		assert_eq!(event.fingerprint, None);

		let event = scope.apply_to_event(Event::message("X"), None).await.unwrap().unwrap();
		assert_eq!(event.fingerprint, Some(Fingerprint::Many(vec!["X".to_string()])));

		let event = Event {
			fingerprint: Some(Fingerprint::from("scalar")),
			..Default::default()
		};
		let event = scope.apply_to_event(event, None).await.unwrap().unwrap();
		assert_eq!(event.fingerprint, Some(Fingerprint::Many(vec!["scalar".to_string()])));

		let mut scope = Scope::new();
		scope.set_fingerprint(["a", "b"]);
		let event = Event {
			fingerprint: Some(Fingerprint::from("e")),
			..Event::message("ignored")
		};
		let event = scope.apply_to_event(event, None).await.unwrap().unwrap();
		assert_eq!(
			event.fingerprint.map(Fingerprint::into_vec),
			Some(vec!["e".to_string(), "a".to_string(), "b".to_string()])
		);
	}

	#[tokio::test]
	async fn breadcrumbs_backfilled_only_when_event_has_none() {
		let mut scope = Scope::new();
		scope.add_breadcrumb(crumb(1), None);

		let event = scope.apply_to_event(Event::default(), None).await.unwrap().unwrap();
		assert_eq!(event.breadcrumbs.len(), 1);

		let event = Event {
			breadcrumbs: vec![crumb(7), crumb(8)],
			..Default::default()
		};
		let event = scope.apply_to_event(event, None).await.unwrap().unwrap();
		assert_eq!(event.breadcrumbs.len(), 2);
		assert_eq!(event.breadcrumbs[0].message.as_deref(), Some("7"));
	}

	#[test]
	fn scope_processor_can_drop_event() {
		let mut scope = Scope::new();
		scope.add_event_processor(processor_fn(|_, _| Ok(None)));
		let result = tokio_test::block_on(scope.apply_to_event(Event::message("x"), None));
		assert!(result.unwrap().is_none());
	}
}
