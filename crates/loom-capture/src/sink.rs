// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Destinations for finished events.

use async_trait::async_trait;
use loom_capture_core::Event;
use parking_lot::Mutex;
use tracing::info;

use crate::error::{CaptureError, Result};

/// Receives events after every scope and processor has run.
#[async_trait]
pub trait EventSink: Send + Sync {
	async fn send(&self, event: Event) -> Result<()>;

	/// Waits until previously sent events are delivered.
	async fn flush(&self) -> Result<()> {
		Ok(())
	}
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
	events: Mutex<Vec<Event>>,
}

impl MemorySink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn events(&self) -> Vec<Event> {
		self.events.lock().clone()
	}

	/// Removes and returns every stored event.
	pub fn take(&self) -> Vec<Event> {
		std::mem::take(&mut *self.events.lock())
	}

	pub fn len(&self) -> usize {
		self.events.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.events.lock().is_empty()
	}
}

#[async_trait]
impl EventSink for MemorySink {
	async fn send(&self, event: Event) -> Result<()> {
		self.events.lock().push(event);
		Ok(())
	}
}

/// Emits each event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
	async fn send(&self, event: Event) -> Result<()> {
		let payload = serde_json::to_string(&event).map_err(|e| CaptureError::Sink(e.to_string()))?;
		let exception = event.exception.as_ref();
		info!(
			event_id = ?event.event_id.map(|id| id.to_string()),
			level = ?event.level,
			message = ?event.message,
			exception_type = ?exception.and_then(|e| e.ty.as_deref()),
			frames = exception.map(|e| e.frames.len()).unwrap_or(0),
			payload = %payload,
			"captured event"
		);
		Ok(())
	}
}
