// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event processors and the sequential chain that drives them.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use loom_capture_core::{Event, EventHint};
use tracing::debug;

use crate::error::{BoxError, CaptureError, Result};

/// What a processor returns: the (possibly rewritten) event, or `None` to
/// drop it.
pub type ProcessorResult = std::result::Result<Option<Event>, BoxError>;

/// A step in the event pipeline.
#[async_trait]
pub trait EventProcessor: Send + Sync {
	async fn process(&self, event: Event, hint: Option<&EventHint>) -> ProcessorResult;
}

/// Adapter for synchronous closures; see [`processor_fn`].
pub struct FnProcessor<F>(F);

impl<F> fmt::Debug for FnProcessor<F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("FnProcessor")
	}
}

#[async_trait]
impl<F> EventProcessor for FnProcessor<F>
where
	F: Fn(Event, Option<&EventHint>) -> ProcessorResult + Send + Sync,
{
	async fn process(&self, event: Event, hint: Option<&EventHint>) -> ProcessorResult {
		(self.0)(event, hint)
	}
}

/// Adapter for closures returning a future; see [`processor_async`].
pub struct AsyncFnProcessor<F>(F);

impl<F> fmt::Debug for AsyncFnProcessor<F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("AsyncFnProcessor")
	}
}

#[async_trait]
impl<F, Fut> EventProcessor for AsyncFnProcessor<F>
where
	F: Fn(Event, Option<EventHint>) -> Fut + Send + Sync,
	Fut: Future<Output = ProcessorResult> + Send,
{
	async fn process(&self, event: Event, hint: Option<&EventHint>) -> ProcessorResult {
		(self.0)(event, hint.cloned()).await
	}
}

/// Wraps a synchronous closure as a processor.
pub fn processor_fn<F>(f: F) -> Arc<dyn EventProcessor>
where
	F: Fn(Event, Option<&EventHint>) -> ProcessorResult + Send + Sync + 'static,
{
	Arc::new(FnProcessor(f))
}

/// Wraps a closure returning a future as a processor. The hint is passed by
/// value so the future may own it.
pub fn processor_async<F, Fut>(f: F) -> Arc<dyn EventProcessor>
where
	F: Fn(Event, Option<EventHint>) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = ProcessorResult> + Send + 'static,
{
	Arc::new(AsyncFnProcessor(f))
}

/// Drives `event` through `processors` strictly in order, one at a time.
///
/// Stops at the first processor that returns `None` and yields `None`. A
/// processor failure abandons the rest of the chain and is returned as
/// [`CaptureError::Processor`].
pub async fn run_processors(
	processors: &[Arc<dyn EventProcessor>],
	event: Event,
	hint: Option<&EventHint>,
) -> Result<Option<Event>> {
	let mut current = event;
	for (index, processor) in processors.iter().enumerate() {
		match processor
			.process(current, hint)
			.await
			.map_err(CaptureError::Processor)?
		{
			Some(next) => current = next,
			None => {
				debug!(index, "event dropped by processor");
				return Ok(None);
			}
		}
	}
	Ok(Some(current))
}
