// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process-wide capture state: global event processors and the current hub.
//!
//! Created on first access and kept for the life of the process.

use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use crate::hub::Hub;
use crate::processor::EventProcessor;

struct Registry {
	global_event_processors: RwLock<Vec<Arc<dyn EventProcessor>>>,
	current_hub: RwLock<Option<Arc<Hub>>>,
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(|| Registry {
	global_event_processors: RwLock::new(Vec::new()),
	current_hub: RwLock::new(None),
});

/// Adds a processor that runs before every scope's own processors.
pub fn add_global_event_processor(processor: Arc<dyn EventProcessor>) {
	REGISTRY.global_event_processors.write().push(processor);
}

/// Snapshot of the global processors, in registration order.
pub fn global_event_processors() -> Vec<Arc<dyn EventProcessor>> {
	REGISTRY.global_event_processors.read().clone()
}

/// The current hub, creating an empty one on first use.
pub fn current_hub() -> Arc<Hub> {
	if let Some(hub) = REGISTRY.current_hub.read().as_ref() {
		return hub.clone();
	}
	REGISTRY
		.current_hub
		.write()
		.get_or_insert_with(|| Arc::new(Hub::new(None, None)))
		.clone()
}

/// Makes `hub` current, returning the previous one.
pub(crate) fn swap_current_hub(hub: Option<Arc<Hub>>) -> Option<Arc<Hub>> {
	std::mem::replace(&mut *REGISTRY.current_hub.write(), hub)
}
