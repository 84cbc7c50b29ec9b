// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Breadcrumbs: the trail of events recorded before a capture.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::level::Level;

/// A timestamped record attached to events for causal context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
	pub timestamp: DateTime<Utc>,
	/// "http", "navigation", "ui", "console"
	pub category: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	pub level: Level,
	#[serde(default)]
	pub data: serde_json::Value,
}

impl Breadcrumb {
	/// Creates an info breadcrumb in `category` with `message`.
	pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			category: category.into(),
			message: Some(message.into()),
			..Default::default()
		}
	}
}

impl Default for Breadcrumb {
	fn default() -> Self {
		Self {
			timestamp: Utc::now(),
			category: String::new(),
			message: None,
			level: Level::Info,
			data: serde_json::Value::Object(serde_json::Map::new()),
		}
	}
}
