// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event envelope types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::breadcrumb::Breadcrumb;
use crate::exception::ExceptionRef;
use crate::frame::{CapturedTrace, StackFrame};
use crate::level::Level;

/// Unique identifier for a captured event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
	pub fn new() -> Self {
		Self(Uuid::now_v7())
	}
}

impl Default for EventId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for EventId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.simple())
	}
}

impl FromStr for EventId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Grouping key: a single string or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fingerprint {
	One(String),
	Many(Vec<String>),
}

impl Fingerprint {
	pub fn into_vec(self) -> Vec<String> {
		match self {
			Self::One(s) => vec![s],
			Self::Many(v) => v,
		}
	}
}

impl From<Vec<String>> for Fingerprint {
	fn from(v: Vec<String>) -> Self {
		Self::Many(v)
	}
}

impl From<&str> for Fingerprint {
	fn from(s: &str) -> Self {
		Self::One(s.to_string())
	}
}

/// Exception payload of an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExceptionInfo {
	#[serde(rename = "type", skip_serializing_if = "Option::is_none")]
	pub ty: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mechanism: Option<String>,
	#[serde(default)]
	pub frames: Vec<StackFrame>,
}

/// An event on its way to a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub event_id: Option<EventId>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exception: Option<ExceptionInfo>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub level: Option<Level>,
	#[serde(default)]
	pub tags: HashMap<String, String>,
	#[serde(default)]
	pub extra: Map<String, Value>,
	#[serde(default)]
	pub user: Map<String, Value>,
	#[serde(default)]
	pub breadcrumbs: Vec<Breadcrumb>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fingerprint: Option<Fingerprint>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub release: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub environment: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dist: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timestamp: Option<DateTime<Utc>>,
}

impl Event {
	/// An event carrying only `message`.
	pub fn message(message: impl Into<String>) -> Self {
		Self {
			message: Some(message.into()),
			..Default::default()
		}
	}

	/// An error event built from a normalized trace.
	pub fn from_trace(trace: &CapturedTrace) -> Self {
		Self {
			exception: Some(ExceptionInfo {
				ty: trace.name.clone(),
				value: trace.message.clone(),
				mechanism: trace.mechanism.clone(),
				frames: trace.frames.clone(),
			}),
			level: Some(Level::Error),
			..Default::default()
		}
	}
}

/// Extra information handed alongside an event to processors and clients.
#[derive(Debug, Clone, Default)]
pub struct EventHint {
	pub event_id: Option<EventId>,
	pub original_exception: Option<ExceptionRef>,
	pub original_message: Option<String>,
	pub data: Map<String, Value>,
}

impl EventHint {
	pub fn with_event_id(event_id: EventId) -> Self {
		Self {
			event_id: Some(event_id),
			..Default::default()
		}
	}
}
