// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Deep sanitization of user-supplied context values.

use serde::Serialize;
use serde_json::{Map, Value};

/// Maximum nesting kept by [`normalize`]; deeper containers are summarized.
pub const MAX_NORMALIZE_DEPTH: usize = 10;

/// Converts `value` into plain JSON, bounding nesting depth.
///
/// Values that cannot be serialized become a `"[unserializable]"` marker
/// instead of an error; context setters must never fail.
pub fn normalize<T: Serialize + ?Sized>(value: &T) -> Value {
	match serde_json::to_value(value) {
		Ok(value) => normalize_value(value, MAX_NORMALIZE_DEPTH),
		Err(_) => Value::String("[unserializable]".to_string()),
	}
}

/// Like [`normalize`], but always yields an object; non-objects become empty.
pub fn normalize_map<T: Serialize + ?Sized>(value: &T) -> Map<String, Value> {
	match normalize(value) {
		Value::Object(map) => map,
		_ => Map::new(),
	}
}

fn normalize_value(value: Value, depth: usize) -> Value {
	match value {
		Value::Object(map) if depth == 0 => {
			if map.is_empty() {
				Value::Object(map)
			} else {
				Value::String("[Object]".to_string())
			}
		}
		Value::Array(items) if depth == 0 => {
			if items.is_empty() {
				Value::Array(items)
			} else {
				Value::String("[Array]".to_string())
			}
		}
		Value::Object(map) => Value::Object(
			map
				.into_iter()
				.map(|(k, v)| (k, normalize_value(v, depth - 1)))
				.collect(),
		),
		Value::Array(items) => Value::Array(
			items
				.into_iter()
				.map(|v| normalize_value(v, depth - 1))
				.collect(),
		),
		other => other,
	}
}
