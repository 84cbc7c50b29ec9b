// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Completing a trace with the location a global hook reported.

use loom_capture_core::{CapturedTrace, StackFrame, UNKNOWN_FUNCTION};

use super::patterns::QUOTED_REFERENCE;

/// Prepends `(url, line)` as the leading frame of `trace` unless it is
/// already there.
///
/// Returns `true` when a frame was added. Without both `url` and `line` the
/// trace is only marked `incomplete`.
pub fn augment(
	trace: &mut CapturedTrace,
	url: Option<&str>,
	line: Option<u32>,
	message: Option<&str>,
) -> bool {
	augment_at(trace, url, line, None, message)
}

/// [`augment`] with the column the hook reported, if any.
pub fn augment_at(
	trace: &mut CapturedTrace,
	url: Option<&str>,
	line: Option<u32>,
	column: Option<u32>,
	message: Option<&str>,
) -> bool {
	let (Some(url), Some(line)) = (url.filter(|u| !u.is_empty()), line.filter(|l| *l > 0)) else {
		trace.incomplete = true;
		return false;
	};

	trace.incomplete = false;

	let mut initial = StackFrame {
		url: Some(url.to_string()),
		function: UNKNOWN_FUNCTION.to_string(),
		line: Some(line),
		column,
		..Default::default()
	};

	if message.is_some_and(|m| QUOTED_REFERENCE.is_match(m)) {
		initial.column = None;
	}

	if let Some(first) = trace.frames.first_mut() {
		if first.url.as_deref() == Some(url) {
			if first.line == Some(line) {
				return false;
			}
			if first.line.is_none() && first.function == initial.function {
				first.line = initial.line;
				first.context = initial.context;
				return false;
			}
		}
	}

	trace.frames.insert(0, initial);
	trace.partial = true;
	true
}
