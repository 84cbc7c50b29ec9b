// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Newline-delimited `stack` strings (V8, Chakra/WinJS, SpiderMonkey/JSC).

use loom_capture_core::{CapturedTrace, RawException, StackFrame, TraceMode};

use super::patterns::{CHROME, CHROME_EVAL, GECKO, GECKO_EVAL, IS_UNDEFINED, WINJS};
use super::{function_or_unknown, optional_number, parse_number, split_args, ParseFailure};

pub(super) fn from_stack_string(exception: &RawException) -> Result<Option<CapturedTrace>, ParseFailure> {
	let Some(stack) = exception.stack.as_deref().filter(|s| !s.is_empty()) else {
		return Ok(None);
	};

	let mut frames: Vec<StackFrame> = Vec::new();

	for (index, line) in stack.split('\n').enumerate() {
		let frame = if let Some(caps) = CHROME.captures(line) {
			let location = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
			let is_native = location.starts_with("native");
			let mut url = location;
			if location.starts_with("eval") {
				if let Some(inner) = CHROME_EVAL.captures(location).and_then(|c| c.get(1)) {
					url = inner.as_str();
				}
			}
			StackFrame {
				url: (!is_native).then(|| url.to_string()),
				function: function_or_unknown(caps.get(1).map(|m| m.as_str())),
				args: if is_native { vec![location.to_string()] } else { Vec::new() },
				line: optional_number(caps.get(3))?,
				column: optional_number(caps.get(4))?,
				context: None,
			}
		} else if let Some(caps) = WINJS.captures(line) {
			StackFrame {
				url: caps.get(2).map(|m| m.as_str().to_string()),
				function: function_or_unknown(caps.get(1).map(|m| m.as_str())),
				args: Vec::new(),
				line: Some(parse_number(&caps[3])?),
				column: optional_number(caps.get(4))?,
				context: None,
			}
		} else if let Some(caps) = GECKO.captures(line) {
			let location = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
			let mut url = location;
			let mut column = optional_number(caps.get(5))?;
			let eval_location = location
				.contains(" > eval")
				.then(|| GECKO_EVAL.captures(location).and_then(|c| c.get(1)))
				.flatten();
			if let Some(inner) = eval_location {
				url = inner.as_str();
			} else if index == 0 && column.is_none() {
				// engine reports a zero-based column on the exception itself
				column = exception.column_number.map(|c| c.saturating_add(1));
			}
			StackFrame {
				url: Some(url.to_string()),
				function: function_or_unknown(caps.get(1).map(|m| m.as_str())),
				args: split_args(caps.get(2).map(|m| m.as_str())),
				line: optional_number(caps.get(4))?,
				column,
				context: None,
			}
		} else {
			continue;
		};

		frames.push(frame);
	}

	if frames.is_empty() {
		return Ok(None);
	}

	let undefined_reference = exception
		.message
		.as_deref()
		.is_some_and(|m| IS_UNDEFINED.is_match(m));
	if undefined_reference && frames[0].line.is_some() {
		frames[0].column = None;
	}

	Ok(Some(CapturedTrace {
		name: exception.name.clone(),
		message: exception.message.clone(),
		frames,
		..CapturedTrace::new(TraceMode::Stack)
	}))
}
