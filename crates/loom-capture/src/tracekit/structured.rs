// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Engine-native frame records and the two-line `stacktrace` property.

use loom_capture_core::{CapturedTrace, RawException, StackFrame, TraceMode};

use super::patterns::{OPERA10, OPERA11};
use super::{function_or_unknown, parse_number, split_args, ParseFailure};

pub(super) fn from_structured(exception: &RawException) -> Result<Option<CapturedTrace>, ParseFailure> {
	if let Some(native) = exception.frames.as_ref().filter(|f| !f.is_empty()) {
		let frames = native
			.iter()
			.map(|frame| StackFrame {
				url: frame.file.clone(),
				function: function_or_unknown(frame.function.as_deref()),
				args: frame.args.clone(),
				line: frame.line,
				column: frame.column,
				context: None,
			})
			.collect();
		return Ok(Some(trace(exception, frames)));
	}

	let Some(stacktrace) = exception.stacktrace.as_deref().filter(|s| !s.is_empty()) else {
		return Ok(None);
	};

	let lines: Vec<&str> = stacktrace.split('\n').collect();
	let mut frames = Vec::new();

	for index in (0..lines.len()).step_by(2) {
		let line = lines[index];
		let mut frame = if let Some(caps) = OPERA10.captures(line) {
			StackFrame {
				url: caps.get(2).map(|m| m.as_str().to_string()),
				function: function_or_unknown(caps.get(3).map(|m| m.as_str())),
				line: Some(parse_number(&caps[1])?),
				..Default::default()
			}
		} else if let Some(caps) = OPERA11.captures(line) {
			StackFrame {
				url: caps.get(6).map(|m| m.as_str().to_string()),
				function: function_or_unknown(caps.get(3).or(caps.get(4)).map(|m| m.as_str())),
				args: split_args(caps.get(5).map(|m| m.as_str())),
				line: Some(parse_number(&caps[1])?),
				column: Some(parse_number(&caps[2])?),
				context: None,
			}
		} else {
			continue;
		};

		frame.context = lines.get(index + 1).map(|source| vec![source.to_string()]);
		frames.push(frame);
	}

	if frames.is_empty() {
		return Ok(None);
	}

	Ok(Some(trace(exception, frames)))
}

fn trace(exception: &RawException, frames: Vec<StackFrame>) -> CapturedTrace {
	CapturedTrace {
		name: exception.name.clone(),
		message: exception.message.clone(),
		frames,
		..CapturedTrace::new(TraceMode::Stacktrace)
	}
}
