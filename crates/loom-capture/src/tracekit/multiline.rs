// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backtraces embedded in the exception message itself.
//!
//! The message looks like:
//!
//! ```text
//! Statement on line 44: Type mismatch
//! Backtrace:
//!   Line 44 of linked script http://example.com/app.js
//!     this.undef();
//!   Line 31 of inline#1 script in http://example.com/index.html: In function foo
//!     foo();
//! ```
//!
//! Frame lines start at index 2 and each is followed by its source line.

use loom_capture_core::{CapturedTrace, RawException, StackFrame, TraceMode};

use super::patterns::{FUNCTION_SCRIPT, INLINE_SCRIPT, LINKED_SCRIPT};
use super::{function_or_unknown, parse_number, ParseFailure};
use crate::host::HostInfo;

pub(super) fn from_multiline_message(
	exception: &RawException,
	host: &HostInfo,
) -> Result<Option<CapturedTrace>, ParseFailure> {
	let Some(message) = exception.message.as_deref() else {
		return Ok(None);
	};

	let lines: Vec<&str> = message.split('\n').collect();
	if lines.len() < 4 {
		return Ok(None);
	}

	let mut frames = Vec::new();

	for index in (2..lines.len()).step_by(2) {
		let line = lines[index];
		let mut frame = if let Some(caps) = LINKED_SCRIPT.captures(line) {
			StackFrame {
				url: Some(caps[2].to_string()),
				function: function_or_unknown(caps.get(3).map(|m| m.as_str())),
				line: Some(parse_number(&caps[1])?),
				..Default::default()
			}
		} else if let Some(caps) = INLINE_SCRIPT.captures(line) {
			StackFrame {
				url: Some(caps[3].to_string()),
				function: function_or_unknown(caps.get(4).map(|m| m.as_str())),
				line: Some(parse_number(&caps[1])?),
				..Default::default()
			}
		} else if let Some(caps) = FUNCTION_SCRIPT.captures(line) {
			StackFrame {
				url: host.page_url(),
				line: Some(parse_number(&caps[1])?),
				..Default::default()
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

	Ok(Some(CapturedTrace {
		name: exception.name.clone(),
		message: Some(lines[0].to_string()),
		frames,
		..CapturedTrace::new(TraceMode::Multiline)
	}))
}
