// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Last-resort trace synthesized from an introspectable caller chain.
//!
//! The chain only yields function names, so the result is augmented with the
//! location the exception declares about itself.

use std::collections::HashSet;

use loom_capture_core::{CapturedTrace, ChainedFunction, RawException, StackFrame, TraceMode, UNKNOWN_FUNCTION};

use super::augment::augment;
use super::patterns::FUNCTION_NAME;
use super::ParseFailure;

pub(super) fn from_caller_chain(
	exception: &RawException,
	depth: usize,
) -> Result<Option<CapturedTrace>, ParseFailure> {
	let Some(chain) = exception.call_chain.as_ref() else {
		return Ok(None);
	};

	let mut frames = Vec::new();
	let mut visited = HashSet::new();
	let mut cursor = chain.top();

	while let Some(id) = cursor {
		// recursion: the same function shows up again
		if !visited.insert(id) {
			break;
		}
		let Some(function) = chain.get(id) else {
			break;
		};
		cursor = function.caller;

		if function.internal {
			continue;
		}

		frames.push(StackFrame {
			function: function_name(function),
			..Default::default()
		});
	}

	frames.drain(..depth.min(frames.len()));

	let mut trace = CapturedTrace {
		name: exception.name.clone(),
		message: exception.message.clone(),
		frames,
		..CapturedTrace::new(TraceMode::Callers)
	};
	augment(
		&mut trace,
		exception.declared_url(),
		exception.declared_line(),
		exception.declared_message(),
	);

	Ok(Some(trace))
}

fn function_name(function: &ChainedFunction) -> String {
	if let Some(name) = function.name.as_deref().filter(|n| !n.is_empty()) {
		return name.to_string();
	}

	let Some(source) = function.source.as_deref() else {
		return UNKNOWN_FUNCTION.to_string();
	};

	match FUNCTION_NAME.captures(source) {
		Some(caps) => match caps.get(1) {
			Some(name) => name.as_str().to_string(),
			// anonymous: keep the signature up to the body
			None => {
				let signature = source.split('{').next().unwrap_or(source).trim();
				if signature.is_empty() {
					UNKNOWN_FUNCTION.to_string()
				} else {
					signature.to_string()
				}
			}
		},
		None => UNKNOWN_FUNCTION.to_string(),
	}
}
