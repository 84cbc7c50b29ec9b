// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack trace normalization.
//!
//! [`StackTraceComputer::compute`] turns a [`RawException`] into a canonical
//! [`CapturedTrace`] by trying, in order:
//!
//! 1. engine-native frames or the two-line `stacktrace` property
//! 2. the newline-delimited `stack` string (V8, WinJS, SpiderMonkey/JSC)
//! 3. a backtrace embedded in a multi-line message
//! 4. walking the caller chain
//!
//! Each strategy is isolated: a [`ParseFailure`] abandons only that strategy.
//! When none produces frames the result is a [`TraceMode::Failed`] trace.

mod augment;
mod callers;
mod multiline;
pub(crate) mod patterns;
mod stack;
mod structured;

use loom_capture_core::{CapturedTrace, ExceptionRef, RawException, UNKNOWN_FUNCTION};
use thiserror::Error;
use tracing::debug;

use crate::config::DEFAULT_LINES_OF_CONTEXT;
use crate::host::HostInfo;

pub use augment::{augment, augment_at};

/// A single strategy could not parse its input.
#[derive(Debug, Error)]
pub(crate) enum ParseFailure {
	#[error("invalid number in trace: {0}")]
	InvalidNumber(String),
}

type Strategy = fn(&StackTraceComputer, &RawException, usize) -> Result<Option<CapturedTrace>, ParseFailure>;

/// Normalizes raw host exceptions into canonical traces.
#[derive(Debug, Clone)]
pub struct StackTraceComputer {
	host: HostInfo,
	lines_of_context: usize,
}

impl Default for StackTraceComputer {
	fn default() -> Self {
		Self::new(HostInfo::default())
	}
}

impl StackTraceComputer {
	pub fn new(host: HostInfo) -> Self {
		Self {
			host,
			lines_of_context: DEFAULT_LINES_OF_CONTEXT,
		}
	}

	/// Caps the source context kept per frame. Zero drops it entirely.
	pub fn with_lines_of_context(mut self, lines: usize) -> Self {
		self.lines_of_context = lines;
		self
	}

	pub fn host(&self) -> &HostInfo {
		&self.host
	}

	/// Computes the trace for `exception`. Never fails.
	///
	/// `depth` drops that many innermost frames from a caller-chain walk; they
	/// belong to the reporting machinery rather than user code.
	pub fn compute(&self, exception: &ExceptionRef, depth: usize) -> CapturedTrace {
		let strategies: [(&str, Strategy); 4] = [
			("structured", |_, ex, _| structured::from_structured(ex)),
			("stack", |_, ex, _| stack::from_stack_string(ex)),
			("multiline", |computer, ex, _| {
				multiline::from_multiline_message(ex, &computer.host)
			}),
			("callers", |_, ex, depth| callers::from_caller_chain(ex, depth)),
		];

		for (name, strategy) in strategies {
			match strategy(self, exception, depth) {
				Ok(Some(mut trace)) => {
					debug!(strategy = name, frames = trace.frames.len(), "computed stack trace");
					trace.url = self.host.location_href.clone();
					trace.user_agent = self.host.user_agent.clone();
					self.limit_context(&mut trace);
					return trace;
				}
				Ok(None) => {}
				Err(e) => {
					debug!(strategy = name, error = %e, "stack trace strategy failed");
				}
			}
		}

		debug!(name = ?exception.name, "no stack trace strategy applied");
		let mut trace = CapturedTrace::failed(exception);
		trace.user_agent = self.host.user_agent.clone();
		trace
	}
}

impl StackTraceComputer {
	fn limit_context(&self, trace: &mut CapturedTrace) {
		for frame in &mut trace.frames {
			if self.lines_of_context == 0 {
				frame.context = None;
			} else if let Some(context) = frame.context.as_mut() {
				context.truncate(self.lines_of_context);
			}
		}
	}
}

/// Computes a trace with a default host description.
pub fn compute_stack_trace(exception: &ExceptionRef, depth: usize) -> CapturedTrace {
	StackTraceComputer::default().compute(exception, depth)
}

pub(crate) fn parse_number(s: &str) -> Result<u32, ParseFailure> {
	s.trim()
		.parse()
		.map_err(|_| ParseFailure::InvalidNumber(s.to_string()))
}

pub(crate) fn optional_number(m: Option<regex::Match<'_>>) -> Result<Option<u32>, ParseFailure> {
	match m.map(|m| m.as_str()).filter(|s| !s.is_empty()) {
		Some(s) => parse_number(s).map(Some),
		None => Ok(None),
	}
}

pub(crate) fn function_or_unknown(name: Option<&str>) -> String {
	match name.filter(|n| !n.is_empty()) {
		Some(name) => name.to_string(),
		None => UNKNOWN_FUNCTION.to_string(),
	}
}

pub(crate) fn split_args(args: Option<&str>) -> Vec<String> {
	match args.filter(|a| !a.is_empty()) {
		Some(args) => args.split(',').map(str::to_string).collect(),
		None => Vec::new(),
	}
}
