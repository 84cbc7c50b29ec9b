// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Canonical, engine-independent stack trace types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::exception::ExceptionRef;

/// Marker used for frames whose function name could not be determined.
pub const UNKNOWN_FUNCTION: &str = "?";

/// A single normalized stack frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
	pub url: Option<String>,
	pub function: String,
	#[serde(default)]
	pub args: Vec<String>,
	pub line: Option<u32>,
	pub column: Option<u32>,
	/// Source lines around the frame, when the raw trace carried them.
	pub context: Option<Vec<String>>,
}

impl StackFrame {
	/// A frame at `url:line` with an unknown function and no column.
	pub fn at(url: impl Into<String>, line: u32) -> Self {
		Self {
			url: Some(url.into()),
			line: Some(line),
			..Default::default()
		}
	}
}

impl Default for StackFrame {
	fn default() -> Self {
		Self {
			url: None,
			function: UNKNOWN_FUNCTION.to_string(),
			args: Vec::new(),
			line: None,
			column: None,
			context: None,
		}
	}
}

/// Which path produced a [`CapturedTrace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceMode {
	/// Parsed from a newline-delimited stack string.
	Stack,
	/// Parsed from an engine-native structured frame field.
	Stacktrace,
	/// Parsed from a multi-line exception message.
	Multiline,
	/// Synthesized by walking the caller chain.
	Callers,
	/// Synthesized from a global error hook's textual message.
	Onerror,
	/// Every strategy failed.
	Failed,
}

impl fmt::Display for TraceMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Stack => write!(f, "stack"),
			Self::Stacktrace => write!(f, "stacktrace"),
			Self::Multiline => write!(f, "multiline"),
			Self::Callers => write!(f, "callers"),
			Self::Onerror => write!(f, "onerror"),
			Self::Failed => write!(f, "failed"),
		}
	}
}

impl FromStr for TraceMode {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"stack" => Ok(Self::Stack),
			"stacktrace" => Ok(Self::Stacktrace),
			"multiline" => Ok(Self::Multiline),
			"callers" => Ok(Self::Callers),
			"onerror" => Ok(Self::Onerror),
			"failed" => Ok(Self::Failed),
			_ => Err(CoreError::InvalidTraceMode(s.to_string())),
		}
	}
}

/// A normalized trace, innermost call first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedTrace {
	pub mode: TraceMode,
	/// Capture path, e.g. "onerror" or "onunhandledrejection".
	pub mechanism: Option<String>,
	pub name: Option<String>,
	pub message: Option<String>,
	pub url: Option<String>,
	pub frames: Vec<StackFrame>,
	pub user_agent: Option<String>,
	/// Source exception; only set on failed traces.
	#[serde(skip)]
	pub original: Option<ExceptionRef>,
	/// Waiting for a global hook to supply the leading location.
	#[serde(default)]
	pub incomplete: bool,
	/// A synthetic leading frame was prepended.
	#[serde(default)]
	pub partial: bool,
}

impl CapturedTrace {
	/// An empty trace in `mode`.
	pub fn new(mode: TraceMode) -> Self {
		Self {
			mode,
			mechanism: None,
			name: None,
			message: None,
			url: None,
			frames: Vec::new(),
			user_agent: None,
			original: None,
			incomplete: false,
			partial: false,
		}
	}

	/// The trace returned when no strategy could read `exception`.
	pub fn failed(exception: &ExceptionRef) -> Self {
		Self {
			name: exception.name.clone(),
			message: exception.message.clone(),
			original: Some(exception.clone()),
			..Self::new(TraceMode::Failed)
		}
	}

	pub fn with_mechanism(mut self, mechanism: impl Into<String>) -> Self {
		self.mechanism = Some(mechanism.into());
		self
	}

	pub fn is_failed(&self) -> bool {
		self.mode == TraceMode::Failed
	}
}
