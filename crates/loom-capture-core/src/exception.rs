// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The host's raw exception, before normalization.
//!
//! Hosts hand exceptions over in very different shapes: a V8-style `stack`
//! string, an Opera-style `stacktrace` string, engine-native frame records, a
//! message that embeds the backtrace, or nothing but an introspectable call
//! chain. [`RawException`] carries whatever the host had; the trace computer
//! decides which of it is usable.

use std::sync::Arc;

/// Shared handle to a raw exception. Identity (`Arc::ptr_eq`) is what makes
/// two reports "the same exception".
pub type ExceptionRef = Arc<RawException>;

/// A raw exception as raised by the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawException {
	pub name: Option<String>,
	pub message: Option<String>,
	/// Legacy message field some engines use instead of `message`.
	pub description: Option<String>,
	/// Newline-delimited stack string.
	pub stack: Option<String>,
	/// Two-lines-per-frame structured stack string.
	pub stacktrace: Option<String>,
	/// Engine-native frame records.
	pub frames: Option<Vec<NativeFrame>>,
	/// Zero-based column of the throw site.
	pub column_number: Option<u32>,
	pub source_url: Option<String>,
	pub file_name: Option<String>,
	pub line: Option<u32>,
	pub line_number: Option<u32>,
	pub call_chain: Option<CallChain>,
	/// A genuine exception instance, as opposed to a thrown plain value.
	pub is_error: bool,
}

impl RawException {
	/// A genuine exception instance.
	pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			message: Some(message.into()),
			is_error: true,
			..Default::default()
		}
	}

	/// A thrown value that is not an exception instance.
	pub fn value(message: impl Into<String>) -> Self {
		Self {
			message: Some(message.into()),
			..Default::default()
		}
	}

	pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
		self.stack = Some(stack.into());
		self
	}

	pub fn with_stacktrace(mut self, stacktrace: impl Into<String>) -> Self {
		self.stacktrace = Some(stacktrace.into());
		self
	}

	pub fn with_frames(mut self, frames: Vec<NativeFrame>) -> Self {
		self.frames = Some(frames);
		self
	}

	pub fn with_location(mut self, url: impl Into<String>, line: u32) -> Self {
		self.source_url = Some(url.into());
		self.line = Some(line);
		self
	}

	pub fn with_column_number(mut self, column: u32) -> Self {
		self.column_number = Some(column);
		self
	}

	pub fn with_call_chain(mut self, chain: CallChain) -> Self {
		self.call_chain = Some(chain);
		self
	}

	/// Source URL the exception declares about itself.
	pub fn declared_url(&self) -> Option<&str> {
		self.source_url.as_deref().or(self.file_name.as_deref())
	}

	/// Line the exception declares about itself.
	pub fn declared_line(&self) -> Option<u32> {
		self.line.or(self.line_number)
	}

	/// Message, falling back to `description`.
	pub fn declared_message(&self) -> Option<&str> {
		self
			.message
			.as_deref()
			.filter(|m| !m.is_empty())
			.or(self.description.as_deref())
	}
}

/// One engine-native frame record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeFrame {
	pub function: Option<String>,
	pub file: Option<String>,
	pub line: Option<u32>,
	pub column: Option<u32>,
	pub args: Vec<String>,
}

/// Index of a function inside a [`CallChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(usize);

/// One function on an introspectable call chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainedFunction {
	/// Bound name, if the host kept one.
	pub name: Option<String>,
	/// Decompiled source text.
	pub source: Option<String>,
	pub caller: Option<FunctionId>,
	/// Reporting machinery rather than user code; skipped by the walker.
	pub internal: bool,
}

impl ChainedFunction {
	pub fn named(name: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			..Default::default()
		}
	}

	pub fn from_source(source: impl Into<String>) -> Self {
		Self {
			source: Some(source.into()),
			..Default::default()
		}
	}

	pub fn internal(name: impl Into<String>) -> Self {
		Self {
			internal: true,
			..Self::named(name)
		}
	}
}

/// Backlinked call chain, innermost function at `top`.
///
/// Functions live in an arena and link to their caller by id, so recursive
/// chains (a function that is its own caller) are representable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallChain {
	functions: Vec<ChainedFunction>,
	top: Option<FunctionId>,
}

impl CallChain {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a linear chain; the first function is innermost.
	pub fn linear(functions: impl IntoIterator<Item = ChainedFunction>) -> Self {
		let mut chain = Self::new();
		let mut previous: Option<FunctionId> = None;
		for function in functions {
			let id = chain.push(function);
			match previous {
				Some(callee) => chain.set_caller(callee, id),
				None => chain.top = Some(id),
			}
			previous = Some(id);
		}
		chain
	}

	pub fn push(&mut self, function: ChainedFunction) -> FunctionId {
		self.functions.push(function);
		FunctionId(self.functions.len() - 1)
	}

	/// Links `callee` to `caller`. Unknown ids are ignored.
	pub fn set_caller(&mut self, callee: FunctionId, caller: FunctionId) {
		if caller.0 >= self.functions.len() {
			return;
		}
		if let Some(function) = self.functions.get_mut(callee.0) {
			function.caller = Some(caller);
		}
	}

	pub fn set_top(&mut self, id: FunctionId) {
		if id.0 < self.functions.len() {
			self.top = Some(id);
		}
	}

	pub fn top(&self) -> Option<FunctionId> {
		self.top
	}

	pub fn get(&self, id: FunctionId) -> Option<&ChainedFunction> {
		self.functions.get(id.0)
	}

	pub fn len(&self) -> usize {
		self.functions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.functions.is_empty()
	}
}
