// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rust backtraces as engine-native frames.

use loom_capture_core::NativeFrame;
use rustc_demangle::demangle;
use std::backtrace::Backtrace;

/// Parse a Rust backtrace into in-app frames, innermost first.
pub fn parse_backtrace(backtrace: &Backtrace) -> Vec<NativeFrame> {
	let bt_string = format!("{:#}", backtrace);
	parse_backtrace_string(&bt_string)
}

/// Capture a fresh backtrace and parse it.
pub fn capture_backtrace() -> Vec<NativeFrame> {
	parse_backtrace(&Backtrace::force_capture())
}

/// Parse the alternate display of a backtrace:
///
/// ```text
///    0: my_app::handlers::process
///              at ./src/handlers.rs:42:9
/// ```
fn parse_backtrace_string(bt_string: &str) -> Vec<NativeFrame> {
	let mut frames: Vec<NativeFrame> = Vec::new();
	// Location lines belong to the frame above; skipped frames swallow theirs.
	let mut last_kept = false;

	for line in bt_string.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		if let Some(location) = line.strip_prefix("at ") {
			if last_kept {
				if let Some(frame) = frames.last_mut() {
					apply_location(frame, location);
				}
			}
			continue;
		}

		match parse_frame_line(line) {
			Some(frame) if is_in_app_frame(frame.function.as_deref().unwrap_or_default()) => {
				frames.push(frame);
				last_kept = true;
			}
			_ => last_kept = false,
		}
	}

	frames
}

/// Parse a single `N: symbol` line.
fn parse_frame_line(line: &str) -> Option<NativeFrame> {
	let (prefix, symbol) = line.split_once(':')?;
	if prefix.trim().parse::<u32>().is_err() {
		return None;
	}

	let symbol = symbol.trim();
	if symbol.is_empty() {
		return None;
	}

	Some(NativeFrame {
		function: Some(format!("{:#}", demangle(symbol))),
		..Default::default()
	})
}

/// Apply `file:line:col` to `frame`. The file part may itself contain colons.
fn apply_location(frame: &mut NativeFrame, location: &str) {
	let mut parts = location.rsplitn(3, ':');
	let column = parts.next().and_then(|c| c.parse().ok());
	let line = parts.next().and_then(|l| l.parse().ok());
	match (parts.next(), line, column) {
		(Some(file), Some(line), Some(column)) => {
			frame.file = Some(file.to_string());
			frame.line = Some(line);
			frame.column = Some(column);
		}
		_ => frame.file = Some(location.to_string()),
	}
}

/// Determine if a frame is from application code rather than the standard
/// library, the async runtime, or this crate's own panic machinery.
fn is_in_app_frame(function: &str) -> bool {
	const SYSTEM_PREFIXES: &[&str] = &[
		"std::",
		"core::",
		"alloc::",
		"<std::",
		"<core::",
		"<alloc::",
		"tokio::",
		"<tokio::",
		"futures::",
		"<futures::",
		"async_trait::",
		"tracing::",
		"<tracing::",
		"panic_unwind::",
		"rust_begin_unwind",
		"rust_panic",
		"__rust_",
		"_rust_",
		"loom_capture::backtrace::",
		"loom_capture::panic_hook::",
		"<alloc::boxed::Box<F,A> as core::ops::function::Fn",
	];

	const SYSTEM_CONTAINS: &[&str] = &[
		"::panicking::",
		"::rt::",
		"::sys_common::",
		"::sys::",
	];

	if function.is_empty() {
		return false;
	}

	!SYSTEM_PREFIXES.iter().any(|prefix| function.starts_with(prefix))
		&& !SYSTEM_CONTAINS.iter().any(|needle| function.contains(needle))
}
