// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Routes Rust panics into the host's global error hook.

use std::backtrace::Backtrace;
use std::panic::PanicHookInfo;
use std::sync::Arc;

use loom_capture_core::RawException;
use tracing::info;

use crate::backtrace::parse_backtrace;
use crate::host::{ErrorHookArgs, HostHooks};

/// Exception name given to panics.
pub const PANIC_EXCEPTION_NAME: &str = "panic";

/// Install a panic hook that raises every panic on `hooks`.
///
/// The previously installed panic hook always runs afterwards.
pub fn install_panic_hook(hooks: Arc<HostHooks>) {
	let default_hook = std::panic::take_hook();

	std::panic::set_hook(Box::new(move |info| {
		let backtrace = Backtrace::force_capture();
		hooks.raise_error(&panic_hook_args(info, &backtrace));
		default_hook(info);
	}));

	info!("panic hook installed");
}

fn panic_hook_args(info: &PanicHookInfo<'_>, backtrace: &Backtrace) -> ErrorHookArgs {
	let message = extract_panic_message(info);
	let mut exception = RawException::error(PANIC_EXCEPTION_NAME, message.clone())
		.with_frames(parse_backtrace(backtrace));

	let mut args = ErrorHookArgs::new(message);
	if let Some(location) = info.location() {
		// column_number is zero-based
		exception = exception
			.with_location(location.file(), location.line())
			.with_column_number(location.column().saturating_sub(1));
		args = args.at(location.file(), location.line(), Some(location.column()));
	}

	args.with_error(Arc::new(exception))
}

/// Extract the panic message from panic info.
fn extract_panic_message(info: &PanicHookInfo<'_>) -> String {
	if let Some(s) = info.payload().downcast_ref::<&str>() {
		s.to_string()
	} else if let Some(s) = info.payload().downcast_ref::<String>() {
		s.clone()
	} else {
		"Box<dyn Any>".to_string()
	}
}
