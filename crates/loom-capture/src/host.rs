// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The host environment as seen by the capture client: its global error
//! hook slots and a description of the running page/process.

use std::fmt;
use std::sync::Arc;

use loom_capture_core::ExceptionRef;
use parking_lot::Mutex;

/// Description of the host, stamped onto every computed trace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
	/// Location of the running document or process, if the host has one.
	pub location_href: Option<String>,
	pub user_agent: Option<String>,
}

impl HostInfo {
	/// Describes the current Rust process: executable path as location,
	/// crate name and target as user agent.
	pub fn current_process() -> Self {
		let location_href = std::env::current_exe()
			.ok()
			.map(|path| format!("file://{}", path.display()));
		Self {
			location_href,
			user_agent: Some(format!(
				"{}/{} ({}; {})",
				env!("CARGO_PKG_NAME"),
				env!("CARGO_PKG_VERSION"),
				std::env::consts::OS,
				std::env::consts::ARCH
			)),
		}
	}

	/// The location without its `#fragment`.
	pub fn page_url(&self) -> Option<String> {
		self.location_href
			.as_deref()
			.map(|href| href.split('#').next().unwrap_or(href).to_string())
	}
}

/// Arguments the host passes to its global error hook.
#[derive(Debug, Clone, Default)]
pub struct ErrorHookArgs {
	pub message: Option<String>,
	pub url: Option<String>,
	pub line: Option<u32>,
	pub column: Option<u32>,
	pub error: Option<ExceptionRef>,
}

impl ErrorHookArgs {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: Some(message.into()),
			..Default::default()
		}
	}

	pub fn at(mut self, url: impl Into<String>, line: u32, column: Option<u32>) -> Self {
		self.url = Some(url.into());
		self.line = Some(line);
		self.column = column;
		self
	}

	pub fn with_error(mut self, error: ExceptionRef) -> Self {
		self.error = Some(error);
		self
	}
}

/// Payload of an unhandled-rejection notification.
#[derive(Debug, Clone)]
pub struct RejectionEvent {
	/// Some hosts wrap the rejection in a `detail` record.
	pub detail: Option<RejectionDetail>,
	pub reason: Option<ExceptionRef>,
	/// The notification itself, as a raw value.
	pub payload: ExceptionRef,
}

#[derive(Debug, Clone, Default)]
pub struct RejectionDetail {
	pub reason: Option<ExceptionRef>,
}

impl RejectionEvent {
	/// A notification carrying `reason` directly.
	pub fn with_reason(reason: ExceptionRef) -> Self {
		Self {
			detail: None,
			reason: Some(reason.clone()),
			payload: reason,
		}
	}

	/// The rejected value: `detail.reason` when a detail record exists,
	/// otherwise `reason`, otherwise the notification itself.
	pub fn rejected_value(&self) -> ExceptionRef {
		let reason = match &self.detail {
			Some(detail) => detail.reason.as_ref(),
			None => self.reason.as_ref(),
		};
		reason.unwrap_or(&self.payload).clone()
	}
}

/// Global error hook: returns true when the error was fully handled.
pub type ErrorHook = Arc<dyn Fn(&ErrorHookArgs) -> bool + Send + Sync>;
/// Global unhandled-rejection hook.
pub type RejectionHook = Arc<dyn Fn(&RejectionEvent) + Send + Sync>;

/// The host's pair of global hook slots.
///
/// Hooks are invoked outside the slot lock, so a hook may replace itself or
/// raise further errors.
#[derive(Default)]
pub struct HostHooks {
	error: Mutex<Option<ErrorHook>>,
	rejection: Mutex<Option<RejectionHook>>,
}

impl fmt::Debug for HostHooks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HostHooks")
			.field("error", &self.error.lock().is_some())
			.field("rejection", &self.rejection.lock().is_some())
			.finish()
	}
}

impl HostHooks {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn error_hook(&self) -> Option<ErrorHook> {
		self.error.lock().clone()
	}

	/// Installs `hook`, returning the one it replaced.
	pub fn set_error_hook(&self, hook: ErrorHook) -> Option<ErrorHook> {
		self.error.lock().replace(hook)
	}

	pub fn rejection_hook(&self) -> Option<RejectionHook> {
		self.rejection.lock().clone()
	}

	/// Installs `hook`, returning the one it replaced.
	pub fn set_rejection_hook(&self, hook: RejectionHook) -> Option<RejectionHook> {
		self.rejection.lock().replace(hook)
	}

	/// Installs the hook built by `wrap` from the currently installed one.
	/// The read and the install happen under one lock, so no hook installed
	/// concurrently is lost from the chain.
	pub fn chain_error_hook(&self, wrap: impl FnOnce(Option<ErrorHook>) -> ErrorHook) {
		let mut slot = self.error.lock();
		let previous = slot.take();
		*slot = Some(wrap(previous));
	}

	/// [`HostHooks::chain_error_hook`] for the rejection slot.
	pub fn chain_rejection_hook(&self, wrap: impl FnOnce(Option<RejectionHook>) -> RejectionHook) {
		let mut slot = self.rejection.lock();
		let previous = slot.take();
		*slot = Some(wrap(previous));
	}

	/// Raises a global error. Returns false when no hook is installed.
	pub fn raise_error(&self, args: &ErrorHookArgs) -> bool {
		match self.error_hook() {
			Some(hook) => hook(args),
			None => false,
		}
	}

	pub fn raise_rejection(&self, event: &RejectionEvent) {
		if let Some(hook) = self.rejection_hook() {
			hook(event);
		}
	}
}
