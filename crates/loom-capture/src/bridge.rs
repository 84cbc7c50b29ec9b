// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Top-level exception reporting.
//!
//! [`GlobalErrorBridge`] owns the pending-report slot and the subscriber
//! list. Exceptions arrive either explicitly through [`GlobalErrorBridge::report`]
//! or through the host hooks it installs; either way they are normalized by a
//! [`StackTraceComputer`] and handed to every subscriber.

use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use loom_capture_core::{CapturedTrace, Event, EventHint, ExceptionRef, StackFrame, TraceMode, UNKNOWN_FUNCTION};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::{BoxError, CaptureError, Result};
use crate::host::{ErrorHook, ErrorHookArgs, HostHooks, HostInfo, RejectionEvent, RejectionHook};
use crate::hub::Hub;
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::tracekit::patterns::ERROR_TYPES;
use crate::tracekit::{augment, StackTraceComputer};

/// Mechanism tag for traces raised through the global error hook.
pub const MECHANISM_ONERROR: &str = "onerror";
/// Mechanism tag for traces raised through the unhandled-rejection hook.
pub const MECHANISM_ONUNHANDLEDREJECTION: &str = "onunhandledrejection";

/// Subscriber callback: `(trace, raised_by_global_hook, source_exception)`.
pub type ReportHandler =
	Arc<dyn Fn(&CapturedTrace, bool, Option<&ExceptionRef>) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Builder for [`GlobalErrorBridge`].
pub struct GlobalErrorBridgeBuilder {
	config: BridgeConfig,
	host: HostInfo,
	hooks: Option<Arc<HostHooks>>,
	scheduler: Option<Arc<dyn Scheduler>>,
}

impl GlobalErrorBridgeBuilder {
	pub fn new() -> Self {
		Self {
			config: BridgeConfig::default(),
			host: HostInfo::default(),
			hooks: None,
			scheduler: None,
		}
	}

	pub fn config(mut self, config: BridgeConfig) -> Self {
		self.config = config;
		self
	}

	pub fn host(mut self, host: HostInfo) -> Self {
		self.host = host;
		self
	}

	/// Hook slots to install into. Defaults to a fresh, private pair.
	pub fn hooks(mut self, hooks: Arc<HostHooks>) -> Self {
		self.hooks = Some(hooks);
		self
	}

	/// Scheduler for the report debounce. Defaults to [`TokioScheduler`].
	pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
		self.scheduler = Some(scheduler);
		self
	}

	pub fn build(self) -> GlobalErrorBridge {
		let scheduler = self
			.scheduler
			.unwrap_or_else(|| Arc::new(TokioScheduler::new()));
		let computer = StackTraceComputer::new(self.host).with_lines_of_context(self.config.lines_of_context);

		GlobalErrorBridge {
			inner: Arc::new(BridgeInner {
				config: self.config,
				computer,
				hooks: self.hooks.unwrap_or_default(),
				scheduler,
				handlers: RwLock::new(Vec::new()),
				pending: Mutex::new(None),
				error_hook_installed: AtomicBool::new(false),
				rejection_hook_installed: AtomicBool::new(false),
			}),
		}
	}
}

impl Default for GlobalErrorBridgeBuilder {
	fn default() -> Self {
		Self::new()
	}
}

struct PendingReport {
	exception: ExceptionRef,
	trace: CapturedTrace,
}

struct BridgeInner {
	config: BridgeConfig,
	computer: StackTraceComputer,
	hooks: Arc<HostHooks>,
	scheduler: Arc<dyn Scheduler>,
	handlers: RwLock<Vec<ReportHandler>>,
	pending: Mutex<Option<PendingReport>>,
	error_hook_installed: AtomicBool,
	rejection_hook_installed: AtomicBool,
}

impl BridgeInner {
	fn notify_handlers(
		&self,
		trace: &CapturedTrace,
		is_global: bool,
		exception: Option<&ExceptionRef>,
	) -> Result<()> {
		if is_global && !self.config.collect_global_errors {
			debug!(mode = %trace.mode, "global error collection disabled, dropping trace");
			return Ok(());
		}

		let handlers = self.handlers.read().clone();
		let mut first_failure = None;
		for handler in handlers {
			if let Err(e) = handler(trace, is_global, exception) {
				warn!(error = %e, "report handler failed");
				first_failure.get_or_insert(e);
			}
		}

		match first_failure {
			Some(e) => Err(CaptureError::Handler(e)),
			None => Ok(()),
		}
	}

	fn deliver(&self, report: PendingReport) -> Result<()> {
		debug!(mode = %report.trace.mode, frames = report.trace.frames.len(), "delivering pending report");
		self.notify_handlers(&report.trace, false, Some(&report.exception))
	}

	fn flush_pending(&self) -> Result<()> {
		let report = self.pending.lock().take();
		match report {
			Some(report) => self.deliver(report),
			None => Ok(()),
		}
	}

	/// Delivers the pending report only if it is still for `exception`.
	fn flush_if_pending(&self, exception: &ExceptionRef) -> Result<()> {
		let report = {
			let mut pending = self.pending.lock();
			match pending.as_ref() {
				Some(report) if Arc::ptr_eq(&report.exception, exception) => pending.take(),
				_ => None,
			}
		};
		match report {
			Some(report) => self.deliver(report),
			None => Ok(()),
		}
	}

	fn on_global_error(&self, args: &ErrorHookArgs) -> Result<()> {
		let pending = self.pending.lock().take();
		if let Some(mut report) = pending {
			augment(
				&mut report.trace,
				args.url.as_deref(),
				args.line,
				args.message.as_deref(),
			);
			return self.deliver(report);
		}

		if let Some(error) = args.error.as_ref().filter(|e| e.is_error) {
			let trace = self.computer.compute(error, 0).with_mechanism(MECHANISM_ONERROR);
			return self.notify_handlers(&trace, true, Some(error));
		}

		let trace = self.trace_from_hook_message(args);
		self.notify_handlers(&trace, true, None)
	}

	/// Single-frame trace built from the hook's text and location.
	fn trace_from_hook_message(&self, args: &ErrorHookArgs) -> CapturedTrace {
		let mut name = None;
		let mut message = args.message.clone();
		if let Some(caps) = args.message.as_deref().and_then(|m| ERROR_TYPES.captures(m)) {
			name = caps.get(1).map(|m| m.as_str().to_string());
			message = caps.get(2).map(|m| m.as_str().to_string());
		}

		let host = self.computer.host();
		let frame = StackFrame {
			url: args.url.clone().or_else(|| host.location_href.clone()),
			function: UNKNOWN_FUNCTION.to_string(),
			line: args.line,
			column: args.column,
			..Default::default()
		};

		CapturedTrace {
			name,
			message,
			url: host.location_href.clone(),
			user_agent: host.user_agent.clone(),
			frames: vec![frame],
			..CapturedTrace::new(TraceMode::Onerror)
		}
		.with_mechanism(MECHANISM_ONERROR)
	}

	fn on_unhandled_rejection(&self, event: &RejectionEvent) -> Result<()> {
		let reason = event.rejected_value();
		let trace = self
			.computer
			.compute(&reason, 0)
			.with_mechanism(MECHANISM_ONUNHANDLEDREJECTION);
		self.notify_handlers(&trace, true, Some(&reason))
	}
}

/// Debounced, dedup-aware top-level exception reporter.
///
/// Cloning is cheap; clones share the pending slot and subscribers.
#[derive(Clone)]
pub struct GlobalErrorBridge {
	inner: Arc<BridgeInner>,
}

impl fmt::Debug for GlobalErrorBridge {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GlobalErrorBridge")
			.field("config", &self.inner.config)
			.field("handlers", &self.inner.handlers.read().len())
			.field("pending", &self.inner.pending.lock().is_some())
			.finish()
	}
}

impl GlobalErrorBridge {
	pub fn builder() -> GlobalErrorBridgeBuilder {
		GlobalErrorBridgeBuilder::new()
	}

	pub fn config(&self) -> &BridgeConfig {
		&self.inner.config
	}

	pub fn computer(&self) -> &StackTraceComputer {
		&self.inner.computer
	}

	pub fn hooks(&self) -> &Arc<HostHooks> {
		&self.inner.hooks
	}

	/// Registers a subscriber. Subscribers run in registration order.
	pub fn subscribe<F>(&self, handler: F)
	where
		F: Fn(&CapturedTrace, bool, Option<&ExceptionRef>) -> std::result::Result<(), BoxError>
			+ Send
			+ Sync
			+ 'static,
	{
		self.inner.handlers.write().push(Arc::new(handler));
	}

	/// Reports `exception` and hands it back for the caller to propagate.
	///
	/// Delivery is deferred by the configured flush delay, or by the longer
	/// incomplete delay when the trace still lacks its leading location so a
	/// following global hook call can supply it. Reporting the exception that
	/// is already pending does nothing; reporting a different one replaces the
	/// pending report and delivers the replaced one immediately.
	///
	/// The result is always `Err`: [`CaptureError::Rethrown`] normally, or
	/// [`CaptureError::Handler`] when delivering the replaced report failed.
	/// The new report is scheduled either way.
	pub fn report(&self, exception: ExceptionRef) -> Result<Infallible> {
		let trace = self.inner.computer.compute(&exception, 0);
		let delay = if trace.incomplete {
			self.inner.config.incomplete_delay
		} else {
			self.inner.config.flush_delay
		};

		// dedup check, take and install must share one lock
		let replaced = {
			let mut pending = self.inner.pending.lock();
			if pending
				.as_ref()
				.is_some_and(|report| Arc::ptr_eq(&report.exception, &exception))
			{
				debug!("exception already pending, not reporting again");
				return Err(CaptureError::Rethrown(exception));
			}
			debug!(mode = %trace.mode, incomplete = trace.incomplete, ?delay, "scheduling report");
			pending.replace(PendingReport {
				exception: exception.clone(),
				trace,
			})
		};

		let delivered = match replaced {
			Some(report) => self.inner.deliver(report),
			None => Ok(()),
		};

		let weak: Weak<BridgeInner> = Arc::downgrade(&self.inner);
		let scheduled = exception.clone();
		self.inner.scheduler.schedule(
			delay,
			Box::new(move || {
				let Some(inner) = weak.upgrade() else {
					return;
				};
				if let Err(e) = inner.flush_if_pending(&scheduled) {
					warn!(error = %e, "scheduled report delivery failed");
				}
			}),
		);

		delivered?;
		Err(CaptureError::Rethrown(exception))
	}

	/// Delivers the pending report now, if there is one.
	pub fn flush(&self) -> Result<()> {
		self.inner.flush_pending()
	}

	pub fn has_pending(&self) -> bool {
		self.inner.pending.lock().is_some()
	}

	/// Runs every subscriber with `trace`.
	///
	/// Each subscriber runs even if an earlier one failed; the first failure
	/// is returned afterwards. Global-hook traces are skipped when global
	/// error collection is disabled.
	pub fn notify_handlers(
		&self,
		trace: &CapturedTrace,
		is_global: bool,
		exception: Option<&ExceptionRef>,
	) -> Result<()> {
		self.inner.notify_handlers(trace, is_global, exception)
	}

	/// Handles one invocation of the global error hook.
	pub fn on_global_error(&self, args: &ErrorHookArgs) -> Result<()> {
		self.inner.on_global_error(args)
	}

	/// Handles one unhandled-rejection notification.
	pub fn on_unhandled_rejection(&self, event: &RejectionEvent) -> Result<()> {
		self.inner.on_unhandled_rejection(event)
	}

	/// Installs the global error hook, chaining to the previous one.
	/// Subsequent calls do nothing.
	pub fn install_global_handler(&self) {
		if self.inner.error_hook_installed.swap(true, Ordering::SeqCst) {
			return;
		}

		let weak = Arc::downgrade(&self.inner);
		self.inner.hooks.chain_error_hook(|previous| -> ErrorHook {
			Arc::new(move |args: &ErrorHookArgs| {
				if let Some(inner) = weak.upgrade() {
					if let Err(e) = inner.on_global_error(args) {
						warn!(error = %e, "global error hook delivery failed");
					}
				}
				match &previous {
					Some(previous) => previous(args),
					None => false,
				}
			})
		});
		info!("global error hook installed");
	}

	/// Installs the unhandled-rejection hook, chaining to the previous one.
	/// Subsequent calls do nothing.
	pub fn install_global_unhandled_rejection_handler(&self) {
		if self.inner.rejection_hook_installed.swap(true, Ordering::SeqCst) {
			return;
		}

		let weak = Arc::downgrade(&self.inner);
		self.inner.hooks.chain_rejection_hook(|previous| -> RejectionHook {
			Arc::new(move |event: &RejectionEvent| {
				if let Some(inner) = weak.upgrade() {
					if let Err(e) = inner.on_unhandled_rejection(event) {
						warn!(error = %e, "unhandled rejection hook delivery failed");
					}
				}
				if let Some(previous) = &previous {
					previous(event);
				}
			})
		});
		info!("unhandled rejection hook installed");
	}
}

/// Subscribes a handler that captures every delivered trace on `hub`.
///
/// Captures run on `handle`, since subscribers are synchronous.
pub fn forward_to_hub(bridge: &GlobalErrorBridge, hub: Arc<Hub>, handle: Handle) {
	bridge.subscribe(move |trace, _is_global, exception| {
		let event = Event::from_trace(trace);
		let hint = EventHint {
			original_exception: exception.cloned(),
			..Default::default()
		};
		let hub = hub.clone();
		handle.spawn(async move {
			hub.capture_event(event, Some(hint)).await;
		});
		Ok(())
	});
}
