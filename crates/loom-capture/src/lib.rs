// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error capture client.
//!
//! Intercepts uncaught exceptions and unhandled rejections, normalizes the
//! host's raw exception into an engine-independent trace, decorates events
//! with scoped context and routes them through a hub to a client.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use loom_capture::{forward_to_hub, install_panic_hook, GlobalErrorBridge, Hub, SinkClient, TracingSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SinkClient::builder()
//!         .release(env!("CARGO_PKG_VERSION"))
//!         .environment("production")
//!         .sink(Arc::new(TracingSink))
//!         .build()?;
//!     let hub = Arc::new(Hub::new(Some(Arc::new(client)), None));
//!
//!     // Route panics and explicit reports to the hub
//!     let bridge = GlobalErrorBridge::builder().build();
//!     bridge.install_global_handler();
//!     install_panic_hook(bridge.hooks().clone());
//!     forward_to_hub(&bridge, hub.clone(), tokio::runtime::Handle::current());
//!
//!     hub.configure_scope(|scope| {
//!         scope.set_tag("server", "web-01");
//!     });
//!     hub.capture_message("started", None, None).await;
//!     Ok(())
//! }
//! ```
//!
//! # Overview
//!
//! - [`StackTraceComputer`]: raw exception to [`CapturedTrace`], never fails
//! - [`GlobalErrorBridge`]: debounced `report`, host hook installation,
//!   subscriber fan-out
//! - [`Scope`]: context setters and the event processor chain
//! - [`Hub`]: stack of (client, scope) layers and capture dispatch
//! - [`Client`] / [`SinkClient`] / [`EventSink`]: where finished events go

mod backtrace;
pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod host;
pub mod hub;
mod panic_hook;
pub mod processor;
pub mod registry;
pub mod scheduler;
pub mod scope;
pub mod sink;
pub mod tracekit;

pub use backtrace::capture_backtrace;
pub use bridge::{forward_to_hub, GlobalErrorBridge, GlobalErrorBridgeBuilder, ReportHandler};
pub use client::{Client, ClientMethod, SinkClient, SinkClientBuilder};
pub use config::{BridgeConfig, ClientConfig};
pub use error::{BoxError, CaptureError, Result};
pub use host::{ErrorHookArgs, HostHooks, HostInfo, RejectionDetail, RejectionEvent};
pub use hub::{Hub, Layer};
pub use panic_hook::install_panic_hook;
pub use processor::{processor_async, processor_fn, EventProcessor, ProcessorResult};
pub use registry::{add_global_event_processor, current_hub};
pub use scheduler::{ManualScheduler, Scheduler, TokioScheduler};
pub use scope::Scope;
pub use sink::{EventSink, MemorySink, TracingSink};
pub use tracekit::{augment, augment_at, compute_stack_trace, StackTraceComputer};

// Re-export core types for convenience
pub use loom_capture_core::{
	Breadcrumb, CallChain, CapturedTrace, ChainedFunction, Event, EventHint, EventId, ExceptionRef,
	Fingerprint, Level, NativeFrame, RawException, StackFrame, TraceMode,
};
