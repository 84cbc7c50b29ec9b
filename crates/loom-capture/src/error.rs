// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the capture SDK.

use loom_capture_core::ExceptionRef;
use thiserror::Error;

/// Boxed failure returned by subscribers and event processors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Errors that can occur in the capture SDK.
#[derive(Debug, Error)]
pub enum CaptureError {
	/// `report` hands the exception back so the caller keeps propagating it.
	#[error("exception re-raised after report: {}", .0.declared_message().unwrap_or("<no message>"))]
	Rethrown(ExceptionRef),

	/// A report subscriber failed; the first failure of a notification round.
	#[error("report handler failed: {0}")]
	Handler(#[source] BoxError),

	/// An event processor failed; the event was not delivered.
	#[error("event processor failed: {0}")]
	Processor(#[source] BoxError),

	/// The client has been shut down.
	#[error("capture client has been shut down")]
	ClientShutdown,

	/// The event sink rejected an event.
	#[error("event sink failed: {0}")]
	Sink(String),

	/// Invalid configuration value.
	#[error("invalid configuration: {0}")]
	Config(String),
}

impl CaptureError {
	/// The re-raised exception, if this is a [`CaptureError::Rethrown`].
	pub fn rethrown(&self) -> Option<&ExceptionRef> {
		match self {
			Self::Rethrown(exception) => Some(exception),
			_ => None,
		}
	}
}
