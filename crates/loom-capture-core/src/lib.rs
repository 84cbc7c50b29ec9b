// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Loom error capture client.
//!
//! This crate holds the data model shared by the capture SDK: raw host
//! exceptions, the canonical stack trace they are normalized into, and the
//! event envelope that scopes decorate before it reaches a client.
//!
//! # Overview
//!
//! - [`RawException`]: whatever the host handed over (stack strings, native
//!   frames, an introspectable call chain)
//! - [`CapturedTrace`] / [`StackFrame`]: engine-independent trace, innermost
//!   call first
//! - [`Event`] / [`EventHint`]: the envelope routed through scopes and hubs
//! - [`Breadcrumb`], [`Level`], [`Fingerprint`]: context attached to events
//! - [`normalize`]: deep sanitization for user-supplied context values

pub mod breadcrumb;
pub mod error;
pub mod event;
pub mod exception;
pub mod frame;
pub mod level;
pub mod normalize;

pub use breadcrumb::Breadcrumb;
pub use error::CoreError;
pub use event::{Event, EventHint, EventId, ExceptionInfo, Fingerprint};
pub use exception::{CallChain, ChainedFunction, ExceptionRef, FunctionId, NativeFrame, RawException};
pub use frame::{CapturedTrace, StackFrame, TraceMode, UNKNOWN_FUNCTION};
pub use level::Level;
pub use normalize::{normalize, normalize_map};
