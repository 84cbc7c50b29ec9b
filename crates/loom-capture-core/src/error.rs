// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for capture data types.

use thiserror::Error;

/// Errors raised while building or parsing capture data.
#[derive(Debug, Error)]
pub enum CoreError {
	#[error("invalid level: {0}")]
	InvalidLevel(String),

	#[error("invalid trace mode: {0}")]
	InvalidTraceMode(String),
}
