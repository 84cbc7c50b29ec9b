// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Severity levels shared by events and breadcrumbs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Severity of an event or breadcrumb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
	Fatal,
	Error,
	Warning,
	Log,
	Info,
	Debug,
	Critical,
}

impl fmt::Display for Level {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Fatal => write!(f, "fatal"),
			Self::Error => write!(f, "error"),
			Self::Warning => write!(f, "warning"),
			Self::Log => write!(f, "log"),
			Self::Info => write!(f, "info"),
			Self::Debug => write!(f, "debug"),
			Self::Critical => write!(f, "critical"),
		}
	}
}

impl FromStr for Level {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"fatal" => Ok(Self::Fatal),
			"error" => Ok(Self::Error),
			// older SDKs sent "warn"
			"warning" | "warn" => Ok(Self::Warning),
			"log" => Ok(Self::Log),
			"info" => Ok(Self::Info),
			"debug" => Ok(Self::Debug),
			"critical" => Ok(Self::Critical),
			_ => Err(CoreError::InvalidLevel(s.to_string())),
		}
	}
}
