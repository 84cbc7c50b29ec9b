// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the error bridge and the sink client.

use std::time::Duration;

/// Maximum number of breadcrumbs kept per scope by default.
pub const DEFAULT_MAX_BREADCRUMBS: usize = 100;
/// Delay before delivering a report whose trace is complete.
pub const DEFAULT_FLUSH_DELAY: Duration = Duration::from_millis(0);
/// Delay before delivering a report that still waits for a location.
pub const DEFAULT_INCOMPLETE_DELAY: Duration = Duration::from_millis(2000);
/// Lines of source context requested around a frame.
pub const DEFAULT_LINES_OF_CONTEXT: usize = 11;

/// Settings for [`crate::GlobalErrorBridge`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
	/// Deliver traces raised by the global error hooks.
	pub collect_global_errors: bool,
	/// Debounce for complete reports.
	pub flush_delay: Duration,
	/// Debounce for reports that wait for a global hook to fill in a location.
	pub incomplete_delay: Duration,
	pub lines_of_context: usize,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			collect_global_errors: true,
			flush_delay: DEFAULT_FLUSH_DELAY,
			incomplete_delay: DEFAULT_INCOMPLETE_DELAY,
			lines_of_context: DEFAULT_LINES_OF_CONTEXT,
		}
	}
}

impl BridgeConfig {
	/// Reads `LOOM_CAPTURE_*` variables, keeping defaults for anything unset
	/// or unparsable.
	pub fn from_env() -> Self {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let defaults = Self::default();

		let collect_global_errors = lookup("LOOM_CAPTURE_COLLECT_GLOBAL_ERRORS")
			.map(|v| v != "0" && v.to_lowercase() != "false")
			.unwrap_or(defaults.collect_global_errors);

		let flush_delay = lookup("LOOM_CAPTURE_FLUSH_DELAY_MS")
			.and_then(|s| s.parse().ok())
			.map(Duration::from_millis)
			.unwrap_or(defaults.flush_delay);

		let incomplete_delay = lookup("LOOM_CAPTURE_INCOMPLETE_DELAY_MS")
			.and_then(|s| s.parse().ok())
			.map(Duration::from_millis)
			.unwrap_or(defaults.incomplete_delay);

		let lines_of_context = lookup("LOOM_CAPTURE_LINES_OF_CONTEXT")
			.and_then(|s| s.parse().ok())
			.unwrap_or(defaults.lines_of_context);

		Self {
			collect_global_errors,
			flush_delay,
			incomplete_delay,
			lines_of_context,
		}
	}
}

/// Settings for [`crate::SinkClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// Breadcrumbs kept per scope when added through a hub.
	pub max_breadcrumbs: usize,
	pub environment: String,
	pub release: Option<String>,
	pub dist: Option<String>,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			max_breadcrumbs: DEFAULT_MAX_BREADCRUMBS,
			environment: "production".to_string(),
			release: None,
			dist: None,
		}
	}
}

impl ClientConfig {
	/// Reads `LOOM_CAPTURE_*` variables, keeping defaults for anything unset
	/// or unparsable.
	pub fn from_env() -> Self {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let defaults = Self::default();
		Self {
			max_breadcrumbs: lookup("LOOM_CAPTURE_MAX_BREADCRUMBS")
				.and_then(|s| s.parse().ok())
				.unwrap_or(defaults.max_breadcrumbs),
			environment: lookup("LOOM_CAPTURE_ENVIRONMENT")
				.filter(|s| !s.is_empty())
				.unwrap_or(defaults.environment),
			release: lookup("LOOM_CAPTURE_RELEASE").filter(|s| !s.is_empty()),
			dist: lookup("LOOM_CAPTURE_DIST").filter(|s| !s.is_empty()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |key: &str| vars.get(key).cloned()
	}

	#[test]
	fn bridge_defaults() {
		let config = BridgeConfig::default();
		assert!(config.collect_global_errors);
		assert_eq!(config.flush_delay, Duration::ZERO);
		assert_eq!(config.incomplete_delay, Duration::from_millis(2000));
		assert_eq!(config.lines_of_context, 11);
	}

	#[test]
	fn bridge_reads_overrides() {
		let config = BridgeConfig::from_lookup(lookup(&[
			("LOOM_CAPTURE_COLLECT_GLOBAL_ERRORS", "false"),
			("LOOM_CAPTURE_INCOMPLETE_DELAY_MS", "50"),
		]));
		assert!(!config.collect_global_errors);
		assert_eq!(config.incomplete_delay, Duration::from_millis(50));
		assert_eq!(config.flush_delay, Duration::ZERO);
	}

	#[test]
	fn bridge_ignores_garbage() {
		let config = BridgeConfig::from_lookup(lookup(&[("LOOM_CAPTURE_FLUSH_DELAY_MS", "soon")]));
		assert_eq!(config.flush_delay, DEFAULT_FLUSH_DELAY);
	}

	#[test]
	fn client_reads_overrides() {
		let config = ClientConfig::from_lookup(lookup(&[
			("LOOM_CAPTURE_MAX_BREADCRUMBS", "5"),
			("LOOM_CAPTURE_ENVIRONMENT", "staging"),
			("LOOM_CAPTURE_RELEASE", "1.2.3"),
		]));
		assert_eq!(config.max_breadcrumbs, 5);
		assert_eq!(config.environment, "staging");
		assert_eq!(config.release.as_deref(), Some("1.2.3"));
		assert!(config.dist.is_none());
	}
}
