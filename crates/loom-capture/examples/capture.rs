// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wires a bridge, a hub and a tracing sink together and reports a few
//! errors. Run with `RUST_LOG=debug` to see the capture pipeline.

use std::sync::Arc;
use std::time::Duration;

use loom_capture::{
	forward_to_hub, install_panic_hook, Breadcrumb, BridgeConfig, ClientConfig, GlobalErrorBridge, HostInfo, Hub,
	Level, RawException, SinkClient, TracingSink,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let client = SinkClient::builder()
		.config(ClientConfig::from_env())
		.host(HostInfo::current_process())
		.sink(Arc::new(TracingSink))
		.build()?;
	let client = Arc::new(client);
	let hub = Arc::new(Hub::new(Some(client.clone()), None));

	let bridge = GlobalErrorBridge::builder()
		.config(BridgeConfig::from_env())
		.host(HostInfo::current_process())
		.build();
	bridge.install_global_handler();
	install_panic_hook(bridge.hooks().clone());
	forward_to_hub(&bridge, hub.clone(), tokio::runtime::Handle::current());

	hub.configure_scope(|scope| {
		scope.set_tag("demo", "capture");
	});
	hub.add_breadcrumb(Breadcrumb::new("demo", "starting"));

	hub.capture_message("capture demo started", Some(Level::Info), None).await;

	let exception = Arc::new(
		RawException::error("TypeError", "undefined is not a function")
			.with_stack("TypeError: undefined is not a function\n    at render (http://localhost/app.js:12:7)"),
	);
	if let Err(e) = bridge.report(exception) {
		tracing::info!(error = %e, "report re-raised");
	}

	let _ = tokio::task::spawn_blocking(|| panic!("demo panic")).await;

	tokio::time::sleep(Duration::from_millis(100)).await;
	client.shutdown().await?;
	Ok(())
}
