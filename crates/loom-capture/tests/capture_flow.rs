// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use loom_capture::{
	add_global_event_processor, forward_to_hub, processor_fn, Breadcrumb, CallChain, ChainedFunction,
	ErrorHookArgs, Event, GlobalErrorBridge, HostInfo, Hub, Level, ManualScheduler, MemorySink,
	RawException, SinkClient, TraceMode,
};

fn hub_with_sink() -> (Arc<Hub>, Arc<MemorySink>) {
	let sink = Arc::new(MemorySink::new());
	let client = SinkClient::builder()
		.release("9.9.9")
		.max_breadcrumbs(3)
		.sink(sink.clone())
		.build()
		.unwrap();
	(Arc::new(Hub::new(Some(Arc::new(client)), None)), sink)
}

async fn wait_for(sink: &MemorySink, count: usize) {
	tokio::time::timeout(Duration::from_secs(5), async {
		while sink.len() < count {
			tokio::task::yield_now().await;
		}
	})
	.await
	.expect("events were not delivered");
}

#[tokio::test]
async fn reported_exception_reaches_sink_with_scope() {
	let (hub, sink) = hub_with_sink();
	let scheduler = Arc::new(ManualScheduler::new());
	let bridge = GlobalErrorBridge::builder()
		.host(HostInfo {
			location_href: Some("http://shop.example.com/cart".to_string()),
			user_agent: Some("integration".to_string()),
		})
		.scheduler(scheduler.clone())
		.build();
	forward_to_hub(&bridge, hub.clone(), tokio::runtime::Handle::current());

	hub.configure_scope(|scope| {
		scope.set_tag("team", "checkout");
	});
	for n in 0..5 {
		hub.add_breadcrumb(Breadcrumb::new("ui", format!("click {n}")));
	}

	let ex = Arc::new(
		RawException::error("TypeError", "cart is undefined")
			.with_stack("TypeError: cart is undefined\n    at checkout (http://shop.example.com/app.js:120:17)\n    at onClick (http://shop.example.com/app.js:88:3)"),
	);
	let err = bridge.report(ex.clone()).unwrap_err();
	assert!(Arc::ptr_eq(err.rethrown().unwrap(), &ex));

	scheduler.run_due();
	wait_for(&sink, 1).await;

	let events = sink.events();
	let event = &events[0];
	let exception = event.exception.as_ref().unwrap();
	assert_eq!(exception.ty.as_deref(), Some("TypeError"));
	assert_eq!(exception.frames.len(), 2);
	assert_eq!(exception.frames[0].function, "checkout");
	assert_eq!(exception.frames[0].line, Some(120));
	assert_eq!(event.tags["team"], "checkout");
	assert_eq!(event.release.as_deref(), Some("9.9.9"));
	assert_eq!(event.level, Some(Level::Error));

	let crumbs: Vec<_> = event
		.breadcrumbs
		.iter()
		.map(|b| b.message.clone().unwrap())
		.collect();
	assert_eq!(crumbs, vec!["click 2", "click 3", "click 4"]);
	assert_eq!(hub.last_event_id(), event.event_id);
}

#[tokio::test]
async fn global_hook_completes_caller_chain_trace() {
	let (hub, sink) = hub_with_sink();
	let scheduler = Arc::new(ManualScheduler::new());
	let bridge = GlobalErrorBridge::builder().scheduler(scheduler.clone()).build();
	bridge.install_global_handler();
	forward_to_hub(&bridge, hub.clone(), tokio::runtime::Handle::current());

	let mut chain = CallChain::new();
	let inner = chain.push(ChainedFunction::named("recurse"));
	chain.set_caller(inner, inner);
	chain.set_top(inner);
	let ex = Arc::new(RawException::error("RangeError", "too much recursion").with_call_chain(chain));

	let _ = bridge.report(ex);
	assert_eq!(scheduler.pending(), vec![Duration::from_millis(2000)]);

	bridge.hooks().raise_error(
		&ErrorHookArgs::new("RangeError: too much recursion").at("http://a.com/r.js", 5, None),
	);
	wait_for(&sink, 1).await;

	let events = sink.events();
	let frames = &events[0].exception.as_ref().unwrap().frames;
	assert_eq!(frames.len(), 2);
	assert_eq!(frames[0].url.as_deref(), Some("http://a.com/r.js"));
	assert_eq!(frames[1].function, "recurse");

	scheduler.advance(Duration::from_millis(2000));
	tokio::task::yield_now().await;
	assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn global_processor_runs_before_scope_processors() {
	add_global_event_processor(processor_fn(|mut event: Event, _| {
		if event.tags.contains_key("drop-me") {
			return Ok(None);
		}
		if event.tags.contains_key("order-probe") {
			event.message = Some(format!("{}>global", event.message.unwrap_or_default()));
		}
		Ok(Some(event))
	}));

	let (hub, sink) = hub_with_sink();
	hub.configure_scope(|scope| {
		scope.add_event_processor(processor_fn(|mut event, _| {
			if event.tags.contains_key("order-probe") {
				event.message = Some(format!("{}>scope", event.message.unwrap_or_default()));
			}
			Ok(Some(event))
		}));
	});

	let mut probe = Event::message("start");
	probe.tags.insert("order-probe".to_string(), "1".to_string());
	hub.capture_event(probe, None).await;

	let mut dropped = Event::message("gone");
	dropped.tags.insert("drop-me".to_string(), "1".to_string());
	hub.capture_event(dropped, None).await;

	let events = sink.events();
	assert_eq!(events.len(), 1);
	assert_eq!(events[0].message.as_deref(), Some("start>global>scope"));
}

#[tokio::test]
async fn with_scope_isolates_context() {
	let (hub, sink) = hub_with_sink();

	hub.with_scope(|hub| {
		hub.configure_scope(|scope| {
			scope.set_user(&serde_json::json!({"id": "u-42"}));
			scope.set_fingerprint(["checkout", "timeout"]);
		});
	});
	hub.capture_message("outside", None, None).await;

	let events = sink.events();
	let event = &events[0];
	assert!(event.user.is_empty());
	assert_eq!(
		event.fingerprint.clone().map(|f| f.into_vec()),
		Some(vec!["outside".to_string()])
	);
	assert_eq!(hub.stack_len(), 1);
}

#[tokio::test]
async fn failed_trace_still_produces_event() {
	let (hub, sink) = hub_with_sink();
	hub.capture_exception(Arc::new(RawException::value("plain string")), None)
		.await;

	let events = sink.events();
	let event = &events[0];
	let exception = event.exception.as_ref().unwrap();
	assert!(exception.frames.is_empty());
	assert_eq!(exception.value.as_deref(), Some("plain string"));

	let trace = loom_capture::compute_stack_trace(&Arc::new(RawException::value("x")), 0);
	assert_eq!(trace.mode, TraceMode::Failed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_reports_each_reach_sink_once() {
	let (hub, sink) = hub_with_sink();
	let scheduler = Arc::new(ManualScheduler::new());
	let bridge = GlobalErrorBridge::builder().scheduler(scheduler.clone()).build();
	forward_to_hub(&bridge, hub.clone(), tokio::runtime::Handle::current());

	let barrier = Arc::new(std::sync::Barrier::new(6));
	let threads: Vec<_> = (0..6)
		.map(|n| {
			let bridge = bridge.clone();
			let barrier = barrier.clone();
			std::thread::spawn(move || {
				let message = format!("worker {n} failed");
				let ex = Arc::new(
					RawException::error("Error", message.clone())
						.with_stack(format!("Error: {message}\n    at work (http://a.com/w.js:{}:1)", n + 1)),
				);
				barrier.wait();
				let _ = bridge.report(ex);
			})
		})
		.collect();
	for thread in threads {
		thread.join().unwrap();
	}
	scheduler.run_due();
	wait_for(&sink, 6).await;

	let mut messages: Vec<_> = sink
		.events()
		.into_iter()
		.map(|event| event.exception.unwrap().value.unwrap())
		.collect();
	messages.sort();
	let expected: Vec<_> = (0..6).map(|n| format!("worker {n} failed")).collect();
	assert_eq!(messages, expected);
}
