// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use loom_capture::{install_panic_hook, ErrorHookArgs, HostHooks};
use parking_lot::Mutex;

#[test]
fn panics_are_raised_on_the_error_hook() {
	let hooks = Arc::new(HostHooks::new());
	let seen: Arc<Mutex<Vec<ErrorHookArgs>>> = Arc::new(Mutex::new(Vec::new()));
	let record = seen.clone();
	hooks.set_error_hook(Arc::new(move |args: &ErrorHookArgs| {
		record.lock().push(args.clone());
		false
	}));

	install_panic_hook(hooks);

	let result = std::thread::spawn(|| panic!("kaboom")).join();
	assert!(result.is_err());

	let seen = seen.lock();
	assert_eq!(seen.len(), 1);
	let args = &seen[0];
	assert_eq!(args.message.as_deref(), Some("kaboom"));
	assert!(args.url.as_deref().unwrap().ends_with("panic_hook.rs"));
	assert!(args.line.is_some());

	let error = args.error.as_ref().unwrap();
	assert!(error.is_error);
	assert_eq!(error.name.as_deref(), Some("panic"));
	assert_eq!(error.declared_line(), args.line);
	assert!(error.frames.is_some());
}
