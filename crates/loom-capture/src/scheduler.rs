// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Deferred callbacks for the report debounce.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;

/// A callback to run once.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Host primitive that runs a callback after a delay.
pub trait Scheduler: Send + Sync {
	fn schedule(&self, delay: Duration, task: Task);
}

/// Schedules on a tokio runtime.
///
/// Without a runtime the task runs on a detached thread after sleeping.
#[derive(Debug, Clone, Default)]
pub struct TokioScheduler {
	handle: Option<Handle>,
}

impl TokioScheduler {
	/// Uses the runtime of the calling context, if any.
	pub fn new() -> Self {
		Self {
			handle: Handle::try_current().ok(),
		}
	}

	pub fn with_handle(handle: Handle) -> Self {
		Self {
			handle: Some(handle),
		}
	}
}

impl Scheduler for TokioScheduler {
	fn schedule(&self, delay: Duration, task: Task) {
		match &self.handle {
			Some(handle) => {
				handle.spawn(async move {
					tokio::time::sleep(delay).await;
					task();
				});
			}
			None => {
				std::thread::spawn(move || {
					std::thread::sleep(delay);
					task();
				});
			}
		}
	}
}

/// Scheduler driven by hand, for deterministic tests and embedders that own
/// their event loop.
#[derive(Default)]
pub struct ManualScheduler {
	state: Mutex<ManualState>,
}

#[derive(Default)]
struct ManualState {
	now: Duration,
	seq: u64,
	tasks: Vec<(Duration, u64, Task)>,
}

impl fmt::Debug for ManualScheduler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("ManualScheduler")
			.field("now", &state.now)
			.field("pending", &state.tasks.len())
			.finish()
	}
}

impl ManualScheduler {
	pub fn new() -> Self {
		Self::default()
	}

	/// Delays of tasks not yet run, relative to now, in schedule order.
	pub fn pending(&self) -> Vec<Duration> {
		let state = self.state.lock();
		state
			.tasks
			.iter()
			.map(|(due, _, _)| due.saturating_sub(state.now))
			.collect()
	}

	/// Moves the clock forward and runs every task that became due, earliest
	/// first. Tasks scheduled while running are picked up if already due.
	pub fn advance(&self, by: Duration) -> usize {
		let now = {
			let mut state = self.state.lock();
			state.now += by;
			state.now
		};

		let mut ran = 0;
		loop {
			let task = {
				let mut state = self.state.lock();
				let next = state
					.tasks
					.iter()
					.enumerate()
					.filter(|(_, (due, _, _))| *due <= now)
					.min_by_key(|(_, (due, seq, _))| (*due, *seq))
					.map(|(index, _)| index);
				next.map(|index| state.tasks.remove(index).2)
			};
			match task {
				Some(task) => {
					task();
					ran += 1;
				}
				None => return ran,
			}
		}
	}

	/// Runs every task that is due now.
	pub fn run_due(&self) -> usize {
		self.advance(Duration::ZERO)
	}
}

impl Scheduler for ManualScheduler {
	fn schedule(&self, delay: Duration, task: Task) {
		let mut state = self.state.lock();
		let due = state.now + delay;
		let seq = state.seq;
		state.seq += 1;
		state.tasks.push((due, seq, task));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	#[test]
	fn manual_runs_in_due_order() {
		let scheduler = ManualScheduler::new();
		let order = Arc::new(Mutex::new(Vec::new()));

		for (name, delay) in [("late", 2000), ("early", 0), ("mid", 500)] {
			let order = order.clone();
			scheduler.schedule(
				Duration::from_millis(delay),
				Box::new(move || order.lock().push(name)),
			);
		}

		assert_eq!(scheduler.run_due(), 1);
		assert_eq!(scheduler.pending().len(), 2);
		assert_eq!(scheduler.advance(Duration::from_millis(2000)), 2);
		assert_eq!(*order.lock(), vec!["early", "mid", "late"]);
	}

	#[test]
	fn manual_tasks_may_schedule_more() {
		let scheduler = Arc::new(ManualScheduler::new());
		let count = Arc::new(AtomicUsize::new(0));

		let inner_scheduler = scheduler.clone();
		let inner_count = count.clone();
		scheduler.schedule(
			Duration::ZERO,
			Box::new(move || {
				let count = inner_count.clone();
				inner_scheduler.schedule(
					Duration::ZERO,
					Box::new(move || {
						count.fetch_add(1, Ordering::SeqCst);
					}),
				);
			}),
		);

		assert_eq!(scheduler.run_due(), 2);
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn tokio_scheduler_waits_for_delay() {
		let scheduler = TokioScheduler::new();
		let (tx, rx) = tokio::sync::oneshot::channel();
		scheduler.schedule(
			Duration::from_millis(2000),
			Box::new(move || {
				let _ = tx.send(());
			}),
		);

		let started = tokio::time::Instant::now();
		rx.await.unwrap();
		assert!(started.elapsed() >= Duration::from_millis(2000));
	}
}
