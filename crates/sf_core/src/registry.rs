use std::{collections::HashMap, sync::RwLock};

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Cooperative controls for one in-flight task. Paused is a `watch` cell
/// rather than an `AtomicBool` so the worker loop can `changed().await`
/// between rows instead of polling.
struct TaskHandle {
	cancel: CancellationToken,
	pause: tokio::sync::watch::Sender<bool>,
}

/// Live tasks keyed by task id, mirroring `_active_extractors` - a single
/// shared map the HTTP/CLI layer and the worker both reach into, the worker
/// to check for cancellation/pause and the caller to issue it.
#[derive(Default)]
pub struct TaskRegistry {
	tasks: RwLock<HashMap<String, TaskHandle>>,
}

/// A worker's private view of its own controls, handed out by `register` and
/// consulted from inside the processing loop.
#[derive(Clone)]
pub struct TaskControl {
	cancel: CancellationToken,
	pause: tokio::sync::watch::Receiver<bool>,
}

impl TaskControl {
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	pub async fn cancelled(&self) {
		self.cancel.cancelled().await
	}

	/// Block here while the task is paused, waking as soon as it is resumed
	/// or cancelled.
	pub async fn wait_while_paused(&mut self) {
		while *self.pause.borrow() {
			if self.cancel.is_cancelled() {
				return;
			}
			if self.pause.changed().await.is_err() {
				return;
			}
		}
	}
}

impl TaskRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&self, task_id: &str) -> TaskControl {
		let cancel = CancellationToken::new();
		let (pause_tx, pause_rx) = tokio::sync::watch::channel(false);

		self.tasks.write().expect("poisoned").insert(
			task_id.to_string(),
			TaskHandle {
				cancel: cancel.clone(),
				pause: pause_tx,
			},
		);

		TaskControl {
			cancel,
			pause: pause_rx,
		}
	}

	pub fn unregister(&self, task_id: &str) {
		self.tasks.write().expect("poisoned").remove(task_id);
	}

	pub fn pause(&self, task_id: &str) -> Result<()> {
		self.set_paused(task_id, true)
	}

	pub fn resume(&self, task_id: &str) -> Result<()> {
		self.set_paused(task_id, false)
	}

	fn set_paused(&self, task_id: &str, paused: bool) -> Result<()> {
		let tasks = self.tasks.read().expect("poisoned");
		let handle = tasks
			.get(task_id)
			.ok_or_else(|| Error::ControlNotFound(task_id.to_string()))?;
		let _ = handle.pause.send(paused);
		Ok(())
	}

	pub fn cancel(&self, task_id: &str) -> Result<()> {
		let tasks = self.tasks.read().expect("poisoned");
		let handle = tasks
			.get(task_id)
			.ok_or_else(|| Error::ControlNotFound(task_id.to_string()))?;
		handle.cancel.cancel();
		Ok(())
	}
}
