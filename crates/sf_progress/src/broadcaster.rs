use std::{collections::HashMap, sync::RwLock};

use tokio::sync::broadcast;

use crate::{
	error::{Error, Result},
	event::Event,
};

const CHANNEL_CAPACITY: usize = 256;

/// Fan-out of progress events, keyed by task id. Each task gets its own
/// broadcast channel so a lagging or dropped subscriber on one task cannot
/// affect delivery on another. Ordering is only guaranteed within a task;
/// there is no cross-task ordering guarantee.
pub struct Broadcaster {
	channels: RwLock<HashMap<String, broadcast::Sender<Event>>>,
}

impl Default for Broadcaster {
	fn default() -> Self {
		Self::new()
	}
}

impl Broadcaster {
	pub fn new() -> Self {
		Self {
			channels: RwLock::new(HashMap::new()),
		}
	}

	/// Subscribe to a task's events, creating its channel if this is the
	/// first subscriber.
	pub fn subscribe(&self, task_id: &str) -> broadcast::Receiver<Event> {
		if let Some(sender) = self.channels.read().expect("poisoned").get(task_id) {
			return sender.subscribe();
		}

		let mut channels = self.channels.write().expect("poisoned");
		let sender = channels
			.entry(task_id.to_string())
			.or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
		sender.subscribe()
	}

	/// Drop a task's channel once it is no longer needed. Subscribers
	/// already holding a receiver will simply see the channel close.
	pub fn unsubscribe(&self, task_id: &str) {
		self.channels.write().expect("poisoned").remove(task_id);
	}

	/// Broadcast an event to every current subscriber of `task_id`. Returns
	/// `Err(UnknownTask)` if nothing has subscribed to this task yet; a send
	/// with zero current receivers on a known channel is not an error, since
	/// subscribers may legitimately come and go.
	pub fn broadcast(&self, task_id: &str, event: Event) -> Result<()> {
		let channels = self.channels.read().expect("poisoned");
		let sender = channels
			.get(task_id)
			.ok_or_else(|| Error::UnknownTask(task_id.to_string()))?;

		// A Closed/Lagged subscriber never blocks delivery to the others;
		// broadcast::Sender::send only fails when there are zero receivers,
		// which we treat as a no-op rather than an error.
		let _ = sender.send(event);

		Ok(())
	}

	pub fn is_known(&self, task_id: &str) -> bool {
		self.channels.read().expect("poisoned").contains_key(task_id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::EventKind;

	fn completed(task_id: &str) -> Event {
		Event::new(task_id, EventKind::Completed)
	}

	#[tokio::test]
	async fn multiple_subscribers_receive_same_event() {
		let broadcaster = Broadcaster::new();
		let mut a = broadcaster.subscribe("task-1");
		let mut b = broadcaster.subscribe("task-1");

		broadcaster.broadcast("task-1", completed("task-1")).unwrap();

		assert!(matches!(a.recv().await.unwrap().kind, EventKind::Completed));
		assert!(matches!(b.recv().await.unwrap().kind, EventKind::Completed));
	}

	#[tokio::test]
	async fn broadcast_to_unknown_task_fails() {
		let broadcaster = Broadcaster::new();
		assert!(broadcaster.broadcast("ghost", completed("ghost")).is_err());
	}

	#[tokio::test]
	async fn unsubscribe_removes_channel() {
		let broadcaster = Broadcaster::new();
		let _receiver = broadcaster.subscribe("task-1");
		assert!(broadcaster.is_known("task-1"));

		broadcaster.unsubscribe("task-1");
		assert!(!broadcaster.is_known("task-1"));
	}

	#[tokio::test]
	async fn one_dropped_subscriber_does_not_block_others() {
		let broadcaster = Broadcaster::new();
		let dropped = broadcaster.subscribe("task-1");
		let mut alive = broadcaster.subscribe("task-1");
		drop(dropped);

		broadcaster.broadcast("task-1", completed("task-1")).unwrap();
		assert!(matches!(alive.recv().await.unwrap().kind, EventKind::Completed));
	}

	#[tokio::test]
	async fn tasks_are_independent_channels() {
		let broadcaster = Broadcaster::new();
		let mut a = broadcaster.subscribe("task-a");
		let _b = broadcaster.subscribe("task-b");

		broadcaster.broadcast("task-a", completed("task-a")).unwrap();

		let event = a.recv().await.unwrap();
		assert_eq!(event.task_id, "task-a");
	}
}
