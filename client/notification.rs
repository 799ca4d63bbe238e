use heart_deps::tokio;
use std::{
	sync::{Arc, Mutex},
	time::{Duration, Instant},
};

/// How long a notification stays visible.
pub const NOTIFICATION_DURATION: Duration = Duration::from_secs(4);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
	Success,
	Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
	pub message: String,
	pub kind: NotificationKind,
}

/// A buffer holding at most one notification. Showing a notification replaces the current one and restarts its timer.
#[derive(Debug)]
pub struct NotificationSlot {
	duration: Duration,
	generation: u64,
	current: Option<(Notification, Instant)>,
}

impl Default for NotificationSlot {
	fn default() -> NotificationSlot {
		NotificationSlot::new(NOTIFICATION_DURATION)
	}
}

impl NotificationSlot {
	pub fn new(duration: Duration) -> NotificationSlot {
		NotificationSlot {
			duration,
			generation: 0,
			current: None,
		}
	}

	/// Returns the generation of the new notification, used to dismiss exactly this notification later.
	pub fn show(&mut self, notification: Notification, now: Instant) -> u64 {
		self.generation += 1;
		self.current = Some((notification, now + self.duration));
		self.generation
	}

	/// The visible notification, if any. A notification is hidden once its deadline has passed even if nothing dismissed it yet.
	pub fn current(&self, now: Instant) -> Option<&Notification> {
		match &self.current {
			Some((notification, deadline)) if now < *deadline => Some(notification),
			_ => None,
		}
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.current.as_ref().map(|(_, deadline)| *deadline)
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn dismiss(&mut self) {
		self.current = None;
	}

	/// Dismiss the notification only if it is still the one shown at `generation`.
	pub fn dismiss_generation(&mut self, generation: u64) -> bool {
		if self.generation == generation && self.current.is_some() {
			self.current = None;
			true
		} else {
			false
		}
	}
}

/// A notification slot shared between the controller and whatever displays it.
#[derive(Clone, Debug, Default)]
pub struct Notifier {
	slot: Arc<Mutex<NotificationSlot>>,
}

impl Notifier {
	pub fn new(duration: Duration) -> Notifier {
		Notifier {
			slot: Arc::new(Mutex::new(NotificationSlot::new(duration))),
		}
	}

	pub fn show(&self, message: impl Into<String>, kind: NotificationKind) -> u64 {
		let notification = Notification {
			message: message.into(),
			kind,
		};
		self.slot.lock().unwrap().show(notification, Instant::now())
	}

	pub fn current(&self) -> Option<Notification> {
		self.slot.lock().unwrap().current(Instant::now()).cloned()
	}

	pub fn dismiss(&self) {
		self.slot.lock().unwrap().dismiss();
	}

	/// Wait out the timer of the notification shown at `generation` and dismiss it. Returns false without dismissing anything if that notification was replaced or dismissed in the meantime.
	pub async fn expire(&self, generation: u64) -> bool {
		let deadline = {
			let slot = self.slot.lock().unwrap();
			match slot.deadline() {
				Some(deadline) if slot.generation() == generation => deadline,
				_ => return false,
			}
		};
		tokio::time::delay_for(deadline.saturating_duration_since(Instant::now())).await;
		self.slot.lock().unwrap().dismiss_generation(generation)
	}

	/// Wait until the current notification's timer runs out and dismiss it. If the notification is replaced while waiting, keep waiting for the replacement.
	pub async fn wait_dismissed(&self) {
		loop {
			let (generation, deadline) = {
				let slot = self.slot.lock().unwrap();
				match slot.deadline() {
					Some(deadline) => (slot.generation(), deadline),
					None => return,
				}
			};
			let remaining = deadline.saturating_duration_since(Instant::now());
			tokio::time::delay_for(remaining).await;
			if self.slot.lock().unwrap().dismiss_generation(generation) {
				return;
			}
		}
	}
}

#[cfg(test)]
fn notification(message: &str, kind: NotificationKind) -> Notification {
	Notification {
		message: message.to_owned(),
		kind,
	}
}

#[test]
fn test_notification_expires_after_duration() {
	let mut slot = NotificationSlot::default();
	let now = Instant::now();
	slot.show(
		notification("Prediction completed successfully", NotificationKind::Success),
		now,
	);
	assert_eq!(
		slot.current(now + Duration::from_millis(3999)).map(|n| n.kind),
		Some(NotificationKind::Success)
	);
	assert!(slot.current(now + Duration::from_secs(4)).is_none());
}

#[test]
fn test_show_replaces_and_restarts_timer() {
	let mut slot = NotificationSlot::default();
	let now = Instant::now();
	let first = slot.show(notification("first", NotificationKind::Error), now);
	let later = now + Duration::from_secs(3);
	let second = slot.show(notification("second", NotificationKind::Success), later);
	assert_ne!(first, second);
	let visible = slot.current(now + Duration::from_secs(5)).unwrap();
	assert_eq!(visible.message, "second");
	assert!(slot.current(later + Duration::from_secs(4)).is_none());
	assert!(!slot.dismiss_generation(first));
	assert!(slot.current(later).is_some());
	assert!(slot.dismiss_generation(second));
	assert!(slot.current(later).is_none());
}

#[tokio::test]
async fn test_wait_dismissed() {
	let notifier = Notifier::new(Duration::from_millis(20));
	notifier.show("first", NotificationKind::Error);
	let replacer = notifier.clone();
	let replace = async move {
		tokio::time::delay_for(Duration::from_millis(10)).await;
		replacer.show("second", NotificationKind::Success);
	};
	tokio::join!(notifier.wait_dismissed(), replace);
	assert!(notifier.current().is_none());
}

#[tokio::test]
async fn test_expire() {
	let notifier = Notifier::new(Duration::from_millis(20));
	let first = notifier.show("first", NotificationKind::Error);
	let second = notifier.show("second", NotificationKind::Success);
	assert!(!notifier.expire(first).await);
	assert!(notifier.current().is_some());
	assert!(notifier.expire(second).await);
	assert!(notifier.current().is_none());
	assert!(!notifier.expire(second).await);
}
