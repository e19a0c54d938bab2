//! Forced re-authentication signal emitted when a renewal cycle fails.
//!
//! The coordinator never navigates or logs anyone out by itself. It calls
//! [`SessionHook::session_expired`] exactly once per failed renewal cycle and leaves the reaction
//! (redirecting to a login screen, tearing down caches) to the host application.

// crates.io
use tokio::sync::watch;
// self
use crate::_prelude::*;

/// Receives the forced re-authentication notification.
pub trait SessionHook
where
	Self: Send + Sync,
{
	/// Called once per failed renewal cycle, after both credentials were cleared.
	fn session_expired(&self);
}
impl<F> SessionHook for F
where
	F: Fn() + Send + Sync,
{
	fn session_expired(&self) {
		self()
	}
}

/// Hook that ignores the notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSessionHook;
impl SessionHook for NoopSessionHook {
	fn session_expired(&self) {}
}

/// Broadcast hook hosts can subscribe to from any task.
///
/// Each emission bumps a counter; watchers observe the latest value, so a watcher that subscribes
/// late still sees how many times the session expired.
#[derive(Clone, Debug)]
pub struct SessionSignal(Arc<watch::Sender<u64>>);
impl SessionSignal {
	/// Creates a signal with no emissions.
	pub fn new() -> Self {
		Self(Arc::new(watch::Sender::new(0)))
	}

	/// Returns a watcher that resolves on the next emission.
	pub fn subscribe(&self) -> SessionWatcher {
		SessionWatcher(self.0.subscribe())
	}

	/// Returns how many times the signal fired.
	pub fn emissions(&self) -> u64 {
		*self.0.borrow()
	}
}
impl Default for SessionSignal {
	fn default() -> Self {
		Self::new()
	}
}
impl SessionHook for SessionSignal {
	fn session_expired(&self) {
		self.0.send_modify(|count| *count += 1);
	}
}

/// Subscriber side of [`SessionSignal`].
#[derive(Debug)]
pub struct SessionWatcher(watch::Receiver<u64>);
impl SessionWatcher {
	/// Waits for the next emission; returns `false` once every signal handle is gone.
	pub async fn expired(&mut self) -> bool {
		self.0.changed().await.is_ok()
	}

	/// Returns the emission count seen by this watcher.
	pub fn emissions(&self) -> u64 {
		*self.0.borrow()
	}
}
