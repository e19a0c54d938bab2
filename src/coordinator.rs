//! Single-flight renewal of the access credential with transparent replay.
//!
//! Every outbound call goes through [`RefreshCoordinator::execute`], which attaches the stored
//! access credential and sends the request. When the API answers with `Unauthorized`, the first
//! caller to notice moves the coordinator from `Idle` to `Refreshing` and starts exactly one
//! renewal cycle in a background task; callers that fail while that cycle is in flight are queued
//! behind it. Once the cycle settles, queued requests are replayed in FIFO order with the new
//! credential or rejected with [`Error::SessionExpired`].
//!
//! Replays never re-enter the protocol: a replay that is rejected again reports
//! `SessionExpired`. A caller dropping its future (for example through a timeout) never cancels
//! the renewal other callers are waiting on.

mod execute;
mod metrics;
mod queue;
mod renewal;
mod state;

pub use metrics::RenewalMetrics;
pub use state::{CoordinatorSnapshot, RefreshState};

// self
use crate::{
	_prelude::*,
	coordinator::state::CoordinatorState,
	endpoint::RenewalEndpoint,
	http::Transport,
	session::{NoopSessionHook, SessionHook},
	store::CredentialStore,
};

/// Coordinates credential attachment, renewal, and replay for every outbound call.
///
/// Cloning is cheap and every clone shares the same state, so one coordinator can be handed to
/// any number of tasks.
#[derive(Clone)]
pub struct RefreshCoordinator {
	store: Arc<dyn CredentialStore>,
	transport: Arc<dyn Transport>,
	endpoint: RenewalEndpoint,
	session_hook: Arc<dyn SessionHook>,
	metrics: Arc<RenewalMetrics>,
	state: Arc<Mutex<CoordinatorState>>,
}
impl RefreshCoordinator {
	/// Creates a coordinator in the `Idle` state with an empty queue.
	pub fn new(
		store: impl 'static + CredentialStore,
		transport: impl 'static + Transport,
		endpoint: RenewalEndpoint,
	) -> Self {
		Self::from_shared(Arc::new(store), Arc::new(transport), endpoint)
	}

	/// Creates a coordinator from already shared collaborators.
	pub fn from_shared(
		store: Arc<dyn CredentialStore>,
		transport: Arc<dyn Transport>,
		endpoint: RenewalEndpoint,
	) -> Self {
		Self {
			store,
			transport,
			endpoint,
			session_hook: Arc::new(NoopSessionHook),
			metrics: Default::default(),
			state: Default::default(),
		}
	}

	/// Installs the hook notified when a renewal cycle fails and re-authentication is required.
	pub fn with_session_hook(mut self, hook: impl 'static + SessionHook) -> Self {
		self.session_hook = Arc::new(hook);

		self
	}

	/// Returns the renewal endpoint configuration.
	pub fn endpoint(&self) -> &RenewalEndpoint {
		&self.endpoint
	}

	/// Returns the shared renewal counters.
	pub fn metrics(&self) -> &RenewalMetrics {
		&self.metrics
	}

	/// Returns the current phase, queue length, and renewal epoch.
	pub fn snapshot(&self) -> CoordinatorSnapshot {
		self.state.lock().snapshot()
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("endpoint", &self.endpoint)
			.field("state", &self.snapshot())
			.finish_non_exhaustive()
	}
}
