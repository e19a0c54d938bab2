// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};
// crates.io
use tokio::{sync::Notify, time};
// self
use refresh_coordinator::{
	RefreshCoordinator,
	auth::{CredentialKind, CredentialSecret},
	coordinator::RefreshState,
	endpoint::RenewalEndpoint,
	error::{Error, TransportError},
	http::{
		RenewalScript, RequestDescriptor, Response, ScriptedTransport, Transport, TransportFuture,
	},
	session::SessionSignal,
	store::{CredentialStore, MemoryStore, StoreError, StoreFuture},
};

fn coordinator(
	store: &MemoryStore,
	transport: &ScriptedTransport,
	signal: &SessionSignal,
) -> RefreshCoordinator {
	RefreshCoordinator::new(store.clone(), transport.clone(), RenewalEndpoint::default())
		.with_session_hook(signal.clone())
}

fn stored(store: &MemoryStore, kind: CredentialKind) -> Option<String> {
	store.peek(kind).map(|secret| secret.expose().to_owned())
}

fn echoed_token(response: &Response) -> String {
	let body: serde_json::Value = response.json().expect("Echo body should be JSON.");

	body["token"].as_str().expect("Echo body should carry the token.").to_owned()
}

async fn wait_until(coordinator: &RefreshCoordinator, ready: impl Fn(&RefreshCoordinator) -> bool) {
	time::timeout(Duration::from_secs(5), async {
		while !ready(coordinator) {
			tokio::task::yield_now().await;
		}
	})
	.await
	.expect("Coordinator should reach the expected state in time.");
}

fn spawn_calls(
	coordinator: &RefreshCoordinator,
	count: usize,
) -> Vec<tokio::task::JoinHandle<Result<Response, Error>>> {
	(0..count)
		.map(|i| {
			let coordinator = coordinator.clone();

			tokio::spawn(async move {
				coordinator.execute(RequestDescriptor::get(format!("cultivos/{i}/"))).await
			})
		})
		.collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rejections_share_one_renewal() {
	let store = MemoryStore::seeded(Some("old"), Some("r1"));
	let transport = ScriptedTransport::new(RenewalEndpoint::default(), None)
		.with_renewal(RenewalScript::issue("new"))
		.expect_renewal_credential("r1");
	let signal = SessionSignal::new();
	let coordinator = coordinator(&store, &transport, &signal);

	transport.hold_renewals();

	let calls = spawn_calls(&coordinator, 3);

	wait_until(&coordinator, |c| c.snapshot().pending == 2).await;

	assert_eq!(coordinator.snapshot().state, RefreshState::Refreshing);

	transport.release_renewals();

	for call in calls {
		let response = call
			.await
			.expect("Call task should not panic.")
			.expect("Every call should succeed after the shared renewal.");

		assert_eq!(echoed_token(&response), "new");
	}

	assert_eq!(transport.renewal_calls(), 1);
	assert_eq!(stored(&store, CredentialKind::Access).as_deref(), Some("new"));
	assert_eq!(stored(&store, CredentialKind::Renewal).as_deref(), Some("r1"));
	assert_eq!(signal.emissions(), 0);

	let snapshot = coordinator.snapshot();

	assert_eq!(snapshot.state, RefreshState::Idle);
	assert_eq!(snapshot.pending, 0);
	assert_eq!(snapshot.epoch, 1);
	assert!(snapshot.last_renewed_at.is_some());

	let metrics = coordinator.metrics();

	assert_eq!(metrics.attempts(), 1);
	assert_eq!(metrics.successes(), 1);
	assert_eq!(metrics.queued(), 2);
	assert_eq!(metrics.replays(), 3);
}

#[tokio::test]
async fn replays_reuse_the_original_descriptor() {
	let store = MemoryStore::seeded(Some("old"), Some("r1"));
	let transport = ScriptedTransport::new(RenewalEndpoint::default(), None)
		.with_renewal(RenewalScript::issue("new"));
	let coordinator = coordinator(&store, &transport, &SessionSignal::new());
	let request = RequestDescriptor::post("ofertas/")
		.with_json(&serde_json::json!({ "producto": "maiz", "cantidad_kg": 120 }))
		.expect("Offer body should serialize.");

	coordinator.execute(request.clone()).await.expect("Replay should succeed.");

	let calls = transport.api_calls();

	assert_eq!(calls.len(), 2);
	assert_eq!(calls[0].bearer_token(), Some("old"));
	assert_eq!(calls[1].bearer_token(), Some("new"));
	assert_eq!(calls[1].body, request.body);
	assert_eq!(calls[1].header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn accepted_requests_skip_renewal() {
	let store = MemoryStore::seeded(Some("old"), Some("r1"));
	let transport = ScriptedTransport::new(RenewalEndpoint::default(), Some("old"));
	let coordinator = coordinator(&store, &transport, &SessionSignal::new());
	let response = coordinator
		.execute(RequestDescriptor::get("cultivos/"))
		.await
		.expect("Current credential should be accepted.");

	assert_eq!(echoed_token(&response), "old");
	assert_eq!(transport.renewal_calls(), 0);
	assert_eq!(coordinator.snapshot().epoch, 0);
}

#[tokio::test]
async fn missing_renewal_credential_fails_fast() {
	let store = MemoryStore::seeded(Some("old"), None);
	let transport = ScriptedTransport::new(RenewalEndpoint::default(), None)
		.with_renewal(RenewalScript::issue("new"));
	let signal = SessionSignal::new();
	let coordinator = coordinator(&store, &transport, &signal);
	let err = coordinator
		.execute(RequestDescriptor::get("cultivos/"))
		.await
		.expect_err("A rejected call without a renewal credential should fail.");

	assert!(err.is_session_expired());
	assert_eq!(transport.renewal_calls(), 0);
	assert_eq!(transport.api_calls().len(), 1);
	assert_eq!(signal.emissions(), 0);
	assert_eq!(coordinator.metrics().attempts(), 0);
	assert_eq!(coordinator.snapshot().state, RefreshState::Idle);
}

#[tokio::test]
async fn missing_access_credential_sends_without_authorization() {
	let store = MemoryStore::seeded(None, Some("r1"));
	let transport = ScriptedTransport::new(RenewalEndpoint::default(), None)
		.with_renewal(RenewalScript::issue("new"));
	let coordinator = coordinator(&store, &transport, &SessionSignal::new());
	let request = RequestDescriptor::get("cultivos/").with_header("Authorization", "Bearer stale");
	let response = coordinator.execute(request).await.expect("Renewal should recover the call.");

	assert_eq!(echoed_token(&response), "new");
	assert_eq!(transport.api_calls()[0].header("authorization"), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rejected_renewal_expires_the_session_once() {
	let store = MemoryStore::seeded(Some("old"), Some("r1"));
	let transport = ScriptedTransport::new(RenewalEndpoint::default(), None)
		.with_renewal(RenewalScript::Reject);
	let signal = SessionSignal::new();
	let mut watcher = signal.subscribe();
	let coordinator = coordinator(&store, &transport, &signal);

	transport.hold_renewals();

	let calls = spawn_calls(&coordinator, 2);

	wait_until(&coordinator, |c| c.snapshot().pending == 1).await;
	transport.release_renewals();

	for call in calls {
		let err = call
			.await
			.expect("Call task should not panic.")
			.expect_err("Every call should fail once renewal is rejected.");

		assert!(err.is_session_expired());
	}

	assert!(watcher.expired().await);
	assert_eq!(transport.renewal_calls(), 1);
	assert_eq!(stored(&store, CredentialKind::Access), None);
	assert_eq!(stored(&store, CredentialKind::Renewal), None);
	assert_eq!(signal.emissions(), 1);

	let snapshot = coordinator.snapshot();

	assert_eq!(snapshot.state, RefreshState::Idle);
	assert_eq!(snapshot.epoch, 0);
	assert_eq!(coordinator.metrics().failures(), 1);
}

#[tokio::test]
async fn network_failure_during_renewal_expires_the_session() {
	let store = MemoryStore::seeded(Some("old"), Some("r1"));
	let transport = ScriptedTransport::new(RenewalEndpoint::default(), None)
		.with_renewal(RenewalScript::Fail);
	let signal = SessionSignal::new();
	let coordinator = coordinator(&store, &transport, &signal);
	let err = coordinator
		.execute(RequestDescriptor::get("cultivos/"))
		.await
		.expect_err("A failed renewal should expire the session.");

	assert!(err.is_session_expired());
	assert_eq!(stored(&store, CredentialKind::Access), None);
	assert_eq!(stored(&store, CredentialKind::Renewal), None);
	assert_eq!(signal.emissions(), 1);

	// The next rejection fails fast instead of starting another cycle.
	let err = coordinator
		.execute(RequestDescriptor::get("cultivos/"))
		.await
		.expect_err("Without credentials the call should fail.");

	assert!(err.is_session_expired());
	assert_eq!(transport.renewal_calls(), 1);
	assert_eq!(signal.emissions(), 1);
}

#[tokio::test]
async fn other_failures_pass_through_untouched() {
	let store = MemoryStore::seeded(Some("old"), Some("r1"));
	let transport = ScriptedTransport::new(RenewalEndpoint::default(), Some("old"));
	let coordinator = coordinator(&store, &transport, &SessionSignal::new());

	transport.fail_path("cosechas/", 500);

	let err = coordinator
		.execute(RequestDescriptor::get("cosechas/"))
		.await
		.expect_err("Server errors should surface to the caller.");

	assert!(matches!(err, Error::Transport(TransportError::Status { status: 500, .. })));
	assert_eq!(err.to_string(), "HTTP 500");
	assert_eq!(transport.renewal_calls(), 0);
	assert_eq!(stored(&store, CredentialKind::Access).as_deref(), Some("old"));
}

#[tokio::test]
async fn rejected_replay_is_final() {
	let store = MemoryStore::seeded(Some("old"), Some("r1"));
	let transport = ScriptedTransport::new(RenewalEndpoint::default(), None)
		.with_renewal(RenewalScript::issue("new"));
	let signal = SessionSignal::new();
	let coordinator = coordinator(&store, &transport, &signal);

	transport.reject_everything(true);

	let err = coordinator
		.execute(RequestDescriptor::get("cultivos/"))
		.await
		.expect_err("A replay rejected again should fail.");

	assert!(err.is_session_expired());
	assert_eq!(transport.renewal_calls(), 1);
	assert_eq!(transport.api_calls().len(), 2);
	assert_eq!(stored(&store, CredentialKind::Access).as_deref(), Some("new"));
	assert_eq!(signal.emissions(), 0);
	assert_eq!(coordinator.metrics().replay_rejections(), 1);
}

#[tokio::test]
async fn rotated_renewal_credentials_are_stored() {
	let store = MemoryStore::seeded(Some("old"), Some("r1"));
	let transport = ScriptedTransport::new(RenewalEndpoint::default(), None)
		.with_renewal(RenewalScript::Issue { access: "new".into(), renewal: Some("r2".into()) })
		.expect_renewal_credential("r1");
	let coordinator = coordinator(&store, &transport, &SessionSignal::new());

	coordinator
		.execute(RequestDescriptor::get("cultivos/"))
		.await
		.expect("Renewal should succeed.");

	assert_eq!(stored(&store, CredentialKind::Access).as_deref(), Some("new"));
	assert_eq!(stored(&store, CredentialKind::Renewal).as_deref(), Some("r2"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn abandoned_callers_do_not_cancel_the_renewal() {
	let store = MemoryStore::seeded(Some("old"), Some("r1"));
	let transport = ScriptedTransport::new(RenewalEndpoint::default(), None)
		.with_renewal(RenewalScript::issue("new"));
	let coordinator = coordinator(&store, &transport, &SessionSignal::new());

	transport.hold_renewals();

	let leader =
		time::timeout(Duration::from_millis(50), coordinator.execute(RequestDescriptor::get("a/")))
			.await;

	assert!(leader.is_err());
	assert_eq!(coordinator.snapshot().state, RefreshState::Refreshing);

	let queued =
		time::timeout(Duration::from_millis(50), coordinator.execute(RequestDescriptor::get("b/")))
			.await;

	assert!(queued.is_err());

	let patient = spawn_calls(&coordinator, 1);

	wait_until(&coordinator, |c| c.snapshot().pending == 2).await;
	transport.release_renewals();

	for call in patient {
		let response = call
			.await
			.expect("Call task should not panic.")
			.expect("The remaining caller should be replayed.");

		assert_eq!(echoed_token(&response), "new");
	}

	wait_until(&coordinator, |c| c.snapshot().state == RefreshState::Idle).await;

	assert_eq!(transport.renewal_calls(), 1);
	// Three initial attempts, one replay for the caller that kept waiting.
	assert_eq!(transport.api_calls().len(), 4);
	assert_eq!(coordinator.metrics().abandoned(), 2);
	assert_eq!(stored(&store, CredentialKind::Access).as_deref(), Some("new"));
}

/// Parks the first request to one path until released, after signalling that it arrived.
struct DelayedTransport {
	inner: ScriptedTransport,
	path: &'static str,
	parked: AtomicBool,
	arrived: Arc<Notify>,
	release: Arc<Notify>,
}
impl DelayedTransport {
	fn new(inner: &ScriptedTransport, path: &'static str) -> (Self, Arc<Notify>, Arc<Notify>) {
		let arrived = Arc::new(Notify::new());
		let release = Arc::new(Notify::new());
		let transport = Self {
			inner: inner.clone(),
			path,
			parked: AtomicBool::new(false),
			arrived: arrived.clone(),
			release: release.clone(),
		};

		(transport, arrived, release)
	}
}
impl Transport for DelayedTransport {
	fn send(&self, request: RequestDescriptor) -> TransportFuture<'_> {
		Box::pin(async move {
			if request.path == self.path && !self.parked.swap(true, Ordering::SeqCst) {
				self.arrived.notify_one();
				self.release.notified().await;
			}

			self.inner.send(request).await
		})
	}
}

/// Starts a `slow/` call whose first send is parked, then renews through a `fast/` call.
async fn renew_behind_a_parked_call(
	store: &MemoryStore,
	inner: &ScriptedTransport,
) -> (RefreshCoordinator, tokio::task::JoinHandle<Result<Response, Error>>, Arc<Notify>) {
	let (transport, arrived, release) = DelayedTransport::new(inner, "slow/");
	let coordinator =
		RefreshCoordinator::new(store.clone(), transport, RenewalEndpoint::default());
	let slow = {
		let coordinator = coordinator.clone();

		tokio::spawn(async move { coordinator.execute(RequestDescriptor::get("slow/")).await })
	};

	arrived.notified().await;
	coordinator.execute(RequestDescriptor::get("fast/")).await.expect("Renewal should succeed.");

	assert_eq!(coordinator.snapshot().epoch, 1);

	(coordinator, slow, release)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn late_rejections_resend_without_another_renewal() {
	let store = MemoryStore::seeded(Some("old"), Some("r1"));
	let inner = ScriptedTransport::new(RenewalEndpoint::default(), None)
		.with_renewal(RenewalScript::issue("new"));
	let (coordinator, slow, release) = renew_behind_a_parked_call(&store, &inner).await;

	release.notify_one();

	let response = time::timeout(Duration::from_secs(5), slow)
		.await
		.expect("Late call should settle in time.")
		.expect("Call task should not panic.")
		.expect("Late rejection should be resent with the renewed credential.");

	assert_eq!(echoed_token(&response), "new");
	assert_eq!(inner.renewal_calls(), 1);
	assert_eq!(coordinator.metrics().superseded(), 1);
	assert_eq!(coordinator.snapshot().epoch, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn late_rejections_renew_again_when_the_latest_credential_expired() {
	let store = MemoryStore::seeded(Some("old"), Some("r1"));
	let inner = ScriptedTransport::new(RenewalEndpoint::default(), None)
		.with_renewal(RenewalScript::issue("new"));
	let (coordinator, slow, release) = renew_behind_a_parked_call(&store, &inner).await;

	inner.expire_access();
	inner.set_renewal(RenewalScript::issue("newer"));
	release.notify_one();

	let response = time::timeout(Duration::from_secs(5), slow)
		.await
		.expect("Late call should settle in time.")
		.expect("Call task should not panic.")
		.expect("A renewable session should recover the late call.");

	assert_eq!(echoed_token(&response), "newer");
	assert_eq!(inner.renewal_calls(), 2);
	assert_eq!(coordinator.metrics().superseded(), 1);
	assert_eq!(coordinator.metrics().attempts(), 2);
	assert_eq!(coordinator.snapshot().epoch, 2);
	assert_eq!(stored(&store, CredentialKind::Access).as_deref(), Some("newer"));
	assert_eq!(stored(&store, CredentialKind::Renewal).as_deref(), Some("r1"));
}

/// Memory store whose writes always fail.
#[derive(Clone, Default)]
struct ReadOnlyStore(MemoryStore);
impl CredentialStore for ReadOnlyStore {
	fn get(&self, kind: CredentialKind) -> StoreFuture<'_, Option<CredentialSecret>> {
		self.0.get(kind)
	}

	fn set(&self, _: CredentialKind, _: CredentialSecret) -> StoreFuture<'_, ()> {
		Box::pin(async { Err(StoreError::Backend { message: "read-only".into() }) })
	}

	fn clear(&self, kind: CredentialKind) -> StoreFuture<'_, ()> {
		self.0.clear(kind)
	}
}

#[tokio::test]
async fn store_failures_surface_without_expiring_the_session() {
	let store = ReadOnlyStore(MemoryStore::seeded(Some("old"), Some("r1")));
	let transport = ScriptedTransport::new(RenewalEndpoint::default(), None)
		.with_renewal(RenewalScript::issue("new"));
	let signal = SessionSignal::new();
	let coordinator =
		RefreshCoordinator::new(store.clone(), transport.clone(), RenewalEndpoint::default())
			.with_session_hook(signal.clone());
	let err = coordinator
		.execute(RequestDescriptor::get("cultivos/"))
		.await
		.expect_err("A failed write should surface to the caller.");

	assert!(matches!(err, Error::Storage(StoreError::Backend { .. })));
	assert_eq!(signal.emissions(), 0);
	assert_eq!(coordinator.snapshot().epoch, 0);
	assert_eq!(stored(&store.0, CredentialKind::Renewal).as_deref(), Some("r1"));
}
