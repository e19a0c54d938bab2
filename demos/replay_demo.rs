//! Walks through a renewal cycle against the in-memory API simulator.
//!
//! 1. Seed a [`MemoryStore`] with an expired access credential and a valid renewal credential.
//! 2. Fire several requests at once; every one is rejected, but only one renewal is sent.
//! 3. Reject a replay, then refuse the next renewal and watch the [`SessionSignal`] ask for re-authentication.

// std
use std::time::Duration;
// crates.io
use color_eyre::{Result, eyre::eyre};
// self
use refresh_coordinator::{
	RefreshCoordinator,
	auth::CredentialKind,
	endpoint::RenewalEndpoint,
	http::{RenewalScript, RequestDescriptor, ScriptedTransport},
	session::SessionSignal,
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let endpoint = RenewalEndpoint::builder().path("auth/refresh/").build()?;
	let store = MemoryStore::seeded(Some("expired"), Some("r1"));
	let transport = ScriptedTransport::new(endpoint.clone(), None)
		.with_renewal(RenewalScript::issue("fresh"))
		.expect_renewal_credential("r1");
	let signal = SessionSignal::new();
	let coordinator = RefreshCoordinator::new(store.clone(), transport.clone(), endpoint)
		.with_session_hook(signal.clone());
	let calls = ["cultivos/", "ofertas/", "cosechas/"].map(|path| {
		let coordinator = coordinator.clone();

		tokio::spawn(async move { coordinator.execute(RequestDescriptor::get(path)).await })
	});

	for call in calls {
		let response = call.await??;

		println!("{} -> {}", response.status, response.text());
	}

	println!(
		"renewals sent: {}, stored access: {:?}, snapshot: {:?}",
		transport.renewal_calls(),
		store.peek(CredentialKind::Access),
		coordinator.snapshot(),
	);

	// From here on the API rejects every credential, including renewed ones.
	transport.reject_everything(true);
	transport.set_renewal(RenewalScript::issue("fresh-2"));

	let err = coordinator
		.execute(RequestDescriptor::get("cultivos/"))
		.await
		.err()
		.ok_or_else(|| eyre!("a rejected replay should not succeed"))?;

	println!("replay rejected with a renewed credential: {err}");

	let mut watcher = signal.subscribe();

	transport.set_renewal(RenewalScript::Reject);

	let err = coordinator
		.execute(RequestDescriptor::get("cultivos/"))
		.await
		.err()
		.ok_or_else(|| eyre!("a refused renewal should expire the session"))?;

	println!("renewal refused: {err}");

	tokio::time::timeout(Duration::from_secs(1), watcher.expired()).await?;

	println!("session signal fired {} time(s)", signal.emissions());

	Ok(())
}
