//! The renewal cycle: one renewal request per cycle, followed by draining every waiting caller.

#![cfg_attr(not(feature = "tracing"), allow(unused_variables))]

// self
use crate::{
	_prelude::*,
	RefreshCoordinator,
	auth::{CredentialKind, CredentialSecret},
	coordinator::{queue::PendingRequest, state::Cycle},
	endpoint::RenewedCredentials,
	error::RenewalError,
	http::{RequestDescriptor, Response, SendError},
	obs::{self, CallKind, CallOutcome, CallSpan},
	store::StoreError,
};

#[derive(Debug)]
enum CycleOutcome {
	Renewed(CredentialSecret),
	Rejected(RenewalError),
	NoCredential,
	StoreFailed(StoreError),
}

impl RefreshCoordinator {
	/// Runs the renewal cycle detached from every caller, so no caller can cancel it.
	pub(crate) fn spawn_cycle(&self) {
		tokio::spawn(self.clone().run_cycle());
	}

	async fn run_cycle(self) {
		const KIND: CallKind = CallKind::Renewal;

		let span = CallSpan::new(KIND, "run_cycle").with_epoch(self.state.lock().epoch());

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let outcome = span.instrument(self.renew()).await;
		let renewed_at =
			matches!(outcome, CycleOutcome::Renewed(_)).then(OffsetDateTime::now_utc);
		// Back to `Idle` before anyone is settled, so a settled caller can start the next cycle.
		let cycle = self.state.lock().settle(renewed_at);
		let requests = cycle.into_iter().flat_map(Cycle::into_requests);

		obs::record_call_outcome(
			KIND,
			if renewed_at.is_some() { CallOutcome::Success } else { CallOutcome::Failure },
		);

		match outcome {
			CycleOutcome::Renewed(access) =>
				for pending in requests {
					if pending.is_abandoned() {
						self.metrics.record_abandoned();

						continue;
					}

					let (request, completion) = pending.into_parts();
					let coordinator = self.clone();
					let access = access.clone();

					tokio::spawn(async move {
						let result = coordinator.replay_with(request, &access).await;

						if completion.send(result).is_err() {
							coordinator.metrics.record_abandoned();
						}
					});
				},
			CycleOutcome::Rejected(e) => {
				obs_event!(warn, error = %e, "Renewal failed; re-authentication is required.");

				self.reject_all(requests, || Error::SessionExpired);
				self.session_hook.session_expired();
			},
			CycleOutcome::NoCredential => {
				obs_event!(debug, "Renewal credential disappeared before the cycle started.");

				self.reject_all(requests, || Error::SessionExpired);
			},
			CycleOutcome::StoreFailed(e) => {
				obs_event!(warn, error = %e, "Credential store failed during renewal.");

				self.reject_all(requests, || Error::Storage(e.clone()));
			},
		}
	}

	async fn renew(&self) -> CycleOutcome {
		let renewal = match self.store.get(CredentialKind::Renewal).await {
			Ok(Some(renewal)) => renewal,
			Ok(None) => return CycleOutcome::NoCredential,
			Err(e) => return CycleOutcome::StoreFailed(e),
		};

		self.metrics.record_attempt();

		let renewed = match self.request_renewal(&renewal).await {
			Ok(renewed) => renewed,
			Err(e) => {
				self.metrics.record_failure();
				self.clear_credentials().await;

				return CycleOutcome::Rejected(e);
			},
		};

		if let Err(e) = self.store_renewed(&renewed).await {
			self.metrics.record_failure();

			return CycleOutcome::StoreFailed(e);
		}

		self.metrics.record_success();

		CycleOutcome::Renewed(renewed.access)
	}

	async fn request_renewal(
		&self,
		renewal: &CredentialSecret,
	) -> Result<RenewedCredentials, RenewalError> {
		match self.transport.send(self.endpoint.request(renewal)).await {
			Ok(response) => self.endpoint.parse(&response),
			Err(SendError::Unauthorized) => Err(RenewalError::Rejected),
			Err(SendError::Other(e)) => Err(e.into()),
		}
	}

	async fn store_renewed(&self, renewed: &RenewedCredentials) -> Result<(), StoreError> {
		self.store.set(CredentialKind::Access, renewed.access.clone()).await?;

		if let Some(rotated) = &renewed.renewal {
			self.store.set(CredentialKind::Renewal, rotated.clone()).await?;
		}

		Ok(())
	}

	async fn clear_credentials(&self) {
		for kind in CredentialKind::ALL {
			if let Err(e) = self.store.clear(kind).await {
				obs_event!(
					warn,
					credential = kind.as_str(),
					error = %e,
					"Credential could not be cleared."
				);
			}
		}
	}

	fn reject_all(
		&self,
		requests: impl Iterator<Item = PendingRequest>,
		error: impl Fn() -> Error,
	) {
		for pending in requests {
			if !pending.settle(Err(error())) {
				self.metrics.record_abandoned();
			}
		}
	}

	/// Re-sends `request` with `access`. A second rejection is final.
	async fn replay_with(
		&self,
		request: RequestDescriptor,
		access: &CredentialSecret,
	) -> Result<Response> {
		const KIND: CallKind = CallKind::Replay;

		let span = CallSpan::new(KIND, "replay_with").with_epoch(self.state.lock().epoch());

		obs::record_call_outcome(KIND, CallOutcome::Attempt);
		self.metrics.record_replay();

		let result = span
			.instrument(async {
				match self.transport.send(request.with_bearer(access)).await {
					Ok(response) => Ok(response),
					Err(SendError::Unauthorized) => {
						self.metrics.record_replay_rejection();
						obs_event!(warn, "Replay was rejected with a freshly renewed credential.");

						Err(Error::SessionExpired)
					},
					Err(SendError::Other(e)) => Err(e.into()),
				}
			})
			.await;

		obs::record_call_outcome(KIND, CallOutcome::of(&result));

		result
	}
}
