#![cfg_attr(not(feature = "tracing"), allow(unused_variables))]

// self
use crate::{
	_prelude::*,
	RefreshCoordinator,
	auth::CredentialKind,
	coordinator::state::Admission,
	http::{RequestDescriptor, Response, SendError},
	obs::{self, CallKind, CallOutcome, CallSpan},
};

impl RefreshCoordinator {
	/// Sends `request` with the current access credential and returns the API response.
	///
	/// Non-authorization failures are returned unchanged. When the API rejects the credential,
	/// the call either starts the renewal cycle or waits for the one in flight, then resolves
	/// with the replayed response or [`Error::SessionExpired`]. The descriptor may be sent more
	/// than once, so it must describe a call that is safe to repeat.
	///
	/// Dropping the returned future (for example via `tokio::time::timeout`) abandons only this
	/// call; an in-flight renewal still completes for everyone else.
	pub async fn execute(&self, request: RequestDescriptor) -> Result<Response> {
		const KIND: CallKind = CallKind::Execute;

		let span = CallSpan::new(KIND, "execute").with_epoch(self.state.lock().epoch());

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span.instrument(self.send_or_renew(request)).await;

		obs::record_call_outcome(KIND, CallOutcome::of(&result));

		result
	}

	async fn send_or_renew(&self, mut request: RequestDescriptor) -> Result<Response> {
		let receiver = loop {
			let observed_epoch = self.state.lock().epoch();
			let outgoing = match self.store.get(CredentialKind::Access).await? {
				Some(access) => request.clone().with_bearer(&access),
				None => request.clone().without_authorization(),
			};

			match self.transport.send(outgoing).await {
				Ok(response) => return Ok(response),
				Err(SendError::Other(e)) => return Err(e.into()),
				Err(SendError::Unauthorized) => (),
			}

			if self.store.get(CredentialKind::Renewal).await?.is_none() {
				obs_event!(
					debug,
					path = %request.path,
					"Request was rejected and no renewal credential is stored."
				);

				return Err(Error::SessionExpired);
			}

			let admission = self.state.lock().admit(request, observed_epoch);

			match admission {
				Admission::Leader(receiver) => {
					self.spawn_cycle();

					break receiver;
				},
				Admission::Queued(receiver) => {
					self.metrics.record_queued();

					break receiver;
				},
				// Sent before the latest renewal: resend with the current credential and judge the
				// next rejection against the epoch observed for that send.
				Admission::Superseded(stale) => {
					self.metrics.record_superseded();
					obs_event!(
						debug,
						path = %stale.path,
						epoch = observed_epoch,
						"Rejected credential predates the latest renewal; resending."
					);

					request = stale;
				},
			}
		};

		receiver.await.unwrap_or_else(|_| Err(Error::CycleAborted))
	}
}
