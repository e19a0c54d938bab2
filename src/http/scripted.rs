//! In-memory [`Transport`] that simulates an API guarded by bearer credentials, for local
//! development, demos, and tests.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use tokio::sync::Semaphore;
// self
use crate::{
	_prelude::*,
	endpoint::RenewalEndpoint,
	error::TransportError,
	http::{RequestDescriptor, Response, SendError, Transport, TransportFuture, classify},
};

/// How the simulated renewal endpoint answers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenewalScript {
	/// Issues a new access credential (and optionally rotates the renewal credential).
	Issue {
		/// Access credential to mint.
		access: String,
		/// Replacement renewal credential, if the server rotates it.
		renewal: Option<String>,
	},
	/// Rejects the renewal credential with a 401.
	Reject,
	/// Fails at the network level.
	Fail,
}
impl RenewalScript {
	/// Issues `access` without rotating the renewal credential.
	pub fn issue(access: impl Into<String>) -> Self {
		Self::Issue { access: access.into(), renewal: None }
	}
}

/// Simulated API: requests carrying the currently accepted access credential succeed with a JSON
/// echo (`{"method", "path", "token"}`), everything else is answered with 401. Renewal requests
/// follow the configured [`RenewalScript`]; a successful renewal switches the accepted credential.
#[derive(Clone)]
pub struct ScriptedTransport(Arc<ScriptedState>);
impl ScriptedTransport {
	/// Creates a transport for `endpoint` that currently accepts `access`.
	pub fn new(endpoint: RenewalEndpoint, access: Option<&str>) -> Self {
		Self(Arc::new(ScriptedState {
			endpoint,
			accepted_access: Mutex::new(access.map(str::to_owned)),
			accepted_renewal: Mutex::new(None),
			renewal: Mutex::new(RenewalScript::Reject),
			reject_everything: AtomicBool::new(false),
			failures: Mutex::new(BTreeMap::new()),
			calls: Mutex::new(Vec::new()),
			gate: Mutex::new(None),
		}))
	}

	/// Sets the renewal behavior.
	pub fn with_renewal(self, script: RenewalScript) -> Self {
		self.set_renewal(script);

		self
	}

	/// Only accepts renewal requests carrying `renewal`; others are rejected with a 401.
	pub fn expect_renewal_credential(self, renewal: impl Into<String>) -> Self {
		*self.0.accepted_renewal.lock() = Some(renewal.into());

		self
	}

	/// Replaces the renewal behavior.
	pub fn set_renewal(&self, script: RenewalScript) {
		*self.0.renewal.lock() = script;
	}

	/// Makes the API reject every credential, including freshly renewed ones.
	pub fn reject_everything(&self, reject: bool) {
		self.0.reject_everything.store(reject, Ordering::SeqCst);
	}

	/// Stops accepting the current access credential, as if it expired server-side.
	pub fn expire_access(&self) {
		*self.0.accepted_access.lock() = None;
	}

	/// Answers requests to `path` with `status` regardless of credentials.
	pub fn fail_path(&self, path: impl Into<String>, status: u16) {
		self.0.failures.lock().insert(path.into(), status);
	}

	/// Parks renewal requests until [`ScriptedTransport::release_renewals`] is called.
	pub fn hold_renewals(&self) {
		*self.0.gate.lock() = Some(Arc::new(Semaphore::new(0)));
	}

	/// Lets parked and future renewal requests proceed.
	pub fn release_renewals(&self) {
		if let Some(gate) = self.0.gate.lock().take() {
			gate.close();
		}
	}

	/// Returns every request received so far, in arrival order.
	pub fn calls(&self) -> Vec<RequestDescriptor> {
		self.0.calls.lock().clone()
	}

	/// Returns how many renewal requests were received.
	pub fn renewal_calls(&self) -> usize {
		self.0.calls.lock().iter().filter(|call| self.0.endpoint.matches(call)).count()
	}

	/// Returns the non-renewal requests received so far.
	pub fn api_calls(&self) -> Vec<RequestDescriptor> {
		self.0.calls.lock().iter().filter(|call| !self.0.endpoint.matches(call)).cloned().collect()
	}

	/// Returns the access credential the simulated API currently accepts.
	pub fn accepted_access(&self) -> Option<String> {
		self.0.accepted_access.lock().clone()
	}
}
impl Transport for ScriptedTransport {
	fn send(&self, request: RequestDescriptor) -> TransportFuture<'_> {
		let state = Arc::clone(&self.0);

		Box::pin(async move {
			state.calls.lock().push(request.clone());

			if state.endpoint.matches(&request) {
				state.renew(&request).await
			} else {
				state.serve(&request)
			}
		})
	}
}
impl Debug for ScriptedTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ScriptedTransport")
			.field("endpoint", &self.0.endpoint)
			.field("calls", &self.0.calls.lock().len())
			.finish()
	}
}

struct ScriptedState {
	endpoint: RenewalEndpoint,
	accepted_access: Mutex<Option<String>>,
	accepted_renewal: Mutex<Option<String>>,
	renewal: Mutex<RenewalScript>,
	reject_everything: AtomicBool,
	failures: Mutex<BTreeMap<String, u16>>,
	calls: Mutex<Vec<RequestDescriptor>>,
	gate: Mutex<Option<Arc<Semaphore>>>,
}
impl ScriptedState {
	fn serve(&self, request: &RequestDescriptor) -> Result<Response, SendError> {
		if let Some(status) = self.failures.lock().get(&request.path).copied() {
			return classify(Response::new(status));
		}

		let token = request.bearer_token();
		let accepted = !self.reject_everything.load(Ordering::SeqCst)
			&& token.is_some()
			&& token == self.accepted_access.lock().as_deref();

		if !accepted {
			return classify(unauthorized());
		}

		let body = serde_json::json!({
			"method": request.method.as_str(),
			"path": request.path,
			"token": token,
		});

		classify(json_response(200, &body))
	}

	async fn renew(&self, request: &RequestDescriptor) -> Result<Response, SendError> {
		let gate = self.gate.lock().clone();

		if let Some(gate) = gate {
			// Closing the semaphore is the release signal.
			let _ = gate.acquire().await;
		}

		let presented = request
			.body
			.as_deref()
			.and_then(|body| serde_json::from_slice::<serde_json::Value>(body).ok())
			.and_then(|body| {
				body.get(self.endpoint.credential_field())
					.and_then(serde_json::Value::as_str)
					.map(str::to_owned)
			});
		let expected = self.accepted_renewal.lock().clone();

		if presented.is_none() || expected.is_some_and(|expected| presented != Some(expected)) {
			return classify(unauthorized());
		}

		let script = self.renewal.lock().clone();

		match script {
			RenewalScript::Issue { access, renewal } => {
				let mut body = serde_json::Map::new();

				body.insert(self.endpoint.access_field().into(), access.clone().into());

				if let (Some(field), Some(value)) = (self.endpoint.rotation_field(), &renewal) {
					body.insert(field.into(), value.clone().into());
				}

				*self.accepted_access.lock() = Some(access);

				if renewal.is_some() {
					*self.accepted_renewal.lock() = renewal;
				}

				classify(json_response(200, &serde_json::Value::Object(body)))
			},
			RenewalScript::Reject => classify(unauthorized()),
			RenewalScript::Fail => Err(TransportError::Io(std::io::Error::new(
				std::io::ErrorKind::ConnectionReset,
				"connection reset by peer",
			))
			.into()),
		}
	}
}

fn unauthorized() -> Response {
	json_response(
		401,
		&serde_json::json!({ "detail": "Token is invalid or expired", "code": "token_not_valid" }),
	)
}

fn json_response(status: u16, body: &serde_json::Value) -> Response {
	Response::new(status)
		.with_header("content-type", "application/json")
		.with_body(body.to_string())
}
