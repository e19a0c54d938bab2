//! Coordinator-level error types shared by the transport, store, and renewal layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical error returned by [`RefreshCoordinator::execute`](crate::RefreshCoordinator::execute).
#[derive(Debug, ThisError)]
pub enum Error {
	/// The session can no longer be renewed; the host must re-authenticate.
	#[error("Session expired; re-authentication is required.")]
	SessionExpired,
	/// The renewal cycle ended without settling this request (runtime shutdown or task panic).
	#[error("Renewal cycle ended before the request was settled.")]
	CycleAborted,
	/// Non-authorization transport failure, passed through unchanged.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Credential store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Returns `true` when the caller must force re-authentication.
	pub fn is_session_expired(&self) -> bool {
		matches!(self, Self::SessionExpired)
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// API base URL cannot be parsed.
	#[error("API base URL `{base}` is invalid.")]
	InvalidBaseUrl {
		/// Raw base string supplied by the host.
		base: String,
		/// Underlying parsing failure.
		#[source]
		source: BoxError,
	},
	/// Renewal endpoint configuration failed validation.
	#[error(transparent)]
	RenewalEndpoint(#[from] crate::endpoint::RenewalEndpointError),
	/// Request body could not be serialized.
	#[error("Request body could not be serialized to JSON.")]
	BodySerialization(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures that are not authorization related.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
	/// The API answered with a non-success status other than 401.
	#[error("{}", status_message(.status, .body))]
	Status {
		/// HTTP status code.
		status: u16,
		/// Response body, possibly empty.
		body: String,
	},
	/// The descriptor could not be turned into a valid request (bad URL or header).
	#[error("Request could not be built: {message}.")]
	InvalidRequest {
		/// Human-readable reason.
		message: String,
	},
	/// Response body could not be decoded.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured decoding failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Returns the HTTP status when the API produced one.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			_ => None,
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_builder() { Self::InvalidRequest { message: e.to_string() } } else { Self::network(e) }
	}
}

/// Reasons a renewal attempt failed. Callers observe these as [`Error::SessionExpired`].
#[derive(Debug, ThisError)]
pub enum RenewalError {
	/// The renewal request itself failed in transport or returned a non-success status.
	#[error("Renewal request failed.")]
	Transport(#[from] TransportError),
	/// The renewal endpoint rejected the stored renewal credential.
	#[error("Renewal endpoint rejected the renewal credential.")]
	Rejected,
	/// The renewal response body is not a JSON object.
	#[error("Renewal endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The renewal response did not carry a usable access credential.
	#[error("Renewal response is missing the `{field}` access credential.")]
	MissingAccess {
		/// Response field that was expected to hold the credential.
		field: String,
	},
}

fn status_message(status: &u16, body: &str) -> String {
	if body.trim().is_empty() { format!("HTTP {status}") } else { body.to_owned() }
}
