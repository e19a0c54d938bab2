//! Transport primitives the coordinator drives.
//!
//! The module exposes [`Transport`], the only network dependency of the coordinator, together
//! with the owned [`RequestDescriptor`] and [`Response`] values that flow through it. A transport
//! performs exactly one exchange per call and classifies failures into [`SendError::Unauthorized`]
//! (the API rejected the attached access credential) and [`SendError::Other`] (everything else).
//! Descriptors own their body bytes, so the coordinator can re-send them after a renewal.

pub mod request;
pub mod response;
pub mod scripted;

#[cfg(feature = "reqwest")] mod client;

#[cfg(feature = "reqwest")] pub use client::*;
pub use request::*;
pub use response::*;
pub use scripted::*;

// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Response, SendError>> + 'a + Send>>;

/// Performs one network exchange for a request descriptor.
///
/// Implementations must be `Send + Sync + 'static` so the coordinator can share them with the
/// background renewal task and with replays that outlive the caller that triggered them.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` once and classifies the outcome.
	fn send(&self, request: RequestDescriptor) -> TransportFuture<'_>;
}

/// Failure classes reported by a [`Transport`].
#[derive(Debug, ThisError)]
pub enum SendError {
	/// The API rejected the attached access credential (HTTP 401).
	#[error("The API rejected the access credential.")]
	Unauthorized,
	/// Any other failure; passed through to the caller untouched.
	#[error(transparent)]
	Other(#[from] TransportError),
}
impl SendError {
	/// Returns `true` for [`SendError::Unauthorized`].
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Self::Unauthorized)
	}
}

/// Applies the status classification shared by the built-in transports: 2xx succeeds, 401 is
/// [`SendError::Unauthorized`], every other status becomes [`TransportError::Status`].
pub fn classify(response: Response) -> Result<Response, SendError> {
	match response.status {
		200..=299 => Ok(response),
		401 => Err(SendError::Unauthorized),
		status => Err(TransportError::Status { status, body: response.text() }.into()),
	}
}
