//! Renewal endpoint configuration: where renewals are sent and how their payloads look.
//!
//! The endpoint is a fixed `POST` templated with the stored renewal credential, e.g.
//! `{"refresh": "<renewal>"}` sent to `auth/refresh/`, answered with `{"access": "<new>"}`.
//! Servers that rotate renewal credentials may also return a replacement under the rotation
//! field, which the coordinator stores alongside the new access credential.

/// Builder API for assembling renewal endpoints.
pub mod builder;

pub use builder::*;

// self
use crate::{
	_prelude::*,
	auth::CredentialSecret,
	error::RenewalError,
	http::{RequestDescriptor, Response},
};

/// Validated renewal endpoint description.
///
/// Deserializing applies the defaults for omitted fields and the same validation as
/// [`RenewalEndpointBuilder::build`], so hosts can load it straight from their configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RenewalEndpointBuilder", into = "RenewalEndpointBuilder")]
pub struct RenewalEndpoint {
	path: String,
	credential_field: String,
	access_field: String,
	rotation_field: Option<String>,
}
impl RenewalEndpoint {
	/// Path used when none is configured.
	pub const DEFAULT_PATH: &'static str = "auth/refresh/";

	/// Creates a new builder seeded with the defaults.
	pub fn builder() -> RenewalEndpointBuilder {
		RenewalEndpointBuilder::default()
	}

	/// Path of the renewal endpoint, relative to the transport's API base.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Request field carrying the renewal credential.
	pub fn credential_field(&self) -> &str {
		&self.credential_field
	}

	/// Response field carrying the new access credential.
	pub fn access_field(&self) -> &str {
		&self.access_field
	}

	/// Response field that may carry a rotated renewal credential.
	pub fn rotation_field(&self) -> Option<&str> {
		self.rotation_field.as_deref()
	}

	/// Returns `true` when `request` targets this endpoint.
	pub fn matches(&self, request: &RequestDescriptor) -> bool {
		request.path.trim_start_matches('/') == self.path.trim_start_matches('/')
	}

	/// Builds the renewal request for `renewal`. No access credential is attached.
	pub fn request(&self, renewal: &CredentialSecret) -> RequestDescriptor {
		let mut body = serde_json::Map::new();

		body.insert(
			self.credential_field.clone(),
			serde_json::Value::String(renewal.expose().to_owned()),
		);

		let (name, value) = RequestDescriptor::default_content_type();

		RequestDescriptor::post(self.path.clone())
			.with_header(name, value)
			.with_body(serde_json::Value::Object(body).to_string())
	}

	/// Extracts the renewed credentials from a successful renewal response.
	pub fn parse(&self, response: &Response) -> Result<RenewedCredentials, RenewalError> {
		let mut deserializer = serde_json::Deserializer::from_slice(&response.body);
		let payload: serde_json::Map<String, serde_json::Value> =
			serde_path_to_error::deserialize(&mut deserializer)
				.map_err(|source| RenewalError::MalformedResponse { source })?;
		let access = non_empty_string(&payload, &self.access_field)
			.ok_or_else(|| RenewalError::MissingAccess { field: self.access_field.clone() })?;
		let renewal = self
			.rotation_field
			.as_deref()
			.and_then(|field| non_empty_string(&payload, field));

		Ok(RenewedCredentials {
			access: CredentialSecret::new(access),
			renewal: renewal.map(CredentialSecret::new),
		})
	}
}
impl Default for RenewalEndpoint {
	fn default() -> Self {
		Self {
			path: Self::DEFAULT_PATH.into(),
			credential_field: RenewalEndpointBuilder::DEFAULT_FIELD.into(),
			access_field: RenewalEndpointBuilder::DEFAULT_ACCESS_FIELD.into(),
			rotation_field: Some(RenewalEndpointBuilder::DEFAULT_FIELD.into()),
		}
	}
}

/// Credentials minted by one successful renewal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenewedCredentials {
	/// New access credential.
	pub access: CredentialSecret,
	/// Rotated renewal credential, when the server issued one.
	pub renewal: Option<CredentialSecret>,
}

fn non_empty_string<'a>(
	payload: &'a serde_json::Map<String, serde_json::Value>,
	field: &str,
) -> Option<&'a str> {
	payload.get(field).and_then(serde_json::Value::as_str).filter(|value| !value.is_empty())
}
