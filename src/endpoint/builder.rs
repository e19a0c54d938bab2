// self
use crate::{_prelude::*, endpoint::RenewalEndpoint};

/// Errors raised while constructing or validating renewal endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum RenewalEndpointError {
	/// The endpoint path is empty.
	#[error("Renewal endpoint path must not be empty.")]
	EmptyPath,
	/// A payload field name is empty.
	#[error("The renewal {field} field name must not be empty.")]
	EmptyField {
		/// Which field failed validation.
		field: &'static str,
	},
}

/// Builder for [`RenewalEndpoint`] values; also the serde representation of the endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewalEndpointBuilder {
	/// Endpoint path relative to the API base.
	pub path: String,
	/// Request field carrying the renewal credential.
	pub credential_field: String,
	/// Response field carrying the new access credential.
	pub access_field: String,
	/// Response field that may carry a rotated renewal credential; `None` ignores rotation.
	pub rotation_field: Option<String>,
}
impl RenewalEndpointBuilder {
	pub(crate) const DEFAULT_ACCESS_FIELD: &'static str = "access";
	pub(crate) const DEFAULT_FIELD: &'static str = "refresh";

	/// Sets the endpoint path.
	pub fn path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();

		self
	}

	/// Sets the request field carrying the renewal credential.
	pub fn credential_field(mut self, field: impl Into<String>) -> Self {
		self.credential_field = field.into();

		self
	}

	/// Sets the response field carrying the new access credential.
	pub fn access_field(mut self, field: impl Into<String>) -> Self {
		self.access_field = field.into();

		self
	}

	/// Sets the response field carrying a rotated renewal credential.
	pub fn rotation_field(mut self, field: impl Into<String>) -> Self {
		self.rotation_field = Some(field.into());

		self
	}

	/// Ignores renewal credentials returned by the server.
	pub fn without_rotation(mut self) -> Self {
		self.rotation_field = None;

		self
	}

	/// Validates the configuration and produces a [`RenewalEndpoint`].
	pub fn build(self) -> Result<RenewalEndpoint, RenewalEndpointError> {
		let path = self.path.trim();

		if path.trim_start_matches('/').is_empty() {
			return Err(RenewalEndpointError::EmptyPath);
		}
		if self.credential_field.is_empty() {
			return Err(RenewalEndpointError::EmptyField { field: "credential" });
		}
		if self.access_field.is_empty() {
			return Err(RenewalEndpointError::EmptyField { field: "access" });
		}
		if self.rotation_field.as_deref().is_some_and(str::is_empty) {
			return Err(RenewalEndpointError::EmptyField { field: "rotation" });
		}

		Ok(RenewalEndpoint {
			path: path.to_owned(),
			credential_field: self.credential_field,
			access_field: self.access_field,
			rotation_field: self.rotation_field,
		})
	}
}
impl Default for RenewalEndpointBuilder {
	fn default() -> Self {
		Self {
			path: RenewalEndpoint::DEFAULT_PATH.into(),
			credential_field: Self::DEFAULT_FIELD.into(),
			access_field: Self::DEFAULT_ACCESS_FIELD.into(),
			rotation_field: Some(Self::DEFAULT_FIELD.into()),
		}
	}
}
impl TryFrom<RenewalEndpointBuilder> for RenewalEndpoint {
	type Error = RenewalEndpointError;

	fn try_from(builder: RenewalEndpointBuilder) -> Result<Self, Self::Error> {
		builder.build()
	}
}
impl From<RenewalEndpoint> for RenewalEndpointBuilder {
	fn from(endpoint: RenewalEndpoint) -> Self {
		Self {
			path: endpoint.path,
			credential_field: endpoint.credential_field,
			access_field: endpoint.access_field,
			rotation_field: endpoint.rotation_field,
		}
	}
}
