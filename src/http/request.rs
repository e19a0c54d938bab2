//! Owned, re-sendable request descriptors.

// self
use crate::{_prelude::*, auth::CredentialSecret, error::ConfigError};

const AUTHORIZATION: &str = "authorization";
const CONTENT_TYPE: &str = "content-type";
const JSON: &str = "application/json";

/// HTTP methods understood by the built-in transports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	#[default]
	/// `GET`.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `PATCH`.
	Patch,
	/// `DELETE`.
	Delete,
}
impl Method {
	/// Returns the canonical upper-case method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Complete description of one API call.
///
/// Header names are stored lower-cased. The body is owned, so a descriptor can be sent any
/// number of times; callers must not assume it is sent at most once.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the transport's API base (a leading `/` is allowed).
	pub path: String,
	/// Request headers keyed by lower-case name.
	pub headers: BTreeMap<String, String>,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl RequestDescriptor {
	/// Creates a descriptor without headers or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: BTreeMap::new(), body: None }
	}

	/// Shorthand for a `GET` descriptor.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` descriptor.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `PUT` descriptor.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Shorthand for a `PATCH` descriptor.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// Shorthand for a `DELETE` descriptor.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Sets or replaces a header.
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Sets a raw body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `value` as the JSON body and sets the JSON content type.
	pub fn with_json<T>(self, value: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let body = serde_json::to_vec(value).map_err(ConfigError::BodySerialization)?;

		Ok(self.with_header(CONTENT_TYPE, JSON).with_body(body))
	}

	/// Returns a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Attaches `credential` as the bearer `Authorization` header, replacing any previous one.
	pub fn with_bearer(self, credential: &CredentialSecret) -> Self {
		self.with_header(AUTHORIZATION, credential.bearer())
	}

	/// Removes any `Authorization` header.
	pub fn without_authorization(mut self) -> Self {
		self.headers.remove(AUTHORIZATION);

		self
	}

	/// Returns the attached bearer credential, if any.
	pub fn bearer_token(&self) -> Option<&str> {
		self.header(AUTHORIZATION).and_then(|value| value.strip_prefix("Bearer "))
	}

	/// Returns `true` when a body is present and no content type was chosen.
	pub(crate) fn needs_default_content_type(&self) -> bool {
		self.body.is_some() && !self.headers.contains_key(CONTENT_TYPE)
	}

	/// The content type applied to bodies that were sent without one.
	pub(crate) const fn default_content_type() -> (&'static str, &'static str) {
		(CONTENT_TYPE, JSON)
	}
}
impl Debug for RequestDescriptor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(name, value)| {
				let value = if name == AUTHORIZATION { "<redacted>" } else { value.as_str() };

				(name.as_str(), value)
			})
			.collect::<BTreeMap<_, _>>();

		f.debug_struct("RequestDescriptor")
			.field("method", &self.method)
			.field("path", &self.path)
			.field("headers", &headers)
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.finish()
	}
}
