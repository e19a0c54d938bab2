// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	http::{Method, RequestDescriptor, Response, SendError, Transport, TransportFuture, classify},
};

/// Reqwest-backed [`Transport`] that resolves descriptor paths against an API base URL.
///
/// The base always ends with a single `/`, and descriptor paths are joined relative to it (a
/// leading `/` on the path is ignored), so `cultivos/` and `/cultivos/` hit the same resource.
/// Absolute URLs in a descriptor path are sent as-is. Bodies sent without a content type are
/// labeled `application/json`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	base: Url,
}
impl ReqwestTransport {
	/// Builds a transport rooted at `base` with a default reqwest client.
	pub fn new(base: &str) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().build()?;

		Self::with_client(client, base)
	}

	/// Builds a transport rooted at `<origin>/api/`, the layout served by the backend.
	pub fn api(origin: &str) -> Result<Self, ConfigError> {
		let trimmed = origin.trim_end_matches('/');
		let base =
			if trimmed.ends_with("/api") { trimmed.to_owned() } else { format!("{trimmed}/api") };

		Self::new(&base)
	}

	/// Wraps an existing reqwest client.
	pub fn with_client(client: ReqwestClient, base: &str) -> Result<Self, ConfigError> {
		Ok(Self { client, base: normalize_base(base)? })
	}

	/// Returns the normalized API base URL.
	pub fn base_url(&self) -> &Url {
		&self.base
	}

	/// Resolves a descriptor path against the API base.
	pub fn resolve(&self, path: &str) -> Result<Url, TransportError> {
		let relative = path.trim_start_matches('/');

		self.base.join(relative).map_err(|e| TransportError::InvalidRequest {
			message: format!("`{path}` cannot be resolved against {}: {e}", self.base),
		})
	}

	async fn send_now(&self, request: RequestDescriptor) -> Result<Response, SendError> {
		let url = self.resolve(&request.path)?;
		let needs_content_type = request.needs_default_content_type();
		let mut builder = self.client.request(reqwest_method(request.method), url);

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}
		if needs_content_type {
			let (name, value) = RequestDescriptor::default_content_type();

			builder = builder.header(name, value);
		}
		if let Some(body) = request.body {
			builder = builder.body(body);
		}

		let response = builder.send().await.map_err(TransportError::from)?;
		let status = response.status().as_u16();
		let headers = response
			.headers()
			.iter()
			.filter_map(|(name, value)| {
				value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
			})
			.collect();
		let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

		classify(Response { status, headers, body })
	}
}
impl Transport for ReqwestTransport {
	fn send(&self, request: RequestDescriptor) -> TransportFuture<'_> {
		Box::pin(self.send_now(request))
	}
}

fn normalize_base(raw: &str) -> Result<Url, ConfigError> {
	let base = format!("{}/", raw.trim().trim_end_matches('/'));

	Url::parse(&base).map_err(|source| ConfigError::InvalidBaseUrl {
		base: raw.to_owned(),
		source: Box::new(source),
	})
}

fn reqwest_method(method: Method) -> reqwest::Method {
	match method {
		Method::Get => reqwest::Method::GET,
		Method::Post => reqwest::Method::POST,
		Method::Put => reqwest::Method::PUT,
		Method::Patch => reqwest::Method::PATCH,
		Method::Delete => reqwest::Method::DELETE,
	}
}
