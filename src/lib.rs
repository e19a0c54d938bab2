//! Single-flight bearer credential renewal for REST clients: every outbound call passes through a
//! coordinator that attaches the current access credential, renews it exactly once when the API
//! rejects it, and replays the affected requests with the fresh credential.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

/// Emits a `tracing` event when the `tracing` feature is enabled; compiles to nothing otherwise.
macro_rules! obs_event {
	($level:ident, $($arg:tt)+) => {{
		#[cfg(feature = "tracing")]
		{
			::tracing::$level!($($arg)+);
		}
	}};
}

pub mod auth;
pub mod coordinator;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod obs;
pub mod session;
pub mod store;

pub use coordinator::RefreshCoordinator;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	#[cfg(feature = "reqwest")]
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
#[cfg(feature = "reqwest")] pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
