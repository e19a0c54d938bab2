//! Optional observability helpers for coordinator calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `refresh_coordinator.call` with the `call`
//!   (execute/renewal/replay), `stage` (call site), and `epoch` (successful renewals seen when
//!   the call started) fields, plus warn/debug events for renewal failures and replays that were
//!   rejected again.
//! - Enable `metrics` to increment the `refresh_coordinator_call_total` counter for every
//!   attempt/success/failure, labeled by `call` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Call kinds observed by the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// A caller-initiated request passing through the coordinator.
	Execute,
	/// A renewal cycle running on behalf of every waiting caller.
	Renewal,
	/// A request re-sent with a freshly renewed credential.
	Replay,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::Execute => "execute",
			CallKind::Renewal => "renewal",
			CallKind::Replay => "replay",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a coordinator operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}

	/// Maps a result onto its success/failure label.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { CallOutcome::Success } else { CallOutcome::Failure }
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
