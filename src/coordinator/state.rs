//! The coordinator's shared state machine: `Idle` / `Refreshing`, the pending queue, and the
//! renewal epoch. Every method runs inside the coordinator's mutex and never awaits.

// self
use crate::{
	_prelude::*,
	coordinator::queue::{CompletionReceiver, PendingQueue, PendingRequest},
	http::RequestDescriptor,
};

/// Observable renewal phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
	/// No renewal in flight.
	#[default]
	Idle,
	/// One renewal is in flight; callers that hit 401 join its queue.
	Refreshing,
}

/// Point-in-time view of the coordinator, for diagnostics and tests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorSnapshot {
	/// Current phase.
	pub state: RefreshState,
	/// Requests queued behind the in-flight renewal (excluding the caller that started it).
	pub pending: usize,
	/// Number of successful renewals since start-up.
	pub epoch: u64,
	/// Completion time of the latest successful renewal.
	pub last_renewed_at: Option<OffsetDateTime>,
}

/// How a caller that saw a 401 joins the protocol.
#[derive(Debug)]
pub(crate) enum Admission {
	/// The caller moved the state to `Refreshing` and must start the renewal cycle.
	Leader(CompletionReceiver),
	/// The caller joined the queue of the in-flight renewal.
	Queued(CompletionReceiver),
	/// A renewal completed after the caller's credential was attached; replay with the current
	/// credential instead of renewing again.
	Superseded(RequestDescriptor),
}

/// Callers gathered by one renewal cycle: the one that started it, then the queue.
#[derive(Debug)]
pub(crate) struct Cycle {
	leader: PendingRequest,
	queue: PendingQueue,
}
impl Cycle {
	/// Leader first, then queued requests in insertion order.
	pub(crate) fn into_requests(self) -> impl Iterator<Item = PendingRequest> {
		std::iter::once(self.leader).chain(self.queue)
	}
}

#[derive(Debug, Default)]
enum Phase {
	#[default]
	Idle,
	Refreshing(Cycle),
}

#[derive(Debug, Default)]
pub(crate) struct CoordinatorState {
	phase: Phase,
	epoch: u64,
	last_renewed_at: Option<OffsetDateTime>,
}
impl CoordinatorState {
	pub(crate) fn epoch(&self) -> u64 {
		self.epoch
	}

	/// Decides the fate of a caller whose request, sent during `observed_epoch`, was rejected.
	pub(crate) fn admit(&mut self, request: RequestDescriptor, observed_epoch: u64) -> Admission {
		if let Phase::Refreshing(cycle) = &mut self.phase {
			let (pending, receiver) = PendingRequest::new(request);

			cycle.queue.push(pending);

			return Admission::Queued(receiver);
		}
		if self.epoch != observed_epoch {
			return Admission::Superseded(request);
		}

		let (leader, receiver) = PendingRequest::new(request);

		self.phase = Phase::Refreshing(Cycle { leader, queue: PendingQueue::default() });

		Admission::Leader(receiver)
	}

	/// Ends the in-flight cycle: back to `Idle` with an empty queue, handing the gathered
	/// callers to the renewal task. `renewed_at` is set only when the renewal succeeded.
	pub(crate) fn settle(&mut self, renewed_at: Option<OffsetDateTime>) -> Option<Cycle> {
		if renewed_at.is_some() {
			self.epoch += 1;
			self.last_renewed_at = renewed_at;
		}

		match std::mem::take(&mut self.phase) {
			Phase::Refreshing(cycle) => Some(cycle),
			Phase::Idle => None,
		}
	}

	pub(crate) fn snapshot(&self) -> CoordinatorSnapshot {
		let (state, pending) = match &self.phase {
			Phase::Idle => (RefreshState::Idle, 0),
			Phase::Refreshing(cycle) => (RefreshState::Refreshing, cycle.queue.len()),
		};

		CoordinatorSnapshot {
			state,
			pending,
			epoch: self.epoch,
			last_renewed_at: self.last_renewed_at,
		}
	}
}
