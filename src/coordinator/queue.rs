//! FIFO holding area for requests waiting on an in-flight renewal.

// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, http::{RequestDescriptor, Response}};

/// Completion handle resolved once with the caller's final outcome.
pub(crate) type Completion = oneshot::Sender<Result<Response>>;
/// Caller side of a [`Completion`].
pub(crate) type CompletionReceiver = oneshot::Receiver<Result<Response>>;

/// A caller suspended until the in-flight renewal settles.
#[derive(Debug)]
pub(crate) struct PendingRequest {
	request: RequestDescriptor,
	completion: Completion,
}
impl PendingRequest {
	pub(crate) fn new(request: RequestDescriptor) -> (Self, CompletionReceiver) {
		let (completion, receiver) = oneshot::channel();

		(Self { request, completion }, receiver)
	}

	/// The caller stopped waiting (timeout or cancellation).
	pub(crate) fn is_abandoned(&self) -> bool {
		self.completion.is_closed()
	}

	/// Resolves the caller; returns `false` if nobody is listening anymore.
	pub(crate) fn settle(self, outcome: Result<Response>) -> bool {
		self.completion.send(outcome).is_ok()
	}

	pub(crate) fn into_parts(self) -> (RequestDescriptor, Completion) {
		(self.request, self.completion)
	}
}

/// Insertion-ordered queue owned by the coordinator state.
#[derive(Debug, Default)]
pub(crate) struct PendingQueue(VecDeque<PendingRequest>);
impl PendingQueue {
	pub(crate) fn push(&mut self, pending: PendingRequest) {
		self.0.push_back(pending);
	}

	pub(crate) fn len(&self) -> usize {
		self.0.len()
	}
}
impl IntoIterator for PendingQueue {
	type IntoIter = std::collections::vec_deque::IntoIter<PendingRequest>;
	type Item = PendingRequest;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}
