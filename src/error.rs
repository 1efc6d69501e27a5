use thiserror::Error;

/// Errors reported by `PairingHeap` operations.
/// An operation that returns one of these has not modified the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapError {
	/// Peeked at a heap with no elements
	#[error("the heap is empty")]
	Empty,
	/// The handle's node was popped, the heap was cleared, or the handle came from another heap
	#[error("handle does not refer to a live element of this heap")]
	StaleHandle,
	/// `decrease_key` was given a value less extreme than the current one
	#[error("new value is less extreme than the current value")]
	InvalidPriorityUpdate
}

pub type Result<T> = std::result::Result<T, HeapError>;
