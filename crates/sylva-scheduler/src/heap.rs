//! Binary min-heap
//!
//! Both scheduler queues are instances of [`MinHeap`]. The heap only supports
//! removing its top element; interior removal is deliberately absent, which is
//! why task cancellation is lazy (see [`crate::Scheduler::cancel_callback`]).
//!
//! Ordering is defined by [`HeapNode::key`]. For tasks the key is
//! `(sort_index, id)`, so ties on the sort index fall back to insertion order.

/// An element that can be stored in a [`MinHeap`].
pub trait HeapNode {
	/// Total order used by the heap. Smaller keys are popped first.
	type Key: Ord;

	/// Returns the current ordering key of this node.
	fn key(&self) -> Self::Key;
}

/// Array-backed binary min-heap.
///
/// `push` and `pop` restore the heap property with `O(log n)` comparisons;
/// `peek` is `O(1)`.
///
/// # Example
///
/// ```rust
/// use sylva_scheduler::{HeapNode, MinHeap};
///
/// struct Job(u32, u64);
///
/// impl HeapNode for Job {
/// 	type Key = (u32, u64);
///
/// 	fn key(&self) -> Self::Key {
/// 		(self.0, self.1)
/// 	}
/// }
///
/// let mut heap = MinHeap::new();
/// heap.push(Job(30, 1));
/// heap.push(Job(10, 2));
/// heap.push(Job(10, 0));
///
/// assert_eq!(heap.pop().map(|job| job.1), Some(0));
/// assert_eq!(heap.pop().map(|job| job.1), Some(2));
/// assert_eq!(heap.pop().map(|job| job.1), Some(1));
/// assert!(heap.pop().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct MinHeap<T> {
	nodes: Vec<T>,
}

impl<T: HeapNode> MinHeap<T> {
	/// Creates an empty heap.
	pub fn new() -> Self {
		Self { nodes: Vec::new() }
	}

	/// Creates an empty heap with room for `capacity` nodes.
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			nodes: Vec::with_capacity(capacity),
		}
	}

	/// Number of nodes in the heap.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Returns `true` when the heap holds no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Returns the node with the smallest key without removing it.
	pub fn peek(&self) -> Option<&T> {
		self.nodes.first()
	}

	/// Inserts a node at the tail and sifts it up.
	pub fn push(&mut self, node: T) {
		let index = self.nodes.len();
		self.nodes.push(node);
		self.sift_up(index);
	}

	/// Removes and returns the node with the smallest key.
	///
	/// The last node takes the vacated root slot and is sifted down.
	pub fn pop(&mut self) -> Option<T> {
		let last = self.nodes.pop()?;
		if self.nodes.is_empty() {
			return Some(last);
		}
		let first = std::mem::replace(&mut self.nodes[0], last);
		self.sift_down(0);
		Some(first)
	}

	fn greater(&self, a: usize, b: usize) -> bool {
		self.nodes[a].key() > self.nodes[b].key()
	}

	fn sift_up(&mut self, mut index: usize) {
		while index > 0 {
			let parent_index = (index - 1) >> 1;
			if self.greater(parent_index, index) {
				self.nodes.swap(parent_index, index);
				index = parent_index;
			} else {
				return;
			}
		}
	}

	fn sift_down(&mut self, mut index: usize) {
		let len = self.nodes.len();
		let half_len = len >> 1;

		while index < half_len {
			let left_index = index * 2 + 1;
			let right_index = left_index + 1;

			if self.greater(index, left_index) {
				if right_index < len && self.greater(left_index, right_index) {
					self.nodes.swap(index, right_index);
					index = right_index;
				} else {
					self.nodes.swap(index, left_index);
					index = left_index;
				}
			} else if right_index < len && self.greater(index, right_index) {
				self.nodes.swap(index, right_index);
				index = right_index;
			} else {
				return;
			}
		}
	}
}

impl<T: HeapNode> Default for MinHeap<T> {
	fn default() -> Self {
		Self::new()
	}
}
