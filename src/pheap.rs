use std::{cmp::Ordering, collections::VecDeque, fmt, mem, sync::atomic::{self, AtomicU64}};

use crate::{Comparator, HeapError, MaxFirst};

static NEXT_HEAP_ID: AtomicU64 = AtomicU64::new(0);

fn next_heap_id() -> u64 {
	NEXT_HEAP_ID.fetch_add(1, atomic::Ordering::Relaxed)
}

/// Refers to one element of one `PairingHeap`.
/// Returned by `PairingHeap::push` and accepted by `get`, `get_mut` and `decrease_key`.
/// A handle stays valid until its element is popped or its heap is cleared or dropped;
/// `update_priorities` and `append` (on the receiving heap) keep it valid.
/// Clones of a heap do not accept the original's handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
	heap: u64,
	idx: usize,
	generation: u32
}

/// One arena slot.  `value` is None while the slot sits on the free list.
/// `child` and `next` form the first-child / next-sibling chain, `parent` points at the direct parent
/// (never at a sibling) and is only followed upwards.
#[derive(Clone, Debug)]
struct Node<T> {
	value: Option<T>,
	child: Option<usize>,
	next: Option<usize>,
	parent: Option<usize>,
	generation: u32
}

#[cfg(test)]
#[derive(Debug, PartialEq, Eq)]
enum CheckError {
	MoreExtremeThanParent(usize),
	BrokenParentLink(usize),
	RootHasParent,
	WrongCount
}

/// Trees bigger than this are not walked by the per-operation self check in unit tests
#[cfg(all(test, not(feature = "stress_tests")))]
const FULL_CHECK_MAX: usize = 1 << 10;

/// A pairing heap: a heap ordered multiway tree where each node keeps its children as a singly linked list.
/// - Push / meld: O(1)
/// - Peek: O(1)
/// - Pop: amortized O(log(n))
/// - Decrease key: cut and meld; the cut scans the element's siblings, so O(number of siblings)
/// - Rebuild after arbitrary mutation, clone: O(n)
/// The most extreme element according to the heap's `Comparator` is on top; the default `MaxFirst`
/// gives a max heap.
pub struct PairingHeap<T, C = MaxFirst> {
	nodes: Vec<Node<T>>,
	free: Vec<usize>,
	root: Option<usize>,
	count: usize,
	id: u64,
	cmp: C
}

impl<T: Ord> PairingHeap<T> {
	/// Create an empty max heap
	pub fn new() -> Self {
		Self::with_comparator(MaxFirst)
	}
}

impl<T, C> PairingHeap<T, C> {
	/// Get the number of elements in the heap
	pub fn len(&self) -> usize {
		self.count
	}

	pub fn is_empty(&self) -> bool {
		self.count == 0
	}

	/// The comparator this heap was built with
	pub fn comparator(&self) -> &C {
		&self.cmp
	}

	/// Get the most extreme element without removing it
	pub fn peek(&self) -> Option<&T> {
		self.root.map(|root|self.value(root))
	}

	/// Like `peek`, but reports an empty heap as `HeapError::Empty`
	pub fn top(&self) -> Result<&T, HeapError> {
		self.peek().ok_or(HeapError::Empty)
	}

	/// Read the element a handle refers to
	pub fn get(&self, handle: Handle) -> Result<&T, HeapError> {
		self.resolve(handle).map(|idx|self.value(idx))
	}

	/// Get mutable access to the element a handle refers to.
	/// Any change is allowed, but if it makes the element less extreme (or more extreme than its parent
	/// without going through `decrease_key`) the heap order is broken until `update_priorities` is called.
	pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T, HeapError> {
		let idx = self.resolve(handle)?;
		Ok(self.value_mut(idx))
	}

	/// Borrowing iterator over all elements.
	/// The order of the result is arbitrary, but every element will be visited exactly once.
	pub fn iter(&self) -> Iter<'_, T> {
		Iter{nodes: self.nodes.iter()}
	}

	/// Mutable borrowing iterator over all elements, in arbitrary order.
	/// As with `get_mut`, call `update_priorities` afterwards if any priority may have changed.
	pub fn values_mut(&mut self) -> impl Iterator<Item=&mut T> + '_ {
		self.nodes.iter_mut().filter_map(|node|node.value.as_mut())
	}

	/// Remove every element.  All outstanding handles become stale.
	pub fn clear(&mut self) {
		if self.count != 0 {
			tracing::trace!(len = self.count, "clearing pairing heap");
		}
		self.root = None;
		self.count = 0;
		self.reset_arena();
	}

	/// Drop every slot and take a fresh heap id so no old handle can match a reused slot.
	/// The node vector owns every value directly, so this never walks the tree.
	fn reset_arena(&mut self) {
		self.nodes.clear();
		self.free.clear();
		self.id = next_heap_id();
	}

	fn value(&self, idx: usize) -> &T {
		match &self.nodes[idx].value {
			Some(value) => value,
			None => unreachable!("pairing heap link to vacant slot {}", idx)
		}
	}

	fn value_mut(&mut self, idx: usize) -> &mut T {
		match &mut self.nodes[idx].value {
			Some(value) => value,
			None => unreachable!("pairing heap link to vacant slot {}", idx)
		}
	}

	fn resolve(&self, handle: Handle) -> Result<usize, HeapError> {
		match self.nodes.get(handle.idx) {
			Some(node) if handle.heap == self.id
				&& node.generation == handle.generation
				&& node.value.is_some() => Ok(handle.idx),
			_ => Err(HeapError::StaleHandle)
		}
	}

	fn handle(&self, idx: usize) -> Handle {
		Handle{heap: self.id, idx, generation: self.nodes[idx].generation}
	}

	fn alloc(&mut self, value: T) -> usize {
		match self.free.pop() {
			Some(idx) => {
				self.nodes[idx].value = Some(value);
				idx
			},
			None => {
				self.nodes.push(Node{value: Some(value), child: None, next: None, parent: None, generation: 0});
				self.nodes.len() - 1
			}
		}
	}

	/// Take the value out of a slot and put the slot on the free list.
	/// Bumping the generation is what makes old handles to this slot stale.
	fn release(&mut self, idx: usize) -> Option<T> {
		let node = &mut self.nodes[idx];
		node.child = None;
		node.next = None;
		node.parent = None;
		node.generation = node.generation.wrapping_add(1);
		self.free.push(idx);
		node.value.take()
	}

	/// Unlink `idx` from the child list of `parent`.  The subtree under `idx` comes along.
	fn cut(&mut self, idx: usize, parent: usize) {
		let next = self.nodes[idx].next.take();
		self.nodes[idx].parent = None;
		if self.nodes[parent].child == Some(idx) {
			self.nodes[parent].child = next;
			return
		}
		let mut sibling = self.nodes[parent].child;
		while let Some(s) = sibling {
			if self.nodes[s].next == Some(idx) {
				self.nodes[s].next = next;
				return
			}
			sibling = self.nodes[s].next;
		}
	}

	/// Push every node reachable from `root` onto a list, iteratively, detaching all links.
	fn flatten(&mut self, root: Option<usize>) -> VecDeque<usize> {
		let mut singles = VecDeque::new();
		let mut todo: Vec<usize> = root.into_iter().collect();
		while let Some(idx) = todo.pop() {
			let node = &mut self.nodes[idx];
			todo.extend(node.next.take());
			todo.extend(node.child.take());
			node.parent = None;
			singles.push_back(idx);
		}
		singles
	}
}

impl<T, C: Comparator<T>> PairingHeap<T, C> {
	/// Create an empty heap ordered by `cmp`
	pub fn with_comparator(cmp: C) -> Self {
		Self{nodes: Vec::new(), free: Vec::new(), root: None, count: 0, id: next_heap_id(), cmp}
	}

	/// Create a heap out of the elements of an iterator, ordered by `cmp`
	pub fn from_iter_with<I: IntoIterator<Item=T>>(iter: I, cmp: C) -> Self {
		let mut res = Self::with_comparator(cmp);
		res.extend(iter);
		res
	}

	/// Insert an element into the heap, returning a handle to it
	pub fn push(&mut self, value: T) -> Handle {
		let idx = self.alloc(value);
		self.root = Some(match self.root {
			None => idx,
			Some(root) => self.meld(root, idx)
		});
		self.count += 1;
		self.debug_check();
		self.handle(idx)
	}

	/// Remove the most extreme element and return it, or None if the heap is empty
	pub fn pop(&mut self) -> Option<T> {
		let root = self.root?;
		let first_child = self.nodes[root].child;
		let res = self.release(root);
		self.root = first_child.and_then(|first|self.combine_siblings(first));
		self.count -= 1;
		if self.count == 0 {
			self.reset_arena();
		}
		self.debug_check();
		res
	}

	/// Replace the element a handle refers to with a value that is at least as extreme.
	/// If the new value outranks the element's parent, the element's whole subtree is cut out and
	/// melded with the root, so the handle keeps referring to the same element afterwards.
	/// Fails without changing anything if the handle is stale or the new value is less extreme.
	pub fn decrease_key(&mut self, handle: Handle, value: T) -> Result<(), HeapError> {
		let idx = self.resolve(handle)?;
		if self.cmp.cmp(&value, self.value(idx)) == Ordering::Less {
			return Err(HeapError::InvalidPriorityUpdate)
		}
		*self.value_mut(idx) = value;
		if let Some(parent) = self.nodes[idx].parent {
			if self.cmp.cmp(self.value(parent), self.value(idx)) == Ordering::Less {
				self.cut(idx, parent);
				self.root = self.root.map(|root|self.meld(root, idx));
			}
		}
		self.debug_check();
		Ok(())
	}

	/// Restore the heap order after elements were changed through `get_mut` or `values_mut`.
	/// Every node is detached and the singletons are melded back together pairwise, in O(n).
	/// Nodes keep their identity, so existing handles still refer to the same elements.
	pub fn update_priorities(&mut self) {
		if self.count == 0 {
			return
		}
		tracing::trace!(len = self.count, "rebuilding pairing heap order");
		let root = self.root.take();
		let singles = self.flatten(root);
		self.root = self.meld_pairwise(singles);
		self.debug_check();
	}

	/// Move every element of `other` into this heap in O(other.len()), leaving `other` empty.
	/// `other`'s nodes are re-melded under this heap's comparator, since two comparators of the
	/// same type may still order differently.
	/// Handles from `self` stay valid; handles from `other` become stale.
	pub fn append(&mut self, other: &mut Self) {
		if other.count == 0 {
			return
		}
		tracing::trace!(len = self.count, other_len = other.count, "appending pairing heap");
		let offset = self.nodes.len();
		let shift = |link: Option<usize>|link.map(|i|i + offset);
		for (i, mut node) in mem::take(&mut other.nodes).into_iter().enumerate() {
			if node.value.is_none() {
				self.free.push(offset + i);
			}
			node.child = shift(node.child);
			node.next = shift(node.next);
			node.parent = shift(node.parent);
			self.nodes.push(node);
		}
		let singles = self.flatten(shift(other.root));
		self.root = match (self.root, self.meld_pairwise(singles)) {
			(Some(a), Some(b)) => Some(self.meld(a, b)),
			(a, b) => a.or(b)
		};
		self.count += other.count;
		other.clear();
		self.debug_check();
	}

	/// Remove all elements, most extreme first
	pub fn into_sorted_vec(mut self) -> Vec<T> {
		let mut res = Vec::with_capacity(self.count);
		while let Some(value) = self.pop() {
			res.push(value);
		}
		res
	}

	/// Iterator that pops elements, most extreme first.
	/// Elements not consumed by the iterator stay in the heap.
	pub fn drain_sorted(&mut self) -> DrainSorted<'_, T, C> {
		DrainSorted{heap: self}
	}

	/// Combine two trees.  The less extreme root becomes the first child of the other one;
	/// on a tie `a` stays on top.  Both roots must already be detached from any parent or sibling.
	fn meld(&mut self, a: usize, b: usize) -> usize {
		let (top, sub) = if self.cmp.cmp(self.value(a), self.value(b)) == Ordering::Less {
			(b, a)
		} else { (a, b) };
		self.nodes[sub].next = self.nodes[top].child;
		self.nodes[sub].parent = Some(top);
		self.nodes[top].child = Some(sub);
		top
	}

	/// Two pass pairing of a detached sibling list: meld adjacent pairs left to right,
	/// then fold the results into one tree right to left.
	fn combine_siblings(&mut self, first: usize) -> Option<usize> {
		let mut trees = Vec::new();
		let mut sibling = Some(first);
		while let Some(idx) = sibling {
			sibling = self.nodes[idx].next.take();
			self.nodes[idx].parent = None;
			trees.push(idx);
		}
		let paired: Vec<usize> = trees.chunks(2).map(|pair|match *pair {
			[a, b] => self.meld(a, b),
			[a] => a,
			_ => unreachable!()
		}).collect();
		paired.into_iter().rev().reduce(|acc, tree|self.meld(tree, acc))
	}

	/// Meld singleton trees two at a time, queueing each result at the back, until one remains
	fn meld_pairwise(&mut self, mut trees: VecDeque<usize>) -> Option<usize> {
		loop {
			let a = trees.pop_front()?;
			let Some(b) = trees.pop_front() else { return Some(a) };
			let top = self.meld(a, b);
			trees.push_back(top);
		}
	}

	#[inline]
	fn debug_check(&self) {
		#[cfg(all(test, not(feature = "stress_tests")))]{
			if self.count <= FULL_CHECK_MAX {
				assert_eq!(self.check(), Ok(()))
			}
		}
	}

	#[cfg(test)]
	fn check(&self) -> Result<(), CheckError> {
		use CheckError::*;
		let live = self.nodes.iter().filter(|node|node.value.is_some()).count();
		if live != self.count || self.nodes.len() - self.free.len() != self.count {
			return Err(WrongCount)
		}
		let Some(root) = self.root else {
			return if self.count == 0 { Ok(()) } else { Err(WrongCount) }
		};
		if self.nodes[root].parent.is_some() || self.nodes[root].next.is_some() {
			return Err(RootHasParent)
		}
		let mut seen = 0;
		let mut todo = vec![root];
		while let Some(idx) = todo.pop() {
			seen += 1;
			if seen > self.count {
				return Err(WrongCount)
			}
			let mut child = self.nodes[idx].child;
			while let Some(c) = child {
				if self.nodes[c].parent != Some(idx) {
					return Err(BrokenParentLink(c))
				}
				if self.cmp.cmp(self.value(c), self.value(idx)) == Ordering::Greater {
					return Err(MoreExtremeThanParent(c))
				}
				todo.push(c);
				child = self.nodes[c].next;
			}
		}
		if seen != self.count { Err(WrongCount) } else { Ok(()) }
	}
}

impl<T: Clone, C: Comparator<T> + Clone> PairingHeap<T, C> {
	/// Copy every element of `source` into fresh singleton nodes and meld them pairwise.
	/// `self` must be empty.
	fn copy_nodes(&mut self, source: &Self) {
		if source.count == 0 {
			return
		}
		tracing::trace!(len = source.count, "copying pairing heap");
		self.nodes.reserve(source.count);
		let mut singles = VecDeque::with_capacity(source.count);
		let mut todo: Vec<usize> = source.root.into_iter().collect();
		while let Some(idx) = todo.pop() {
			let node = &source.nodes[idx];
			todo.extend(node.next);
			todo.extend(node.child);
			singles.push_back(self.alloc(source.value(idx).clone()));
		}
		self.count = singles.len();
		self.root = self.meld_pairwise(singles);
		self.debug_check();
	}
}

impl<T: Clone, C: Comparator<T> + Clone> Clone for PairingHeap<T, C> {
	fn clone(&self) -> Self {
		let mut res = Self::with_comparator(self.cmp.clone());
		res.copy_nodes(self);
		res
	}

	fn clone_from(&mut self, source: &Self) {
		self.clear();
		self.cmp = source.cmp.clone();
		self.copy_nodes(source);
	}
}

impl<T, C: Comparator<T> + Default> Default for PairingHeap<T, C> {
	fn default() -> Self {
		Self::with_comparator(C::default())
	}
}

impl<T: fmt::Debug, C> fmt::Debug for PairingHeap<T, C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.iter()).finish()
	}
}

impl<T, C: Comparator<T>> Extend<T> for PairingHeap<T, C> {
	fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
		for value in iter {
			self.push(value);
		}
	}
}

impl<T, C: Comparator<T> + Default> FromIterator<T> for PairingHeap<T, C> {
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
		Self::from_iter_with(iter, C::default())
	}
}

pub struct Iter<'a, T> {
	nodes: std::slice::Iter<'a, Node<T>>
}

impl<'a, T> Iterator for Iter<'a, T> {
	type Item = &'a T;
	fn next(&mut self) -> Option<Self::Item> {
		self.nodes.find_map(|node|node.value.as_ref())
	}
}

impl<'a, T, C> IntoIterator for &'a PairingHeap<T, C> {
	type Item = &'a T;
	type IntoIter = Iter<'a, T>;
	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

pub struct DrainSorted<'a, T, C: Comparator<T>> {
	heap: &'a mut PairingHeap<T, C>
}

impl<'a, T, C: Comparator<T>> Iterator for DrainSorted<'a, T, C> {
	type Item = T;
	fn next(&mut self) -> Option<T> {
		self.heap.pop()
	}
	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.heap.len(), Some(self.heap.len()))
	}
}
