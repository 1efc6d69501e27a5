//! An addressable pairing heap.
//!
//! `PairingHeap` keeps its nodes in an arena owned by the heap and hands out `Handle`s
//! at insertion time.  A handle can later be used to read an element, to make it more
//! extreme in place (`PairingHeap::decrease_key`), or to mutate it freely before asking
//! the heap to restore its order (`PairingHeap::update_priorities`).
//! Handles are checked on every use, so a handle that outlived its node (or its heap)
//! produces `HeapError::StaleHandle` instead of touching someone else's element.
//!
//! Which element is "most extreme" is decided by a per-heap `Comparator`.  The default,
//! `MaxFirst`, keeps the maximum on top like `std::collections::BinaryHeap`;
//! `MinFirst` or any `Fn(&T, &T) -> Ordering` closure can be used instead.

pub mod error;
pub mod pheap;

use std::cmp::Ordering;

pub use error::{HeapError, Result};
pub use pheap::{Handle, PairingHeap};



/// Decides which of two elements is more extreme.
/// `cmp(a, b) == Ordering::Less` means `a` is less extreme than `b` and must never sit above
/// `b` in the heap.  `Ordering::Equal` elements may be arranged either way.
pub trait Comparator<T: ?Sized> {
	fn cmp(&self, a: &T, b: &T) -> Ordering;
}

impl<T: ?Sized, F> Comparator<T> for F where F: Fn(&T, &T) -> Ordering {
	fn cmp(&self, a: &T, b: &T) -> Ordering {
		self(a, b)
	}
}

/// Largest element on top (the natural `Ord` order).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaxFirst;

impl<T: Ord + ?Sized> Comparator<T> for MaxFirst {
	fn cmp(&self, a: &T, b: &T) -> Ordering {
		a.cmp(b)
	}
}

/// Smallest element on top.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MinFirst;

impl<T: Ord + ?Sized> Comparator<T> for MinFirst {
	fn cmp(&self, a: &T, b: &T) -> Ordering {
		b.cmp(a)
	}
}
