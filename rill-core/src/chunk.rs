// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Immutable ordered batches, the unit of stream output.

use std::sync::Arc;

/// An immutable, cheaply clonable ordered batch of elements.
///
/// A `Chunk` is the unit in which streams emit data: combinators operate on
/// whole chunks where possible and fall back to per-element processing only
/// when their semantics require it. Element order is preserved within and
/// across chunks unless a combinator explicitly documents reordering.
#[derive(Debug)]
pub struct Chunk<T> {
    items: Arc<[T]>,
}

impl<T> Clone for Chunk<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Chunk<T> {
    /// An empty chunk.
    pub fn empty() -> Self {
        Self {
            items: Arc::from([]),
        }
    }

    /// A chunk holding a single element.
    pub fn single(item: T) -> Self {
        Self {
            items: Arc::from([item]),
        }
    }

    /// Number of elements in the chunk.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the chunk holds no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Borrowing iterator over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// First element, if any.
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    /// Last element, if any.
    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Element at `index`, if in bounds.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Maps every element into a new chunk.
    pub fn map<U, F>(&self, f: F) -> Chunk<U>
    where
        F: FnMut(&T) -> U,
    {
        Chunk {
            items: self.items.iter().map(f).collect(),
        }
    }
}

impl<T: Clone> Chunk<T> {
    /// Copies the elements into a `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.to_vec()
    }

    /// Keeps only the elements matching `f`, preserving order.
    pub fn filtered<F>(&self, mut f: F) -> Chunk<T>
    where
        F: FnMut(&T) -> bool,
    {
        Chunk {
            items: self.items.iter().filter(|item| f(item)).cloned().collect(),
        }
    }

    /// Concatenates two chunks, `self` first.
    pub fn concat(&self, other: &Chunk<T>) -> Chunk<T> {
        Chunk {
            items: self.items.iter().chain(other.iter()).cloned().collect(),
        }
    }

    /// The elements from `start` (inclusive) onwards as a new chunk.
    pub fn drop_front(&self, start: usize) -> Chunk<T> {
        let start = start.min(self.items.len());
        Chunk {
            items: self.items[start..].iter().cloned().collect(),
        }
    }

    /// The first `len` elements as a new chunk.
    pub fn take_front(&self, len: usize) -> Chunk<T> {
        let len = len.min(self.items.len());
        Chunk {
            items: self.items[..len].iter().cloned().collect(),
        }
    }
}

impl<T> FromIterator<T> for Chunk<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T> From<Vec<T>> for Chunk<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            items: items.into(),
        }
    }
}

impl<'a, T> IntoIterator for &'a Chunk<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: PartialEq> PartialEq for Chunk<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq> Eq for Chunk<T> {}
