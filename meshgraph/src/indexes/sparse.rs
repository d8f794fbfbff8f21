// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sparse-set based containers over a bounded integer universe
//!
//! Both structures answer membership in O(1) and clear in O(1) without
//! touching their backing storage, which makes them cheap to reuse for
//! every node visited by the Louvain local-move loop.

/// Map from integers in `[0, capacity)` to values, iterated in insertion order
#[derive(Debug, Clone)]
pub struct SparseMap<V> {
    dense: Vec<usize>,
    sparse: Vec<usize>,
    values: Vec<V>,
    size: usize,
}

impl<V: Copy + Default> SparseMap<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            dense: vec![0; capacity],
            sparse: vec![0; capacity],
            values: vec![V::default(); capacity],
            size: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.dense.len()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn clear(&mut self) {
        self.size = 0;
    }

    pub fn has(&self, key: usize) -> bool {
        let position = self.sparse[key];
        position < self.size && self.dense[position] == key
    }

    pub fn get(&self, key: usize) -> Option<V> {
        let position = self.sparse[key];
        if position < self.size && self.dense[position] == key {
            Some(self.values[position])
        } else {
            None
        }
    }

    pub fn set(&mut self, key: usize, value: V) {
        let position = self.sparse[key];
        if position < self.size && self.dense[position] == key {
            self.values[position] = value;
            return;
        }

        self.dense[self.size] = key;
        self.sparse[key] = self.size;
        self.values[self.size] = value;
        self.size += 1;
    }

    /// Entry at insertion position `i`
    pub fn entry_at(&self, i: usize) -> (usize, V) {
        (self.dense[i], self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, V)> + '_ {
        (0..self.size).map(move |i| self.entry_at(i))
    }
}

impl<V> SparseMap<V>
where
    V: Copy + Default + std::ops::AddAssign,
{
    /// Add `value` to the entry of `key`, starting from the default
    pub fn accumulate(&mut self, key: usize, value: V) {
        let position = self.sparse[key];
        if position < self.size && self.dense[position] == key {
            self.values[position] += value;
        } else {
            self.set(key, value);
        }
    }
}

/// FIFO queue over integers in `[0, capacity)` that ignores members
/// already enqueued
#[derive(Debug, Clone)]
pub struct SparseQueueSet {
    dense: Vec<usize>,
    sparse: Vec<usize>,
    start: usize,
    size: usize,
}

impl SparseQueueSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            dense: vec![0; capacity],
            sparse: vec![capacity; capacity],
            start: 0,
            size: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.dense.len()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn clear(&mut self) {
        self.start = 0;
        self.size = 0;
    }

    pub fn contains(&self, member: usize) -> bool {
        if self.size == 0 {
            return false;
        }

        let capacity = self.capacity();
        let position = self.sparse[member];
        let end = self.start + self.size;

        position < capacity
            && ((position >= self.start && position < end)
                || (end > capacity && position < end - capacity))
            && self.dense[position] == member
    }

    /// Enqueue a member. Returns false if it was already queued.
    pub fn enqueue(&mut self, member: usize) -> bool {
        if self.contains(member) {
            return false;
        }

        let position = (self.start + self.size) % self.capacity();
        self.dense[position] = member;
        self.sparse[member] = position;
        self.size += 1;
        true
    }

    pub fn dequeue(&mut self) -> Option<usize> {
        if self.size == 0 {
            return None;
        }

        let position = self.start;
        self.size -= 1;
        self.start += 1;
        if self.start == self.capacity() {
            self.start = 0;
        }

        let member = self.dense[position];
        self.sparse[member] = self.capacity();
        Some(member)
    }
}
