// SPDX-License-Identifier: AGPL-3.0-or-later
// CCScore - Controversy and Clustering Scores over Edit Graphs
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Fixed-capacity blocking FIFO between the producer and the workers.
//!
//! All bookkeeping sits behind one mutex. Producers wait on the free-slot
//! count and consumers on the available-item count, each with its own
//! condition variable, so nobody spins.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

pub struct BoundedQueue<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    /// Signalled when a slot frees up
    slot_freed: Condvar,
    /// Signalled when an item becomes available
    item_added: Condvar,
}

impl<T> BoundedQueue<T> {
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            slot_freed: Condvar::new(),
            item_added: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Slots a producer could fill without blocking.
    pub fn free_slots(&self) -> usize {
        self.capacity - self.items.lock().len()
    }

    /// Append `value`, blocking while the queue is full.
    pub fn push(&self, value: T) {
        let mut items = self.items.lock();
        while items.len() >= self.capacity {
            self.slot_freed.wait(&mut items);
        }
        items.push_back(value);
        drop(items);
        self.item_added.notify_one();
    }

    /// Append `value` if a slot is free, otherwise hand it back.
    pub fn try_push(&self, value: T) -> Result<(), T> {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            return Err(value);
        }
        items.push_back(value);
        drop(items);
        self.item_added.notify_one();
        Ok(())
    }

    /// Remove the oldest item, blocking while the queue is empty.
    pub fn pop_front(&self) -> T {
        self.pop_with(VecDeque::pop_front)
    }

    /// Remove the most recently pushed item, blocking while empty.
    pub fn pop_back(&self) -> T {
        self.pop_with(VecDeque::pop_back)
    }

    /// Remove the oldest item if one is available.
    pub fn try_pop_front(&self) -> Option<T> {
        let value = self.items.lock().pop_front()?;
        self.slot_freed.notify_one();
        Some(value)
    }

    fn pop_with(&self, take: fn(&mut VecDeque<T>) -> Option<T>) -> T {
        let mut items = self.items.lock();
        loop {
            if let Some(value) = take(&mut *items) {
                drop(items);
                self.slot_freed.notify_one();
                return value;
            }
            self.item_added.wait(&mut items);
        }
    }
}
