use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::buffer::BufferData;

/// Lightweight handle for a buffer registered with a [`Context`](crate::Context)
///
/// Handles of destroyed buffers never alias newer ones: each slot's generation is bumped when it
/// is freed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferId {
    index: u32,
    generation: u32,
}

/// Every live buffer, in registration order
///
/// Shared by the application threads, which register and unregister, and the mixer, which
/// traverses. A single mutex guards the whole table.
pub(crate) struct Registry {
    table: Mutex<Table>,
}

impl Registry {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            table: Mutex::new(Table::with_capacity(n)),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(&self, data: Arc<BufferData>) -> BufferId {
        self.lock().insert(data)
    }

    /// Remove `id`, returning its data so that the caller frees it after the lock is released
    pub(crate) fn unregister(&self, id: BufferId) -> Option<Arc<BufferData>> {
        self.lock().remove(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len
    }
}

pub(crate) struct Table {
    slots: Vec<Slot>,
    first_populated: usize,
    last_populated: usize,
    first_free: usize,
    len: usize,
}

struct Slot {
    data: Option<Arc<BufferData>>,
    generation: u32,
    prev: usize,
    next: usize,
}

impl Table {
    fn with_capacity(n: usize) -> Self {
        let n = n.max(1);
        let slots = (0..n)
            .map(|i| Slot {
                data: None,
                generation: 0,
                prev: usize::MAX,
                next: if i + 1 == n { usize::MAX } else { i + 1 },
            })
            .collect();
        Self {
            slots,
            first_populated: usize::MAX,
            last_populated: usize::MAX,
            first_free: 0,
            len: 0,
        }
    }

    fn insert(&mut self, data: Arc<BufferData>) -> BufferId {
        if self.first_free == usize::MAX {
            // Full; grow and chain the new slots onto the freelist
            let old = self.slots.len();
            let new = old * 2;
            self.slots.extend((old..new).map(|i| Slot {
                data: None,
                generation: 0,
                prev: usize::MAX,
                next: if i + 1 == new { usize::MAX } else { i + 1 },
            }));
            self.first_free = old;
        }
        let index = self.first_free;
        let tail = self.last_populated;
        let slot = &mut self.slots[index];
        self.first_free = slot.next;
        slot.data = Some(data);
        slot.prev = tail;
        slot.next = usize::MAX;
        let generation = slot.generation;

        // Append to populated list
        if tail == usize::MAX {
            self.first_populated = index;
        } else {
            self.slots[tail].next = index;
        }
        self.last_populated = index;
        self.len += 1;
        BufferId {
            index: index as u32,
            generation,
        }
    }

    fn remove(&mut self, id: BufferId) -> Option<Arc<BufferData>> {
        let index = id.index as usize;
        let slot = self.slots.get_mut(index)?;
        if slot.generation != id.generation || slot.data.is_none() {
            return None;
        }
        let data = slot.data.take();
        slot.generation = slot.generation.wrapping_add(1);
        let (prev, next) = (slot.prev, slot.next);

        // Remove from populated list
        if prev == usize::MAX {
            debug_assert_eq!(index, self.first_populated);
            self.first_populated = next;
        } else {
            self.slots[prev].next = next;
        }
        if next == usize::MAX {
            debug_assert_eq!(index, self.last_populated);
            self.last_populated = prev;
        } else {
            self.slots[next].prev = prev;
        }

        // Push onto freelist
        let slot = &mut self.slots[index];
        slot.prev = usize::MAX;
        slot.next = self.first_free;
        self.first_free = index;
        self.len -= 1;
        data
    }

    /// Registered buffers, oldest registration first
    pub(crate) fn iter(&self) -> Iter<'_> {
        Iter {
            table: self,
            next: self.first_populated,
        }
    }
}

pub(crate) struct Iter<'a> {
    table: &'a Table,
    next: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Arc<BufferData>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next != usize::MAX {
            let slot = &self.table.slots[self.next];
            self.next = slot.next;
            if let Some(data) = slot.data.as_ref() {
                return Some(data);
            }
        }
        None
    }
}
