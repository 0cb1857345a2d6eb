//! # Proxy Pool
//!
//! Fixed-capacity, generational slot allocator for live proxies.

use crate::id::ProxyId;

/// A single slot in the pool.
struct Slot<T> {
    /// Bumped every time the slot is freed, so stale ids miss.
    generation: u32,
    /// The stored object, if the slot is occupied.
    value: Option<T>,
}

/// A pool allocator for proxies.
///
/// Objects are inserted and removed individually in O(1). Every insert hands
/// out a [`ProxyId`] carrying the slot's generation; once the slot is freed
/// the generation moves on and the old id no longer resolves.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. It is owned by a single simulation and only
/// touched from its tick.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool: ProxyPool<u32> = ProxyPool::new(10_000);
///
/// let id = pool.insert(42).unwrap();
/// assert_eq!(pool.get(id), Some(&42));
///
/// pool.remove(id);
/// assert_eq!(pool.get(id), None);
/// ```
pub struct ProxyPool<T> {
    /// The storage array.
    slots: Box<[Slot<T>]>,
    /// Free list - indices of available slots.
    free_list: Vec<u32>,
    /// Number of occupied slots.
    len: usize,
}

impl<T> ProxyPool<T> {
    /// Creates a new pool with the specified capacity.
    ///
    /// All slots are pre-allocated upfront. A capacity of zero yields a pool
    /// that rejects every insert.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(u32::MAX as usize);
        let slots: Vec<Slot<T>> = (0..capacity)
            .map(|_| Slot {
                generation: 0,
                value: None,
            })
            .collect();

        // Reversed so the lowest index is handed out first.
        #[allow(clippy::cast_possible_truncation)]
        let free_list: Vec<u32> = (0..capacity as u32).rev().collect();

        Self {
            slots: slots.into_boxed_slice(),
            free_list,
            len: 0,
        }
    }

    /// Returns the total capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of occupied slots.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing is stored.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of free slots.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Stores an object, returning its id, or `None` when the pool is full.
    pub fn insert(&mut self, value: T) -> Option<ProxyId> {
        self.insert_with(|_| value)
    }

    /// Stores an object built from its own id.
    ///
    /// Useful when the stored object needs to know its handle.
    pub fn insert_with(&mut self, build: impl FnOnce(ProxyId) -> T) -> Option<ProxyId> {
        let index = self.free_list.pop()?;
        let slot = &mut self.slots[index as usize];
        let id = ProxyId::new(index, slot.generation);
        slot.value = Some(build(id));
        self.len += 1;
        Some(id)
    }

    /// Removes an object, returning it. Stale or foreign ids return `None`.
    pub fn remove(&mut self, id: ProxyId) -> Option<T> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index());
        self.len -= 1;
        Some(value)
    }

    /// Returns true if `id` refers to a live object.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ProxyId) -> bool {
        self.get(id).is_some()
    }

    /// Gets a reference to a stored object.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ProxyId) -> Option<&T> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    /// Gets a mutable reference to a stored object.
    #[inline]
    pub fn get_mut(&mut self, id: ProxyId) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    /// Removes everything. Generations advance, so every old id goes stale.
    pub fn clear(&mut self) {
        self.free_list.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            #[allow(clippy::cast_possible_truncation)]
            self.free_list.push(index as u32);
        }
        self.len = 0;
    }

    /// Iterates over stored objects in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ProxyId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            #[allow(clippy::cast_possible_truncation)]
            let id = ProxyId::new(index as u32, slot.generation);
            slot.value.as_ref().map(|v| (id, v))
        })
    }

    /// Iterates mutably over stored objects in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ProxyId, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            #[allow(clippy::cast_possible_truncation)]
            let id = ProxyId::new(index as u32, slot.generation);
            slot.value.as_mut().map(|v| (id, v))
        })
    }

    /// Iterates over stored objects without their ids.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| slot.value.as_ref())
    }

    /// Iterates mutably over stored objects without their ids.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(|slot| slot.value.as_mut())
    }
}
