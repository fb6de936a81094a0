//! The handle fabric: generational-handle slot tables (§3, §4.1 of the spec).
//!
//! Mirrors the ABA-safe generational arena the teacher crate assumes
//! (`stockton-skeleton`'s descriptor/texture block bookkeeping is built on
//! the same idea, just specialised to GPU descriptor sets); here it is
//! generalised into a reusable `SlotTable<T>` shared by every resource
//! system in [`crate::resources`].

use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::{Mutex, RwLock, RwLockReadGuard};

/// A value-typed, cheaply-copyable reference into a [`SlotTable<T>`].
///
/// `generation == 0` is the sentinel used for "invalid" (capacity
/// exhausted, or a handle default-constructed without ever being
/// allocated). A handle whose generation doesn't match the live generation
/// of its slot is stale and resolves to `None` everywhere.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The sentinel invalid handle.
    pub fn invalid() -> Self {
        Handle {
            index: 0,
            generation: 0,
            _marker: PhantomData,
        }
    }

    fn new(index: u32, generation: u32) -> Self {
        Handle {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.generation != 0
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Reinterpret this handle as referring to a different owning type.
    ///
    /// Safe because `Handle<T>` never stores anything of type `T` itself —
    /// `T` is a zero-sized compile-time tag distinguishing, say, a mesh
    /// handle from a texture handle. Resource systems use this to expose a
    /// stable public handle type (e.g. [`crate::ids::MeshHandle`]) while
    /// keeping their backing [`SlotTable`] keyed on the concrete entity
    /// type they store.
    pub(crate) fn retag<U>(self) -> Handle<U> {
        Handle {
            index: self.index,
            generation: self.generation,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}
impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

struct FreeList {
    queue: VecDeque<usize>,
    used: usize,
}

/// A read guard over a single resolved slot value, dereferencing to `&T`.
pub struct SlotRef<'a, T> {
    guard: RwLockReadGuard<'a, Vec<Slot<T>>>,
    index: usize,
}

impl<'a, T> Deref for SlotRef<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.guard[self.index]
            .value
            .as_ref()
            .expect("SlotRef constructed over an empty slot")
    }
}

/// Fixed-capacity generational arena. See module docs and spec §4.1.
pub struct SlotTable<T> {
    capacity: usize,
    slots: RwLock<Vec<Slot<T>>>,
    free: Mutex<FreeList>,
}

impl<T> SlotTable<T> {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        let mut queue = VecDeque::with_capacity(capacity);
        for i in 0..capacity {
            slots.push(Slot {
                generation: 0,
                value: None,
            });
            queue.push_back(i);
        }
        SlotTable {
            capacity,
            slots: RwLock::new(slots),
            free: Mutex::new(FreeList { queue, used: 0 }),
        }
    }

    /// Claim a free slot, construct `value` into it, and return a valid
    /// handle. Returns [`Handle::invalid`] if the table is full
    /// (`CapacityExhausted`, §7) — the caller is expected to log and fall
    /// back.
    pub fn allocate(&self, value: T) -> Handle<T> {
        let mut free = self.free.lock().unwrap();
        let index = match free.queue.pop_front() {
            Some(index) => index,
            None => return Handle::invalid(),
        };
        free.used += 1;
        drop(free);

        let mut slots = self.slots.write().unwrap();
        let slot = &mut slots[index];
        slot.generation += 1;
        slot.value = Some(value);
        Handle::new(index as u32, slot.generation)
    }

    pub fn is_valid(&self, handle: Handle<T>) -> bool {
        if !handle.is_valid() {
            return false;
        }
        let slots = self.slots.read().unwrap();
        slots
            .get(handle.index as usize)
            .map(|s| s.generation == handle.generation && s.value.is_some())
            .unwrap_or(false)
    }

    /// Resolve a handle to its value, or `None` if stale/empty/never
    /// allocated.
    pub fn get(&self, handle: Handle<T>) -> Option<SlotRef<'_, T>> {
        if !handle.is_valid() {
            return None;
        }
        let guard = self.slots.read().unwrap();
        let index = handle.index as usize;
        match guard.get(index) {
            Some(slot) if slot.generation == handle.generation && slot.value.is_some() => {
                Some(SlotRef { guard, index })
            }
            _ => None,
        }
    }

    /// Mutate a handle's value in place via a closure, returning `None` if
    /// the handle doesn't resolve.
    pub fn get_mut_with<R>(&self, handle: Handle<T>, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        if !handle.is_valid() {
            return None;
        }
        let mut slots = self.slots.write().unwrap();
        let index = handle.index as usize;
        match slots.get_mut(index) {
            Some(slot) if slot.generation == handle.generation => {
                slot.value.as_mut().map(f)
            }
            _ => None,
        }
    }

    /// Drop the value at `handle`'s slot and return it to the free list.
    /// Idempotent: releasing an already-released (or never-valid) handle
    /// returns `false`.
    pub fn release(&self, handle: Handle<T>) -> bool {
        if !handle.is_valid() {
            return false;
        }
        let index = handle.index as usize;
        let mut slots = self.slots.write().unwrap();
        let released = match slots.get_mut(index) {
            Some(slot) if slot.generation == handle.generation && slot.value.is_some() => {
                slot.value = None;
                true
            }
            _ => false,
        };
        drop(slots);

        if released {
            let mut free = self.free.lock().unwrap();
            free.queue.push_back(index);
            free.used -= 1;
        }
        released
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used_slots(&self) -> usize {
        self.free.lock().unwrap().used
    }

    pub fn available_slots(&self) -> usize {
        self.capacity - self.used_slots()
    }

    pub fn is_empty(&self) -> bool {
        self.used_slots() == 0
    }

    pub fn is_full(&self) -> bool {
        self.available_slots() == 0
    }
}
