//! # Generation-Counted Handles
//!
//! Graph nodes and geo layouts are keyed by handles instead of addresses.
//! A handle is split into two parts:
//! - Lower 32 bits: slot index
//! - Upper 32 bits: generation counter
//!
//! Releasing a slot bumps its generation, so a handle issued before the
//! release never compares equal to the one issued after it.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker for scene graph node handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphNode {}

/// Marker for geo layout handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoLayout {}

/// Typed handle (index + generation).
#[repr(transparent)]
pub struct Handle<K> {
    raw: u64,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Handle<K> {
    /// Creates a handle from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            raw: ((generation as u64) << 32) | (index as u64),
            _kind: PhantomData,
        }
    }

    /// Slot index.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index(self) -> u32 {
        self.raw as u32
    }

    /// Generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.raw >> 32) as u32
    }

    /// Null/invalid handle.
    pub const NULL: Self = Self {
        raw: u64::MAX,
        _kind: PhantomData,
    };

    /// Checks if this handle is null.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.raw == u64::MAX
    }

    /// Raw packed value.
    #[inline]
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        self.raw
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K> PartialOrd for Handle<K> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Handle<K> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<K> Default for Handle<K> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<K> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Handle(NULL)")
        } else {
            write!(f, "Handle({}v{})", self.index(), self.generation())
        }
    }
}

/// Issues and recycles handles of one kind.
#[derive(Debug)]
pub struct HandleAllocator<K> {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> HandleAllocator<K> {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            alive: Vec::new(),
            free: Vec::new(),
            _kind: PhantomData,
        }
    }

    /// Issues a fresh handle, reusing a released slot when one exists.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` slots are ever live at once.
    pub fn allocate(&mut self) -> Handle<K> {
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return Handle::new(index, self.generations[slot]);
        }

        assert!(
            self.generations.len() < u32::MAX as usize,
            "handle index space exhausted"
        );
        #[allow(clippy::cast_possible_truncation)]
        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        Handle::new(index, 0)
    }

    /// Releases a handle. Stale or null handles are ignored.
    ///
    /// Returns true if the handle was live.
    pub fn release(&mut self, handle: Handle<K>) -> bool {
        if !self.is_live(handle) {
            return false;
        }
        let slot = handle.index() as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(handle.index());
        true
    }

    /// Returns true if `handle` refers to a live slot of the current generation.
    #[must_use]
    pub fn is_live(&self, handle: Handle<K>) -> bool {
        if handle.is_null() {
            return false;
        }
        let slot = handle.index() as usize;
        slot < self.alive.len() && self.alive[slot] && self.generations[slot] == handle.generation()
    }

    /// Number of live handles.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }
}

impl<K> Default for HandleAllocator<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_packing() {
        let h: Handle<GraphNode> = Handle::new(7, 3);
        assert_eq!(h.index(), 7);
        assert_eq!(h.generation(), 3);
        assert!(!h.is_null());
        assert!(Handle::<GraphNode>::NULL.is_null());
        assert!(Handle::<GeoLayout>::default().is_null());
    }

    #[test]
    fn test_reused_slot_gets_new_generation() {
        let mut nodes: HandleAllocator<GraphNode> = HandleAllocator::new();
        let first = nodes.allocate();
        assert!(nodes.release(first));

        let second = nodes.allocate();
        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
        assert!(!nodes.is_live(first));
        assert!(nodes.is_live(second));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut nodes: HandleAllocator<GraphNode> = HandleAllocator::new();
        let h = nodes.allocate();
        assert!(nodes.release(h));
        assert!(!nodes.release(h));
        assert!(!nodes.release(Handle::NULL));
        assert_eq!(nodes.live_count(), 0);
    }
}
