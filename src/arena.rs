//! Arena allocation for syntactic nodes and ports.
//!
//! Provides dense, total-orderable handles (`NodeId`, `PortId`) and `Arena`
//! (contiguous storage addressed by those handles). Slots are never freed:
//! the rewriting passes only disconnect superseded wiring, so every handle
//! stays valid for the lifetime of the arena that issued it.
//!
//! `HandleSet` is a growable bitset keyed by handle, used for traversal
//! state (on-path, visited) in place of per-node mutable flags.
//!
//! # Determinism
//! - Handle ordering is by the inner `u32`, which is allocation order.
//! - Iteration order over slots is by index (0..len).

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A dense arena handle.
pub trait Handle: Copy + Eq + Ord + Hash + fmt::Debug {
    /// Builds a handle from a slot index.
    fn from_index(index: usize) -> Self;

    /// Returns the slot index.
    fn index(self) -> usize;
}

macro_rules! arena_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Creates a handle from a raw `u32`.
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Returns the raw `u32` index.
            #[inline]
            pub const fn as_u32(&self) -> u32 {
                self.0
            }
        }

        impl Handle for $name {
            #[inline]
            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

arena_handle!(
    /// Handle of a node in the syntactic graph.
    NodeId
);

arena_handle!(
    /// Handle of a port in the syntactic graph.
    PortId
);

/// Contiguous, append-only storage addressed by handles of type `H`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arena<H, T> {
    slots: Vec<T>,
    _handle: PhantomData<fn() -> H>,
}

impl<H: Handle, T> Arena<H, T> {
    /// Creates a new empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            _handle: PhantomData,
        }
    }

    /// Stores `data` in a fresh slot and returns its handle.
    pub fn allocate(&mut self, data: T) -> H {
        let handle = H::from_index(self.slots.len());
        self.slots.push(data);
        handle
    }

    /// Returns a reference to the data stored at `id`, if present.
    #[inline]
    pub fn get(&self, id: H) -> Option<&T> {
        self.slots.get(id.index())
    }

    /// Returns a mutable reference to the data stored at `id`, if present.
    #[inline]
    pub fn get_mut(&mut self, id: H) -> Option<&mut T> {
        self.slots.get_mut(id.index())
    }

    /// Returns the number of allocated slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if nothing has been allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over all slots in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(idx, data)| (H::from_index(idx), data))
    }
}

impl<H: Handle, T> Default for Arena<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handle, T> Index<H> for Arena<H, T> {
    type Output = T;

    #[inline]
    fn index(&self, id: H) -> &T {
        &self.slots[id.index()]
    }
}

impl<H: Handle, T> IndexMut<H> for Arena<H, T> {
    #[inline]
    fn index_mut(&mut self, id: H) -> &mut T {
        &mut self.slots[id.index()]
    }
}

/// Growable bitset over arena handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleSet<H> {
    bits: Vec<bool>,
    _handle: PhantomData<fn() -> H>,
}

impl<H: Handle> HandleSet<H> {
    /// Creates an empty set sized for `capacity` handles.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: vec![false; capacity],
            _handle: PhantomData,
        }
    }

    /// Inserts `id`, returning `true` if it was not present.
    pub fn insert(&mut self, id: H) -> bool {
        let idx = id.index();
        if idx >= self.bits.len() {
            self.bits.resize(idx + 1, false);
        }
        !std::mem::replace(&mut self.bits[idx], true)
    }

    /// Removes `id`, returning `true` if it was present.
    pub fn remove(&mut self, id: H) -> bool {
        match self.bits.get_mut(id.index()) {
            Some(bit) => std::mem::replace(bit, false),
            None => false,
        }
    }

    #[inline]
    pub fn contains(&self, id: H) -> bool {
        self.bits.get(id.index()).copied().unwrap_or(false)
    }

    /// Number of handles currently in the set.
    pub fn len(&self) -> usize {
        self.bits.iter().filter(|bit| **bit).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|bit| *bit)
    }
}

impl<H: Handle> Default for HandleSet<H> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
