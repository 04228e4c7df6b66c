//! Entity identities and recycling.
//!
//! An [`EntityId`] is a 64-bit handle that packs a *generation* counter in the
//! high 32 bits and an *index* in the low 32 bits. The generation is bumped
//! every time an index is recycled, so a handle held past its entity's death
//! is detectably stale rather than silently pointing at the replacement.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity identifier.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Construct an `EntityId` from an index and generation.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// The index portion (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The generation portion (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// IdentityPool
// ---------------------------------------------------------------------------

/// Hands out and recycles [`EntityId`]s with generational tracking.
///
/// Released indices wait in a FIFO queue so that generations are spread out
/// over time rather than concentrated on a hot index.
#[derive(Debug)]
pub struct IdentityPool {
    /// Current generation for each index slot.
    generations: Vec<u32>,
    /// Whether the slot is currently alive.
    alive: Vec<bool>,
    /// Recyclable indices, oldest first.
    free_indices: VecDeque<u32>,
    /// Number of alive slots, maintained incrementally.
    live: usize,
}

impl IdentityPool {
    /// Create a new, empty identity pool.
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            alive: Vec::new(),
            free_indices: VecDeque::new(),
            live: 0,
        }
    }

    /// Allocate a fresh [`EntityId`].
    ///
    /// A recycled index is reused with its incremented generation when one is
    /// available; otherwise a brand-new index is created at generation zero.
    pub fn allocate(&mut self) -> EntityId {
        self.live += 1;
        if let Some(index) = self.free_indices.pop_front() {
            // Reuse recycled index -- generation was already bumped on release.
            self.alive[index as usize] = true;
            EntityId::new(index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            EntityId::new(index, 0)
        }
    }

    /// Release an entity, incrementing the generation for its index so that
    /// any outstanding handles become stale.
    ///
    /// Returns `true` if the entity was alive and is now released, `false`
    /// if it was already dead or the handle carried a stale generation. A
    /// `false` return never touches the free-list, so no index can be queued
    /// for recycling twice.
    pub fn release(&mut self, id: EntityId) -> bool {
        let idx = id.index() as usize;
        if idx >= self.generations.len() {
            return false;
        }
        if self.generations[idx] != id.generation() {
            return false;
        }
        if !self.alive[idx] {
            return false;
        }
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free_indices.push_back(id.index());
        self.live -= 1;
        true
    }

    /// Returns `true` if `id` refers to a currently alive entity whose
    /// generation matches the pool's current generation for that index.
    pub fn is_alive(&self, id: EntityId) -> bool {
        let idx = id.index() as usize;
        if idx >= self.generations.len() {
            return false;
        }
        self.alive[idx] && self.generations[idx] == id.generation()
    }

    /// Total number of currently alive entities.
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Rebuild the full [`EntityId`] for an index slot, if that slot is
    /// currently alive. Membership sets store bare indices; this recovers the
    /// generational handle for them.
    pub fn entity_at(&self, index: u32) -> Option<EntityId> {
        let idx = index as usize;
        if idx < self.alive.len() && self.alive[idx] {
            Some(EntityId::new(index, self.generations[idx]))
        } else {
            None
        }
    }
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
