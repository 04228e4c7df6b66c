//! Parent/child entity links.
//!
//! Hierarchy is bookkeeping, not ownership: links are generational ids, so a
//! stale link is detectably dead rather than dangling. The one place the
//! hierarchy changes behavior is destruction, where [`Pool::destroy`]
//! cascades through the whole subtree.

use crate::entity::EntityId;
use crate::pool::{Pool, Seed};
use crate::PoolError;

impl Pool {
    /// Create an entity from a seed and link it under `parent`.
    ///
    /// The child participates in update passes and views like any other
    /// entity; the link only matters for traversal and cascading destroy.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::DeadEntity`] if `parent` is dead or stale.
    pub fn create_child(&mut self, parent: EntityId, seed: Seed) -> Result<EntityId, PoolError> {
        if !self.ids.is_alive(parent) {
            return Err(PoolError::DeadEntity(parent));
        }
        let child = self.create(seed);
        // A start hook may have destroyed either end already.
        if self.ids.is_alive(child) && self.ids.is_alive(parent) {
            self.slots[child.index() as usize].parent = Some(parent);
            self.slots[parent.index() as usize].children.push(child);
        }
        Ok(child)
    }

    /// The parent of `entity`, if it is alive and has one.
    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        if !self.ids.is_alive(entity) {
            return None;
        }
        self.slots
            .get(entity.index() as usize)
            .and_then(|slot| slot.parent)
    }

    /// Iterate the alive direct children of `entity`, in creation order.
    pub fn children(&self, entity: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        let slice: &[EntityId] = if self.ids.is_alive(entity) {
            self.slots
                .get(entity.index() as usize)
                .map(|slot| slot.children.as_slice())
                .unwrap_or(&[])
        } else {
            &[]
        };
        slice.iter().copied().filter(move |&c| self.ids.is_alive(c))
    }

    /// Walk all alive descendants of `entity` depth-first.
    ///
    /// The walk is lazy; entries that die between construction and being
    /// reached are skipped.
    pub fn descendants(&self, entity: EntityId) -> Descendants<'_> {
        let mut stack = Vec::new();
        if self.ids.is_alive(entity) {
            if let Some(slot) = self.slots.get(entity.index() as usize) {
                // Reverse so pop order matches creation order.
                stack.extend(slot.children.iter().rev().copied());
            }
        }
        Descendants { pool: self, stack }
    }
}

/// Lazy depth-first walk over a subtree. Created by [`Pool::descendants`].
pub struct Descendants<'a> {
    pool: &'a Pool,
    stack: Vec<EntityId>,
}

impl Iterator for Descendants<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        while let Some(entity) = self.stack.pop() {
            if !self.pool.ids.is_alive(entity) {
                continue;
            }
            if let Some(slot) = self.pool.slots.get(entity.index() as usize) {
                self.stack.extend(slot.children.iter().rev().copied());
            }
            return Some(entity);
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
