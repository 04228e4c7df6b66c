//! Per-kind membership sets.
//!
//! Each registered kind owns one [`ComponentSet`]: a sparse/dense pair that
//! answers "which entity indices currently carry this kind" in O(1) per
//! operation and hands out a packed member slice for iteration. Payloads do
//! not live here; they live on the entity record, keyed by kind.

/// Sentinel for "index not present" in the sparse array.
const EMPTY: u32 = u32::MAX;

/// Sparse/dense membership record for one kind.
///
/// `sparse[entity_index]` holds the position of that index inside `dense`,
/// or [`EMPTY`]. Removal swap-pops the dense array so it stays packed.
#[derive(Debug, Default)]
pub struct ComponentSet {
    sparse: Vec<u32>,
    dense: Vec<u32>,
}

impl ComponentSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
        }
    }

    /// Record membership for `index`. Returns `false` if it was already a
    /// member.
    pub fn insert(&mut self, index: u32) -> bool {
        if self.contains(index) {
            return false;
        }
        let slot = index as usize;
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, EMPTY);
        }
        self.sparse[slot] = self.dense.len() as u32;
        self.dense.push(index);
        true
    }

    /// Drop membership for `index`. Returns `false` if it was not a member.
    pub fn remove(&mut self, index: u32) -> bool {
        if !self.contains(index) {
            return false;
        }
        let pos = self.sparse[index as usize] as usize;
        let last = self.dense[self.dense.len() - 1];
        // Swap the last member into the vacated dense slot.
        self.dense.swap_remove(pos);
        if pos < self.dense.len() {
            self.sparse[last as usize] = pos as u32;
        }
        self.sparse[index as usize] = EMPTY;
        true
    }

    /// Whether `index` is currently a member.
    pub fn contains(&self, index: u32) -> bool {
        self.sparse
            .get(index as usize)
            .map_or(false, |&pos| pos != EMPTY)
    }

    /// Number of current members.
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Packed slice of member indices, in insertion order disturbed only by
    /// swap-removal.
    pub fn dense(&self) -> &[u32] {
        &self.dense
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
