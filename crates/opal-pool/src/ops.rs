//! Deferred structural operations.
//!
//! Lifecycle hooks run while the pool is mid-operation (attaching a seed,
//! walking an update pass, iterating a view). Letting them restructure the
//! pool directly would invalidate the very storage being walked, so hooks
//! record their intent in an [`OpQueue`] through the [`Hooks`] context and
//! the pool flushes the queue once the current operation completes.
//!
//! The queue is FIFO and flushing is reentrant: ops queued by hooks that run
//! during a flush are appended and drained in the same flush.

use crate::entity::EntityId;
use std::any::TypeId;
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Op / OpQueue
// ---------------------------------------------------------------------------

/// A structural mutation deferred until the pool is quiescent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    /// Destroy an entity (cascading through its children).
    Destroy(EntityId),
    /// Detach one kind from an entity.
    Detach(EntityId, TypeId),
}

/// FIFO queue of deferred [`Op`]s.
#[derive(Debug, Default)]
pub(crate) struct OpQueue {
    queue: VecDeque<Op>,
}

impl OpQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn push(&mut self, op: Op) {
        self.queue.push_back(op);
    }

    pub fn pop(&mut self) -> Option<Op> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// Context handed to every lifecycle hook.
///
/// A hook can learn which entity it belongs to and queue structural changes;
/// it can never reach into the pool directly. Queued changes take effect
/// after the operation that triggered the hook finishes.
#[derive(Debug)]
pub struct Hooks<'a> {
    entity: EntityId,
    ops: &'a mut OpQueue,
}

impl<'a> Hooks<'a> {
    pub(crate) fn new(entity: EntityId, ops: &'a mut OpQueue) -> Self {
        Self { entity, ops }
    }

    /// The entity this hook's component is attached to.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Queue destruction of the owning entity.
    pub fn destroy(&mut self) {
        self.ops.push(Op::Destroy(self.entity));
    }

    /// Queue destruction of another entity.
    pub fn destroy_entity(&mut self, target: EntityId) {
        self.ops.push(Op::Destroy(target));
    }

    /// Queue detachment of kind `T` from the owning entity.
    pub fn detach<T: 'static>(&mut self) {
        self.ops.push(Op::Detach(self.entity, TypeId::of::<T>()));
    }

    /// Queue detachment of kind `T` from another entity.
    pub fn detach_from<T: 'static>(&mut self, target: EntityId) {
        self.ops.push(Op::Detach(target, TypeId::of::<T>()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Fuse;

    #[test]
    fn queue_is_fifo() {
        let mut ops = OpQueue::new();
        let a = EntityId::new(0, 0);
        let b = EntityId::new(1, 0);
        ops.push(Op::Destroy(a));
        ops.push(Op::Destroy(b));
        assert_eq!(ops.pop(), Some(Op::Destroy(a)));
        assert_eq!(ops.pop(), Some(Op::Destroy(b)));
        assert_eq!(ops.pop(), None);
    }

    #[test]
    fn hooks_queue_against_owner_by_default() {
        let mut ops = OpQueue::new();
        let owner = EntityId::new(3, 1);
        let other = EntityId::new(4, 0);
        let mut cx = Hooks::new(owner, &mut ops);
        assert_eq!(cx.entity(), owner);
        cx.destroy();
        cx.detach::<Fuse>();
        cx.destroy_entity(other);
        assert_eq!(ops.pop(), Some(Op::Destroy(owner)));
        assert_eq!(ops.pop(), Some(Op::Detach(owner, TypeId::of::<Fuse>())));
        assert_eq!(ops.pop(), Some(Op::Destroy(other)));
    }
}
