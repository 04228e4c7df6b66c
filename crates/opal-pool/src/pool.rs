//! The [`Pool`] is the top-level container. It owns the identity pool, the
//! kind registry, one membership set per kind, and the per-entity records
//! that map attached kinds to their payloads.
//!
//! Structural operations (create, add, remove, destroy) run lifecycle hooks.
//! Hooks defer their own structural requests through an op queue, which every
//! public operation flushes before returning, so a component destroying its
//! own entity from inside a hook is always safe.

use crate::entity::{EntityId, IdentityPool};
use crate::kind::{Component, Erased, KindId, KindRegistry, Marker};
use crate::ops::{Hooks, Op, OpQueue};
use crate::set::ComponentSet;
use crate::view::View;
use crate::PoolError;
use std::any::TypeId;

// ---------------------------------------------------------------------------
// Payload and entity records
// ---------------------------------------------------------------------------

/// What an entity holds for one attached kind.
pub(crate) enum Payload {
    /// Behavioral kind: a boxed instance with lifecycle hooks.
    Instance(Box<dyn Erased>),
    /// Marker kind: bare membership, nothing stored.
    Flag,
}

/// Per-entity record. `mapping` preserves attach order, which is the order
/// `start` hooks run in at creation.
#[derive(Default)]
pub(crate) struct EntitySlot {
    pub(crate) mapping: Vec<(KindId, Payload)>,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
}

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

enum SeedPayload {
    Instance(Box<dyn Erased>),
    Flag,
}

struct SeedEntry {
    type_id: TypeId,
    name: &'static str,
    register: fn(&mut KindRegistry) -> KindId,
    payload: SeedPayload,
}

/// An ordered bundle of components for [`Pool::create`].
///
/// Entry order is meaningful: components attach in the order they were put
/// in, and their `start` hooks run in the same order once the whole seed is
/// attached.
#[derive(Default)]
pub struct Seed {
    entries: Vec<SeedEntry>,
}

impl Seed {
    /// Create an empty seed.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a behavioral component to the seed.
    ///
    /// # Panics
    ///
    /// Panics if the seed already contains an entry of the same kind.
    pub fn put<T: Component>(mut self, value: T) -> Self {
        self.push(SeedEntry {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            register: |kinds| kinds.ensure::<T>(),
            payload: SeedPayload::Instance(Box::new(value)),
        });
        self
    }

    /// Add a marker to the seed.
    ///
    /// # Panics
    ///
    /// Panics if the seed already contains an entry of the same kind.
    pub fn mark<M: Marker>(mut self) -> Self {
        self.push(SeedEntry {
            type_id: TypeId::of::<M>(),
            name: std::any::type_name::<M>(),
            register: |kinds| kinds.ensure_marker::<M>(),
            payload: SeedPayload::Flag,
        });
        self
    }

    fn push(&mut self, entry: SeedEntry) {
        if self.entries.iter().any(|e| e.type_id == entry.type_id) {
            panic!("seed already contains kind '{}'", entry.name);
        }
        self.entries.push(entry);
    }

    /// Number of entries in the seed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the seed has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Entity and component storage with lazy kind registration.
pub struct Pool {
    pub(crate) ids: IdentityPool,
    kinds: KindRegistry,
    /// Indexed by `KindId.0`. Grows lazily as kinds register.
    sets: Vec<ComponentSet>,
    /// Indexed by entity index.
    pub(crate) slots: Vec<EntitySlot>,
    ops: OpQueue,
}

impl Pool {
    /// Create an empty pool. No kinds are registered upfront; each kind
    /// registers itself the first time it is used.
    pub fn new() -> Self {
        Self {
            ids: IdentityPool::new(),
            kinds: KindRegistry::new(),
            sets: Vec::new(),
            slots: Vec::new(),
            ops: OpQueue::new(),
        }
    }

    // -- creation -----------------------------------------------------------

    /// Create an entity from a seed.
    ///
    /// Components attach in seed order (self-aware instances get `bind`, then
    /// `on_attach` fires per entry). Once every entry is attached, `start`
    /// runs on each behavioral instance in the same order, so seeded siblings
    /// exist by the time any `start` hook fires. Deferred ops queued by hooks
    /// are applied before this returns.
    pub fn create(&mut self, seed: Seed) -> EntityId {
        let entity = self.ids.allocate();
        let idx = entity.index() as usize;
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, EntitySlot::default);
        }
        for entry in seed.entries {
            let kid = (entry.register)(&mut self.kinds);
            self.ensure_set(kid);
            self.sets[kid.0 as usize].insert(entity.index());
            let payload = match entry.payload {
                SeedPayload::Instance(mut inst) => {
                    if self.kinds.info(kid).map_or(false, |i| i.self_aware) {
                        inst.bind(entity);
                    }
                    Payload::Instance(inst)
                }
                SeedPayload::Flag => Payload::Flag,
            };
            self.slots[idx].mapping.push((kid, payload));
            let Pool { slots, ops, .. } = self;
            if let Some((_, Payload::Instance(inst))) = slots[idx].mapping.last_mut() {
                let mut cx = Hooks::new(entity, ops);
                inst.on_attach(&mut cx);
            }
        }
        {
            let Pool { slots, ops, .. } = self;
            for i in 0..slots[idx].mapping.len() {
                if let (_, Payload::Instance(inst)) = &mut slots[idx].mapping[i] {
                    let mut cx = Hooks::new(entity, ops);
                    inst.start(&mut cx);
                }
            }
        }
        self.flush_ops();
        entity
    }

    /// Create an entity carrying a single component.
    pub fn create_with<T: Component>(&mut self, value: T) -> EntityId {
        self.create(Seed::new().put(value))
    }

    /// Create an entity with no components attached.
    pub fn create_empty(&mut self) -> EntityId {
        self.create(Seed::new())
    }

    // -- attach / detach ----------------------------------------------------

    /// Attach a behavioral component to an existing entity.
    ///
    /// If the entity already carries this kind the old instance is replaced:
    /// it receives `on_detach` and is dropped, then the new instance is bound
    /// and receives `on_attach`. `start` never fires here; it is reserved for
    /// creation.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::DeadEntity`] if `entity` is dead or stale.
    pub fn add<T: Component>(&mut self, entity: EntityId, value: T) -> Result<(), PoolError> {
        if !self.ids.is_alive(entity) {
            return Err(PoolError::DeadEntity(entity));
        }
        let kid = self.kinds.ensure::<T>();
        self.ensure_set(kid);
        let idx = entity.index() as usize;
        let mut value = value;
        if T::SELF_AWARE {
            Component::bind(&mut value, entity);
        }
        let inst: Box<dyn Erased> = Box::new(value);
        let existing = self.slots[idx].mapping.iter().position(|(k, _)| *k == kid);
        match existing {
            Some(pos) => {
                {
                    let Pool { slots, ops, .. } = self;
                    if let (_, Payload::Instance(old)) = &mut slots[idx].mapping[pos] {
                        let mut cx = Hooks::new(entity, ops);
                        old.on_detach(&mut cx);
                    }
                }
                self.slots[idx].mapping[pos].1 = Payload::Instance(inst);
            }
            None => {
                self.sets[kid.0 as usize].insert(entity.index());
                self.slots[idx].mapping.push((kid, Payload::Instance(inst)));
            }
        }
        {
            let Pool { slots, ops, .. } = self;
            if let Some((_, Payload::Instance(inst))) =
                slots[idx].mapping.iter_mut().find(|(k, _)| *k == kid)
            {
                let mut cx = Hooks::new(entity, ops);
                inst.on_attach(&mut cx);
            }
        }
        self.flush_ops();
        Ok(())
    }

    /// Detach a behavioral component from an entity.
    ///
    /// Detaching a kind the entity does not carry (or that was never
    /// registered) is a no-op, not an error. The instance receives
    /// `on_detach` before it is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::DeadEntity`] if `entity` is dead or stale.
    pub fn remove<T: Component>(&mut self, entity: EntityId) -> Result<(), PoolError> {
        if !self.ids.is_alive(entity) {
            return Err(PoolError::DeadEntity(entity));
        }
        if let Some(kid) = self.kinds.lookup::<T>() {
            self.detach_now(entity, kid);
            self.flush_ops();
        }
        Ok(())
    }

    /// Set a marker on an entity. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::DeadEntity`] if `entity` is dead or stale.
    pub fn mark<M: Marker>(&mut self, entity: EntityId) -> Result<(), PoolError> {
        if !self.ids.is_alive(entity) {
            return Err(PoolError::DeadEntity(entity));
        }
        let kid = self.kinds.ensure_marker::<M>();
        self.ensure_set(kid);
        if self.sets[kid.0 as usize].insert(entity.index()) {
            self.slots[entity.index() as usize]
                .mapping
                .push((kid, Payload::Flag));
        }
        Ok(())
    }

    /// Clear a marker from an entity. Clearing an absent marker is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::DeadEntity`] if `entity` is dead or stale.
    pub fn unmark<M: Marker>(&mut self, entity: EntityId) -> Result<(), PoolError> {
        if !self.ids.is_alive(entity) {
            return Err(PoolError::DeadEntity(entity));
        }
        if let Some(kid) = self.kinds.lookup::<M>() {
            self.detach_now(entity, kid);
        }
        Ok(())
    }

    /// Whether `entity` currently carries marker `M`. Dead entities and
    /// never-registered markers answer `false`.
    pub fn marked<M: Marker>(&self, entity: EntityId) -> bool {
        self.has::<M>(entity)
    }

    // -- access -------------------------------------------------------------

    /// Borrow the component of kind `T` on `entity`, if present.
    ///
    /// Absence (dead entity, unattached kind, never-registered kind) is
    /// `None`, never an error, and never registers anything.
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        if !self.ids.is_alive(entity) {
            return None;
        }
        let kid = self.kinds.lookup::<T>()?;
        let slot = self.slots.get(entity.index() as usize)?;
        slot.mapping
            .iter()
            .find(|(k, _)| *k == kid)
            .and_then(|(_, payload)| match payload {
                Payload::Instance(inst) => inst.as_any().downcast_ref::<T>(),
                Payload::Flag => None,
            })
    }

    /// Mutably borrow the component of kind `T` on `entity`, if present.
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        if !self.ids.is_alive(entity) {
            return None;
        }
        let kid = self.kinds.lookup::<T>()?;
        let slot = self.slots.get_mut(entity.index() as usize)?;
        slot.mapping
            .iter_mut()
            .find(|(k, _)| *k == kid)
            .and_then(|(_, payload)| match payload {
                Payload::Instance(inst) => inst.as_any_mut().downcast_mut::<T>(),
                Payload::Flag => None,
            })
    }

    /// Whether `entity` carries the kind `T` (behavioral or marker).
    pub fn has<T: 'static>(&self, entity: EntityId) -> bool {
        match self.kinds.lookup::<T>() {
            Some(kid) => self.has_kind(entity, kid),
            None => false,
        }
    }

    /// Whether `entity` carries the kind identified by `kid`.
    pub fn has_kind(&self, entity: EntityId, kid: KindId) -> bool {
        self.ids.is_alive(entity)
            && self
                .sets
                .get(kid.0 as usize)
                .map_or(false, |set| set.contains(entity.index()))
    }

    /// Whether `entity` carries every one of the given kinds.
    pub fn has_all(&self, entity: EntityId, kinds: &[KindId]) -> bool {
        kinds.iter().all(|&kid| self.has_kind(entity, kid))
    }

    /// Resolve the [`KindId`] for a behavioral kind, registering it on first
    /// use.
    pub fn kind<T: Component>(&mut self) -> KindId {
        let kid = self.kinds.ensure::<T>();
        self.ensure_set(kid);
        kid
    }

    /// Resolve the [`KindId`] for a marker kind, registering it on first use.
    pub fn marker_kind<M: Marker>(&mut self) -> KindId {
        let kid = self.kinds.ensure_marker::<M>();
        self.ensure_set(kid);
        kid
    }

    /// The kind registry, for metadata lookups.
    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    /// Build a reusable [`View`] over the given kinds.
    pub fn with(&self, kinds: &[KindId]) -> View {
        View::new(kinds)
    }

    // -- destruction --------------------------------------------------------

    /// Destroy an entity and, recursively, all of its children.
    ///
    /// Every behavioral instance on every destroyed entity receives
    /// `on_detach`, children are freed before their parents, and each
    /// identity returns to the recycling queue. The cost of freeing one
    /// entity is proportional to the kinds attached to it.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::DeadEntity`] if `entity` is already dead or the
    /// handle is stale. The identity is never queued for recycling twice.
    pub fn destroy(&mut self, entity: EntityId) -> Result<(), PoolError> {
        if !self.ids.is_alive(entity) {
            return Err(PoolError::DeadEntity(entity));
        }
        self.destroy_now(entity);
        self.flush_ops();
        Ok(())
    }

    /// Bulk-detach the given kinds from every entity carrying them.
    ///
    /// No `on_detach` hooks run; call sites that need teardown must run it
    /// before clearing. Entities themselves stay alive.
    pub fn clear(&mut self, kinds: &[KindId]) {
        for &kid in kinds {
            let members = match self.sets.get(kid.0 as usize) {
                Some(set) => set.dense().to_vec(),
                None => continue,
            };
            for index in members {
                self.sets[kid.0 as usize].remove(index);
                self.slots[index as usize].mapping.retain(|(k, _)| *k != kid);
            }
        }
    }

    // -- update pass --------------------------------------------------------

    /// Run one update pass: for every kind that declared `UPDATES`, in
    /// first-registration order, invoke `update(dt, clock)` on each attached
    /// instance.
    ///
    /// Each kind's membership is snapshotted before its pass; entities that
    /// die or shed the kind mid-pass are skipped, and structural requests
    /// from hooks are applied once after every kind has run.
    pub fn run_updates(&mut self, dt: f64, clock: f64) {
        let pass: Vec<KindId> = self.kinds.updatable().to_vec();
        for kid in pass {
            let snapshot = self.members_of(kid);
            for entity in snapshot {
                if !self.has_kind(entity, kid) {
                    continue;
                }
                let idx = entity.index() as usize;
                let Pool { slots, ops, .. } = self;
                if let Some((_, Payload::Instance(inst))) =
                    slots[idx].mapping.iter_mut().find(|(k, _)| *k == kid)
                {
                    let mut cx = Hooks::new(entity, ops);
                    inst.update(&mut cx, dt, clock);
                }
            }
        }
        self.flush_ops();
    }

    // -- bookkeeping --------------------------------------------------------

    /// Number of currently alive entities.
    pub fn len(&self) -> usize {
        self.ids.live_count()
    }

    /// Whether the pool holds no alive entities.
    pub fn is_empty(&self) -> bool {
        self.ids.live_count() == 0
    }

    /// Whether `entity` is alive and its generation current.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.ids.is_alive(entity)
    }

    /// Alive members of a kind, with full generational handles.
    pub(crate) fn members_of(&self, kid: KindId) -> Vec<EntityId> {
        match self.sets.get(kid.0 as usize) {
            Some(set) => set
                .dense()
                .iter()
                .filter_map(|&index| self.ids.entity_at(index))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Current member count of a kind's set.
    pub(crate) fn set_len(&self, kid: KindId) -> usize {
        self.sets.get(kid.0 as usize).map_or(0, |set| set.len())
    }

    fn ensure_set(&mut self, kid: KindId) {
        let idx = kid.0 as usize;
        if idx >= self.sets.len() {
            self.sets.resize_with(idx + 1, ComponentSet::new);
        }
    }

    /// Detach one kind from an alive entity. Runs `on_detach` for behavioral
    /// payloads. Returns `false` if the kind was not attached.
    fn detach_now(&mut self, entity: EntityId, kid: KindId) -> bool {
        let idx = entity.index() as usize;
        let pos = match self.slots[idx].mapping.iter().position(|(k, _)| *k == kid) {
            Some(pos) => pos,
            None => return false,
        };
        {
            let Pool { slots, ops, .. } = self;
            if let (_, Payload::Instance(inst)) = &mut slots[idx].mapping[pos] {
                let mut cx = Hooks::new(entity, ops);
                inst.on_detach(&mut cx);
            }
        }
        self.slots[idx].mapping.remove(pos);
        self.sets[kid.0 as usize].remove(entity.index());
        true
    }

    /// Destroy an alive entity and its subtree. Callers validate liveness.
    pub(crate) fn destroy_now(&mut self, root: EntityId) {
        if !self.ids.is_alive(root) {
            return;
        }
        let root_idx = root.index() as usize;
        // Unlink from the parent so the cascade never walks back up.
        if let Some(parent) = self.slots[root_idx].parent.take() {
            if self.ids.is_alive(parent) {
                self.slots[parent.index() as usize]
                    .children
                    .retain(|&c| c != root);
            }
        }
        // Gather the subtree breadth-first, then free leaves before parents.
        let mut order = vec![root];
        let mut cursor = 0;
        while cursor < order.len() {
            let e = order[cursor];
            cursor += 1;
            for &child in &self.slots[e.index() as usize].children {
                if self.ids.is_alive(child) {
                    order.push(child);
                }
            }
        }
        for &e in order.iter().rev() {
            self.free(e);
        }
    }

    /// Tear down one entity: `on_detach` for every behavioral payload, then
    /// drop the mapping, leave every set, and recycle the identity.
    fn free(&mut self, entity: EntityId) {
        let idx = entity.index() as usize;
        {
            let Pool { slots, ops, .. } = self;
            for i in 0..slots[idx].mapping.len() {
                if let (_, Payload::Instance(inst)) = &mut slots[idx].mapping[i] {
                    let mut cx = Hooks::new(entity, ops);
                    inst.on_detach(&mut cx);
                }
            }
        }
        let slot = &mut self.slots[idx];
        let mapping = std::mem::take(&mut slot.mapping);
        slot.parent = None;
        slot.children.clear();
        for (kid, _) in &mapping {
            self.sets[kid.0 as usize].remove(entity.index());
        }
        self.ids.release(entity);
    }

    /// Drain the deferred op queue. Ops queued by hooks that run during the
    /// drain are appended and handled in the same drain.
    fn flush_ops(&mut self) {
        while let Some(op) = self.ops.pop() {
            match op {
                Op::Destroy(entity) => {
                    if self.ids.is_alive(entity) {
                        self.destroy_now(entity);
                    } else {
                        tracing::warn!(%entity, "deferred destroy targets a dead entity, skipping");
                    }
                }
                Op::Detach(entity, type_id) => {
                    if !self.ids.is_alive(entity) {
                        tracing::warn!(%entity, "deferred detach targets a dead entity, skipping");
                        continue;
                    }
                    if let Some(kid) = self.kinds.lookup_type_id(type_id) {
                        self.detach_now(entity, kid);
                    }
                }
            }
        }
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
