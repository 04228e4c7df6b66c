//! Component kinds: traits, capability metadata, and lazy registration.
//!
//! A *kind* is a component type the pool knows about. Kinds are never
//! declared upfront; the [`KindRegistry`] assigns a dense [`KindId`] the first
//! time a kind is used (attached, marked, or resolved for a view), and that
//! first-use order is the stable update order for the process lifetime.
//!
//! Kinds come in two shapes. *Behavioral* kinds implement [`Component`] and
//! carry a payload instance plus lifecycle hooks. *Marker* kinds implement
//! [`Marker`] and record bare set membership with no payload at all.

use crate::entity::EntityId;
use crate::ops::Hooks;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Component and Marker traits
// ---------------------------------------------------------------------------

/// A behavioral component kind.
///
/// Capabilities are declared as associated consts and recorded once at first
/// registration; the pool never inspects instances to discover them.
///
/// * [`UPDATES`](Component::UPDATES) opts the kind into the per-frame
///   [`update`](Component::update) pass.
/// * [`SELF_AWARE`](Component::SELF_AWARE) requests a one-time
///   [`bind`](Component::bind) call at attach time so the instance can keep a
///   handle to its owning entity.
///
/// All hooks default to no-ops; implement only what the kind needs.
pub trait Component: 'static {
    /// Whether this kind participates in the per-frame update pass.
    const UPDATES: bool = false;
    /// Whether this kind wants its owning [`EntityId`] injected at attach.
    const SELF_AWARE: bool = false;

    /// Receive the owning entity's id. Called exactly once, before any other
    /// hook, and only when [`SELF_AWARE`](Component::SELF_AWARE) is `true`.
    fn bind(&mut self, _entity: EntityId) {}

    /// Called once per instance after the whole seed it arrived in has been
    /// attached. Components seeded together can rely on each other here.
    fn start(&mut self, _cx: &mut Hooks<'_>) {}

    /// Called when the instance is attached to an entity.
    fn on_attach(&mut self, _cx: &mut Hooks<'_>) {}

    /// Called when the instance is detached (explicit removal, replacement,
    /// or entity destruction).
    fn on_detach(&mut self, _cx: &mut Hooks<'_>) {}

    /// Per-frame step. `dt` is the frame delta, `clock` the accumulated
    /// monotonic time. Only called when [`UPDATES`](Component::UPDATES) is
    /// `true`.
    fn update(&mut self, _cx: &mut Hooks<'_>, _dt: f64, _clock: f64) {}
}

/// A marker component kind: pure set membership, no payload, no hooks.
pub trait Marker: 'static {}

// ---------------------------------------------------------------------------
// Erased
// ---------------------------------------------------------------------------

/// Object-safe mirror of [`Component`] so the pool can store payloads as
/// `Box<dyn Erased>` and still downcast back to the concrete type.
pub(crate) trait Erased: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn bind(&mut self, entity: EntityId);
    fn start(&mut self, cx: &mut Hooks<'_>);
    fn on_attach(&mut self, cx: &mut Hooks<'_>);
    fn on_detach(&mut self, cx: &mut Hooks<'_>);
    fn update(&mut self, cx: &mut Hooks<'_>, dt: f64, clock: f64);
}

impl<T: Component> Erased for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn bind(&mut self, entity: EntityId) {
        Component::bind(self, entity);
    }

    fn start(&mut self, cx: &mut Hooks<'_>) {
        Component::start(self, cx);
    }

    fn on_attach(&mut self, cx: &mut Hooks<'_>) {
        Component::on_attach(self, cx);
    }

    fn on_detach(&mut self, cx: &mut Hooks<'_>) {
        Component::on_detach(self, cx);
    }

    fn update(&mut self, cx: &mut Hooks<'_>, dt: f64, clock: f64) {
        Component::update(self, cx, dt, clock);
    }
}

// ---------------------------------------------------------------------------
// KindId, KindShape, KindInfo
// ---------------------------------------------------------------------------

/// Opaque, lightweight identifier for a registered kind.
///
/// Ids are dense and assigned in first-registration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KindId(pub(crate) u32);

impl fmt::Debug for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KindId({})", self.0)
    }
}

/// Whether a kind carries a payload instance or is a bare membership flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindShape {
    /// Payload-carrying kind with lifecycle hooks.
    Behavioral,
    /// Payload-free membership flag.
    Marker,
}

/// Metadata about a registered kind, captured once at first registration.
#[derive(Debug, Clone)]
pub struct KindInfo {
    /// Id assigned at first registration.
    pub id: KindId,
    /// Rust type name, for diagnostics.
    pub name: &'static str,
    /// Behavioral or marker.
    pub shape: KindShape,
    /// Declared [`Component::UPDATES`] capability.
    pub updates: bool,
    /// Declared [`Component::SELF_AWARE`] capability.
    pub self_aware: bool,
}

// ---------------------------------------------------------------------------
// KindRegistry
// ---------------------------------------------------------------------------

/// Maps Rust types to [`KindId`]s and their metadata.
///
/// A type registers at most once; later `ensure` calls for the same Rust
/// `TypeId` return the existing id.
#[derive(Debug)]
pub struct KindRegistry {
    /// TypeId -> KindId for dedup.
    by_type: HashMap<TypeId, KindId>,
    /// Indexed by KindId.0.
    infos: Vec<KindInfo>,
    /// Kinds that declared `UPDATES`, in first-registration order.
    updatable: Vec<KindId>,
}

impl KindRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            by_type: HashMap::new(),
            infos: Vec::new(),
            updatable: Vec::new(),
        }
    }

    /// Resolve the [`KindId`] for a behavioral kind, registering it on first
    /// use.
    pub fn ensure<T: Component>(&mut self) -> KindId {
        let rust_type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&rust_type_id) {
            return existing;
        }
        let id = self.push(KindInfo {
            id: KindId(self.infos.len() as u32),
            name: std::any::type_name::<T>(),
            shape: KindShape::Behavioral,
            updates: T::UPDATES,
            self_aware: T::SELF_AWARE,
        });
        self.by_type.insert(rust_type_id, id);
        id
    }

    /// Resolve the [`KindId`] for a marker kind, registering it on first use.
    pub fn ensure_marker<M: Marker>(&mut self) -> KindId {
        let rust_type_id = TypeId::of::<M>();
        if let Some(&existing) = self.by_type.get(&rust_type_id) {
            return existing;
        }
        let id = self.push(KindInfo {
            id: KindId(self.infos.len() as u32),
            name: std::any::type_name::<M>(),
            shape: KindShape::Marker,
            updates: false,
            self_aware: false,
        });
        self.by_type.insert(rust_type_id, id);
        id
    }

    fn push(&mut self, info: KindInfo) -> KindId {
        let id = info.id;
        tracing::debug!(kind = info.name, id = id.0, shape = ?info.shape, "registered kind");
        if info.updates {
            self.updatable.push(id);
        }
        self.infos.push(info);
        id
    }

    /// Look up a kind by its Rust `TypeId` without registering it.
    pub fn lookup<T: 'static>(&self) -> Option<KindId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Look up a kind by a runtime `TypeId`. Used when resolving deferred
    /// detach ops, which carry the `TypeId` rather than a generic parameter.
    pub(crate) fn lookup_type_id(&self, type_id: TypeId) -> Option<KindId> {
        self.by_type.get(&type_id).copied()
    }

    /// Get the [`KindInfo`] for a registered kind id.
    pub fn info(&self, id: KindId) -> Option<&KindInfo> {
        self.infos.get(id.0 as usize)
    }

    /// Kinds that declared `UPDATES`, in first-registration order.
    pub fn updatable(&self) -> &[KindId] {
        &self.updatable
    }

    /// Total number of registered kinds.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Whether any kinds have been registered.
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
