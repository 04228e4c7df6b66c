//! Opal Pool -- entity/component storage with lazy kinds and live views.
//!
//! Entities are generational handles backed by a recycling identity pool.
//! Component kinds register themselves on first use and come in two shapes:
//! *behavioral* kinds carry a payload instance with lifecycle hooks (`start`,
//! `on_attach`, `on_detach`, and a per-frame `update`), while *marker* kinds
//! are payload-free set membership. Views intersect any number of kinds,
//! drive iteration from the smallest matching set, and stay safe under
//! structural mutation from inside the pass.
//!
//! # Quick Start
//!
//! ```
//! use opal_pool::prelude::*;
//!
//! struct Position { x: f32, y: f32 }
//! impl Component for Position {}
//!
//! struct Velocity { dx: f32, dy: f32 }
//! impl Component for Velocity {}
//!
//! let mut pool = Pool::new();
//! let e = pool.create(
//!     Seed::new()
//!         .put(Position { x: 0.0, y: 0.0 })
//!         .put(Velocity { dx: 1.0, dy: 0.0 }),
//! );
//!
//! let pos = pool.kind::<Position>();
//! let vel = pool.kind::<Velocity>();
//! let movers = pool.with(&[pos, vel]);
//! movers.each(&mut pool, |pool, entity| {
//!     let dx = pool.get::<Velocity>(entity).map(|v| v.dx).unwrap_or(0.0);
//!     if let Some(p) = pool.get_mut::<Position>(entity) {
//!         p.x += dx;
//!     }
//!     Flow::Continue
//! });
//!
//! assert_eq!(pool.get::<Position>(e).map(|p| p.x), Some(1.0));
//! ```

#![deny(unsafe_code)]

pub mod entity;
pub mod hierarchy;
pub mod kind;
pub mod ops;
pub mod pool;
pub mod set;
pub mod view;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by pool operations.
///
/// Absence is not an error here: reading an unattached or never-registered
/// kind answers `None`/`false`, and detaching an absent kind is a no-op.
/// The one hard failure is addressing an entity that no longer exists.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The entity is dead or the handle's generation is stale.
    #[error("entity {0} is dead or stale")]
    DeadEntity(entity::EntityId),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::EntityId;
    pub use crate::hierarchy::Descendants;
    pub use crate::kind::{Component, KindId, KindInfo, KindShape, Marker};
    pub use crate::ops::Hooks;
    pub use crate::pool::{Pool, Seed};
    pub use crate::view::{Flow, View};
    pub use crate::PoolError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
