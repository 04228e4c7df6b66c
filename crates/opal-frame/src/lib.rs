//! Opal Frame -- per-frame scheduler for an Opal [`Pool`](opal_pool::pool::Pool).
//!
//! This crate builds on [`opal_pool`] to provide the simulation driver: a
//! frame loop that runs every updatable kind's pass in first-registration
//! order, applies deferred structural ops, and hands the resulting pool to a
//! [`Renderer`](frame::Renderer) exactly once per frame.
//!
//! # Quick Start
//!
//! ```
//! use opal_frame::prelude::*;
//!
//! struct Clockwork { ticks: u32 }
//! impl Component for Clockwork {
//!     const UPDATES: bool = true;
//!     fn update(&mut self, _cx: &mut Hooks<'_>, _dt: f64, _clock: f64) {
//!         self.ticks += 1;
//!     }
//! }
//!
//! let mut pool = Pool::new();
//! let e = pool.create_with(Clockwork { ticks: 0 });
//!
//! let mut frames = FrameLoop::new(pool, FrameConfig::default());
//! frames.run_frames(100);
//!
//! assert_eq!(frames.frame_count(), 100);
//! assert_eq!(frames.pool().get::<Clockwork>(e).map(|c| c.ticks), Some(100));
//! ```

#![deny(unsafe_code)]

pub mod frame;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the pool crate for convenience.
pub use opal_pool;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    // Re-export everything from the pool prelude.
    pub use opal_pool::prelude::*;

    // Frame-specific exports.
    pub use crate::frame::{FrameConfig, FrameLoop, Renderer};
}
