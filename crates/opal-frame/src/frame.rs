//! Per-frame scheduling over a [`Pool`].
//!
//! The [`FrameLoop`] drives a pool forward in frames. Each frame:
//!
//! 1. Every kind that declared `UPDATES` runs its update pass, in
//!    first-registration order, via [`Pool::run_updates`]. Structural
//!    requests from hooks apply once the pass completes.
//! 2. The installed [`Renderer`], if any, is invoked exactly once with the
//!    post-update pool.
//!
//! Because kind ordering is fixed for the process lifetime and deferred ops
//! apply FIFO, the same sequence of deltas over the same pool always produces
//! the same final state.
//!
//! # Example
//!
//! ```
//! use opal_frame::frame::{FrameConfig, FrameLoop};
//! use opal_pool::prelude::*;
//!
//! struct Spin { angle: f64 }
//! impl Component for Spin {
//!     const UPDATES: bool = true;
//!     fn update(&mut self, _cx: &mut Hooks<'_>, dt: f64, _clock: f64) {
//!         self.angle += dt;
//!     }
//! }
//!
//! let mut pool = Pool::new();
//! let e = pool.create_with(Spin { angle: 0.0 });
//!
//! let mut frames = FrameLoop::new(pool, FrameConfig { fixed_dt: 0.5 });
//! frames.run_frames(4);
//!
//! assert_eq!(frames.frame_count(), 4);
//! assert_eq!(frames.pool().get::<Spin>(e).map(|s| s.angle), Some(2.0));
//! ```

use opal_pool::pool::Pool;

// ---------------------------------------------------------------------------
// FrameConfig
// ---------------------------------------------------------------------------

/// Configuration for the frame loop.
///
/// `fixed_dt` is the duration in seconds of each [`FrameLoop::advance`]
/// frame. A value of `1.0 / 60.0` gives 60 frames per second.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Fixed time step in seconds per frame. Must be positive and finite.
    pub fixed_dt: f64,
}

impl Default for FrameConfig {
    /// Defaults to 60 Hz (1/60 second per frame).
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// The presentation seam.
///
/// The frame loop knows nothing about drawing; it promises only to hand the
/// post-update pool to the renderer exactly once per frame. Everything else
/// (backends, interpolation, culling) lives behind this trait.
pub trait Renderer {
    /// Present the pool's current state. Called once per frame, after every
    /// update pass has run and deferred ops have been applied.
    fn render(&mut self, pool: &Pool);
}

// ---------------------------------------------------------------------------
// FrameLoop
// ---------------------------------------------------------------------------

/// Drives a [`Pool`] forward one frame at a time.
///
/// The loop owns the pool. Between frames the pool is freely accessible
/// through [`pool`](FrameLoop::pool) and [`pool_mut`](FrameLoop::pool_mut).
pub struct FrameLoop {
    /// The pool being driven.
    pool: Pool,
    /// The installed presentation seam, if any.
    renderer: Option<Box<dyn Renderer>>,
    /// Number of frames executed so far.
    frame_counter: u64,
    /// Accumulated monotonic clock in seconds.
    clock: f64,
    /// Fixed time step in seconds per frame.
    fixed_dt: f64,
}

impl FrameLoop {
    /// Create a frame loop around a pool.
    ///
    /// The frame counter starts at 0 and the clock at 0.0.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn new(pool: Pool, config: FrameConfig) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        Self {
            pool,
            renderer: None,
            frame_counter: 0,
            clock: 0.0,
            fixed_dt: config.fixed_dt,
        }
    }

    /// Install the renderer. Replaces any previously installed one.
    pub fn set_renderer<R: Renderer + 'static>(&mut self, renderer: R) {
        self.renderer = Some(Box::new(renderer));
    }

    /// Advance one frame at the configured fixed time step.
    pub fn advance(&mut self) {
        self.step(self.fixed_dt);
    }

    /// Advance one frame with an explicit delta. The clock accumulates
    /// whatever deltas are supplied, so variable-rate callers stay monotonic.
    ///
    /// # Panics
    ///
    /// Panics if `dt` is not positive and finite.
    pub fn advance_by(&mut self, dt: f64) {
        assert!(
            dt > 0.0 && dt.is_finite(),
            "frame delta must be positive and finite, got {dt}"
        );
        self.step(dt);
    }

    /// Advance `n` frames at the fixed time step.
    pub fn run_frames(&mut self, n: u64) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn step(&mut self, dt: f64) {
        self.frame_counter += 1;
        self.clock += dt;
        self.pool.run_updates(dt, self.clock);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.render(&self.pool);
        }
        tracing::trace!(frame = self.frame_counter, dt, clock = self.clock, "frame complete");
    }

    /// Number of frames executed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Accumulated clock in seconds.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// The configured fixed time step.
    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    /// Shared access to the pool.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Mutable access to the pool, for setup between frames.
    pub fn pool_mut(&mut self) -> &mut Pool {
        &mut self.pool
    }

    /// Tear the loop down and recover the pool.
    pub fn into_pool(self) -> Pool {
        self.pool
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use opal_pool::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    // -- 1. Construction & configuration ------------------------------------

    #[test]
    fn default_config_is_60hz() {
        let frames = FrameLoop::new(Pool::new(), FrameConfig::default());
        assert!((frames.fixed_dt() - 1.0 / 60.0).abs() < 1e-12);
        assert_eq!(frames.frame_count(), 0);
        assert_eq!(frames.clock(), 0.0);
    }

    #[test]
    #[should_panic(expected = "fixed_dt must be positive and finite")]
    fn zero_dt_is_rejected() {
        let _ = FrameLoop::new(Pool::new(), FrameConfig { fixed_dt: 0.0 });
    }

    #[test]
    #[should_panic(expected = "fixed_dt must be positive and finite")]
    fn negative_dt_is_rejected() {
        let _ = FrameLoop::new(Pool::new(), FrameConfig { fixed_dt: -0.1 });
    }

    #[test]
    #[should_panic(expected = "fixed_dt must be positive and finite")]
    fn nan_dt_is_rejected() {
        let _ = FrameLoop::new(Pool::new(), FrameConfig { fixed_dt: f64::NAN });
    }

    #[test]
    #[should_panic(expected = "frame delta must be positive and finite")]
    fn advance_by_rejects_bad_deltas() {
        let mut frames = FrameLoop::new(Pool::new(), FrameConfig::default());
        frames.advance_by(0.0);
    }

    // -- 2. Advancing --------------------------------------------------------

    #[test]
    fn advance_counts_frames_and_clock() {
        let mut frames = FrameLoop::new(Pool::new(), FrameConfig { fixed_dt: 0.25 });
        frames.advance();
        frames.advance();
        assert_eq!(frames.frame_count(), 2);
        assert!((frames.clock() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn variable_deltas_accumulate_monotonically() {
        let mut frames = FrameLoop::new(Pool::new(), FrameConfig::default());
        frames.advance_by(1.0);
        frames.advance_by(0.5);
        frames.advance_by(2.0);
        assert_eq!(frames.frame_count(), 3);
        assert!((frames.clock() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn run_frames_batches_fixed_steps() {
        let mut frames = FrameLoop::new(Pool::new(), FrameConfig { fixed_dt: 0.1 });
        frames.run_frames(10);
        assert_eq!(frames.frame_count(), 10);
        assert!((frames.clock() - 1.0).abs() < 1e-9);
    }

    // -- 3. Update dispatch --------------------------------------------------

    struct Probe {
        seen: Vec<(f64, f64)>,
    }
    impl Component for Probe {
        const UPDATES: bool = true;
        fn update(&mut self, _cx: &mut Hooks<'_>, dt: f64, clock: f64) {
            self.seen.push((dt, clock));
        }
    }

    #[test]
    fn updates_receive_dt_and_accumulated_clock() {
        let mut pool = Pool::new();
        let e = pool.create_with(Probe { seen: Vec::new() });
        let mut frames = FrameLoop::new(pool, FrameConfig { fixed_dt: 0.5 });
        frames.advance();
        frames.advance_by(0.25);
        let seen = &frames.pool().get::<Probe>(e).unwrap().seen;
        assert_eq!(seen, &vec![(0.5, 0.5), (0.25, 0.75)]);
    }

    struct Timer {
        ttl: f64,
        elapsed: f64,
    }
    impl Component for Timer {
        const UPDATES: bool = true;
        fn update(&mut self, cx: &mut Hooks<'_>, dt: f64, _clock: f64) {
            self.elapsed += dt;
            if self.elapsed >= self.ttl {
                cx.destroy();
            }
        }
    }

    #[test]
    fn expiring_timer_destroys_its_entity_mid_frame() {
        let mut pool = Pool::new();
        let e = pool.create_with(Timer {
            ttl: 10.0,
            elapsed: 0.0,
        });
        let mut frames = FrameLoop::new(pool, FrameConfig::default());
        frames.advance_by(11.0);
        assert!(!frames.pool().is_alive(e));
        assert_eq!(frames.pool().len(), 0);
    }

    #[test]
    fn non_updating_kinds_never_run() {
        struct Inert {
            touched: bool,
        }
        impl Component for Inert {
            fn update(&mut self, _cx: &mut Hooks<'_>, _dt: f64, _clock: f64) {
                self.touched = true;
            }
        }
        let mut pool = Pool::new();
        let e = pool.create_with(Inert { touched: false });
        let mut frames = FrameLoop::new(pool, FrameConfig::default());
        frames.run_frames(5);
        assert!(!frames.pool().get::<Inert>(e).unwrap().touched);
    }

    // -- 4. Renderer ---------------------------------------------------------

    struct CountingRenderer {
        calls: Rc<RefCell<u64>>,
        last_len: Rc<RefCell<usize>>,
    }
    impl Renderer for CountingRenderer {
        fn render(&mut self, pool: &Pool) {
            *self.calls.borrow_mut() += 1;
            *self.last_len.borrow_mut() = pool.len();
        }
    }

    #[test]
    fn renderer_runs_exactly_once_per_frame() {
        let calls = Rc::new(RefCell::new(0));
        let last_len = Rc::new(RefCell::new(0));
        let mut pool = Pool::new();
        // Several updatable kinds; still one render per frame.
        pool.create_with(Probe { seen: Vec::new() });
        pool.create_with(Timer {
            ttl: 1000.0,
            elapsed: 0.0,
        });
        let mut frames = FrameLoop::new(pool, FrameConfig::default());
        frames.set_renderer(CountingRenderer {
            calls: calls.clone(),
            last_len: last_len.clone(),
        });
        frames.run_frames(7);
        assert_eq!(*calls.borrow(), 7);
    }

    #[test]
    fn renderer_sees_post_update_state() {
        let calls = Rc::new(RefCell::new(0));
        let last_len = Rc::new(RefCell::new(usize::MAX));
        let mut pool = Pool::new();
        let _doomed = pool.create_with(Timer {
            ttl: 0.5,
            elapsed: 0.0,
        });
        let mut frames = FrameLoop::new(pool, FrameConfig::default());
        frames.set_renderer(CountingRenderer {
            calls: calls.clone(),
            last_len: last_len.clone(),
        });
        frames.advance_by(1.0);
        // The timer fired and its entity was already gone when render ran.
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(*last_len.borrow(), 0);
    }

    #[test]
    fn missing_renderer_is_fine() {
        let mut pool = Pool::new();
        pool.create_with(Probe { seen: Vec::new() });
        let mut frames = FrameLoop::new(pool, FrameConfig::default());
        frames.run_frames(3);
        assert_eq!(frames.frame_count(), 3);
    }

    #[test]
    fn into_pool_recovers_the_pool() {
        let mut pool = Pool::new();
        let e = pool.create_empty();
        let mut frames = FrameLoop::new(pool, FrameConfig::default());
        frames.run_frames(2);
        let pool = frames.into_pool();
        assert!(pool.is_alive(e));
    }
}
