//! Reusable multi-kind views.
//!
//! A [`View`] is a stored query: an ordered list of kinds whose intersection
//! it visits. It holds no entity data, so it stays valid across any amount
//! of churn and can be kept for the life of the pool.
//!
//! Iteration is driven by the smallest of the requested sets (ties go to the
//! kind listed first), with every other kind checked per candidate. The
//! driver's membership is snapshotted before the walk and every entry is
//! re-validated when reached, so the callback may freely create, destroy,
//! attach, and detach through the `&mut Pool` it receives.

use crate::entity::EntityId;
use crate::kind::KindId;
use crate::pool::Pool;

/// Callback verdict for [`View::each`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep visiting.
    Continue,
    /// End the whole pass now.
    Stop,
}

/// A stored query over the intersection of one or more kinds.
#[derive(Debug, Clone)]
pub struct View {
    kinds: Vec<KindId>,
}

impl View {
    /// Build a view over the given kinds. Usually reached through
    /// [`Pool::with`].
    pub fn new(kinds: &[KindId]) -> Self {
        Self {
            kinds: kinds.to_vec(),
        }
    }

    /// The kinds this view intersects, in the order they were requested.
    pub fn kinds(&self) -> &[KindId] {
        &self.kinds
    }

    /// Visit every alive entity carrying all of this view's kinds.
    ///
    /// The callback receives the pool and may mutate it structurally; the
    /// snapshot-and-revalidate policy guarantees no entity is visited after
    /// it dies or sheds a requested kind, and entities added mid-pass are
    /// picked up on the next pass, not this one. Returning [`Flow::Stop`]
    /// ends the pass early.
    pub fn each<F>(&self, pool: &mut Pool, mut f: F)
    where
        F: FnMut(&mut Pool, EntityId) -> Flow,
    {
        let driver = match self.pick_driver(pool) {
            Some(driver) => driver,
            None => return,
        };
        let snapshot = pool.members_of(driver);
        for entity in snapshot {
            if !pool.has_all(entity, &self.kinds) {
                continue;
            }
            if let Flow::Stop = f(pool, entity) {
                break;
            }
        }
    }

    /// Count the entities this view currently matches.
    pub fn count(&self, pool: &Pool) -> usize {
        let driver = match self.pick_driver(pool) {
            Some(driver) => driver,
            None => return 0,
        };
        pool.members_of(driver)
            .into_iter()
            .filter(|&entity| pool.has_all(entity, &self.kinds))
            .count()
    }

    /// The smallest requested set, ties broken by request order.
    fn pick_driver(&self, pool: &Pool) -> Option<KindId> {
        let mut kinds = self.kinds.iter().copied();
        let mut driver = kinds.next()?;
        let mut best = pool.set_len(driver);
        for kid in kinds {
            let len = pool.set_len(kid);
            if len < best {
                best = len;
                driver = kid;
            }
        }
        Some(driver)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{Component, Marker};
    use crate::pool::Seed;

    struct Pos {
        x: f32,
    }
    impl Component for Pos {}

    struct Vel {
        dx: f32,
    }
    impl Component for Vel {}

    struct Enemy;
    impl Marker for Enemy {}

    fn matched(view: &View, pool: &mut Pool) -> Vec<EntityId> {
        let mut out = Vec::new();
        view.each(pool, |_, e| {
            out.push(e);
            Flow::Continue
        });
        out
    }

    #[test]
    fn intersection_only() {
        let mut pool = Pool::new();
        let both = pool.create(
            Seed::new()
                .put(Pos { x: 0.0 })
                .put(Vel { dx: 1.0 }),
        );
        let _pos_only = pool.create_with(Pos { x: 1.0 });
        let _vel_only = pool.create_with(Vel { dx: 2.0 });
        let pos = pool.kind::<Pos>();
        let vel = pool.kind::<Vel>();
        let view = pool.with(&[pos, vel]);
        assert_eq!(matched(&view, &mut pool), vec![both]);
        assert!(pool.has_all(both, &[pos, vel]));

        // Shedding one kind empties the intersection.
        pool.remove::<Vel>(both).unwrap();
        assert!(matched(&view, &mut pool).is_empty());
    }

    #[test]
    fn smallest_set_drives_iteration_both_ways() {
        // Pos outnumbers Vel.
        let mut pool = Pool::new();
        for i in 0..10 {
            let e = pool.create_with(Pos { x: i as f32 });
            if i < 3 {
                pool.add(e, Vel { dx: 1.0 }).unwrap();
            }
        }
        let pos = pool.kind::<Pos>();
        let vel = pool.kind::<Vel>();
        assert_eq!(pool.with(&[pos, vel]).count(&pool), 3);
        // Same view with kinds listed the other way round.
        assert_eq!(pool.with(&[vel, pos]).count(&pool), 3);

        // Now invert the imbalance in a fresh pool.
        let mut pool = Pool::new();
        for i in 0..10 {
            let e = pool.create_with(Vel { dx: i as f32 });
            if i < 4 {
                pool.add(e, Pos { x: 0.0 }).unwrap();
            }
        }
        let pos = pool.kind::<Pos>();
        let vel = pool.kind::<Vel>();
        assert_eq!(pool.with(&[pos, vel]).count(&pool), 4);
        assert_eq!(pool.with(&[vel, pos]).count(&pool), 4);
    }

    #[test]
    fn never_populated_kind_matches_nothing() {
        let mut pool = Pool::new();
        let _ = pool.create_with(Pos { x: 0.0 });
        let pos = pool.kind::<Pos>();
        let vel = pool.kind::<Vel>();
        let view = pool.with(&[pos, vel]);
        assert_eq!(view.count(&pool), 0);
        assert!(matched(&view, &mut pool).is_empty());
    }

    #[test]
    fn views_mix_behavioral_and_marker_kinds() {
        let mut pool = Pool::new();
        let tagged = pool.create_with(Pos { x: 0.0 });
        pool.mark::<Enemy>(tagged).unwrap();
        let _plain = pool.create_with(Pos { x: 1.0 });
        let pos = pool.kind::<Pos>();
        let enemy = pool.marker_kind::<Enemy>();
        let view = pool.with(&[pos, enemy]);
        assert_eq!(matched(&view, &mut pool), vec![tagged]);
    }

    #[test]
    fn stop_ends_the_pass_early() {
        let mut pool = Pool::new();
        for i in 0..5 {
            pool.create_with(Pos { x: i as f32 });
        }
        let pos = pool.kind::<Pos>();
        let view = pool.with(&[pos]);
        let mut visited = 0;
        view.each(&mut pool, |_, _| {
            visited += 1;
            if visited == 2 {
                Flow::Stop
            } else {
                Flow::Continue
            }
        });
        assert_eq!(visited, 2);
    }

    #[test]
    fn destroy_during_iteration_is_safe() {
        let mut pool = Pool::new();
        let ids: Vec<EntityId> = (0..4).map(|i| pool.create_with(Pos { x: i as f32 })).collect();
        let pos = pool.kind::<Pos>();
        let view = pool.with(&[pos]);
        // Destroy a later entry while visiting an earlier one.
        let victim = ids[3];
        let mut visited = Vec::new();
        view.each(&mut pool, |pool, e| {
            visited.push(e);
            if e == ids[0] {
                pool.destroy(victim).unwrap();
            }
            Flow::Continue
        });
        assert!(!visited.contains(&victim));
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn detach_during_iteration_skips_the_entry() {
        let mut pool = Pool::new();
        let a = pool.create(Seed::new().put(Pos { x: 0.0 }).put(Vel { dx: 0.0 }));
        let b = pool.create(Seed::new().put(Pos { x: 1.0 }).put(Vel { dx: 1.0 }));
        let pos = pool.kind::<Pos>();
        let vel = pool.kind::<Vel>();
        let view = pool.with(&[pos, vel]);
        let mut visited = Vec::new();
        view.each(&mut pool, |pool, e| {
            visited.push(e);
            if e == a {
                pool.remove::<Vel>(b).unwrap();
            }
            Flow::Continue
        });
        assert_eq!(visited, vec![a]);
    }

    #[test]
    fn entities_created_mid_pass_wait_for_the_next_pass() {
        let mut pool = Pool::new();
        pool.create_with(Pos { x: 0.0 });
        let pos = pool.kind::<Pos>();
        let view = pool.with(&[pos]);
        let mut visited = 0;
        view.each(&mut pool, |pool, _| {
            pool.create_with(Pos { x: 99.0 });
            visited += 1;
            Flow::Continue
        });
        assert_eq!(visited, 1);
        assert_eq!(view.count(&pool), 2);
    }

    #[test]
    fn view_survives_arbitrary_churn() {
        let mut pool = Pool::new();
        let pos = pool.kind::<Pos>();
        let view = pool.with(&[pos]);
        assert_eq!(view.count(&pool), 0);
        let e = pool.create_with(Pos { x: 0.0 });
        assert_eq!(view.count(&pool), 1);
        pool.destroy(e).unwrap();
        assert_eq!(view.count(&pool), 0);
    }
}
