//! # Emitters
//!
//! An emitter accumulates elapsed time and, for every full interval, spawns
//! one proxy per prototype. Spawning stops at the spawn cap, the maximum
//! number of live descendants. A grandchild counts against every emitter
//! above it, so a nested emitter can only spawn while each of its ancestors
//! has room. Time that could not be spent because of a cap is dropped down
//! to less than one interval, so a long stall never turns into a burst after
//! the cap frees up.

use std::sync::Arc;

use ember_core::{ProxyId, ProxyPool};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::context::ContextSnapshot;
use crate::proxy::{Lineage, RuntimeProxy};
use crate::tree::CompiledTree;

/// Smallest accepted spawn interval, in seconds.
pub const MIN_INTERVAL: f32 = 0.001;

/// Per-proxy emitter bookkeeping.
#[derive(Clone, Debug, PartialEq)]
pub struct EmitterState {
    interval: f32,
    spawn_cap: u32,
    accumulated: f32,
    live_descendants: u32,
    /// This emitter followed by its ancestors; handed to every child.
    lineage: Option<Lineage>,
}

impl EmitterState {
    /// Creates an idle emitter.
    #[must_use]
    pub fn new(interval: f32, spawn_cap: u32) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            spawn_cap,
            accumulated: 0.0,
            live_descendants: 0,
            lineage: None,
        }
    }

    /// Seconds between spawn rounds.
    #[must_use]
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Maximum live descendants.
    #[must_use]
    pub fn spawn_cap(&self) -> u32 {
        self.spawn_cap
    }

    /// Time not yet spent on spawns.
    #[must_use]
    pub fn accumulated(&self) -> f32 {
        self.accumulated
    }

    /// Proxies below this emitter, at any depth, that are still in the pool
    /// or queued for it.
    #[must_use]
    pub fn live_descendants(&self) -> u32 {
        self.live_descendants
    }

    /// Spawns the cap still allows.
    #[must_use]
    pub fn headroom(&self) -> u32 {
        self.spawn_cap.saturating_sub(self.live_descendants)
    }

    /// Takes new parameters from a redeclaration. Accumulated time and the
    /// descendant count carry over.
    pub(crate) fn reconfigure(&mut self, interval: f32, spawn_cap: u32) {
        self.interval = interval.max(MIN_INTERVAL);
        self.spawn_cap = spawn_cap;
    }

    /// Records descendants spawned further down the tree.
    pub(crate) fn descendants_added(&mut self, count: u32) {
        self.live_descendants = self.live_descendants.saturating_add(count);
    }

    /// Records that one descendant left the pool (or was never inserted).
    pub(crate) fn descendant_removed(&mut self) {
        self.live_descendants = self.live_descendants.saturating_sub(1);
    }

    /// Adds `elapsed` seconds and returns how many children to spawn now.
    ///
    /// Spawn `k` uses prototype `k % prototype_count`. `room` is an extra
    /// limit from the pool's free space and the ancestors' caps. The
    /// returned children are already counted as live.
    pub fn accumulate(&mut self, elapsed: f32, prototype_count: usize, room: u32) -> u32 {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulated += elapsed;
        }
        if prototype_count == 0 {
            self.accumulated = 0.0;
            return 0;
        }

        let limit = self.headroom().min(room);
        let mut spawned = 0_u32;
        while self.accumulated >= self.interval && spawned < limit {
            for _ in 0..prototype_count {
                if spawned >= limit {
                    break;
                }
                spawned += 1;
            }
            self.accumulated -= self.interval;
        }
        if self.accumulated >= self.interval {
            // Blocked by a cap: keep less than one interval.
            self.accumulated %= self.interval;
        }

        self.live_descendants += spawned;
        spawned
    }

    fn lineage(&mut self, id: ProxyId, ancestors: &[ProxyId]) -> Lineage {
        let lineage = self.lineage.get_or_insert_with(|| {
            std::iter::once(id).chain(ancestors.iter().copied()).collect()
        });
        Arc::clone(lineage)
    }
}

/// Runs the emission pass over the pool.
///
/// New children are pushed to `pending`; the pool itself is not resized here.
/// Returns the number of children queued.
pub(crate) fn emission_pass(
    pool: &mut ProxyPool<RuntimeProxy>,
    tree: &CompiledTree,
    pending: &mut Vec<RuntimeProxy>,
    rng: &mut ChaCha8Rng,
    system: &ContextSnapshot,
    elapsed: f32,
) -> u32 {
    let mut room = u32::try_from(pool.free_count()).unwrap_or(u32::MAX);
    let mut queued = 0_u32;

    let emitters: Vec<ProxyId> = pool
        .iter()
        .filter(|(_, proxy)| proxy.is_emitter())
        .map(|(id, _)| id)
        .collect();

    for id in emitters {
        let Some(proxy) = pool.get(id) else {
            continue;
        };
        let Some(slot) = tree.slot(proxy.slot) else {
            continue;
        };
        let headroom = ancestor_headroom(pool, &proxy.ancestors);

        let Some(proxy) = pool.get_mut(id) else {
            continue;
        };
        let RuntimeProxy {
            emitter,
            physics,
            ancestors,
            ..
        } = proxy;
        let Some(emitter) = emitter.as_mut() else {
            continue;
        };

        let prototypes = slot.prototypes();
        let count = emitter.accumulate(elapsed, prototypes.len(), room.min(headroom));
        if count == 0 {
            continue;
        }
        let lineage = emitter.lineage(id, ancestors);
        let mut spawned = 0_u32;
        for k in 0..count as usize {
            let child_index = prototypes[k % prototypes.len()];
            let Some(child_slot) = tree.slot(child_index) else {
                emitter.descendant_removed();
                continue;
            };
            let seed: [u8; 4] = rng.gen();
            pending.push(RuntimeProxy::spawn(
                child_index,
                child_slot,
                Some((&lineage, &*physics)),
                system,
                seed,
            ));
            spawned += 1;
        }

        for &ancestor in &lineage[1..] {
            if let Some(emitter) = pool.get_mut(ancestor).and_then(|p| p.emitter.as_mut()) {
                emitter.descendants_added(spawned);
            }
        }
        room -= count;
        queued += spawned;
    }

    if queued > 0 {
        tracing::trace!(queued, frame = system.frame, "emission pass queued children");
    }
    queued
}

/// Smallest headroom among the live emitters in `ancestors`.
fn ancestor_headroom(pool: &ProxyPool<RuntimeProxy>, ancestors: &[ProxyId]) -> u32 {
    ancestors
        .iter()
        .filter_map(|&id| pool.get(id)?.emitter.as_ref())
        .map(EmitterState::headroom)
        .min()
        .unwrap_or(u32::MAX)
}

/// Frees one spawn-cap slot on every ancestor still in the pool.
pub(crate) fn release_descendant(pool: &mut ProxyPool<RuntimeProxy>, ancestors: &[ProxyId]) {
    for &id in ancestors {
        if let Some(emitter) = pool.get_mut(id).and_then(|proxy| proxy.emitter.as_mut()) {
            emitter.descendant_removed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_cap_bounds_catch_up() {
        let mut emitter = EmitterState::new(0.1, 5);
        assert_eq!(emitter.accumulate(10.0, 1, u32::MAX), 5);
        assert!(emitter.accumulated() < emitter.interval());
        assert_eq!(emitter.live_descendants(), 5);
        // Still capped.
        assert_eq!(emitter.accumulate(10.0, 1, u32::MAX), 0);
    }

    #[test]
    fn test_one_round_per_interval() {
        let mut emitter = EmitterState::new(0.5, 100);
        assert_eq!(emitter.accumulate(0.25, 2, u32::MAX), 0);
        assert_eq!(emitter.accumulate(0.25, 2, u32::MAX), 2);
        assert_eq!(emitter.accumulate(1.0, 2, u32::MAX), 4);
    }

    #[test]
    fn test_cap_applies_mid_round() {
        let mut emitter = EmitterState::new(1.0, 4);
        assert_eq!(emitter.accumulate(5.0, 3, u32::MAX), 4);
    }

    #[test]
    fn test_room_limits_spawns() {
        let mut emitter = EmitterState::new(0.1, 50);
        assert_eq!(emitter.accumulate(1.0, 1, 3), 3);
    }

    #[test]
    fn test_no_prototypes_discards_time() {
        let mut emitter = EmitterState::new(0.1, 5);
        assert_eq!(emitter.accumulate(3.0, 0, u32::MAX), 0);
        assert_eq!(emitter.accumulated(), 0.0);
    }

    #[test]
    fn test_descendant_removed_frees_cap() {
        let mut emitter = EmitterState::new(0.1, 1);
        assert_eq!(emitter.accumulate(0.1, 1, u32::MAX), 1);
        assert_eq!(emitter.accumulate(0.1, 1, u32::MAX), 0);
        emitter.descendant_removed();
        assert_eq!(emitter.accumulate(0.0, 1, u32::MAX), 1);
        emitter.descendant_removed();
        emitter.descendant_removed();
        assert_eq!(emitter.live_descendants(), 0);
    }

    #[test]
    fn test_grandchildren_use_up_headroom() {
        let mut emitter = EmitterState::new(0.1, 4);
        assert_eq!(emitter.accumulate(0.1, 1, u32::MAX), 1);
        emitter.descendants_added(3);
        assert_eq!(emitter.headroom(), 0);
        assert_eq!(emitter.accumulate(1.0, 1, u32::MAX), 0);
        emitter.descendant_removed();
        assert_eq!(emitter.accumulate(0.1, 1, u32::MAX), 1);
    }

    #[test]
    fn test_lineage_lists_emitter_then_ancestors() {
        let mut emitter = EmitterState::new(0.1, 4);
        let outer = ProxyId::new(0, 0);
        let inner = ProxyId::new(3, 1);
        let lineage = emitter.lineage(inner, &[outer]);
        assert_eq!(&lineage[..], &[inner, outer]);
        assert!(Arc::ptr_eq(&lineage, &emitter.lineage(inner, &[outer])));
    }

    #[test]
    fn test_negative_elapsed_ignored() {
        let mut emitter = EmitterState::new(0.1, 5);
        assert_eq!(emitter.accumulate(-4.0, 1, u32::MAX), 0);
        assert_eq!(emitter.accumulated(), 0.0);
    }
}
