//! # Simulation
//!
//! The frame loop. One [`Simulation`] owns the proxy pool, the compiled
//! declaration and the shared context, and advances all of them together.
//!
//! ## Tick phases
//!
//! 1. Physics update, every proxy, canonical property order
//! 2. Render-state update (render behaviors, then transitions)
//! 3. Frame counter, simulation time and frame rate advance once
//! 4. Emission; new children are queued and inserted at the end of the phase
//! 5. Render pass over every proxy in the pool
//! 6. Expiration sweep; death hooks run, removals are flushed at the end
//!
//! A proxy that expires on a tick is therefore still drawn on that tick.

use std::sync::Arc;

use ember_core::{PhysicsState, ProxyId, ProxyPool};
use glam::Vec2;
use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace, warn};

use crate::config::SimulationConfig;
use crate::context::{ContextHandle, ContextSnapshot, SharedContext, SystemContext};
use crate::emitter;
use crate::error::EmberResult;
use crate::node::Declaration;
use crate::proxy::RuntimeProxy;
use crate::reconcile::{self, ReconcileReport};
use crate::render::{NullSurface, RenderItem, RenderSurface, RenderTag, RenderState};
use crate::tree::CompiledTree;

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Frame number after the tick.
    pub frame: u64,
    /// Children inserted by the emission pass.
    pub spawned: u32,
    /// Children lost because the pool was full.
    pub dropped: u32,
    /// Proxies removed by the sweep.
    pub expired: u32,
    /// Proxies alive after the tick.
    pub alive: usize,
}

/// Approximate memory use of a simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemorySummary {
    /// Nodes in the current declaration.
    pub node_count: usize,
    /// Live proxies.
    pub proxy_count: usize,
    /// Live proxies that are emitters.
    pub emitter_count: usize,
    /// Queued inserts and removals (zero between ticks).
    pub pending: usize,
    /// Packed per-proxy state (physics plus render).
    pub bytes_per_proxy: usize,
    /// Packed state of every live proxy.
    pub approximate_bytes: usize,
}

impl std::fmt::Display for MemorySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} node(s), {} proxies ({} emitters), {} B/proxy, ~{} B",
            self.node_count,
            self.proxy_count,
            self.emitter_count,
            self.bytes_per_proxy,
            self.approximate_bytes
        )
    }
}

/// A declarative particle simulation.
///
/// # Example
///
/// ```rust,ignore
/// use ember::{EntityNode, Simulation};
/// use glam::Vec2;
///
/// let mut sim = Simulation::default();
/// sim.declare(EntityNode::emitter(0.1, vec![EntityNode::leaf().with_lifetime(1.0)]))?;
/// loop {
///     let report = sim.tick(1.0 / 60.0, Vec2::new(800.0, 600.0));
///     for (tag, proxy) in sim.render_list() {
///         // draw `tag` at `proxy.physics().position()`
///     }
/// }
/// ```
pub struct Simulation {
    config: SimulationConfig,
    context: SharedContext,
    pool: ProxyPool<RuntimeProxy>,
    tree: Option<CompiledTree>,
    pending_inserts: Vec<RuntimeProxy>,
    pending_removals: Vec<ProxyId>,
    rng: ChaCha8Rng,
    frame_output: Vec<RenderItem>,
    dropped_spawns: u64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::build(SimulationConfig::default())
    }
}

impl Simulation {
    /// Creates a simulation from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EmberError::InvalidConfig`] if `config` is out of range.
    pub fn new(config: SimulationConfig) -> EmberResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Creates a simulation with default settings and a pool of `capacity`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::build(SimulationConfig {
            max_proxies: capacity,
            ..SimulationConfig::default()
        })
    }

    fn build(config: SimulationConfig) -> Self {
        let context = Arc::new(RwLock::new(SystemContext::new(&config)));
        Self {
            pool: ProxyPool::new(config.max_proxies),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            context,
            tree: None,
            pending_inserts: Vec::new(),
            pending_removals: Vec::new(),
            frame_output: Vec::new(),
            dropped_spawns: 0,
            config,
        }
    }

    // =========================================================================
    // DECLARATION
    // =========================================================================

    /// Applies a declaration.
    ///
    /// The first call instantiates one proxy per root. Later calls reconcile:
    /// every live proxy takes the behaviors of the node at its position in the
    /// new tree, and future spawns use the new prototypes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EmberError::StructuralMismatch`] if the new tree does
    /// not have the shape of the current one. Nothing is changed in that case.
    pub fn declare(&mut self, declaration: impl Into<Declaration>) -> EmberResult<ReconcileReport> {
        let declaration = declaration.into();
        let next = CompiledTree::compile(&declaration, self.config.default_spawn_cap);

        let Some(previous) = &self.tree else {
            let spawned = self.instantiate_roots(&next);
            info!(
                roots = next.roots().len(),
                nodes = next.len(),
                spawned,
                "declaration instantiated"
            );
            self.tree = Some(next);
            return Ok(ReconcileReport::default());
        };

        if let Err(err) = reconcile::check_shape(previous, &next) {
            warn!(%err, "redeclaration rejected");
            return Err(err);
        }
        let report = reconcile::transplant(&mut self.pool, &next);
        debug!(
            proxies = report.proxies_updated,
            emitters = report.emitters_updated,
            "declaration reconciled"
        );
        self.tree = Some(next);
        Ok(report)
    }

    fn instantiate_roots(&mut self, tree: &CompiledTree) -> usize {
        let system = self.context.read().snapshot();
        let mut spawned = 0;
        for &index in tree.roots() {
            let Some(slot) = tree.slot(index) else {
                continue;
            };
            let seed: [u8; 4] = self.rng.gen();
            let mut proxy = RuntimeProxy::spawn(index, slot, None, &system, seed);
            if self
                .pool
                .insert_with(|id| {
                    proxy.id = id;
                    proxy
                })
                .is_some()
            {
                spawned += 1;
            } else {
                self.dropped_spawns += 1;
                warn!(slot = index, "proxy pool full, root dropped");
            }
        }
        spawned
    }

    // =========================================================================
    // FRAME LOOP
    // =========================================================================

    /// Advances one frame without an external surface.
    ///
    /// The drawn proxies are available from [`Simulation::last_frame`].
    pub fn tick(&mut self, elapsed: f32, bounds: Vec2) -> TickReport {
        self.tick_with(elapsed, bounds, &mut NullSurface)
    }

    /// Advances one frame, drawing onto `surface` during the render pass.
    pub fn tick_with(
        &mut self,
        elapsed: f32,
        bounds: Vec2,
        surface: &mut impl RenderSurface,
    ) -> TickReport {
        let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
        let system = {
            let mut context = self.context.write();
            context.set_bounds(bounds);
            context.snapshot()
        };
        let tree = self.tree.as_ref();

        // Phase 1: physics
        for proxy in self.pool.values_mut() {
            proxy.update_physics(&system);
        }

        // Phase 2: render state
        for proxy in self.pool.values_mut() {
            let transitions = tree
                .and_then(|tree| tree.slot(proxy.slot))
                .map_or(&[][..], |slot| &slot.transitions[..]);
            proxy.update_render(transitions, &system);
        }

        // Phase 3: advance the frame
        let system = {
            let mut context = self.context.write();
            context.advance(elapsed);
            context.snapshot()
        };

        // Phase 4: emission
        let (spawned, dropped) = match tree {
            Some(tree) => {
                emitter::emission_pass(
                    &mut self.pool,
                    tree,
                    &mut self.pending_inserts,
                    &mut self.rng,
                    &system,
                    elapsed,
                );
                flush_inserts(&mut self.pool, &mut self.pending_inserts)
            }
            None => (0, 0),
        };
        if dropped > 0 {
            self.dropped_spawns += u64::from(dropped);
            warn!(dropped, "proxy pool full, spawns dropped");
        }

        // Phase 5: render
        surface.begin_frame(system.frame);
        self.frame_output.clear();
        for proxy in self.pool.values() {
            surface.draw(proxy.tag, proxy);
            self.frame_output.push(RenderItem::of(proxy));
        }
        surface.end_frame();

        // Phase 6: expiration sweep
        for (id, proxy) in self.pool.iter_mut() {
            if proxy.expired || system.time < proxy.expiration() {
                continue;
            }
            proxy.expired = true;
            if let Some(hook) = tree
                .and_then(|tree| tree.slot(proxy.slot))
                .and_then(|slot| slot.on_death.as_ref())
            {
                hook(&*proxy);
            }
            self.pending_removals.push(id);
        }
        let expired = flush_removals(&mut self.pool, &mut self.pending_removals);

        let report = TickReport {
            frame: system.frame,
            spawned,
            dropped,
            expired,
            alive: self.pool.len(),
        };
        if system.debug {
            debug!(
                frame = report.frame,
                spawned = report.spawned,
                expired = report.expired,
                alive = report.alive,
                "tick"
            );
        } else {
            trace!(frame = report.frame, alive = report.alive, "tick");
        }
        report
    }

    // =========================================================================
    // OUTPUT
    // =========================================================================

    /// Every live proxy with its tag, in pool order.
    pub fn render_list(&self) -> impl Iterator<Item = (RenderTag, &RuntimeProxy)> {
        self.pool.values().map(|proxy| (proxy.tag, proxy))
    }

    /// What the last render pass drew, including proxies swept afterwards.
    #[must_use]
    pub fn last_frame(&self) -> &[RenderItem] {
        &self.frame_output
    }

    /// Approximate memory use.
    #[must_use]
    pub fn summary(&self) -> MemorySummary {
        let bytes_per_proxy = PhysicsState::SIZE + std::mem::size_of::<RenderState>();
        let proxy_count = self.pool.len();
        MemorySummary {
            node_count: self.tree.as_ref().map_or(0, CompiledTree::len),
            proxy_count,
            emitter_count: self.pool.values().filter(|proxy| proxy.is_emitter()).count(),
            pending: self.pending_inserts.len() + self.pending_removals.len(),
            bytes_per_proxy,
            approximate_bytes: bytes_per_proxy * proxy_count,
        }
    }

    /// A weak view of the context for outside readers.
    #[must_use]
    pub fn context_handle(&self) -> ContextHandle {
        ContextHandle::new(&self.context)
    }

    /// Current context values.
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        self.context.read().snapshot()
    }

    /// Sets the viewport bounds used by unit-space start positions.
    ///
    /// `tick` also updates them; call this before the first `declare` so root
    /// proxies resolve against the real viewport.
    pub fn set_bounds(&mut self, bounds: Vec2) {
        self.context.write().set_bounds(bounds);
    }

    /// Enables or disables per-tick debug logging.
    pub fn set_debug(&mut self, debug: bool) {
        self.context.write().set_debug(debug);
    }

    /// Frames advanced so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.context.read().frame()
    }

    /// Simulation time in seconds.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.context.read().time()
    }

    /// Looks up a live proxy.
    #[must_use]
    pub fn proxy(&self, id: ProxyId) -> Option<&RuntimeProxy> {
        self.pool.get(id)
    }

    /// Looks up a live proxy for per-proxy edits.
    pub fn proxy_mut(&mut self, id: ProxyId) -> Option<&mut RuntimeProxy> {
        self.pool.get_mut(id)
    }

    /// Every live proxy, in pool order.
    pub fn proxies(&self) -> impl Iterator<Item = &RuntimeProxy> {
        self.pool.values()
    }

    /// Number of live proxies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Returns true if no proxy is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Spawns lost to a full pool since creation.
    #[must_use]
    pub fn dropped_spawns(&self) -> u64 {
        self.dropped_spawns
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

/// Moves queued children into the pool. Returns `(inserted, dropped)`.
fn flush_inserts(
    pool: &mut ProxyPool<RuntimeProxy>,
    pending: &mut Vec<RuntimeProxy>,
) -> (u32, u32) {
    let mut inserted = 0;
    let mut dropped = 0;
    for mut proxy in pending.drain(..) {
        let ancestors = Arc::clone(&proxy.ancestors);
        let placed = pool
            .insert_with(|id| {
                proxy.id = id;
                proxy
            })
            .is_some();
        if placed {
            inserted += 1;
        } else {
            dropped += 1;
            emitter::release_descendant(pool, &ancestors);
        }
    }
    (inserted, dropped)
}

/// Removes swept proxies and frees their ancestors' spawn cap.
fn flush_removals(pool: &mut ProxyPool<RuntimeProxy>, pending: &mut Vec<ProxyId>) -> u32 {
    let mut removed = 0;
    for id in pending.drain(..) {
        if let Some(proxy) = pool.remove(id) {
            emitter::release_descendant(pool, &proxy.ancestors);
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::EntityNode;

    const BOUNDS: Vec2 = Vec2::new(800.0, 600.0);

    #[test]
    fn test_tick_without_declaration() {
        let mut sim = Simulation::default();
        let report = sim.tick(0.5, BOUNDS);
        assert_eq!(report.frame, 1);
        assert_eq!(report.alive, 0);
        assert!((sim.time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_first_declare_instantiates_roots() {
        let mut sim = Simulation::default();
        let report = sim
            .declare(vec![EntityNode::leaf(), EntityNode::leaf()])
            .unwrap();
        assert_eq!(report, ReconcileReport::default());
        assert_eq!(sim.len(), 2);
        assert_eq!(sim.summary().node_count, 2);
    }

    #[test]
    fn test_pool_room_limits_spawns() {
        let mut sim = Simulation::with_capacity(3);
        sim.declare(EntityNode::emitter(0.1, vec![EntityNode::leaf()]).with_spawn_cap(10))
            .unwrap();
        let report = sim.tick(1.0, BOUNDS);
        assert_eq!(report.spawned, 2);
        assert_eq!(report.dropped, 0);
        assert_eq!(sim.len(), 3);
        let emitter = sim.proxies().find(|proxy| proxy.is_emitter()).unwrap();
        assert_eq!(emitter.emitter().unwrap().live_descendants(), 2);
    }

    #[test]
    fn test_expired_children_free_the_cap() {
        let mut sim = Simulation::default();
        sim.declare(
            EntityNode::emitter(0.1, vec![EntityNode::leaf().with_lifetime(0.1)]).with_spawn_cap(1),
        )
        .unwrap();
        assert_eq!(sim.tick(0.1, BOUNDS).spawned, 1);

        // Emission runs before the sweep, so the cap is still taken here.
        let report = sim.tick(0.1, BOUNDS);
        assert_eq!(report.spawned, 0);
        assert_eq!(report.expired, 1);
        assert_eq!(report.alive, 1);

        let report = sim.tick(0.1, BOUNDS);
        assert_eq!(report.spawned, 1);
        assert_eq!(report.alive, 2);
    }

    #[test]
    fn test_children_outlive_their_emitter() {
        let mut sim = Simulation::default();
        sim.declare(
            EntityNode::emitter(0.1, vec![EntityNode::leaf().with_lifetime(1.0)])
                .with_lifetime(0.15),
        )
        .unwrap();
        sim.tick(0.1, BOUNDS);
        let report = sim.tick(0.1, BOUNDS);
        assert_eq!(report.expired, 1);
        assert_eq!(report.alive, 2);

        let parent = sim.proxies().next().unwrap().parent().unwrap();
        assert!(sim.proxy(parent).is_none());
        assert!(sim.proxies().all(|proxy| proxy.parent() == Some(parent)));

        let report = sim.tick(2.0, BOUNDS);
        assert_eq!(report.expired, 2);
        assert!(sim.is_empty());
    }

    #[test]
    fn test_summary_counts_bytes() {
        let mut sim = Simulation::default();
        sim.declare(EntityNode::emitter(1.0, vec![EntityNode::leaf()])).unwrap();
        let summary = sim.summary();
        assert_eq!(summary.proxy_count, 1);
        assert_eq!(summary.emitter_count, 1);
        assert_eq!(summary.bytes_per_proxy, 34);
        assert_eq!(summary.approximate_bytes, 34);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimulationConfig {
            frame_rate_smoothing: 2.0,
            ..SimulationConfig::default()
        };
        assert!(Simulation::new(config).is_err());
    }
}
