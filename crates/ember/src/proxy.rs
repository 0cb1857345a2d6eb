//! # Runtime Proxies
//!
//! The live counterpart of a declared node. A proxy owns its packed physics,
//! its render state and a shared handle to the behaviors of the node it was
//! spawned from. Redeclaration swaps the behaviors; everything else stays.

use std::sync::Arc;

use ember_core::{PhysicsState, ProxyId};
use glam::Vec2;

use crate::behavior::{lifetime_progress, PropertySet, SpawnContext};
use crate::context::ContextSnapshot;
use crate::emitter::EmitterState;
use crate::render::{RenderState, RenderTag, Transition};
use crate::tree::{Slot, SlotKind};

/// Ids of a proxy's ancestors, nearest first. Children of one emitter share
/// a single allocation.
pub(crate) type Lineage = Arc<[ProxyId]>;

/// One live particle.
#[derive(Clone)]
pub struct RuntimeProxy {
    pub(crate) id: ProxyId,
    pub(crate) ancestors: Lineage,
    pub(crate) physics: PhysicsState,
    /// Render state after render behaviors, before transitions.
    pub(crate) render: RenderState,
    /// Render state as drawn.
    pub(crate) visual: RenderState,
    pub(crate) properties: Arc<PropertySet>,
    pub(crate) slot: u32,
    pub(crate) tag: RenderTag,
    pub(crate) birth_frame: u64,
    pub(crate) inception_time: f64,
    pub(crate) expired: bool,
    pub(crate) emitter: Option<EmitterState>,
}

impl std::fmt::Debug for RuntimeProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeProxy")
            .field("id", &self.id)
            .field("parent", &self.parent())
            .field("slot", &self.slot)
            .field("tag", &self.tag)
            .field("birth_frame", &self.birth_frame)
            .field("position", &self.physics.position())
            .field("expired", &self.expired)
            .field("emitter", &self.emitter)
            .finish_non_exhaustive()
    }
}

impl RuntimeProxy {
    /// Builds a proxy for `slot`. The id is assigned when it enters the pool.
    ///
    /// Origin: the slot's start position if declared, else the parent's
    /// position, else the origin. The birth hook runs last. `parent` carries
    /// the spawning emitter's lineage, the emitter itself first.
    pub(crate) fn spawn(
        slot_index: u32,
        slot: &Slot,
        parent: Option<(&Lineage, &PhysicsState)>,
        system: &ContextSnapshot,
        seed: [u8; 4],
    ) -> Self {
        let parent_physics = parent.map(|(_, physics)| physics);
        let origin = match slot.start {
            Some(start) => start.resolve(system.bounds),
            None => parent_physics.map_or(Vec2::ZERO, PhysicsState::position),
        };

        let spawn = SpawnContext {
            seed,
            frame: system.frame,
            bounds: system.bounds,
            parent: parent_physics,
        };
        let mut physics = PhysicsState::new(system.frame, seed);
        let mut render = RenderState::default();
        slot.properties.initialize(&spawn, origin, &mut physics, &mut render);

        if let Some(hook) = &slot.on_birth {
            hook(&mut physics, parent_physics);
        }

        let mut visual = render;
        for transition in slot.transitions.iter() {
            transition.apply(&mut visual, 0.0, physics.lifetime());
        }

        let emitter = match &slot.kind {
            SlotKind::Leaf => None,
            SlotKind::Emitter {
                interval,
                spawn_cap,
                ..
            } => Some(EmitterState::new(*interval, *spawn_cap)),
        };

        Self {
            id: ProxyId::NULL,
            ancestors: parent.map_or_else(
                || Arc::from(&[][..]),
                |(lineage, _)| Arc::clone(lineage),
            ),
            physics,
            render,
            visual,
            properties: Arc::clone(&slot.properties),
            slot: slot_index,
            tag: slot.tag,
            birth_frame: system.frame,
            inception_time: system.time,
            expired: false,
            emitter,
        }
    }

    /// Pool handle. [`ProxyId::NULL`] until inserted.
    #[must_use]
    pub fn id(&self) -> ProxyId {
        self.id
    }

    /// The emitter that spawned this proxy, if any. It may be gone already.
    #[must_use]
    pub fn parent(&self) -> Option<ProxyId> {
        self.ancestors.first().copied()
    }

    /// Every emitter above this proxy, nearest first.
    #[must_use]
    pub fn ancestors(&self) -> &[ProxyId] {
        &self.ancestors
    }

    /// Packed physics.
    #[must_use]
    pub fn physics(&self) -> &PhysicsState {
        &self.physics
    }

    /// Render state before transitions.
    #[must_use]
    pub fn render_state(&self) -> &RenderState {
        &self.render
    }

    /// Render state as drawn, transitions applied.
    #[must_use]
    pub fn visual(&self) -> &RenderState {
        &self.visual
    }

    /// Drawable tag.
    #[must_use]
    pub fn tag(&self) -> RenderTag {
        self.tag
    }

    /// Frame number at birth (full width).
    #[must_use]
    pub fn birth_frame(&self) -> u64 {
        self.birth_frame
    }

    /// Simulation time at birth.
    #[must_use]
    pub fn inception_time(&self) -> f64 {
        self.inception_time
    }

    /// Simulation time at which this proxy expires.
    #[must_use]
    pub fn expiration(&self) -> f64 {
        self.inception_time + f64::from(self.physics.lifetime())
    }

    /// Returns true once the sweep has marked this proxy.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Pre-order position of the declaring node.
    #[must_use]
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Returns true for emitters.
    #[must_use]
    pub fn is_emitter(&self) -> bool {
        self.emitter.is_some()
    }

    /// Emitter bookkeeping, for emitters.
    #[must_use]
    pub fn emitter(&self) -> Option<&EmitterState> {
        self.emitter.as_ref()
    }

    /// Behaviors currently driving this proxy.
    #[must_use]
    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// Behaviors of this proxy alone. Detaches from the shared set on first
    /// use; the next redeclaration replaces them again.
    pub fn properties_mut(&mut self) -> &mut PropertySet {
        Arc::make_mut(&mut self.properties)
    }

    /// Seconds since birth.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn time_alive(&self, system: &ContextSnapshot) -> f32 {
        (system.time - self.inception_time).max(0.0) as f32
    }

    /// Progress from birth (`0.0`) to expiration (`1.0`).
    #[must_use]
    pub fn lifetime_progress(&self, system: &ContextSnapshot) -> f32 {
        lifetime_progress(self.time_alive(system), self.physics.lifetime())
    }

    pub(crate) fn update_physics(&mut self, system: &ContextSnapshot) {
        self.properties
            .update_physics(&mut self.physics, &self.render, system, self.inception_time);
    }

    pub(crate) fn update_render(&mut self, transitions: &[Transition], system: &ContextSnapshot) {
        self.properties
            .update_render(&self.physics, &mut self.render, system, self.inception_time);
        self.visual = self.render;
        if transitions.is_empty() {
            return;
        }
        let time_alive = self.time_alive(system);
        let lifetime = self.physics.lifetime();
        for transition in transitions {
            transition.apply(&mut self.visual, time_alive, lifetime);
        }
    }

    /// Takes behaviors, tag and emitter parameters from a new slot.
    pub(crate) fn transplant(&mut self, slot: &Slot) {
        self.properties = Arc::clone(&slot.properties);
        self.tag = slot.tag;
        if let (
            Some(emitter),
            SlotKind::Emitter {
                interval,
                spawn_cap,
                ..
            },
        ) = (self.emitter.as_mut(), &slot.kind)
        {
            emitter.reconfigure(*interval, *spawn_cap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Declaration, EntityNode};
    use crate::tree::CompiledTree;

    fn snapshot(frame: u64, time: f64) -> ContextSnapshot {
        ContextSnapshot {
            frame,
            time,
            average_frame_rate: 60.0,
            bounds: Vec2::new(400.0, 200.0),
            debug: false,
        }
    }

    #[test]
    fn test_spawn_at_unit_start() {
        let tree = CompiledTree::compile(
            &Declaration::from(EntityNode::leaf().starting_at_unit(Vec2::new(0.5, 0.5))),
            8,
        );
        let slot = tree.slot(0).unwrap();
        let proxy = RuntimeProxy::spawn(0, slot, None, &snapshot(3, 1.5), [1, 2, 3, 4]);
        assert_eq!(proxy.physics().position(), Vec2::new(200.0, 100.0));
        assert_eq!(proxy.birth_frame(), 3);
        assert_eq!(proxy.physics().seed(), [1, 2, 3, 4]);
        assert!((proxy.expiration() - 6.5).abs() < 1e-6);
        assert!(proxy.id().is_null());
    }

    #[test]
    fn test_child_starts_at_parent() {
        let tree = CompiledTree::compile(&Declaration::from(EntityNode::leaf()), 8);
        let mut parent = PhysicsState::default();
        parent.set_position(Vec2::new(40.0, 30.0));
        let lineage: Lineage = Arc::from(&[ProxyId::new(2, 0), ProxyId::new(0, 0)][..]);
        let proxy = RuntimeProxy::spawn(
            0,
            tree.slot(0).unwrap(),
            Some((&lineage, &parent)),
            &snapshot(0, 0.0),
            [0; 4],
        );
        assert_eq!(proxy.physics().position(), Vec2::new(40.0, 30.0));
        assert_eq!(proxy.parent(), Some(ProxyId::new(2, 0)));
        assert_eq!(proxy.ancestors(), &[ProxyId::new(2, 0), ProxyId::new(0, 0)]);
    }

    #[test]
    fn test_birth_hook_sees_parent() {
        let node = EntityNode::leaf().on_birth(|physics, parent| {
            if let Some(parent) = parent {
                physics.set_velocity(parent.velocity() * 2.0);
            }
        });
        let tree = CompiledTree::compile(&Declaration::from(node), 8);
        let mut parent = PhysicsState::default();
        parent.set_velocity(Vec2::new(1.0, -1.0));
        let lineage: Lineage = Arc::from(&[ProxyId::new(0, 0)][..]);
        let proxy = RuntimeProxy::spawn(
            0,
            tree.slot(0).unwrap(),
            Some((&lineage, &parent)),
            &snapshot(0, 0.0),
            [0; 4],
        );
        assert_eq!(proxy.physics().velocity(), Vec2::new(2.0, -2.0));
    }

    #[test]
    fn test_transplant_keeps_physics() {
        let first = CompiledTree::compile(
            &Declaration::from(EntityNode::leaf().with_velocity(Vec2::new(1.0, 0.0))),
            8,
        );
        let slot = first.slot(0).unwrap();
        let mut proxy = RuntimeProxy::spawn(0, slot, None, &snapshot(0, 0.0), [9; 4]);
        proxy.update_physics(&snapshot(0, 0.0));
        let before = proxy.physics;

        let second = CompiledTree::compile(
            &Declaration::from(EntityNode::leaf().with_constant_velocity(Vec2::new(-3.0, 0.0))),
            8,
        );
        proxy.transplant(second.slot(0).unwrap());
        assert_eq!(proxy.physics, before);
        assert_eq!(proxy.properties().velocity.value(), Vec2::new(-3.0, 0.0));
    }

    #[test]
    fn test_properties_mut_detaches() {
        let tree = CompiledTree::compile(&Declaration::from(EntityNode::leaf()), 8);
        let slot = tree.slot(0).unwrap();
        let mut proxy = RuntimeProxy::spawn(0, slot, None, &snapshot(0, 0.0), [0; 4]);
        proxy.properties_mut().velocity.clear_behaviors();
        assert_eq!(proxy.properties().velocity.behavior_count(), 0);
        assert_eq!(slot.properties.velocity.behavior_count(), 1);
    }

    #[test]
    fn test_transitions_shape_visual_only() {
        use crate::render::{TransitionKind, TransitionPhase};

        let tree = CompiledTree::compile(&Declaration::from(EntityNode::leaf()), 8);
        let slot = tree.slot(0).unwrap();
        let mut proxy = RuntimeProxy::spawn(0, slot, None, &snapshot(0, 0.0), [0; 4]);
        let fade_in = [Transition::new(TransitionKind::Opacity, TransitionPhase::Birth, 1.0)];
        proxy.update_render(&fade_in, &snapshot(15, 0.25));
        assert_eq!(proxy.visual().opacity(), 0.25);
        assert_eq!(proxy.render_state().opacity(), 1.0);
    }
}
