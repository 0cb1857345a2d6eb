//! # Entity Declarations
//!
//! An [`EntityNode`] is an immutable description of a particle: starting
//! values, update rules, hooks and, for emitters, the prototypes it spawns.
//! Hosts build a fresh [`Declaration`] every time they re-evaluate; building
//! one has no side effects.

use std::fmt;
use std::sync::Arc;

use ember_core::{Angle, PhysicsState};
use glam::Vec2;

use crate::behavior::PropertySet;
use crate::proxy::RuntimeProxy;
use crate::render::{RenderTag, Transition};

/// Called once when a proxy is born, with the spawning emitter's physics.
pub type BirthHook = Arc<dyn Fn(&mut PhysicsState, Option<&PhysicsState>) + Send + Sync>;

/// Called once when a proxy expires, before it leaves the pool.
pub type DeathHook = Arc<dyn Fn(&RuntimeProxy) + Send + Sync>;

/// Where a proxy starts, before its position offset is added.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StartPosition {
    /// Pixels.
    Absolute(Vec2),
    /// Unit space, scaled by the viewport bounds at birth.
    Unit(Vec2),
}

impl StartPosition {
    /// Resolves to pixels.
    #[must_use]
    pub fn resolve(self, bounds: Vec2) -> Vec2 {
        match self {
            Self::Absolute(point) => point,
            Self::Unit(unit) => unit * bounds,
        }
    }
}

/// Emitter parameters and prototypes.
#[derive(Clone, Debug)]
pub struct EmitterSpec {
    /// Seconds between spawn rounds.
    pub interval: f32,
    /// Maximum live descendants; `None` uses the configured default.
    pub spawn_cap: Option<u32>,
    /// Declarations spawned once each per round, in order.
    pub prototypes: Vec<EntityNode>,
}

/// Leaf or emitter.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// A plain particle.
    Leaf,
    /// A particle that spawns others.
    Emitter(EmitterSpec),
}

/// One declared entity.
#[derive(Clone)]
pub struct EntityNode {
    kind: NodeKind,
    properties: PropertySet,
    tag: Option<RenderTag>,
    start: Option<StartPosition>,
    transitions: Vec<Transition>,
    on_birth: Option<BirthHook>,
    on_death: Option<DeathHook>,
}

impl fmt::Debug for EntityNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityNode")
            .field("kind", &self.kind)
            .field("tag", &self.tag)
            .field("start", &self.start)
            .field("behaviors", &self.properties.behavior_count())
            .field("transitions", &self.transitions)
            .finish_non_exhaustive()
    }
}

impl EntityNode {
    fn with_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            properties: PropertySet::default(),
            tag: None,
            start: None,
            transitions: Vec::new(),
            on_birth: None,
            on_death: None,
        }
    }

    /// A particle with the default kinematics and a 5 second lifetime.
    #[must_use]
    pub fn leaf() -> Self {
        Self::with_kind(NodeKind::Leaf)
    }

    /// An emitter spawning `prototypes` every `interval` seconds.
    ///
    /// Emitters never expire unless a lifetime is set explicitly.
    #[must_use]
    pub fn emitter(interval: f32, prototypes: Vec<EntityNode>) -> Self {
        let mut node = Self::with_kind(NodeKind::Emitter(EmitterSpec {
            interval,
            spawn_cap: None,
            prototypes,
        }));
        node.properties.lifetime.set_value(f32::INFINITY);
        node
    }

    /// Leaf or emitter.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns true for emitters.
    #[must_use]
    pub fn is_emitter(&self) -> bool {
        matches!(self.kind, NodeKind::Emitter(_))
    }

    /// The prototypes of an emitter; empty for leaves.
    #[must_use]
    pub fn prototypes(&self) -> &[EntityNode] {
        match &self.kind {
            NodeKind::Leaf => &[],
            NodeKind::Emitter(spec) => &spec.prototypes,
        }
    }

    /// Configured properties.
    #[must_use]
    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// Configured properties, for `set_behavior` / `add_behavior`.
    pub fn properties_mut(&mut self) -> &mut PropertySet {
        &mut self.properties
    }

    /// Explicit render tag, if any.
    #[must_use]
    pub fn tag(&self) -> Option<RenderTag> {
        self.tag
    }

    /// Declared start position, if any.
    #[must_use]
    pub fn start(&self) -> Option<StartPosition> {
        self.start
    }

    /// Declared transitions.
    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub(crate) fn birth_hook(&self) -> Option<&BirthHook> {
        self.on_birth.as_ref()
    }

    pub(crate) fn death_hook(&self) -> Option<&DeathHook> {
        self.on_death.as_ref()
    }

    /// Edits the property set in place.
    #[must_use]
    pub fn configure(mut self, edit: impl FnOnce(&mut PropertySet)) -> Self {
        edit(&mut self.properties);
        self
    }

    /// Sets the render tag.
    #[must_use]
    pub fn with_tag(mut self, tag: RenderTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Sets the spawn cap. No effect on leaves.
    #[must_use]
    pub fn with_spawn_cap(mut self, cap: u32) -> Self {
        if let NodeKind::Emitter(spec) = &mut self.kind {
            spec.spawn_cap = Some(cap);
        }
        self
    }

    /// Starts at an absolute point in pixels.
    #[must_use]
    pub fn starting_at(mut self, point: Vec2) -> Self {
        self.start = Some(StartPosition::Absolute(point));
        self
    }

    /// Starts at a unit-space point of the viewport.
    #[must_use]
    pub fn starting_at_unit(mut self, unit: Vec2) -> Self {
        self.start = Some(StartPosition::Unit(unit));
        self
    }

    /// Sets the lifetime in seconds.
    #[must_use]
    pub fn with_lifetime(mut self, seconds: f32) -> Self {
        self.properties.lifetime.set_value(seconds);
        self
    }

    /// Sets the starting velocity; the default rules keep integrating it.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.properties.velocity.set_value(velocity);
        self
    }

    /// Pins the velocity to a constant.
    #[must_use]
    pub fn with_constant_velocity(mut self, velocity: Vec2) -> Self {
        self.properties.velocity.set(velocity);
        self
    }

    /// Sets the starting acceleration.
    #[must_use]
    pub fn with_acceleration(mut self, acceleration: Vec2) -> Self {
        self.properties.acceleration.set_value(acceleration);
        self
    }

    /// Sets the starting rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Angle) -> Self {
        self.properties.rotation.set_value(rotation);
        self
    }

    /// Sets the starting torque.
    #[must_use]
    pub fn with_torque(mut self, torque: Angle) -> Self {
        self.properties.torque.set_value(torque);
        self
    }

    /// Adds a visual transition.
    #[must_use]
    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Sets the birth hook.
    #[must_use]
    pub fn on_birth(
        mut self,
        hook: impl Fn(&mut PhysicsState, Option<&PhysicsState>) + Send + Sync + 'static,
    ) -> Self {
        self.on_birth = Some(Arc::new(hook));
        self
    }

    /// Sets the death hook.
    #[must_use]
    pub fn on_death(mut self, hook: impl Fn(&RuntimeProxy) + Send + Sync + 'static) -> Self {
        self.on_death = Some(Arc::new(hook));
        self
    }

    /// Number of nodes in this subtree, this one included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self
            .prototypes()
            .iter()
            .map(EntityNode::node_count)
            .sum::<usize>()
    }
}

/// The roots of one declaration pass.
#[derive(Clone, Debug, Default)]
pub struct Declaration {
    roots: Vec<EntityNode>,
}

impl Declaration {
    /// Creates a declaration from its roots.
    #[must_use]
    pub fn new(roots: Vec<EntityNode>) -> Self {
        Self { roots }
    }

    /// Appends a root.
    #[must_use]
    pub fn with(mut self, root: EntityNode) -> Self {
        self.roots.push(root);
        self
    }

    /// The roots, in declaration order.
    #[must_use]
    pub fn roots(&self) -> &[EntityNode] {
        &self.roots
    }

    /// Total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(EntityNode::node_count).sum()
    }
}

impl From<Vec<EntityNode>> for Declaration {
    fn from(roots: Vec<EntityNode>) -> Self {
        Self::new(roots)
    }
}

impl From<EntityNode> for Declaration {
    fn from(root: EntityNode) -> Self {
        Self::new(vec![root])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emitter_defaults_to_infinite_lifetime() {
        let emitter = EntityNode::emitter(0.1, vec![EntityNode::leaf()]);
        assert!(emitter.properties().lifetime.value().is_infinite());
        assert_eq!(EntityNode::leaf().properties().lifetime.value(), 5.0);
    }

    #[test]
    fn test_spawn_cap_ignored_on_leaf() {
        let leaf = EntityNode::leaf().with_spawn_cap(3);
        assert!(!leaf.is_emitter());
        let emitter = EntityNode::emitter(0.1, vec![]).with_spawn_cap(3);
        match emitter.kind() {
            NodeKind::Emitter(spec) => assert_eq!(spec.spawn_cap, Some(3)),
            NodeKind::Leaf => panic!("expected emitter"),
        }
    }

    #[test]
    fn test_node_count() {
        let tree = Declaration::new(vec![
            EntityNode::leaf(),
            EntityNode::emitter(
                0.5,
                vec![
                    EntityNode::leaf(),
                    EntityNode::emitter(1.0, vec![EntityNode::leaf()]),
                ],
            ),
        ]);
        assert_eq!(tree.node_count(), 6);
    }

    #[test]
    fn test_constant_velocity_replaces_rule() {
        let node = EntityNode::leaf().with_constant_velocity(Vec2::new(2.0, 0.0));
        assert_eq!(node.properties().velocity.behavior_count(), 1);
        assert_eq!(node.properties().velocity.value(), Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_start_position_resolves() {
        let bounds = Vec2::new(200.0, 100.0);
        assert_eq!(
            StartPosition::Unit(Vec2::new(0.5, 1.0)).resolve(bounds),
            Vec2::new(100.0, 100.0)
        );
        assert_eq!(
            StartPosition::Absolute(Vec2::new(3.0, 4.0)).resolve(bounds),
            Vec2::new(3.0, 4.0)
        );
    }
}
