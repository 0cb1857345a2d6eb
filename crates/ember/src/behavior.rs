//! # Behavior Engine
//!
//! A configured property is a value plus an ordered list of pure per-frame
//! functions `f(entity, current) -> next`. Each tick every function runs once,
//! in list order, feeding its output to the next one.
//!
//! ## Update order
//!
//! Behaviors read *other* properties of the same proxy, so the order in which
//! properties are updated is fixed:
//!
//! ```text
//! lifetime → position → velocity → acceleration → rotation → torque
//!          → torque variation → anchor
//! ```
//!
//! The entity view is rebuilt from the packed state before each property.
//! A property sees values already written earlier in the same tick and the
//! previous tick's values for properties updated after it, so position
//! integrates the velocity from before this tick's velocity update.
//!
//! Render properties follow the same discipline in their own pass:
//!
//! ```text
//! opacity → scale → blur → hue rotation
//! ```

use std::fmt;
use std::sync::Arc;

use ember_core::{Angle, PhysicsState};
use glam::Vec2;

use crate::context::ContextSnapshot;
use crate::render::RenderState;

/// A per-frame update rule for one property.
pub type Behavior<T> = Arc<dyn Fn(&EntityContext<'_>, T) -> T + Send + Sync>;

/// Computes a property's starting value when a proxy is born.
pub type Initializer<T> = Arc<dyn Fn(&SpawnContext<'_>) -> T + Send + Sync>;

/// Read-only view of one proxy handed to behaviors.
#[derive(Clone, Copy)]
pub struct EntityContext<'a> {
    physics: &'a PhysicsState,
    render: &'a RenderState,
    system: &'a ContextSnapshot,
    inception_time: f64,
}

impl<'a> EntityContext<'a> {
    /// Creates a view over a proxy's current state.
    #[must_use]
    pub fn new(
        physics: &'a PhysicsState,
        render: &'a RenderState,
        system: &'a ContextSnapshot,
        inception_time: f64,
    ) -> Self {
        Self {
            physics,
            render,
            system,
            inception_time,
        }
    }

    /// The packed physics state.
    #[must_use]
    pub fn physics(&self) -> &PhysicsState {
        self.physics
    }

    /// The base render state (before transitions).
    #[must_use]
    pub fn render(&self) -> &RenderState {
        self.render
    }

    /// Shared simulation values for this tick.
    #[must_use]
    pub fn system(&self) -> &ContextSnapshot {
        self.system
    }

    /// Position in pixels.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.physics.position()
    }

    /// Velocity in pixels per frame.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.physics.velocity()
    }

    /// Acceleration in pixels per frame per frame.
    #[must_use]
    pub fn acceleration(&self) -> Vec2 {
        self.physics.acceleration()
    }

    /// Rotation.
    #[must_use]
    pub fn rotation(&self) -> Angle {
        self.physics.rotation()
    }

    /// Rotation per frame.
    #[must_use]
    pub fn torque(&self) -> Angle {
        self.physics.torque()
    }

    /// Torque change per frame.
    #[must_use]
    pub fn torque_variation(&self) -> Angle {
        self.physics.torque_variation()
    }

    /// Centre of rotation in unit space.
    #[must_use]
    pub fn anchor(&self) -> Vec2 {
        self.physics.anchor()
    }

    /// Lifetime in seconds.
    #[must_use]
    pub fn lifetime(&self) -> f32 {
        self.physics.lifetime()
    }

    /// The four random seed bytes.
    #[must_use]
    pub fn seed(&self) -> [u8; 4] {
        self.physics.seed()
    }

    /// One seed byte mapped to `[0, 1]`.
    #[must_use]
    pub fn seed_unit(&self, index: usize) -> f32 {
        self.physics.seed_unit(index)
    }

    /// Current frame number.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.system.frame
    }

    /// Frames since birth (16-bit wrapping).
    #[must_use]
    pub fn frames_alive(&self) -> u16 {
        self.physics.frames_alive(self.system.frame)
    }

    /// Seconds since birth.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn time_alive(&self) -> f32 {
        (self.system.time - self.inception_time).max(0.0) as f32
    }

    /// Progress from birth (`0.0`) to expiration (`1.0`).
    #[must_use]
    pub fn lifetime_progress(&self) -> f32 {
        lifetime_progress(self.time_alive(), self.lifetime())
    }

    /// Viewport bounds in pixels.
    #[must_use]
    pub fn bounds(&self) -> Vec2 {
        self.system.bounds
    }
}

/// Progress ratio shared by proxies and contexts.
pub(crate) fn lifetime_progress(time_alive: f32, lifetime: f32) -> f32 {
    if lifetime.is_infinite() {
        0.0
    } else if lifetime <= 0.0 {
        1.0
    } else {
        (time_alive / lifetime).clamp(0.0, 1.0)
    }
}

/// Values available while a proxy is being born.
#[derive(Clone, Copy)]
pub struct SpawnContext<'a> {
    /// Random bytes drawn for the new proxy.
    pub seed: [u8; 4],
    /// Frame of birth.
    pub frame: u64,
    /// Viewport bounds at birth.
    pub bounds: Vec2,
    /// The spawning emitter's physics, if any.
    pub parent: Option<&'a PhysicsState>,
}

impl SpawnContext<'_> {
    /// One seed byte mapped to `[0, 1]`. Indices wrap modulo 4.
    #[must_use]
    pub fn seed_unit(&self, index: usize) -> f32 {
        f32::from(self.seed[index % 4]) / 255.0
    }

    /// Picks a value in `[min, max]` from one seed byte.
    #[must_use]
    pub fn random_in(&self, index: usize, min: f32, max: f32) -> f32 {
        min + (max - min) * self.seed_unit(index)
    }

    /// The spawning emitter's position, or the origin for roots.
    #[must_use]
    pub fn parent_position(&self) -> Vec2 {
        self.parent.map_or(Vec2::ZERO, PhysicsState::position)
    }
}

/// A property value with its ordered update rules.
pub struct Configured<T> {
    value: T,
    initializer: Option<Initializer<T>>,
    behaviors: Vec<Behavior<T>>,
}

impl<T> Clone for Configured<T>
where
    T: Copy,
{
    fn clone(&self) -> Self {
        Self {
            value: self.value,
            initializer: self.initializer.clone(),
            behaviors: self.behaviors.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Configured<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configured")
            .field("value", &self.value)
            .field("initializer", &self.initializer.is_some())
            .field("behaviors", &self.behaviors.len())
            .finish()
    }
}

impl<T> Configured<T>
where
    T: Copy + Send + Sync + 'static,
{
    /// A property with a starting value and no rules.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value,
            initializer: None,
            behaviors: Vec::new(),
        }
    }

    /// A property with a starting value and one rule.
    #[must_use]
    pub fn with_behavior(
        value: T,
        behavior: impl Fn(&EntityContext<'_>, T) -> T + Send + Sync + 'static,
    ) -> Self {
        let mut configured = Self::new(value);
        configured.set_behavior(behavior);
        configured
    }

    /// The current value.
    #[must_use]
    pub fn value(&self) -> T {
        self.value
    }

    /// Replaces the starting value, keeping the rules.
    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    /// Pins the property to a constant: the rule list becomes one function
    /// returning `constant`.
    pub fn set(&mut self, constant: T) {
        self.value = constant;
        self.set_behavior(move |_, _| constant);
    }

    /// Replaces every rule with `behavior`.
    pub fn set_behavior(
        &mut self,
        behavior: impl Fn(&EntityContext<'_>, T) -> T + Send + Sync + 'static,
    ) {
        self.behaviors.clear();
        self.behaviors.push(Arc::new(behavior));
    }

    /// Appends `behavior` after the existing rules.
    pub fn add_behavior(
        &mut self,
        behavior: impl Fn(&EntityContext<'_>, T) -> T + Send + Sync + 'static,
    ) {
        self.behaviors.push(Arc::new(behavior));
    }

    /// Removes every rule; the value then stays where it is.
    pub fn clear_behaviors(&mut self) {
        self.behaviors.clear();
    }

    /// Number of rules.
    #[must_use]
    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }

    /// Sets a function computing the starting value at birth.
    pub fn set_initializer(
        &mut self,
        initializer: impl Fn(&SpawnContext<'_>) -> T + Send + Sync + 'static,
    ) {
        self.initializer = Some(Arc::new(initializer));
    }

    /// Returns true if an initializer is set.
    #[must_use]
    pub fn has_initializer(&self) -> bool {
        self.initializer.is_some()
    }

    /// The starting value for a new proxy.
    #[must_use]
    pub fn initial(&self, spawn: &SpawnContext<'_>) -> T {
        self.initializer
            .as_ref()
            .map_or(self.value, |init| init(spawn))
    }

    /// Runs every rule over `value`, in order.
    #[must_use]
    pub fn apply(&self, entity: &EntityContext<'_>, value: T) -> T {
        self.behaviors
            .iter()
            .fold(value, |current, behavior| behavior(entity, current))
    }

    /// Runs every rule over the stored value, in place.
    pub fn update(&mut self, entity: &EntityContext<'_>) {
        self.value = self.apply(entity, self.value);
    }
}

/// Runs one physics property's rules against the packed state.
fn step_physics<T>(
    property: &Configured<T>,
    physics: &mut PhysicsState,
    render: &RenderState,
    system: &ContextSnapshot,
    inception_time: f64,
    get: fn(&PhysicsState) -> T,
    set: fn(&mut PhysicsState, T),
) where
    T: Copy + Send + Sync + 'static,
{
    if property.behaviors.is_empty() {
        return;
    }
    let next = {
        let entity = EntityContext::new(physics, render, system, inception_time);
        property.apply(&entity, get(physics))
    };
    set(physics, next);
}

/// Runs one render property's rules against the base render state.
fn step_render(
    property: &Configured<f32>,
    physics: &PhysicsState,
    render: &mut RenderState,
    system: &ContextSnapshot,
    inception_time: f64,
    get: fn(&RenderState) -> f32,
    set: fn(&mut RenderState, f32),
) {
    if property.behaviors.is_empty() {
        return;
    }
    let next = {
        let entity = EntityContext::new(physics, render, system, inception_time);
        property.apply(&entity, get(render))
    };
    set(render, next);
}

/// Every configured property of an entity.
///
/// [`PropertySet::default`] installs the standard kinematics:
/// position integrates velocity, velocity integrates acceleration, rotation
/// integrates torque and torque integrates torque variation.
#[derive(Clone, Debug)]
pub struct PropertySet {
    /// Seconds until expiration.
    pub lifetime: Configured<f32>,
    /// Position in pixels.
    pub position: Configured<Vec2>,
    /// Velocity in pixels per frame.
    pub velocity: Configured<Vec2>,
    /// Acceleration in pixels per frame per frame.
    pub acceleration: Configured<Vec2>,
    /// Rotation.
    pub rotation: Configured<Angle>,
    /// Rotation per frame.
    pub torque: Configured<Angle>,
    /// Torque change per frame.
    pub torque_variation: Configured<Angle>,
    /// Centre of rotation in unit space.
    pub anchor: Configured<Vec2>,
    /// Opacity in `[0, 1]`.
    pub opacity: Configured<f32>,
    /// Uniform scale factor.
    pub scale: Configured<f32>,
    /// Blur radius in pixels.
    pub blur: Configured<f32>,
    /// Hue rotation in degrees.
    pub hue_rotation: Configured<f32>,
}

impl Default for PropertySet {
    fn default() -> Self {
        Self {
            lifetime: Configured::new(ember_core::DEFAULT_LIFETIME),
            position: Configured::with_behavior(Vec2::ZERO, |e, p| p + e.velocity()),
            velocity: Configured::with_behavior(Vec2::ZERO, |e, v| v + e.acceleration()),
            acceleration: Configured::new(Vec2::ZERO),
            rotation: Configured::with_behavior(Angle::ZERO, |e, r| r + e.torque()),
            torque: Configured::with_behavior(Angle::ZERO, |e, t| t + e.torque_variation()),
            torque_variation: Configured::new(Angle::ZERO),
            anchor: Configured::new(Vec2::splat(0.5)),
            opacity: Configured::new(1.0),
            scale: Configured::new(1.0),
            blur: Configured::new(0.0),
            hue_rotation: Configured::new(0.0),
        }
    }
}

impl PropertySet {
    /// Writes starting values into a fresh proxy.
    ///
    /// `origin` is where the proxy starts before the position value (an
    /// offset) is added; an explicit position initializer overrides both.
    pub fn initialize(
        &self,
        spawn: &SpawnContext<'_>,
        origin: Vec2,
        physics: &mut PhysicsState,
        render: &mut RenderState,
    ) {
        physics.set_lifetime(self.lifetime.initial(spawn));
        let position = if self.position.has_initializer() {
            self.position.initial(spawn)
        } else {
            origin + self.position.value()
        };
        physics.set_position(position);
        physics.set_velocity(self.velocity.initial(spawn));
        physics.set_acceleration(self.acceleration.initial(spawn));
        physics.set_rotation(self.rotation.initial(spawn));
        physics.set_torque(self.torque.initial(spawn));
        physics.set_torque_variation(self.torque_variation.initial(spawn));
        physics.set_anchor(self.anchor.initial(spawn));

        render.set_opacity(self.opacity.initial(spawn));
        render.set_scale(self.scale.initial(spawn));
        render.set_blur(self.blur.initial(spawn));
        render.set_hue_rotation(self.hue_rotation.initial(spawn));
    }

    /// Advances every physics property by one tick, in canonical order.
    pub fn update_physics(
        &self,
        physics: &mut PhysicsState,
        render: &RenderState,
        system: &ContextSnapshot,
        inception_time: f64,
    ) {
        macro_rules! step {
            ($field:ident, $set:ident) => {
                step_physics(
                    &self.$field,
                    physics,
                    render,
                    system,
                    inception_time,
                    PhysicsState::$field,
                    PhysicsState::$set,
                )
            };
        }
        step!(lifetime, set_lifetime);
        step!(position, set_position);
        step!(velocity, set_velocity);
        step!(acceleration, set_acceleration);
        step!(rotation, set_rotation);
        step!(torque, set_torque);
        step!(torque_variation, set_torque_variation);
        step!(anchor, set_anchor);
    }

    /// Advances every render property by one tick, in canonical order.
    pub fn update_render(
        &self,
        physics: &PhysicsState,
        render: &mut RenderState,
        system: &ContextSnapshot,
        inception_time: f64,
    ) {
        macro_rules! step {
            ($field:ident, $set:ident) => {
                step_render(
                    &self.$field,
                    physics,
                    render,
                    system,
                    inception_time,
                    RenderState::$field,
                    RenderState::$set,
                )
            };
        }
        step!(opacity, set_opacity);
        step!(scale, set_scale);
        step!(blur, set_blur);
        step!(hue_rotation, set_hue_rotation);
    }

    /// Total number of rules across every property.
    #[must_use]
    pub fn behavior_count(&self) -> usize {
        self.lifetime.behavior_count()
            + self.position.behavior_count()
            + self.velocity.behavior_count()
            + self.acceleration.behavior_count()
            + self.rotation.behavior_count()
            + self.torque.behavior_count()
            + self.torque_variation.behavior_count()
            + self.anchor.behavior_count()
            + self.opacity.behavior_count()
            + self.scale.behavior_count()
            + self.blur.behavior_count()
            + self.hue_rotation.behavior_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ContextSnapshot {
        ContextSnapshot {
            frame: 10,
            time: 2.0,
            average_frame_rate: 60.0,
            bounds: Vec2::new(400.0, 300.0),
            debug: false,
        }
    }

    #[test]
    fn test_behaviors_run_in_list_order() {
        let physics = PhysicsState::default();
        let render = RenderState::default();
        let system = snapshot();
        let entity = EntityContext::new(&physics, &render, &system, 0.0);

        let mut value = Configured::new(1.0_f32);
        value.add_behavior(|_, v| v + 1.0);
        value.add_behavior(|_, v| v * 10.0);
        value.update(&entity);
        assert_eq!(value.value(), 20.0);
    }

    #[test]
    fn test_set_behavior_replaces_list() {
        let mut value = Configured::with_behavior(0.0_f32, |_, v| v + 1.0);
        value.add_behavior(|_, v| v + 1.0);
        assert_eq!(value.behavior_count(), 2);
        value.set_behavior(|_, v| v - 1.0);
        assert_eq!(value.behavior_count(), 1);
    }

    #[test]
    fn test_set_pins_constant() {
        let physics = PhysicsState::default();
        let render = RenderState::default();
        let system = snapshot();
        let entity = EntityContext::new(&physics, &render, &system, 0.0);

        let mut value = Configured::with_behavior(0.0_f32, |_, v| v + 5.0);
        value.set(3.0);
        value.update(&entity);
        value.update(&entity);
        assert_eq!(value.value(), 3.0);
    }

    #[test]
    fn test_initializer_overrides_value() {
        let mut value = Configured::new(1.0_f32);
        let spawn = SpawnContext {
            seed: [255, 0, 0, 0],
            frame: 0,
            bounds: Vec2::ZERO,
            parent: None,
        };
        assert_eq!(value.initial(&spawn), 1.0);
        value.set_initializer(|s| s.random_in(0, 10.0, 20.0));
        assert_eq!(value.initial(&spawn), 20.0);
    }

    #[test]
    fn test_position_sees_previous_velocity() {
        let props = PropertySet::default();
        let mut physics = PhysicsState::default();
        let render = RenderState::default();
        let system = snapshot();
        physics.set_velocity(Vec2::new(1.0, 0.0));
        physics.set_acceleration(Vec2::new(2.0, 0.0));

        props.update_physics(&mut physics, &render, &system, 0.0);

        // Position used the velocity from before this tick's velocity update.
        assert_eq!(physics.position().x, 1.0);
        assert_eq!(physics.velocity().x, 3.0);
    }

    #[test]
    fn test_rotation_integrates_torque() {
        let props = PropertySet::default();
        let mut physics = PhysicsState::default();
        let render = RenderState::default();
        let system = snapshot();
        physics.set_torque(Angle::from_degrees(90.0));

        for _ in 0..5 {
            props.update_physics(&mut physics, &render, &system, 0.0);
        }
        // 450 degrees wraps to 90.
        assert!(physics.rotation().distance(Angle::from_degrees(90.0)) < 2.0);
    }

    #[test]
    fn test_entity_context_time() {
        let physics = PhysicsState::default();
        let render = RenderState::default();
        let system = snapshot();
        let entity = EntityContext::new(&physics, &render, &system, 1.0);
        assert_eq!(entity.time_alive(), 1.0);
        assert!((entity.lifetime_progress() - 0.2).abs() < 1e-6);
        assert_eq!(entity.frame(), 10);
    }

    #[test]
    fn test_render_pass_order() {
        let mut props = PropertySet::default();
        props.opacity.set_behavior(|_, o| o * 0.5);
        props.scale.set_behavior(|e, _| e.render().opacity() * 4.0);
        let physics = PhysicsState::default();
        let mut render = RenderState::default();
        let system = snapshot();

        props.update_render(&physics, &mut render, &system, 0.0);
        assert_eq!(render.opacity(), 0.5);
        // Scale ran after opacity and saw the halved value.
        assert_eq!(render.scale(), 2.0);
    }
}
