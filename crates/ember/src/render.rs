//! # Render State
//!
//! Visual properties layered on top of physics, and the contract with the
//! external render surface.
//!
//! The core never draws. Each tick it hands the surface a `(RenderTag, proxy)`
//! pair for every live proxy; the surface resolves the tag to a drawable.

use bytemuck::{Pod, Zeroable};
use ember_core::{quantize, PhysicsState, ProxyId};
use half::f16;

use crate::proxy::RuntimeProxy;

/// Opaque identifier correlating a proxy with an external drawable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTag(pub u32);

impl std::fmt::Display for RenderTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tag#{}", self.0)
    }
}

/// Packed visual properties of one proxy (8 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct RenderState {
    opacity: f16,
    scale: f16,
    blur: f16,
    hue_rotation: f16,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            opacity: f16::ONE,
            scale: f16::ONE,
            blur: f16::ZERO,
            hue_rotation: f16::ZERO,
        }
    }
}

impl RenderState {
    /// Opacity in `[0, 1]`.
    #[must_use]
    pub fn opacity(&self) -> f32 {
        self.opacity.to_f32()
    }

    /// Sets the opacity, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = quantize::encode_half(opacity.clamp(0.0, 1.0));
    }

    /// Uniform scale factor, never negative.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale.to_f32()
    }

    /// Sets the scale factor. Negative values clamp to zero.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = quantize::encode_half(scale.max(0.0));
    }

    /// Blur radius in pixels.
    #[must_use]
    pub fn blur(&self) -> f32 {
        self.blur.to_f32()
    }

    /// Sets the blur radius. Negative values clamp to zero.
    pub fn set_blur(&mut self, blur: f32) {
        self.blur = quantize::encode_half(blur.max(0.0));
    }

    /// Hue rotation in degrees, `[0, 360)`.
    #[must_use]
    pub fn hue_rotation(&self) -> f32 {
        self.hue_rotation.to_f32()
    }

    /// Sets the hue rotation. The angle is taken modulo 360, and values that
    /// round up to 360 in `f16` wrap to 0.
    pub fn set_hue_rotation(&mut self, degrees: f32) {
        let wrapped = ember_core::Angle::from_degrees(degrees).normalized();
        let encoded = quantize::encode_half(wrapped.degrees());
        self.hue_rotation = if encoded.to_f32() >= 360.0 {
            f16::ZERO
        } else {
            encoded
        };
    }
}

/// Which visual property a transition fades.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionKind {
    /// Multiplies opacity.
    Opacity,
    /// Multiplies scale.
    Scale,
}

/// When a transition plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionPhase {
    /// Ramps in from zero after birth.
    Birth,
    /// Ramps out to zero before expiration.
    Death,
    /// Both.
    BirthAndDeath,
}

/// A visual ramp applied on top of the base render state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    /// Faded property.
    pub kind: TransitionKind,
    /// When it plays.
    pub phase: TransitionPhase,
    /// Length of the ramp in seconds.
    pub duration: f32,
}

impl Transition {
    /// Creates a transition.
    #[must_use]
    pub const fn new(kind: TransitionKind, phase: TransitionPhase, duration: f32) -> Self {
        Self {
            kind,
            phase,
            duration,
        }
    }

    /// Multiplier in `[0, 1]` for a proxy `time_alive` seconds into a life of
    /// `lifetime` seconds.
    #[must_use]
    pub fn factor(&self, time_alive: f32, lifetime: f32) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        let mut factor = 1.0_f32;
        if matches!(self.phase, TransitionPhase::Birth | TransitionPhase::BirthAndDeath) {
            factor = factor.min(time_alive / self.duration);
        }
        if matches!(self.phase, TransitionPhase::Death | TransitionPhase::BirthAndDeath)
            && lifetime.is_finite()
        {
            factor = factor.min((lifetime - time_alive) / self.duration);
        }
        factor.clamp(0.0, 1.0)
    }

    /// Applies this transition to `state`.
    pub fn apply(&self, state: &mut RenderState, time_alive: f32, lifetime: f32) {
        let factor = self.factor(time_alive, lifetime);
        match self.kind {
            TransitionKind::Opacity => state.set_opacity(state.opacity() * factor),
            TransitionKind::Scale => state.set_scale(state.scale() * factor),
        }
    }
}

/// An owned record of one proxy as it was drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderItem {
    /// Drawable tag.
    pub tag: RenderTag,
    /// The proxy's handle.
    pub id: ProxyId,
    /// Physics at draw time.
    pub physics: PhysicsState,
    /// Visual state at draw time, transitions applied.
    pub visual: RenderState,
}

impl RenderItem {
    pub(crate) fn of(proxy: &RuntimeProxy) -> Self {
        Self {
            tag: proxy.tag(),
            id: proxy.id(),
            physics: *proxy.physics(),
            visual: *proxy.visual(),
        }
    }
}

/// The external drawing side of a simulation.
///
/// Called once per live proxy during the render pass of every tick, after
/// physics, render-state update and emission, and before expired proxies are
/// swept.
pub trait RenderSurface {
    /// Called before the first `draw` of a tick.
    fn begin_frame(&mut self, _frame: u64) {}

    /// Draws one proxy.
    fn draw(&mut self, tag: RenderTag, proxy: &RuntimeProxy);

    /// Called after the last `draw` of a tick.
    fn end_frame(&mut self) {}
}

/// A surface that draws nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSurface;

impl RenderSurface for NullSurface {
    fn draw(&mut self, _tag: RenderTag, _proxy: &RuntimeProxy) {}
}

impl RenderSurface for Vec<RenderItem> {
    fn begin_frame(&mut self, _frame: u64) {
        self.clear();
    }

    fn draw(&mut self, _tag: RenderTag, proxy: &RuntimeProxy) {
        self.push(RenderItem::of(proxy));
    }
}

/// Adapts a closure into a [`RenderSurface`].
pub struct DrawFn<F>(pub F);

impl<F> RenderSurface for DrawFn<F>
where
    F: FnMut(RenderTag, &RuntimeProxy),
{
    fn draw(&mut self, tag: RenderTag, proxy: &RuntimeProxy) {
        (self.0)(tag, proxy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_state_size() {
        assert_eq!(std::mem::size_of::<RenderState>(), 8);
    }

    #[test]
    fn test_render_state_clamps() {
        let mut state = RenderState::default();
        state.set_opacity(3.0);
        assert_eq!(state.opacity(), 1.0);
        state.set_scale(-2.0);
        assert_eq!(state.scale(), 0.0);
        state.set_hue_rotation(-90.0);
        assert_eq!(state.hue_rotation(), 270.0);
    }

    #[test]
    fn test_hue_rounding_stays_below_full_turn() {
        let mut state = RenderState::default();
        state.set_hue_rotation(359.9);
        assert_eq!(state.hue_rotation(), 0.0);
        state.set_hue_rotation(359.5);
        assert_eq!(state.hue_rotation(), 359.5);
    }

    #[test]
    fn test_birth_transition_ramps_in() {
        let t = Transition::new(TransitionKind::Opacity, TransitionPhase::Birth, 0.5);
        assert_eq!(t.factor(0.0, 2.0), 0.0);
        assert_eq!(t.factor(0.25, 2.0), 0.5);
        assert_eq!(t.factor(1.0, 2.0), 1.0);
    }

    #[test]
    fn test_death_transition_ramps_out() {
        let t = Transition::new(TransitionKind::Scale, TransitionPhase::Death, 0.5);
        assert_eq!(t.factor(0.0, 2.0), 1.0);
        assert_eq!(t.factor(1.75, 2.0), 0.5);
        assert_eq!(t.factor(2.0, 2.0), 0.0);
        assert_eq!(t.factor(100.0, f32::INFINITY), 1.0);
    }

    #[test]
    fn test_apply_scales_property() {
        let t = Transition::new(TransitionKind::Scale, TransitionPhase::BirthAndDeath, 1.0);
        let mut state = RenderState::default();
        t.apply(&mut state, 0.5, 10.0);
        assert_eq!(state.scale(), 0.5);
        assert_eq!(state.opacity(), 1.0);
    }
}
