//! # Packed Physics State
//!
//! The physical quantities of one proxy, packed into 26 bytes.
//!
//! | field | storage | decoded as |
//! |---|---|---|
//! | x, y | `u16` fixed point | pixels, 0.1 px resolution |
//! | velocity, acceleration | `f16` x 2 | pixels per frame (per frame) |
//! | lifetime | `f16` | seconds |
//! | inception | `u16`, wrapping | frame number at birth |
//! | rotation | `u8` | 256 steps per turn |
//! | torque, torque variation | `i8` | signed steps per frame |
//! | anchor | `u8` x 2 | unit space |
//! | seed | `u8` x 4 | random bytes |
//!
//! `f16` keeps about three significant digits, so a velocity integrated from
//! a small acceleration drifts once it grows: after 1000 frames of 0.1 px
//! the stored value reads about 105 rather than 100.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use half::f16;

use super::angle::Angle;
use super::quantize::{
    decode_angle, decode_angle_delta, decode_position, decode_unit, encode_angle,
    encode_angle_delta, encode_duration, encode_half, encode_position, encode_unit,
};

/// Lifetime, in seconds, given to a state that has not been configured.
pub const DEFAULT_LIFETIME: f32 = 5.0;

/// Packed, fixed-width physics state of a single proxy.
///
/// Reads decode, writes encode. Writes outside the representable range are
/// clamped silently; see [`quantize`](super::quantize).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PhysicsState {
    x: u16,
    y: u16,
    inception: u16,
    velocity: [f16; 2],
    acceleration: [f16; 2],
    lifetime: f16,
    rotation: u8,
    torque: i8,
    torque_variation: i8,
    anchor: [u8; 2],
    seed: [u8; 4],
    /// Keeps the struct free of implicit padding.
    _reserved: u8,
}

impl PhysicsState {
    /// Size of a packed state in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Creates a state at rest at the origin, born on `frame`.
    ///
    /// Only the low 16 bits of `frame` are stored.
    #[must_use]
    pub fn new(frame: u64, seed: [u8; 4]) -> Self {
        let mut state = Self::zeroed();
        state.set_position(Vec2::ZERO);
        state.set_anchor(Vec2::splat(0.5));
        state.set_lifetime(DEFAULT_LIFETIME);
        state.set_inception(frame);
        state.seed = seed;
        state
    }

    /// The position, in pixels.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec2 {
        Vec2::new(decode_position(self.x), decode_position(self.y))
    }

    /// Sets the position, clamping each axis to the representable range.
    #[inline]
    pub fn set_position(&mut self, position: Vec2) {
        self.x = encode_position(position.x);
        self.y = encode_position(position.y);
    }

    /// The velocity, in pixels per frame. Stored as `f16`; repeated
    /// accumulation rounds at every write.
    #[inline]
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        Vec2::new(self.velocity[0].to_f32(), self.velocity[1].to_f32())
    }

    /// Sets the velocity.
    #[inline]
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = [encode_half(velocity.x), encode_half(velocity.y)];
    }

    /// The acceleration, in pixels per frame per frame, as `f16`.
    #[inline]
    #[must_use]
    pub fn acceleration(&self) -> Vec2 {
        Vec2::new(self.acceleration[0].to_f32(), self.acceleration[1].to_f32())
    }

    /// Sets the acceleration.
    #[inline]
    pub fn set_acceleration(&mut self, acceleration: Vec2) {
        self.acceleration = [encode_half(acceleration.x), encode_half(acceleration.y)];
    }

    /// The rotation, in `[0, 360)` degrees.
    #[inline]
    #[must_use]
    pub fn rotation(&self) -> Angle {
        Angle::from_degrees(decode_angle(self.rotation))
    }

    /// Sets the rotation. The angle is taken modulo 360.
    #[inline]
    pub fn set_rotation(&mut self, rotation: Angle) {
        self.rotation = encode_angle(rotation.degrees());
    }

    /// The rotation applied per frame.
    #[inline]
    #[must_use]
    pub fn torque(&self) -> Angle {
        Angle::from_degrees(decode_angle_delta(self.torque))
    }

    /// Sets the rotation applied per frame.
    #[inline]
    pub fn set_torque(&mut self, torque: Angle) {
        self.torque = encode_angle_delta(torque.degrees());
    }

    /// The change of torque per frame.
    #[inline]
    #[must_use]
    pub fn torque_variation(&self) -> Angle {
        Angle::from_degrees(decode_angle_delta(self.torque_variation))
    }

    /// Sets the change of torque per frame.
    #[inline]
    pub fn set_torque_variation(&mut self, variation: Angle) {
        self.torque_variation = encode_angle_delta(variation.degrees());
    }

    /// The centre of rotation, in unit space relative to the drawable.
    #[inline]
    #[must_use]
    pub fn anchor(&self) -> Vec2 {
        Vec2::new(decode_unit(self.anchor[0]), decode_unit(self.anchor[1]))
    }

    /// Sets the centre of rotation. Each axis is clamped to `[0, 1]`.
    #[inline]
    pub fn set_anchor(&mut self, anchor: Vec2) {
        self.anchor = [encode_unit(anchor.x), encode_unit(anchor.y)];
    }

    /// Seconds from birth until expiration.
    #[inline]
    #[must_use]
    pub fn lifetime(&self) -> f32 {
        self.lifetime.to_f32()
    }

    /// Sets the lifetime. Negative values clamp to zero; `f32::INFINITY`
    /// means the proxy never expires.
    #[inline]
    pub fn set_lifetime(&mut self, seconds: f32) {
        self.lifetime = encode_duration(seconds);
    }

    /// Frame number at birth, modulo 65536.
    #[inline]
    #[must_use]
    pub const fn inception(&self) -> u16 {
        self.inception
    }

    /// Records the birth frame, keeping its low 16 bits.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_inception(&mut self, frame: u64) {
        self.inception = frame as u16;
    }

    /// Frames elapsed since birth, using wrapping 16-bit arithmetic.
    ///
    /// Exact for proxies younger than 65536 frames.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn frames_alive(&self, current_frame: u64) -> u16 {
        (current_frame as u16).wrapping_sub(self.inception)
    }

    /// The four random seed bytes drawn at birth.
    #[inline]
    #[must_use]
    pub const fn seed(&self) -> [u8; 4] {
        self.seed
    }

    /// One seed byte mapped to `[0, 1]`. Indices wrap modulo 4.
    #[inline]
    #[must_use]
    pub fn seed_unit(&self, index: usize) -> f32 {
        f32::from(self.seed[index % 4]) / 255.0
    }

    /// The packed bytes, for diagnostics and byte-level comparisons.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for PhysicsState {
    fn default() -> Self {
        Self::new(0, [0; 4])
    }
}
