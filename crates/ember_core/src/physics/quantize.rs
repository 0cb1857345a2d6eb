//! # Quantization
//!
//! Encoders and decoders between full-precision values and the packed
//! representation used by [`PhysicsState`](super::PhysicsState).
//!
//! Every encoder clamps. Writing a value outside the representable range is
//! lossy, documented behavior and never an error. `NaN` encodes as zero.

use half::f16;

/// Fixed-point scale for positions (steps per pixel).
pub const POSITION_SCALE: f32 = 10.0;

/// Encoded value that represents a position of `0.0`.
pub const POSITION_OFFSET: f32 = 5000.0;

/// Smallest representable position.
pub const POSITION_MIN: f32 = -POSITION_OFFSET / POSITION_SCALE;

/// Largest representable position.
pub const POSITION_MAX: f32 = (u16::MAX as f32 - POSITION_OFFSET) / POSITION_SCALE;

/// Degrees covered by one step of a packed angle (256 steps per turn).
pub const ANGLE_STEP: f32 = 360.0 / 256.0;

/// Steps per unit for unit-space values packed into a byte.
const UNIT_STEPS: f32 = 255.0;

#[inline]
fn finite_or_zero(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

/// Encodes a position coordinate into 16 bits.
///
/// Values outside `[POSITION_MIN, POSITION_MAX]` are clamped to the bound.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn encode_position(value: f32) -> u16 {
    let steps = (finite_or_zero(value) * POSITION_SCALE).round() + POSITION_OFFSET;
    steps.clamp(0.0, f32::from(u16::MAX)) as u16
}

/// Decodes a 16-bit position coordinate.
#[inline]
#[must_use]
pub fn decode_position(encoded: u16) -> f32 {
    (f32::from(encoded) - POSITION_OFFSET) / POSITION_SCALE
}

/// Encodes an absolute angle in degrees into one of 256 steps.
///
/// The angle is taken modulo 360 first.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn encode_angle(degrees: f32) -> u8 {
    let wrapped = finite_or_zero(degrees).rem_euclid(360.0);
    let steps = (wrapped / ANGLE_STEP).round() as u32;
    (steps % 256) as u8
}

/// Decodes a packed absolute angle into degrees in `[0, 360)`.
#[inline]
#[must_use]
pub fn decode_angle(encoded: u8) -> f32 {
    f32::from(encoded) * ANGLE_STEP
}

/// Encodes a per-frame angular delta into a signed step count.
///
/// The delta is wrapped into `(-180, 180]` and clamped to `[-128, 127]`
/// steps, so a delta of exactly 180 degrees saturates at 127 steps.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode_angle_delta(degrees: f32) -> i8 {
    let mut wrapped = finite_or_zero(degrees).rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped -= 360.0;
    }
    (wrapped / ANGLE_STEP)
        .round()
        .clamp(f32::from(i8::MIN), f32::from(i8::MAX)) as i8
}

/// Decodes a signed angular delta into degrees.
#[inline]
#[must_use]
pub fn decode_angle_delta(encoded: i8) -> f32 {
    f32::from(encoded) * ANGLE_STEP
}

/// Encodes a unit-space value (`0.0..=1.0`) into a byte.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn encode_unit(value: f32) -> u8 {
    (finite_or_zero(value).clamp(0.0, 1.0) * UNIT_STEPS).round() as u8
}

/// Decodes a byte into a unit-space value.
#[inline]
#[must_use]
pub fn decode_unit(encoded: u8) -> f32 {
    f32::from(encoded) / UNIT_STEPS
}

/// Encodes a signed quantity (velocity, acceleration) as a 16-bit float.
///
/// Magnitudes beyond the largest finite `f16` are clamped to it.
#[inline]
#[must_use]
pub fn encode_half(value: f32) -> f16 {
    let max = f16::MAX.to_f32();
    f16::from_f32(finite_or_zero(value).clamp(-max, max))
}

/// Encodes a duration in seconds as a 16-bit float.
///
/// Negative durations clamp to zero. `+inf` is kept and means "never
/// expires"; other large values clamp to the largest finite `f16`.
#[inline]
#[must_use]
pub fn encode_duration(seconds: f32) -> f16 {
    let seconds = finite_or_zero(seconds);
    if seconds == f32::INFINITY {
        return f16::INFINITY;
    }
    f16::from_f32(seconds.clamp(0.0, f16::MAX.to_f32()))
}
