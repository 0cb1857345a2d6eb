//! Angles in degrees.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// An angle, stored in degrees.
///
/// Arithmetic is unbounded; wrapping into `[0, 360)` happens through
/// [`Angle::normalized`] and whenever an angle is written into a
/// [`PhysicsState`](super::PhysicsState).
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Angle {
    degrees: f32,
}

impl Angle {
    /// The zero angle.
    pub const ZERO: Self = Self { degrees: 0.0 };

    /// Creates an angle from degrees.
    #[inline]
    #[must_use]
    pub const fn from_degrees(degrees: f32) -> Self {
        Self { degrees }
    }

    /// Creates an angle from radians.
    #[inline]
    #[must_use]
    pub fn from_radians(radians: f32) -> Self {
        Self {
            degrees: radians.to_degrees(),
        }
    }

    /// Returns the angle in degrees.
    #[inline]
    #[must_use]
    pub const fn degrees(self) -> f32 {
        self.degrees
    }

    /// Returns the angle in radians.
    #[inline]
    #[must_use]
    pub fn radians(self) -> f32 {
        self.degrees.to_radians()
    }

    /// Returns the equivalent angle in `[0, 360)`.
    #[must_use]
    pub fn normalized(self) -> Self {
        let wrapped = self.degrees.rem_euclid(360.0);
        // rem_euclid can round up to exactly 360 for tiny negative inputs.
        Self {
            degrees: if wrapped >= 360.0 { 0.0 } else { wrapped },
        }
    }

    /// Returns the equivalent signed angle in `(-180, 180]`.
    #[must_use]
    pub fn signed(self) -> Self {
        let wrapped = self.normalized().degrees;
        Self {
            degrees: if wrapped > 180.0 { wrapped - 360.0 } else { wrapped },
        }
    }

    /// Shortest angular distance to `other`, in degrees, always `>= 0`.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).signed().degrees.abs()
    }
}

impl Add for Angle {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::from_degrees(self.degrees + rhs.degrees)
    }
}

impl AddAssign for Angle {
    fn add_assign(&mut self, rhs: Self) {
        self.degrees += rhs.degrees;
    }
}

impl Sub for Angle {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::from_degrees(self.degrees - rhs.degrees)
    }
}

impl SubAssign for Angle {
    fn sub_assign(&mut self, rhs: Self) {
        self.degrees -= rhs.degrees;
    }
}

impl Neg for Angle {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_degrees(-self.degrees)
    }
}

impl Mul<f32> for Angle {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::from_degrees(self.degrees * rhs)
    }
}
