//! Basic building blocks.

use std::{
    f64::consts::PI,
    ops::{Add, Neg, Sub},
};

/// Point in field coordinates. The y-axis points down, as on a screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Position {
    x: f64,
    y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn distance(&self, position: Self) -> f64 {
        ((self.x - position.x).powi(2) + (self.y - position.y).powi(2)).sqrt()
    }

    /// Point at `distance` along `angle`, with the y-component inverted to match the field's
    /// downward y-axis.
    pub fn project(&self, angle: Angle, distance: f64) -> Position {
        Position::new(
            self.x + distance * angle.0.cos(),
            self.y - distance * angle.0.sin(),
        )
    }

    /// Linear interpolation between `self` (u = 0) and `other` (u = 1).
    pub fn lerp(&self, other: Position, u: f64) -> Position {
        Position::new(
            other.x * u + self.x * (1.0 - u),
            other.y * u + self.y * (1.0 - u),
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Angle(f64);

impl Angle {
    pub const FULL_TURN: f64 = 2.0 * PI;

    pub const fn new(radians: f64) -> Self {
        Self(radians)
    }

    pub fn from_deg(degree: f64) -> Self {
        Self(degree * PI / 180.0)
    }

    pub fn to_deg(self) -> f64 {
        (self.0 * (180.0 / PI) + 360.0) % 360.0
    }

    /// Snaps to exactly zero once the angle leaves `[-2π, 2π]`. This is a hard reset, not a
    /// modulo wrap.
    pub fn reset_beyond_full_turn(self) -> Self {
        if self.0 > Self::FULL_TURN || self.0 < -Self::FULL_TURN {
            Self(0.0)
        } else {
            self
        }
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl From<Angle> for f64 {
    fn from(value: Angle) -> Self {
        value.0
    }
}

impl From<Angle> for f32 {
    fn from(value: Angle) -> Self {
        value.0 as f32
    }
}

/// Signed wheel velocity in field units per second. Negative values drive in reverse.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Velocity(f64);

impl Velocity {
    pub const fn new(velocity: f64) -> Self {
        Self(velocity)
    }

    /// Bounds the velocity to `[min, max]`. Callers guarantee `min <= max`.
    pub fn clamp(self, min: Velocity, max: Velocity) -> Self {
        Self(self.0.min(max.0).max(min.0))
    }

    pub fn halved(self) -> Self {
        Self(self.0 / 2.0)
    }
}

impl Neg for Velocity {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Velocity(-self.0)
    }
}

impl From<Velocity> for f64 {
    fn from(value: Velocity) -> Self {
        value.0
    }
}
