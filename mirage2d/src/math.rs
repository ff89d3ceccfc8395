//! World-plane vector math.
//!
//! The game is top-down: everything moves on the engine's X/Z plane. `Vec2::x`
//! is world X and `Vec2::y` is world Z, so "north" is `+y`.

use glam::Vec2 as GlamVec2;
use serde::{Deserialize, Serialize};

/// Full turn in radians.
pub const TAU: f32 = std::f32::consts::TAU;

/// Multiply an angle in radians by this to get it in units of 45 degrees.
pub const INV_EIGHTH_TURN: f32 = 4.0 / std::f32::consts::PI;

/// 2D vector type used throughout Mirage2D.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
    pub const ONE: Self = Self { x: 1.0, y: 1.0 };
    pub const NORTH: Self = Self { x: 0.0, y: 1.0 };
    pub const SOUTH: Self = Self { x: 0.0, y: -1.0 };
    pub const EAST: Self = Self { x: 1.0, y: 0.0 };
    pub const WEST: Self = Self { x: -1.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        self.to_glam().length()
    }

    pub fn length_squared(&self) -> f32 {
        self.dot(*self)
    }

    /// Unit vector in the same direction, or zero for the zero vector.
    pub fn normalized(&self) -> Self {
        self.to_glam().normalize_or_zero().into()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.to_glam().dot(rhs.to_glam())
    }

    pub fn distance(self, rhs: Self) -> f32 {
        self.to_glam().distance(rhs.to_glam())
    }

    pub fn distance_squared(self, rhs: Self) -> f32 {
        self.to_glam().distance_squared(rhs.to_glam())
    }

    /// `self` at `t = 0`, `rhs` at `t = 1`.
    pub fn lerp(self, rhs: Self, t: f32) -> Self {
        self.to_glam().lerp(rhs.to_glam(), t).into()
    }

    /// Angle of the vector measured from `+x` towards `+y`, normalized to `[0, TAU)`.
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x).rem_euclid(TAU)
    }

    /// Unit vector at `angle` radians from `+x`.
    pub fn from_angle(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self { x: cos, y: sin }
    }

    pub fn to_glam(self) -> GlamVec2 {
        GlamVec2::new(self.x, self.y)
    }
}

impl From<GlamVec2> for Vec2 {
    fn from(v: GlamVec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Vec2> for GlamVec2 {
    fn from(v: Vec2) -> Self {
        v.to_glam()
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        (self.to_glam() + rhs.to_glam()).into()
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        (self.to_glam() - rhs.to_glam()).into()
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, scale: f32) -> Self {
        (self.to_glam() * scale).into()
    }
}

impl std::ops::MulAssign<f32> for Vec2 {
    fn mul_assign(&mut self, scale: f32) {
        *self = *self * scale;
    }
}

impl std::ops::Div<f32> for Vec2 {
    type Output = Self;

    fn div(self, scale: f32) -> Self {
        (self.to_glam() / scale).into()
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self { x: -self.x, y: -self.y }
    }
}
