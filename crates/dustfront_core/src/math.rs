//! 2D vector math for the simulation.
//!
//! The server is the single authority over world state, so plain `f32`
//! math is used throughout. Determinism concerns (targeting ties,
//! iteration order) are handled by ordered collections and explicit
//! tie-breaking, not by the number representation.

use serde::{Deserialize, Serialize};

/// A 2D vector in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Vec2 {
    /// Zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along the given angle (radians).
    #[must_use]
    pub fn from_angle(radians: f32) -> Self {
        Self {
            x: radians.cos(),
            y: radians.sin(),
        }
    }

    /// Squared length.
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Squared distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        (self - other).length_squared()
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Dot product.
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Normalized copy, or zero if the vector is (near) zero length.
    #[must_use]
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            Self::ZERO
        } else {
            Self {
                x: self.x / len,
                y: self.y / len,
            }
        }
    }

    /// Copy with length clamped to `max`.
    #[must_use]
    pub fn clamp_length(self, max: f32) -> Self {
        let len_sq = self.length_squared();
        if len_sq > max * max {
            self.normalize_or_zero() * max
        } else {
            self
        }
    }

    /// Angle of this vector in radians (atan2 convention).
    #[must_use]
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Linear interpolation toward `other` by factor `t` in [0, 1].
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// Solve the intercept point for a projectile fired at a moving target.
///
/// Returns the world point to aim at so a projectile launched from
/// `shooter` at `projectile_speed` meets a target currently at `target`
/// moving with constant `target_vel`. Falls back to the target's current
/// position when no forward-time solution exists (target faster than the
/// projectile, or degenerate geometry).
#[must_use]
pub fn intercept_point(
    shooter: Vec2,
    target: Vec2,
    target_vel: Vec2,
    projectile_speed: f32,
) -> Vec2 {
    let to_target = target - shooter;

    // Quadratic in time-to-impact t:
    //   |to_target + target_vel * t| = projectile_speed * t
    let a = target_vel.length_squared() - projectile_speed * projectile_speed;
    let b = 2.0 * to_target.dot(target_vel);
    let c = to_target.length_squared();

    let t = if a.abs() < 1e-4 {
        // Near-linear case: speeds cancel, solve b*t + c = 0.
        if b.abs() < 1e-6 {
            return target;
        }
        -c / b
    } else {
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return target;
        }
        let sqrt_d = discriminant.sqrt();
        let t1 = (-b - sqrt_d) / (2.0 * a);
        let t2 = (-b + sqrt_d) / (2.0 * a);
        // Smallest positive root.
        match (t1 > 0.0, t2 > 0.0) {
            (true, true) => t1.min(t2),
            (true, false) => t1,
            (false, true) => t2,
            (false, false) => return target,
        }
    };

    if t > 0.0 && t.is_finite() {
        target + target_vel * t
    } else {
        target
    }
}

/// Wrap an angle to the `(-PI, PI]` range.
#[must_use]
pub fn wrap_angle(radians: f32) -> f32 {
    let mut a = radians;
    while a > std::f32::consts::PI {
        a -= std::f32::consts::TAU;
    }
    while a <= -std::f32::consts::PI {
        a += std::f32::consts::TAU;
    }
    a
}
