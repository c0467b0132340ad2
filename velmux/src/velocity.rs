use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Planar velocity command: linear `x`/`y` and angular `theta` (yaw rate).
///
/// The default value is the stop command. Every component is required when
/// deserialized, since the type also describes limits and bounds.
#[derive(Clone, Debug, Default, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BaseVelocity {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl BaseVelocity {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        theta: 0.0,
    };

    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.theta.is_finite()
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Returns `true` if every component magnitude is within `bounds`.
    ///
    /// Bounds are magnitudes, so their sign is ignored.
    pub fn is_within(&self, bounds: &BaseVelocity) -> bool {
        self.x.abs() <= bounds.x.abs()
            && self.y.abs() <= bounds.y.abs()
            && self.theta.abs() <= bounds.theta.abs()
    }
}

/// Multiply scalar value for velocity
///
/// # Example
///
/// ```
/// use assert_approx_eq::assert_approx_eq;
/// use velmux::BaseVelocity;
///
/// let vel = BaseVelocity::new(0.1, -0.2, 1.0);
/// let twice = vel * 2.0;
/// assert_approx_eq!(twice.x, 0.2);
/// assert_approx_eq!(twice.y, -0.4);
/// assert_approx_eq!(twice.theta, 2.0);
/// ```
impl std::ops::Mul<f64> for BaseVelocity {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
            theta: self.theta * rhs,
        }
    }
}

/// Acceleration limits used by [`VelocityLimiter`](crate::VelocityLimiter).
#[derive(Clone, Debug, Default, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BaseAcceleration {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl BaseAcceleration {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }
}

impl std::ops::Mul<f64> for BaseAcceleration {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
            theta: self.theta * rhs,
        }
    }
}

/// Components as `[x, y, theta]`.
impl From<BaseVelocity> for [f64; 3] {
    fn from(v: BaseVelocity) -> Self {
        [v.x, v.y, v.theta]
    }
}

impl From<BaseAcceleration> for [f64; 3] {
    fn from(a: BaseAcceleration) -> Self {
        [a.x, a.y, a.theta]
    }
}
