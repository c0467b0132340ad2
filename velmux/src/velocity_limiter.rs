use std::{sync::Mutex, time::Instant};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    error::Error,
    move_base::MoveBase,
    velocity::{BaseAcceleration, BaseVelocity},
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct VelocityLimiterConfig {
    pub max_velocity: BaseVelocity,
    /// Defaults to `-max_velocity`.
    pub min_velocity: Option<BaseVelocity>,
    /// Acceleration is not limited if unset.
    pub max_acceleration: Option<BaseAcceleration>,
    /// Defaults to `-max_acceleration`.
    pub min_acceleration: Option<BaseAcceleration>,
}

/// Clamps velocities sent to the wrapped `MoveBase` to velocity and
/// acceleration limits.
///
/// The acceleration limit is applied against the last forwarded velocity
/// using the time elapsed since it was forwarded. The first command is only
/// velocity-limited.
#[derive(Debug)]
pub struct VelocityLimiter<T>
where
    T: MoveBase,
{
    inner: T,
    max_velocity: BaseVelocity,
    min_velocity: BaseVelocity,
    acceleration: Option<(BaseAcceleration, BaseAcceleration)>,
    last_sent: Mutex<Option<(BaseVelocity, Instant)>>,
}

impl VelocityLimiterConfig {
    /// Checks that every limit is finite and that each lower limit, given or
    /// derived from the upper one, does not exceed the upper limit.
    pub fn validate(&self) -> Result<(), Error> {
        check_limits(
            "velocity",
            self.max_velocity.into(),
            self.min_velocity
                .unwrap_or(self.max_velocity * -1.0)
                .into(),
        )?;
        if let Some(max) = self.max_acceleration {
            check_limits(
                "acceleration",
                max.into(),
                self.min_acceleration.unwrap_or(max * -1.0).into(),
            )?;
        } else if self.min_acceleration.is_some() {
            return Err(Error::InvalidVelocityLimits(
                "min_acceleration is set without max_acceleration".into(),
            ));
        }
        Ok(())
    }
}

fn check_limits(kind: &str, max: [f64; 3], min: [f64; 3]) -> Result<(), Error> {
    for ((axis, max), min) in ["x", "y", "theta"].into_iter().zip(max).zip(min) {
        if !max.is_finite() || !min.is_finite() {
            return Err(Error::InvalidVelocityLimits(format!(
                "{kind} limits of {axis} must be finite, but min={min} max={max}"
            )));
        }
        if min > max {
            return Err(Error::InvalidVelocityLimits(format!(
                "min {kind} of {axis} ({min}) is larger than max ({max})"
            )));
        }
    }
    Ok(())
}

impl<T> VelocityLimiter<T>
where
    T: MoveBase,
{
    /// Symmetric velocity limit `-max_velocity..=max_velocity`.
    pub fn new(inner: T, max_velocity: BaseVelocity) -> Result<Self, Error> {
        Self::from_config(
            inner,
            &VelocityLimiterConfig {
                max_velocity,
                min_velocity: None,
                max_acceleration: None,
                min_acceleration: None,
            },
        )
    }

    pub fn new_as_asymmetric(
        inner: T,
        max_velocity: BaseVelocity,
        min_velocity: BaseVelocity,
        acceleration: Option<(BaseAcceleration, BaseAcceleration)>,
    ) -> Result<Self, Error> {
        Self::from_config(
            inner,
            &VelocityLimiterConfig {
                max_velocity,
                min_velocity: Some(min_velocity),
                max_acceleration: acceleration.map(|(max, _)| max),
                min_acceleration: acceleration.map(|(_, min)| min),
            },
        )
    }

    /// Fails with [`Error::InvalidVelocityLimits`] if `config` does not pass
    /// [`VelocityLimiterConfig::validate`].
    pub fn from_config(inner: T, config: &VelocityLimiterConfig) -> Result<Self, Error> {
        config.validate()?;
        let acceleration = config
            .max_acceleration
            .map(|max| (max, config.min_acceleration.unwrap_or(max * -1.0)));
        Ok(Self {
            inner,
            max_velocity: config.max_velocity,
            min_velocity: config.min_velocity.unwrap_or(config.max_velocity * -1.0),
            acceleration,
            last_sent: Mutex::new(None),
        })
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_limited_velocity(&self, velocity: &BaseVelocity, now: Instant) -> BaseVelocity {
        let vel = self.limit_acceleration(velocity, now);
        self.limit_velocity(&vel)
    }

    fn limit_velocity(&self, velocity: &BaseVelocity) -> BaseVelocity {
        BaseVelocity {
            x: velocity.x.clamp(self.min_velocity.x, self.max_velocity.x),
            y: velocity.y.clamp(self.min_velocity.y, self.max_velocity.y),
            theta: velocity
                .theta
                .clamp(self.min_velocity.theta, self.max_velocity.theta),
        }
    }

    fn limit_acceleration(&self, velocity: &BaseVelocity, now: Instant) -> BaseVelocity {
        let (Some((max_acc, min_acc)), Some((last, sent_at))) =
            (self.acceleration, *self.last_sent.lock().unwrap())
        else {
            return *velocity;
        };
        let dt = now.saturating_duration_since(sent_at).as_secs_f64();
        BaseVelocity {
            x: velocity
                .x
                .clamp(last.x + min_acc.x * dt, last.x + max_acc.x * dt),
            y: velocity
                .y
                .clamp(last.y + min_acc.y * dt, last.y + max_acc.y * dt),
            theta: velocity.theta.clamp(
                last.theta + min_acc.theta * dt,
                last.theta + max_acc.theta * dt,
            ),
        }
    }
}

impl<T> MoveBase for VelocityLimiter<T>
where
    T: MoveBase,
{
    fn send_velocity(&self, velocity: &BaseVelocity) -> Result<(), Error> {
        let now = Instant::now();
        let limited = self.get_limited_velocity(velocity, now);
        trace!(?velocity, ?limited, "limited velocity");
        self.inner.send_velocity(&limited)?;
        *self.last_sent.lock().unwrap() = Some((limited, now));
        Ok(())
    }

    fn current_velocity(&self) -> Result<BaseVelocity, Error> {
        self.inner.current_velocity()
    }
}
