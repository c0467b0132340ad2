use tracing::trace;

use crate::{error::Error, move_base::MoveBase, velocity::BaseVelocity};

/// Logs every call made on the wrapped value at `trace` level.
#[derive(Debug)]
pub struct Tracing<T>(T);

impl<T> Tracing<T> {
    pub fn new(v: T) -> Self {
        Self(v)
    }

    pub fn get_ref(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Tracing<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: MoveBase> MoveBase for Tracing<T> {
    fn send_velocity(&self, velocity: &BaseVelocity) -> Result<(), Error> {
        trace!(
            method = "MoveBase::send_velocity",
            velocity_x = velocity.x,
            velocity_y = velocity.y,
            velocity_theta = velocity.theta
        );
        self.0.send_velocity(velocity)
    }

    fn current_velocity(&self) -> Result<BaseVelocity, Error> {
        let velocity = self.0.current_velocity()?;
        trace!(
            method = "MoveBase::current_velocity",
            velocity_x = velocity.x,
            velocity_y = velocity.y,
            velocity_theta = velocity.theta
        );
        Ok(velocity)
    }
}
