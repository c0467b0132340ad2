use std::sync::Mutex;

use auto_impl::auto_impl;

use crate::{error::Error, velocity::BaseVelocity};

/// Sink of velocity commands.
///
/// The mux output is a `MoveBase`, and so is every mux input handle
/// ([`SourceInput`](crate::SourceInput)), so producers and consumers can be
/// chained freely.
#[auto_impl(Box, Rc, Arc)]
pub trait MoveBase: Send + Sync {
    fn send_velocity(&self, velocity: &BaseVelocity) -> Result<(), Error>;
    fn current_velocity(&self) -> Result<BaseVelocity, Error>;
}

/// `MoveBase` that only remembers what it was sent.
#[derive(Debug, Default)]
pub struct DummyMoveBase {
    sent: Mutex<Vec<BaseVelocity>>,
}

impl DummyMoveBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// All velocities sent so far, oldest first.
    pub fn sent_velocities(&self) -> Vec<BaseVelocity> {
        self.sent.lock().unwrap().clone()
    }
}

impl MoveBase for DummyMoveBase {
    fn send_velocity(&self, velocity: &BaseVelocity) -> Result<(), Error> {
        self.sent.lock().unwrap().push(*velocity);
        Ok(())
    }

    fn current_velocity(&self) -> Result<BaseVelocity, Error> {
        Ok(self
            .sent
            .lock()
            .unwrap()
            .last()
            .copied()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn test_set_get() {
        let base = DummyMoveBase::new();
        let vel = base.current_velocity().unwrap();
        assert_approx_eq!(vel.x, 0.0);
        assert_approx_eq!(vel.y, 0.0);
        assert_approx_eq!(vel.theta, 0.0);
        base.send_velocity(&BaseVelocity::new(0.1, 0.2, -3.0))
            .unwrap();
        let vel2 = base.current_velocity().unwrap();
        assert_approx_eq!(vel2.x, 0.1);
        assert_approx_eq!(vel2.y, 0.2);
        assert_approx_eq!(vel2.theta, -3.0);
        assert_eq!(base.sent_velocities().len(), 1);
    }
}
