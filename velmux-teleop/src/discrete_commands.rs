use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Joy, JoyNode, LocomotionHint, RobotModeClient, StairsMode};

const DEADMAN_AXIS: usize = 2;
const POWER_AXIS: usize = 5;
const SIT_STAND_AXIS: usize = 7;
const MODE_AXIS: usize = 6;

const DEADMAN_THRESHOLD: f64 = -0.99;
const REQUEST_THRESHOLD: f64 = 0.9;

/// Discrete request read from a joystick message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscreteRequest {
    TogglePower,
    ToggleSitStand,
    NextLocomotionHint,
    NextStairsMode,
}

impl DiscreteRequest {
    /// Returns the highest-priority request in `joy`, if the deadman is held.
    pub fn from_joy(joy: &Joy) -> Option<Self> {
        if !is_deadman_held(joy) {
            return None;
        }
        if joy.axis(POWER_AXIS) < -REQUEST_THRESHOLD {
            Some(Self::TogglePower)
        } else if joy.axis(SIT_STAND_AXIS) > REQUEST_THRESHOLD {
            Some(Self::ToggleSitStand)
        } else if joy.axis(MODE_AXIS) > REQUEST_THRESHOLD {
            Some(Self::NextLocomotionHint)
        } else if joy.axis(MODE_AXIS) < -REQUEST_THRESHOLD {
            Some(Self::NextStairsMode)
        } else {
            None
        }
    }
}

fn is_deadman_held(joy: &Joy) -> bool {
    joy.axis(DEADMAN_AXIS) < DEADMAN_THRESHOLD
}

/// Seconds to wait after each request before accepting the next one.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DiscreteCommandConfig {
    #[serde(default = "default_power_pause_secs")]
    pub power_pause_secs: f64,
    #[serde(default = "default_sit_stand_pause_secs")]
    pub sit_stand_pause_secs: f64,
    #[serde(default = "default_toggle_pause_secs")]
    pub toggle_pause_secs: f64,
}

fn default_power_pause_secs() -> f64 {
    3.0
}
fn default_sit_stand_pause_secs() -> f64 {
    5.0
}
fn default_toggle_pause_secs() -> f64 {
    0.5
}

impl Default for DiscreteCommandConfig {
    fn default() -> Self {
        Self {
            power_pause_secs: default_power_pause_secs(),
            sit_stand_pause_secs: default_sit_stand_pause_secs(),
            toggle_pause_secs: default_toggle_pause_secs(),
        }
    }
}

fn secs(v: f64) -> Duration {
    Duration::try_from_secs_f64(v).unwrap_or_default()
}

#[derive(Debug, Default)]
struct DiscreteCommandState {
    is_paused: bool,
    locomotion_index: usize,
    stairs_index: usize,
}

/// Runs discrete robot services (power, sit/stand, gait hints) from joystick
/// gestures.
///
/// A request pauses the node until its handler and the following wait are
/// done; requests arriving meanwhile are ignored.
#[derive(Debug)]
pub struct DiscreteCommandNode<R: RobotModeClient> {
    robot: R,
    config: DiscreteCommandConfig,
    state: Mutex<DiscreteCommandState>,
}

impl<R> DiscreteCommandNode<R>
where
    R: RobotModeClient,
{
    pub fn new(config: DiscreteCommandConfig, robot: R) -> Self {
        Self {
            robot,
            config,
            state: Mutex::new(DiscreteCommandState::default()),
        }
    }

    pub fn robot(&self) -> &R {
        &self.robot
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().unwrap().is_paused
    }

    pub fn locomotion_hint(&self) -> LocomotionHint {
        LocomotionHint::CYCLE[self.state.lock().unwrap().locomotion_index]
    }

    pub fn stairs_mode(&self) -> StairsMode {
        StairsMode::CYCLE[self.state.lock().unwrap().stairs_index]
    }

    /// Handles the request in `joy`, if any, and returns it.
    pub async fn handle(&self, joy: &Joy) -> Option<DiscreteRequest> {
        let request = {
            let mut state = self.state.lock().unwrap();
            if state.is_paused {
                if is_deadman_held(joy) {
                    debug!("paused, ignoring joy");
                }
                return None;
            }
            let request = DiscreteRequest::from_joy(joy);
            state.is_paused = request.is_some();
            request
        }?;

        let pause = match request {
            DiscreteRequest::TogglePower => self.toggle_power(),
            DiscreteRequest::ToggleSitStand => self.toggle_sit_stand(),
            DiscreteRequest::NextLocomotionHint => self.next_locomotion_hint(),
            DiscreteRequest::NextStairsMode => self.next_stairs_mode(),
        };
        if let Some(pause) = pause {
            // requests are accepted before the robot is done, wait for it
            tokio::time::sleep(pause).await;
        }
        self.state.lock().unwrap().is_paused = false;
        Some(request)
    }

    fn toggle_power(&self) -> Option<Duration> {
        info!("received power on/off command");
        match self.robot.is_powered_on() {
            Ok(true) => match self.robot.safe_power_off() {
                Ok(()) => info!("power ON --> OFF"),
                Err(e) => warn!("failed to power off: {e}"),
            },
            Ok(false) => match self.robot.power_on() {
                Ok(()) => info!("power OFF --> ON"),
                Err(e) => warn!("failed to power on: {e}"),
            },
            Err(e) => warn!("failed to read power state: {e}"),
        }
        Some(secs(self.config.power_pause_secs))
    }

    fn toggle_sit_stand(&self) -> Option<Duration> {
        info!("received sit/stand command");
        if !self.robot.is_motion_allowed(false) {
            warn!("not changing sit/stand, robot motion not allowed");
            return None;
        }
        // The robot may report sitting and standing at once. Standing up from
        // an unknown posture is safer than sitting down into one.
        match self.robot.is_sitting() {
            Ok(true) => match self.robot.stand() {
                Ok(()) => info!("SIT --> STAND"),
                Err(e) => warn!("failed to stand: {e}"),
            },
            Ok(false) => match self.robot.sit() {
                Ok(()) => info!("STAND --> SIT"),
                Err(e) => warn!("failed to sit: {e}"),
            },
            Err(e) => warn!("failed to read posture: {e}"),
        }
        Some(secs(self.config.sit_stand_pause_secs))
    }

    fn next_locomotion_hint(&self) -> Option<Duration> {
        let hint = {
            let mut state = self.state.lock().unwrap();
            state.locomotion_index = (state.locomotion_index + 1) % LocomotionHint::CYCLE.len();
            LocomotionHint::CYCLE[state.locomotion_index]
        };
        let result = self.robot.mobility_params().and_then(|mut params| {
            params.locomotion_hint = hint;
            self.robot.set_mobility_params(&params)
        });
        match result {
            Ok(()) => info!("set locomotion mode to: {}", hint.label()),
            Err(e) => warn!("error setting locomotion mode: {e}"),
        }
        Some(secs(self.config.toggle_pause_secs))
    }

    fn next_stairs_mode(&self) -> Option<Duration> {
        let mode = {
            let mut state = self.state.lock().unwrap();
            state.stairs_index = (state.stairs_index + 1) % StairsMode::CYCLE.len();
            StairsMode::CYCLE[state.stairs_index]
        };
        let result = self.robot.mobility_params().and_then(|mut params| {
            params.stairs_mode = mode;
            self.robot.set_mobility_params(&params)
        });
        match result {
            Ok(()) => info!("set stairs mode to: {}", mode.label()),
            Err(e) => warn!("error setting stairs mode: {e}"),
        }
        Some(secs(self.config.toggle_pause_secs))
    }
}

#[async_trait]
impl<R> JoyNode for DiscreteCommandNode<R>
where
    R: RobotModeClient,
{
    async fn handle_joy(&self, joy: &Joy) {
        self.handle(joy).await;
    }

    async fn proc(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joy_with(axis: usize, value: f64) -> Joy {
        let mut axes = vec![0.0; 8];
        axes[DEADMAN_AXIS] = -1.0;
        axes[axis] = value;
        Joy::new(axes, vec![])
    }

    #[test]
    fn test_request_from_joy() {
        assert_eq!(
            DiscreteRequest::from_joy(&joy_with(POWER_AXIS, -1.0)),
            Some(DiscreteRequest::TogglePower)
        );
        assert_eq!(
            DiscreteRequest::from_joy(&joy_with(SIT_STAND_AXIS, 1.0)),
            Some(DiscreteRequest::ToggleSitStand)
        );
        assert_eq!(
            DiscreteRequest::from_joy(&joy_with(MODE_AXIS, 1.0)),
            Some(DiscreteRequest::NextLocomotionHint)
        );
        assert_eq!(
            DiscreteRequest::from_joy(&joy_with(MODE_AXIS, -1.0)),
            Some(DiscreteRequest::NextStairsMode)
        );
        assert_eq!(DiscreteRequest::from_joy(&joy_with(MODE_AXIS, 0.5)), None);

        // deadman released
        let mut joy = joy_with(POWER_AXIS, -1.0);
        joy.axes[DEADMAN_AXIS] = -0.5;
        assert_eq!(DiscreteRequest::from_joy(&joy), None);
        // short joystick
        assert_eq!(DiscreteRequest::from_joy(&Joy::new(vec![0.0, 0.0, -1.0], vec![])), None);
    }

    #[test]
    fn test_power_has_priority() {
        let mut joy = joy_with(POWER_AXIS, -1.0);
        joy.axes[SIT_STAND_AXIS] = 1.0;
        joy.axes[MODE_AXIS] = 1.0;
        assert_eq!(
            DiscreteRequest::from_joy(&joy),
            Some(DiscreteRequest::TogglePower)
        );
        let mut joy = joy_with(SIT_STAND_AXIS, 1.0);
        joy.axes[MODE_AXIS] = -1.0;
        assert_eq!(
            DiscreteRequest::from_joy(&joy),
            Some(DiscreteRequest::ToggleSitStand)
        );
    }

    #[test]
    fn test_secs() {
        assert_eq!(secs(0.5), Duration::from_millis(500));
        assert_eq!(secs(-1.0), Duration::ZERO);
    }
}
