use std::sync::Mutex;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;
use velmux::{BaseVelocity, MoveBase};

use crate::{Joy, JoyNode};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct JoyVelocityConfig {
    #[serde(default = "default_axis_linear_x")]
    pub axis_linear_x: usize,
    #[serde(default = "default_axis_linear_y")]
    pub axis_linear_y: usize,
    #[serde(default = "default_axis_angular")]
    pub axis_angular: usize,
    #[serde(default = "default_linear_gain")]
    pub linear_gain: f64,
    #[serde(default = "default_angular_gain")]
    pub angular_gain: f64,
    #[serde(default = "default_turbo_gain")]
    pub turbo_gain: f64,
    /// Deadman button. Commands are sent only while it is held.
    #[serde(default = "default_enable_button")]
    pub enable_button: usize,
    #[serde(default = "default_turbo_button")]
    pub turbo_button: usize,
}

fn default_axis_linear_x() -> usize {
    1
}
fn default_axis_linear_y() -> usize {
    0
}
fn default_axis_angular() -> usize {
    3
}
fn default_linear_gain() -> f64 {
    0.5
}
fn default_angular_gain() -> f64 {
    1.5
}
fn default_turbo_gain() -> f64 {
    2.0
}
fn default_enable_button() -> usize {
    5
}
fn default_turbo_button() -> usize {
    4
}

impl Default for JoyVelocityConfig {
    fn default() -> Self {
        Self {
            axis_linear_x: default_axis_linear_x(),
            axis_linear_y: default_axis_linear_y(),
            axis_angular: default_axis_angular(),
            linear_gain: default_linear_gain(),
            angular_gain: default_angular_gain(),
            turbo_gain: default_turbo_gain(),
            enable_button: default_enable_button(),
            turbo_button: default_turbo_button(),
        }
    }
}

#[derive(Debug, Default)]
struct JoyVelocityState {
    vel: BaseVelocity,
    is_enabled: bool,
    is_turbo: bool,
}

/// Turns stick axes into velocity commands sent to a `MoveBase`, typically a
/// mux [`SourceInput`](velmux::SourceInput).
#[derive(Debug)]
pub struct JoyVelocityNode<T: MoveBase> {
    move_base: T,
    config: JoyVelocityConfig,
    state: Mutex<JoyVelocityState>,
}

impl<T> JoyVelocityNode<T>
where
    T: MoveBase,
{
    pub fn new(config: JoyVelocityConfig, move_base: T) -> Self {
        Self {
            move_base,
            config,
            state: Mutex::new(JoyVelocityState::default()),
        }
    }

    pub fn move_base(&self) -> &T {
        &self.move_base
    }

    pub fn set_joy(&self, joy: &Joy) {
        let c = &self.config;
        let mut state = self.state.lock().unwrap();
        state.vel = BaseVelocity {
            x: joy.axis(c.axis_linear_x) * c.linear_gain,
            y: joy.axis(c.axis_linear_y) * c.linear_gain,
            theta: joy.axis(c.axis_angular) * c.angular_gain,
        };
        state.is_turbo = joy.is_pressed(c.turbo_button);
        let was_enabled = state.is_enabled;
        state.is_enabled = joy.is_pressed(c.enable_button);
        if was_enabled && !state.is_enabled {
            // stop immediately
            if let Err(e) = self.move_base.send_velocity(&BaseVelocity::default()) {
                warn!("failed to send stop command: {e}");
            }
        }
    }

    /// The command `proc` would send, if any.
    pub fn command(&self) -> Option<BaseVelocity> {
        let state = self.state.lock().unwrap();
        if !state.is_enabled {
            return None;
        }
        if state.is_turbo {
            Some(state.vel * self.config.turbo_gain)
        } else {
            Some(state.vel)
        }
    }
}

#[async_trait]
impl<T> JoyNode for JoyVelocityNode<T>
where
    T: MoveBase,
{
    async fn handle_joy(&self, joy: &Joy) {
        self.set_joy(joy);
    }

    async fn proc(&self) {
        if let Some(vel) = self.command() {
            if let Err(e) = self.move_base.send_velocity(&vel) {
                warn!("failed to send velocity: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::*;
    use velmux::DummyMoveBase;

    use super::*;

    fn joy(x: f64, y: f64, theta: f64, enable: bool, turbo: bool) -> Joy {
        let mut buttons = vec![0; 6];
        buttons[5] = i32::from(enable);
        buttons[4] = i32::from(turbo);
        Joy::new(vec![y, x, 0.0, theta], buttons)
    }

    #[test]
    fn test_default_config() {
        let config: JoyVelocityConfig = toml::from_str("").unwrap();
        assert_eq!(config, JoyVelocityConfig::default());
        let config: JoyVelocityConfig = toml::from_str("enable_button = 0").unwrap();
        assert_eq!(config.enable_button, 0);
        assert_approx_eq!(config.linear_gain, 0.5);
    }

    #[tokio::test]
    async fn test_joy_velocity_node_proc() {
        const X: f64 = 1.2;
        const Y: f64 = 3.5;
        const THETA: f64 = 1.8;
        let node = JoyVelocityNode::new(JoyVelocityConfig::default(), DummyMoveBase::new());

        node.handle_joy(&joy(X, Y, THETA, false, false)).await;
        node.proc().await;
        assert!(node.move_base().sent_velocities().is_empty());

        node.handle_joy(&joy(X, Y, THETA, false, true)).await;
        node.proc().await;
        assert!(node.move_base().sent_velocities().is_empty());

        node.handle_joy(&joy(X, Y, THETA, true, false)).await;
        node.proc().await;
        let current = node.move_base().current_velocity().unwrap();
        assert_approx_eq!(current.x, X * 0.5);
        assert_approx_eq!(current.y, Y * 0.5);
        assert_approx_eq!(current.theta, THETA * 1.5);

        node.handle_joy(&joy(X, Y, THETA, true, true)).await;
        node.proc().await;
        let current = node.move_base().current_velocity().unwrap();
        assert_approx_eq!(current.x, X * 0.5 * 2.0);
        assert_approx_eq!(current.y, Y * 0.5 * 2.0);
        assert_approx_eq!(current.theta, THETA * 1.5 * 2.0);
    }

    #[tokio::test]
    async fn test_release_sends_stop_once() {
        let node = JoyVelocityNode::new(JoyVelocityConfig::default(), DummyMoveBase::new());
        node.handle_joy(&joy(1.0, 0.0, 0.0, true, false)).await;
        node.proc().await;
        node.handle_joy(&joy(1.0, 0.0, 0.0, false, false)).await;
        node.proc().await;
        node.handle_joy(&joy(1.0, 0.0, 0.0, false, false)).await;
        node.proc().await;

        let sent = node.move_base().sent_velocities();
        assert_eq!(sent.len(), 2);
        assert_approx_eq!(sent[0].x, 0.5);
        assert!(sent[1].is_zero());
    }

    #[test]
    fn test_missing_axes_are_neutral() {
        let node = JoyVelocityNode::new(JoyVelocityConfig::default(), DummyMoveBase::new());
        node.set_joy(&Joy::new(vec![], vec![0, 0, 0, 0, 0, 1]));
        assert_eq!(node.command(), Some(BaseVelocity::default()));
    }
}
