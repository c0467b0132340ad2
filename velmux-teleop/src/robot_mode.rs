use auto_impl::auto_impl;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use velmux::Error;

/// Gait requested from the robot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum LocomotionHint {
    #[default]
    Auto = 1,
    Trot = 2,
    SpeedSelectTrot = 3,
    Crawl = 4,
    Amble = 5,
    SpeedSelectAmble = 6,
    SpeedSelectCrawl = 10,
}

impl LocomotionHint {
    /// Order in which the joystick cycles through hints.
    pub const CYCLE: [Self; 7] = [
        Self::Auto,
        Self::Trot,
        Self::SpeedSelectTrot,
        Self::Crawl,
        Self::SpeedSelectCrawl,
        Self::Amble,
        Self::SpeedSelectAmble,
    ];

    /// Unknown values map to [`LocomotionHint::Auto`].
    pub fn from_i32(v: i32) -> Self {
        Self::CYCLE
            .into_iter()
            .find(|h| *h as i32 == v)
            .unwrap_or_default()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Trot => "TROT",
            Self::SpeedSelectTrot => "TROT WITH STOP",
            Self::Crawl => "CRAWL",
            Self::SpeedSelectCrawl => "CRAWL WITH STOP",
            Self::Amble => "AMBLE",
            Self::SpeedSelectAmble => "AMBLE WITH STOP",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum StairsMode {
    Off = 1,
    On = 2,
    #[default]
    Auto = 3,
}

impl StairsMode {
    pub const CYCLE: [Self; 3] = [Self::Off, Self::On, Self::Auto];

    /// Unknown values map to [`StairsMode::Auto`].
    pub fn from_i32(v: i32) -> Self {
        Self::CYCLE
            .into_iter()
            .find(|m| *m as i32 == v)
            .unwrap_or_default()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
            Self::Auto => "AUTOSELECT",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MobilityParams {
    pub locomotion_hint: LocomotionHint,
    pub stairs_mode: StairsMode,
}

/// Discrete robot services driven by [`DiscreteCommandNode`](crate::DiscreteCommandNode).
///
/// Calls are expected to return once the request is accepted, not when the
/// robot has finished moving.
#[auto_impl(Box, Arc)]
pub trait RobotModeClient: Send + Sync {
    fn is_powered_on(&self) -> Result<bool, Error>;
    fn power_on(&self) -> Result<(), Error>;
    fn safe_power_off(&self) -> Result<(), Error>;
    fn is_sitting(&self) -> Result<bool, Error>;
    fn stand(&self) -> Result<(), Error>;
    fn sit(&self) -> Result<(), Error>;
    fn mobility_params(&self) -> Result<MobilityParams, Error>;
    fn set_mobility_params(&self, params: &MobilityParams) -> Result<(), Error>;
    /// Whether the robot may move now. `autonomous` tells who is asking.
    fn is_motion_allowed(&self, autonomous: bool) -> bool {
        let _ = autonomous;
        true
    }
}
