use std::{path::Path, time::Duration};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use velmux::{Arbitrator, BaseVelocity, SourceConfig, VelocityLimiterConfig};

use crate::Error;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LockConfig {
    /// Id of the source this lock disables.
    pub source: String,
    #[serde(default)]
    pub topic: String,
    /// Lock state at startup.
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MuxConfig {
    #[serde(default = "default_output_topic")]
    pub output_topic: String,
    /// Output rate in Hz.
    #[serde(default = "default_publish_rate")]
    pub publish_rate: f64,
    // https://github.com/alexcrichton/toml-rs/issues/258
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locks: Vec<LockConfig>,
    /// Commands with a larger magnitude on any axis are rejected.
    pub command_bounds: Option<BaseVelocity>,
    /// Clamp applied to the output.
    pub velocity_limits: Option<VelocityLimiterConfig>,
}

fn default_output_topic() -> String {
    "cmd_vel".into()
}

fn default_publish_rate() -> f64 {
    20.0
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            output_topic: default_output_topic(),
            publish_rate: default_publish_rate(),
            sources: vec![SourceConfig {
                id: "default".into(),
                topic: "cmd_vel_in".into(),
                priority: 0,
                timeout: 0.5,
            }],
            locks: vec![],
            command_bounds: None,
            velocity_limits: None,
        }
    }
}

impl MuxConfig {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_str(
            &fs_err::read_to_string(&path)
                .map_err(|e| Error::NoFile(path.as_ref().to_owned(), e))?,
            path,
        )
    }

    /// Parses and validates a config. `path` is only used in error messages.
    pub fn from_str<P: AsRef<Path>>(s: &str, path: P) -> Result<Self, Error> {
        let config: MuxConfig =
            toml::from_str(s).map_err(|e| Error::TomlParseFailure(path.as_ref().to_owned(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.period()?;
        if let Some(limits) = &self.velocity_limits {
            limits.validate()?;
        }
        self.create_arbitrator()?;
        Ok(())
    }

    /// Output period derived from `publish_rate`.
    pub fn period(&self) -> Result<Duration, Error> {
        if self.publish_rate.is_nan() || self.publish_rate <= 0.0 {
            return Err(Error::InvalidPublishRate(self.publish_rate));
        }
        Duration::try_from_secs_f64(self.publish_rate.recip())
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or(Error::InvalidPublishRate(self.publish_rate))
    }

    /// Builds the arbitrator with every source registered and initial locks applied.
    pub fn create_arbitrator(&self) -> Result<Arbitrator, Error> {
        let mut arbitrator =
            Arbitrator::from_configs(&self.sources)?.with_command_bounds(self.command_bounds);
        for lock in &self.locks {
            if arbitrator.source(&lock.source).is_none() {
                return Err(velmux::Error::UnknownLockSource(lock.source.clone()).into());
            }
            arbitrator.on_lock(&lock.source, lock.locked)?;
        }
        Ok(arbitrator)
    }

    pub fn has_lock(&self, source: &str) -> bool {
        self.locks.iter().any(|l| l.source == source)
    }
}
