use std::time::{Duration, Instant};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{error::Error, velocity::BaseVelocity};

/// Static configuration of one mux input.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Unique name of the source.
    pub id: String,
    /// Topic the commands of this source arrive on. Informational for the core.
    #[serde(default)]
    pub topic: String,
    /// Higher value wins.
    pub priority: i32,
    /// Seconds without a valid message after which the source is stale.
    pub timeout: f64,
}

impl SourceConfig {
    pub fn new(id: impl Into<String>, priority: i32, timeout: f64) -> Self {
        Self {
            id: id.into(),
            topic: String::new(),
            priority,
            timeout,
        }
    }

    /// Converts the configured timeout to a positive [`Duration`].
    pub fn timeout(&self) -> Result<Duration, Error> {
        let timeout =
            Duration::try_from_secs_f64(self.timeout).map_err(|_| Error::InvalidTimeout {
                id: self.id.clone(),
                seconds: self.timeout,
            })?;
        if timeout.is_zero() {
            return Err(Error::NonPositiveTimeout {
                id: self.id.clone(),
                timeout,
            });
        }
        Ok(timeout)
    }
}

/// Runtime record of a registered source.
#[derive(Debug, Clone)]
pub struct InputSource {
    id: String,
    priority: i32,
    timeout: Duration,
    order: usize,
    last_update: Option<Instant>,
    command: BaseVelocity,
    locked: bool,
}

impl InputSource {
    pub(crate) fn new(id: String, priority: i32, timeout: Duration, order: usize) -> Self {
        Self {
            id,
            priority,
            timeout,
            order,
            last_update: None,
            command: BaseVelocity::default(),
            locked: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Position of this source in the configuration.
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    pub fn command(&self) -> BaseVelocity {
        self.command
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// A source is fresh if its last valid message is not older than its timeout.
    /// A source that never received a message is not fresh.
    pub fn is_fresh(&self, now: Instant) -> bool {
        self.last_update
            .is_some_and(|t| now.saturating_duration_since(t) <= self.timeout)
    }

    pub fn is_eligible(&self, now: Instant) -> bool {
        !self.locked && self.is_fresh(now)
    }

    pub(crate) fn update(&mut self, command: BaseVelocity, timestamp: Instant) {
        self.command = command;
        self.last_update = Some(timestamp);
    }

    pub(crate) fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_conversion() {
        let d = SourceConfig::new("a", 1, 0.5).timeout().unwrap();
        assert_eq!(d, Duration::from_millis(500));

        assert!(matches!(
            SourceConfig::new("a", 1, 0.0).timeout(),
            Err(Error::NonPositiveTimeout { .. })
        ));
        assert!(matches!(
            SourceConfig::new("a", 1, -1.0).timeout(),
            Err(Error::InvalidTimeout { .. })
        ));
        assert!(matches!(
            SourceConfig::new("a", 1, f64::NAN).timeout(),
            Err(Error::InvalidTimeout { .. })
        ));
        assert!(SourceConfig::new("a", 1, f64::INFINITY)
            .timeout()
            .unwrap_err()
            .is_config_error());
    }

    #[test]
    fn test_freshness() {
        let t0 = Instant::now();
        let mut source = InputSource::new("a".into(), 1, Duration::from_millis(500), 0);
        assert!(!source.is_fresh(t0));

        source.update(BaseVelocity::new(1.0, 0.0, 0.0), t0);
        assert!(source.is_fresh(t0));
        assert!(source.is_fresh(t0 + Duration::from_millis(500)));
        assert!(!source.is_fresh(t0 + Duration::from_millis(501)));

        source.set_locked(true);
        assert!(source.is_fresh(t0));
        assert!(!source.is_eligible(t0));
    }
}
