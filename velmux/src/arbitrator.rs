use std::{
    collections::HashSet,
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use crate::{
    error::Error,
    source::{InputSource, SourceConfig},
    velocity::BaseVelocity,
};

/// Result of one arbitration pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MuxOutput {
    /// Id of the selected source, `None` when nothing is eligible.
    pub source: Option<String>,
    /// Command to forward. The stop command when `source` is `None`.
    pub velocity: BaseVelocity,
}

/// Diagnostics snapshot of one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStatus {
    pub id: String,
    pub priority: i32,
    pub timeout: Duration,
    pub locked: bool,
    pub fresh: bool,
    pub selected: bool,
    pub command: BaseVelocity,
}

/// Selects at most one velocity command among prioritized, timed-out and
/// lockable sources.
///
/// The arbitrator itself holds no lock and reads no clock; every time-dependent
/// operation takes the evaluation instant. [`CommandMux`](crate::CommandMux)
/// adds the shared state, the clock and the output sink around it.
#[derive(Debug, Default)]
pub struct Arbitrator {
    // descending priority, then configuration order
    sources: Vec<InputSource>,
    next_order: usize,
    command_bounds: Option<BaseVelocity>,
    selected: Option<String>,
    output: BaseVelocity,
    last_evaluation: Option<Instant>,
}

impl Arbitrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an arbitrator from a list of source configurations.
    ///
    /// The whole list is validated first, so an error leaves nothing behind.
    pub fn from_configs(configs: &[SourceConfig]) -> Result<Self, Error> {
        let mut arbitrator = Self::new();
        arbitrator.register_all(configs)?;
        Ok(arbitrator)
    }

    /// Rejects commands whose component magnitudes exceed `bounds`.
    pub fn with_command_bounds(mut self, bounds: Option<BaseVelocity>) -> Self {
        self.command_bounds = bounds;
        self
    }

    pub fn command_bounds(&self) -> Option<BaseVelocity> {
        self.command_bounds
    }

    pub fn register_source(
        &mut self,
        id: &str,
        priority: i32,
        timeout: Duration,
    ) -> Result<(), Error> {
        self.validate_new_source(id, timeout)?;
        self.insert_source(id, priority, timeout);
        Ok(())
    }

    pub(crate) fn register_all(&mut self, configs: &[SourceConfig]) -> Result<(), Error> {
        let mut ids = HashSet::new();
        let mut validated = Vec::with_capacity(configs.len());
        for config in configs {
            let timeout = config.timeout()?;
            self.validate_new_source(&config.id, timeout)?;
            if !ids.insert(config.id.as_str()) {
                return Err(Error::DuplicateSource(config.id.clone()));
            }
            validated.push((config, timeout));
        }
        for (config, timeout) in validated {
            self.insert_source(&config.id, config.priority, timeout);
        }
        Ok(())
    }

    fn validate_new_source(&self, id: &str, timeout: Duration) -> Result<(), Error> {
        if self.source(id).is_some() {
            return Err(Error::DuplicateSource(id.to_owned()));
        }
        if timeout.is_zero() {
            return Err(Error::NonPositiveTimeout {
                id: id.to_owned(),
                timeout,
            });
        }
        Ok(())
    }

    fn insert_source(&mut self, id: &str, priority: i32, timeout: Duration) {
        let source = InputSource::new(id.to_owned(), priority, timeout, self.next_order);
        self.next_order += 1;
        // keep sorted; equal priorities stay in configuration order
        let index = self
            .sources
            .partition_point(|s| s.priority() >= source.priority());
        debug!(id, priority, ?timeout, "registered source");
        self.sources.insert(index, source);
    }

    /// Drops every source and the current selection.
    pub fn reset(&mut self) {
        debug!("reset all sources");
        self.sources.clear();
        self.next_order = 0;
        self.selected = None;
        self.output = BaseVelocity::default();
        self.last_evaluation = None;
    }

    /// Stores a new command of source `id` and re-evaluates the selection.
    ///
    /// Invalid commands do not touch the source state.
    pub fn on_command(
        &mut self,
        id: &str,
        command: BaseVelocity,
        timestamp: Instant,
    ) -> Result<MuxOutput, Error> {
        let bounds = self.command_bounds;
        let source = self
            .source_mut(id)
            .ok_or_else(|| Error::UnknownSource(id.to_owned()))?;
        if !command.is_finite() || bounds.is_some_and(|b| !command.is_within(&b)) {
            return Err(Error::InvalidCommand {
                id: id.to_owned(),
                command,
            });
        }
        source.update(command, timestamp);
        // never evaluate backwards in time
        let now = match self.last_evaluation {
            Some(last) if last > timestamp => last,
            _ => timestamp,
        };
        Ok(self.evaluate(now))
    }

    /// Updates the lock flag of source `id`.
    ///
    /// The selection is re-evaluated at the last evaluation instant; call
    /// [`tick`](Self::tick) afterwards to evaluate at a newer one.
    pub fn on_lock(&mut self, id: &str, locked: bool) -> Result<MuxOutput, Error> {
        let source = self
            .source_mut(id)
            .ok_or_else(|| Error::UnknownSource(id.to_owned()))?;
        if source.is_locked() != locked {
            debug!(id, locked, "lock changed");
        }
        source.set_locked(locked);
        match self.last_evaluation {
            Some(now) => Ok(self.evaluate(now)),
            None => Ok(self.current()),
        }
    }

    /// Re-evaluates staleness and selection at `now`.
    pub fn tick(&mut self, now: Instant) -> MuxOutput {
        self.evaluate(now)
    }

    fn evaluate(&mut self, now: Instant) -> MuxOutput {
        self.last_evaluation = Some(now);
        let mut best: Option<&InputSource> = None;
        for source in self.sources.iter().filter(|s| s.is_eligible(now)) {
            best = match best {
                Some(b)
                    if b.priority() > source.priority()
                        || (b.priority() == source.priority()
                            && b.last_update() >= source.last_update()) =>
                {
                    Some(b)
                }
                _ => Some(source),
            };
        }

        let (selected, output) = match best {
            Some(source) => (Some(source.id().to_owned()), source.command()),
            None => (None, BaseVelocity::default()),
        };
        if selected != self.selected {
            match &selected {
                Some(id) => info!(from = ?self.selected, to = %id, "selected source changed"),
                None => info!(from = ?self.selected, "no eligible source, stopping"),
            }
        }
        self.selected = selected;
        self.output = output;
        self.current()
    }

    fn current(&self) -> MuxOutput {
        MuxOutput {
            source: self.selected.clone(),
            velocity: self.output,
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The last forwarded command.
    pub fn output(&self) -> BaseVelocity {
        self.output
    }

    pub fn source(&self, id: &str) -> Option<&InputSource> {
        self.sources.iter().find(|s| s.id() == id)
    }

    fn source_mut(&mut self, id: &str) -> Option<&mut InputSource> {
        self.sources.iter_mut().find(|s| s.id() == id)
    }

    /// Sources in arbitration order.
    pub fn sources(&self) -> &[InputSource] {
        &self.sources
    }

    /// Snapshot of every source as of the last evaluation.
    pub fn status(&self) -> Vec<SourceStatus> {
        self.sources
            .iter()
            .map(|s| SourceStatus {
                id: s.id().to_owned(),
                priority: s.priority(),
                timeout: s.timeout(),
                locked: s.is_locked(),
                fresh: self.last_evaluation.is_some_and(|now| s.is_fresh(now)),
                selected: self.selected.as_deref() == Some(s.id()),
                command: s.command(),
            })
            .collect()
    }
}

/// Logs and drops errors that must not affect arbitration.
pub(crate) fn log_rejected(err: &Error) {
    match err {
        Error::UnknownSource(_) | Error::InvalidCommand { .. } => warn!("{err}"),
        _ => warn!("unexpected error: {err}"),
    }
}
