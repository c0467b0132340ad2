use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::{
    arbitrator::{log_rejected, Arbitrator, MuxOutput, SourceStatus},
    error::Error,
    move_base::MoveBase,
    source::SourceConfig,
    velocity::BaseVelocity,
};

/// Shared arbitration state plus the output sink.
///
/// Every state-changing event and every tick forwards the arbitrated command
/// to `output`. The output is sent while the state lock is held, so the sink
/// sees commands in evaluation order.
#[derive(Debug)]
pub struct CommandMux<M>
where
    M: MoveBase,
{
    arbitrator: Mutex<Arbitrator>,
    output: M,
    is_running: AtomicBool,
}

impl<M> CommandMux<M>
where
    M: MoveBase,
{
    /// `output` must not feed back into this mux (for example through a
    /// [`SourceInput`] of it): the state lock is not reentrant, so such a
    /// sink deadlocks on its first command.
    pub fn new(arbitrator: Arbitrator, output: M) -> Self {
        Self {
            arbitrator: Mutex::new(arbitrator),
            output,
            is_running: AtomicBool::new(true),
        }
    }

    pub fn from_configs(configs: &[SourceConfig], output: M) -> Result<Self, Error> {
        Ok(Self::new(Arbitrator::from_configs(configs)?, output))
    }

    pub fn output(&self) -> &M {
        &self.output
    }

    /// Feeds a command of `id` stamped with `timestamp`.
    ///
    /// Errors only for a rejected command. Once the command is accepted, a
    /// failure of the output is logged and the arbitrated output is returned.
    pub fn on_command(
        &self,
        id: &str,
        command: BaseVelocity,
        timestamp: Instant,
    ) -> Result<MuxOutput, Error> {
        let mut arbitrator = self.arbitrator.lock().unwrap();
        let out = arbitrator
            .on_command(id, command, timestamp)
            .map_err(|e| {
                log_rejected(&e);
                e
            })?;
        self.publish(&out.velocity);
        Ok(out)
    }

    /// Sets the lock flag of `id` and re-evaluates at `now`.
    ///
    /// Output failures are handled as in [`on_command`](Self::on_command).
    pub fn on_lock(&self, id: &str, locked: bool, now: Instant) -> Result<MuxOutput, Error> {
        let mut arbitrator = self.arbitrator.lock().unwrap();
        arbitrator.on_lock(id, locked).map_err(|e| {
            log_rejected(&e);
            e
        })?;
        let out = arbitrator.tick(now);
        self.publish(&out.velocity);
        Ok(out)
    }

    fn publish(&self, velocity: &BaseVelocity) {
        if let Err(e) = self.output.send_velocity(velocity) {
            warn!("failed to publish output: {e}");
        }
    }

    /// Re-evaluates at `now` and sends the output. Unlike the event methods,
    /// this returns the output's error.
    pub fn tick(&self, now: Instant) -> Result<MuxOutput, Error> {
        let mut arbitrator = self.arbitrator.lock().unwrap();
        let out = arbitrator.tick(now);
        self.output.send_velocity(&out.velocity)?;
        Ok(out)
    }

    /// Replaces every source with `configs`.
    ///
    /// On error the current sources are kept untouched.
    pub fn reconfigure(&self, configs: &[SourceConfig]) -> Result<(), Error> {
        let mut arbitrator = self.arbitrator.lock().unwrap();
        let next = Arbitrator::from_configs(configs)?
            .with_command_bounds(arbitrator.command_bounds());
        debug!(sources = configs.len(), "reconfigured");
        *arbitrator = next;
        self.output.send_velocity(&BaseVelocity::default())
    }

    pub fn selected(&self) -> Option<String> {
        self.arbitrator.lock().unwrap().selected().map(str::to_owned)
    }

    pub fn status(&self) -> Vec<SourceStatus> {
        self.arbitrator.lock().unwrap().status()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Makes [`main`](Self::main) return after its current tick.
    pub fn stop(&self) {
        self.is_running.store(false, Ordering::Relaxed);
    }

    /// Ticks every `period` until [`stop`](Self::stop) is called, then sends
    /// the stop command once.
    pub async fn main(&self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        while self.is_running() {
            interval.tick().await;
            if let Err(e) = self.tick(Instant::now()) {
                warn!("failed to publish output: {e}");
            }
        }
        debug!("mux stopped");
        if let Err(e) = self.output.send_velocity(&BaseVelocity::default()) {
            warn!("failed to publish stop command: {e}");
        }
    }
}

impl<M> CommandMux<M>
where
    M: MoveBase,
{
    /// Returns a handle feeding commands of source `id`.
    ///
    /// The id is checked on each command, not here.
    pub fn source_input(self: &Arc<Self>, id: impl Into<String>) -> SourceInput<M> {
        SourceInput {
            mux: self.clone(),
            id: id.into(),
        }
    }

    pub fn lock_input(self: &Arc<Self>, id: impl Into<String>) -> LockInput<M> {
        LockInput {
            mux: self.clone(),
            id: id.into(),
        }
    }
}

/// `MoveBase` that feeds one source of a [`CommandMux`].
///
/// Commands are stamped with the current monotonic time.
#[derive(Debug)]
pub struct SourceInput<M>
where
    M: MoveBase,
{
    mux: Arc<CommandMux<M>>,
    id: String,
}

impl<M> SourceInput<M>
where
    M: MoveBase,
{
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<M> MoveBase for SourceInput<M>
where
    M: MoveBase,
{
    fn send_velocity(&self, velocity: &BaseVelocity) -> Result<(), Error> {
        self.mux
            .on_command(&self.id, *velocity, Instant::now())
            .map(|_| ())
    }

    /// Last accepted command of this source.
    fn current_velocity(&self) -> Result<BaseVelocity, Error> {
        self.mux
            .arbitrator
            .lock()
            .unwrap()
            .source(&self.id)
            .map(|s| s.command())
            .ok_or_else(|| Error::UnknownSource(self.id.clone()))
    }
}

/// Lock signal of one source of a [`CommandMux`].
#[derive(Debug)]
pub struct LockInput<M>
where
    M: MoveBase,
{
    mux: Arc<CommandMux<M>>,
    id: String,
}

impl<M> LockInput<M>
where
    M: MoveBase,
{
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_locked(&self, locked: bool) -> Result<(), Error> {
        self.mux
            .on_lock(&self.id, locked, Instant::now())
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;
    use crate::DummyMoveBase;

    fn mux() -> Arc<CommandMux<DummyMoveBase>> {
        let configs = [
            SourceConfig::new("joystick", 10, 0.5),
            SourceConfig::new("autonomy", 5, 1.0),
        ];
        Arc::new(CommandMux::from_configs(&configs, DummyMoveBase::new()).unwrap())
    }

    #[test]
    fn test_events_are_forwarded() {
        let mux = mux();
        let t0 = Instant::now();
        mux.on_command("autonomy", BaseVelocity::new(0.3, 0.0, 0.1), t0)
            .unwrap();
        mux.on_lock("autonomy", true, t0).unwrap();
        mux.tick(t0).unwrap();

        let sent = mux.output().sent_velocities();
        assert_eq!(sent.len(), 3);
        assert_approx_eq!(sent[0].x, 0.3);
        assert!(sent[1].is_zero());
        assert!(sent[2].is_zero());
    }

    #[test]
    fn test_rejected_events_are_not_forwarded() {
        let mux = mux();
        let t0 = Instant::now();
        assert!(mux
            .on_command("unknown", BaseVelocity::default(), t0)
            .is_err());
        assert!(mux
            .on_command("joystick", BaseVelocity::new(f64::NAN, 0.0, 0.0), t0)
            .is_err());
        assert!(mux.on_lock("unknown", true, t0).is_err());
        assert!(mux.output().sent_velocities().is_empty());
    }

    #[test]
    fn test_source_input() {
        let mux = mux();
        let joystick = mux.source_input("joystick");
        joystick
            .send_velocity(&BaseVelocity::new(1.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(mux.selected().as_deref(), Some("joystick"));
        assert_approx_eq!(joystick.current_velocity().unwrap().x, 1.0);
        assert_approx_eq!(mux.output().current_velocity().unwrap().x, 1.0);

        let lock = mux.lock_input("joystick");
        lock.set_locked(true).unwrap();
        assert!(mux.selected().is_none());
        assert!(mux.output().current_velocity().unwrap().is_zero());

        let unknown = mux.source_input("nobody");
        assert!(matches!(
            unknown.current_velocity(),
            Err(Error::UnknownSource(_))
        ));
    }

    #[derive(Debug)]
    struct DisconnectedMoveBase;

    impl MoveBase for DisconnectedMoveBase {
        fn send_velocity(&self, _velocity: &BaseVelocity) -> Result<(), Error> {
            Err(Error::Connection {
                message: "disconnected".into(),
            })
        }

        fn current_velocity(&self) -> Result<BaseVelocity, Error> {
            Err(Error::Connection {
                message: "disconnected".into(),
            })
        }
    }

    #[test]
    fn test_output_failure_keeps_accepted_events() {
        let mux = Arc::new(
            CommandMux::from_configs(
                &[SourceConfig::new("joystick", 10, 0.5)],
                DisconnectedMoveBase,
            )
            .unwrap(),
        );
        let joystick = mux.source_input("joystick");
        joystick
            .send_velocity(&BaseVelocity::new(1.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(mux.selected().as_deref(), Some("joystick"));
        assert_approx_eq!(joystick.current_velocity().unwrap().x, 1.0);

        let out = mux.on_lock("joystick", true, Instant::now()).unwrap();
        assert!(out.source.is_none());
        // rejected input still errors
        assert!(matches!(
            mux.on_command("nobody", BaseVelocity::default(), Instant::now()),
            Err(Error::UnknownSource(_))
        ));
        // the periodic tick reports the output failure to its caller
        assert!(matches!(
            mux.tick(Instant::now()),
            Err(Error::Connection { .. })
        ));
    }

    #[test]
    fn test_reconfigure() {
        let mux = mux();
        let t0 = Instant::now();
        mux.on_command("joystick", BaseVelocity::new(1.0, 0.0, 0.0), t0)
            .unwrap();

        assert!(mux
            .reconfigure(&[SourceConfig::new("a", 1, 0.0)])
            .unwrap_err()
            .is_config_error());
        assert_eq!(mux.selected().as_deref(), Some("joystick"));

        mux.reconfigure(&[SourceConfig::new("a", 1, 1.0)]).unwrap();
        assert!(mux.selected().is_none());
        assert!(mux.output().current_velocity().unwrap().is_zero());
        assert_eq!(mux.status().len(), 1);
    }

    #[tokio::test]
    async fn test_main_ticks_until_stopped() {
        let mux = mux();
        mux.source_input("autonomy")
            .send_velocity(&BaseVelocity::new(0.3, 0.0, 0.0))
            .unwrap();
        let cloned = mux.clone();
        let handle = tokio::spawn(async move {
            cloned.main(Duration::from_millis(10)).await;
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        mux.stop();
        handle.await.unwrap();

        let sent = mux.output().sent_velocities();
        assert!(sent.len() > 3, "{sent:?}");
        assert!(sent.iter().rev().skip(1).any(|v| (v.x - 0.3).abs() < 1e-9));
        // last command is the stop command
        assert!(sent.last().unwrap().is_zero());
    }
}
