use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use auto_impl::auto_impl;
use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

use crate::Joy;

#[async_trait]
#[auto_impl(Box, Arc)]
pub trait JoyNode: Send + Sync {
    /// Ingests a joystick message. May take a long time; messages arriving
    /// meanwhile are coalesced to the latest one.
    async fn handle_joy(&self, joy: &Joy);
    /// Called periodically.
    async fn proc(&self);
}

/// Feeds joystick messages to a set of nodes and drives their `proc`.
///
/// Each node handles messages on its own task, so a slow node never delays
/// the others.
#[derive(Debug)]
pub struct JoyTeleop {
    joy_tx: watch::Sender<Joy>,
    is_running: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl JoyTeleop {
    /// Spawns the node tasks on the current tokio runtime.
    pub fn spawn(nodes: Vec<Arc<dyn JoyNode>>, period: Duration) -> Self {
        let (joy_tx, _) = watch::channel(Joy::default());
        let is_running = Arc::new(AtomicBool::new(true));
        let mut tasks = Vec::with_capacity(nodes.len() + 1);

        for node in &nodes {
            let node = node.clone();
            let mut joy_rx = joy_tx.subscribe();
            tasks.push(tokio::spawn(async move {
                while joy_rx.changed().await.is_ok() {
                    let joy = joy_rx.borrow_and_update().clone();
                    node.handle_joy(&joy).await;
                }
            }));
        }

        let running = is_running.clone();
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            while running.load(Ordering::Relaxed) {
                interval.tick().await;
                for node in &nodes {
                    node.proc().await;
                }
            }
            debug!("joy teleop stopped");
        }));

        Self {
            joy_tx,
            is_running,
            tasks,
        }
    }

    pub fn send_joy(&self, joy: Joy) {
        self.joy_tx.send_replace(joy);
    }

    /// Stops every task and waits for them.
    pub async fn stop(self) {
        let Self {
            joy_tx,
            is_running,
            tasks,
        } = self;
        is_running.store(false, Ordering::Relaxed);
        drop(joy_tx);
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!("joy task failed: {e}");
            }
        }
    }
}
