use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use robot_integration::RobotConnector;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::{
    notifier::{LaunchNotifier, UdpNotifier},
    sequencer::{Sequencer, SequencerConfig},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    GameOver,
    ShutdownRequested,
}

/// Owns the process lifecycle: the robot connection, the companion
/// notifier and the stop signal shared with whoever may end the game early.
pub struct Supervisor {
    shutdown: watch::Sender<bool>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self { shutdown }
    }

    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Connects to the robot, plays the game and flushes pending
    /// notifications before returning. Failures are logged here once.
    pub async fn run(
        &self,
        connector: &dyn RobotConnector,
        companion: SocketAddr,
        config: SequencerConfig,
    ) -> Result<Exit> {
        let robot = match connector.connect().await {
            Ok(robot) => robot,
            Err(error) => {
                error!(%error, "a connection error occurred");
                return Err(error.context("connecting to the robot"));
            }
        };

        let (notifier, delivery) = UdpNotifier::start(companion)
            .await
            .with_context(|| format!("opening notifier socket for {companion}"))?;
        info!(%companion, "notifier ready");

        let notifier: Arc<dyn LaunchNotifier> = Arc::new(notifier);
        let mut sequencer = Sequencer::new(robot, notifier, config.clone());
        let exit = self.play(&mut sequencer, config.warm_up).await;
        sequencer.release_cube();
        drop(sequencer);

        if let Err(error) = delivery.await {
            warn!(%error, "notifier task ended abnormally");
        }
        if let Err(error) = &exit {
            error!("game aborted: {error:#}");
        }
        exit
    }

    async fn play(&self, sequencer: &mut Sequencer, warm_up: bool) -> Result<Exit> {
        let mut shutdown = self.shutdown.subscribe();
        let game = async {
            if warm_up {
                sequencer.warm_up().await?;
            }
            sequencer.run().await
        };

        tokio::select! {
            result = game => {
                result?;
                Ok(Exit::GameOver)
            }
            _ = shutdown.wait_for(|stop| *stop) => {
                info!("shutdown requested, stopping the game");
                Ok(Exit::ShutdownRequested)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/supervisor_tests.rs"]
mod tests;
