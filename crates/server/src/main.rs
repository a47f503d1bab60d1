use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use robot_integration::sim::{SimulatedConnector, SimulatedRobot};
use sequencer::{Exit, Supervisor};
use tracing::{info, warn};

mod config;

use config::{load_settings, resolve_companion, Settings};

/// How long after the tap animation starts the simulated robot reports its
/// own tap on the cube.
const AUTO_TAP_DELAY: Duration = Duration::from_millis(700);

#[derive(Debug, Parser)]
#[command(name = "arkit-server", about = "Runs the tap-the-cube fireworks game")]
struct Args {
    /// Settings file; a missing file means built-in defaults.
    #[arg(long, default_value = "arkit.toml")]
    config: PathBuf,
    /// Companion app address, overriding the settings file and environment.
    #[arg(long)]
    companion: Option<String>,
    /// Start over from the first round after the finale.
    #[arg(long)]
    replay: bool,
    /// Make the simulated robot land every tap.
    #[arg(long)]
    auto_tap: bool,
    /// Simulate a robot that never finds a cube.
    #[arg(long)]
    no_cube: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(companion) = &self.companion {
            settings.companion_addr = companion.clone();
        }
        if self.replay {
            settings.replay_rounds = true;
        }
    }

    fn simulated_robot(&self) -> SimulatedRobot {
        let mut robot = SimulatedRobot::new();
        if self.auto_tap {
            robot = robot.with_tap_after(AUTO_TAP_DELAY);
        }
        if self.no_cube {
            robot = robot.without_cube();
        }
        robot
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config)?;
    args.apply(&mut settings);

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    let config = settings.sequencer_config()?;
    let companion = resolve_companion(&settings.companion_addr).await?;
    let connector = SimulatedConnector::new(Arc::new(args.simulated_robot()));

    let supervisor = Arc::new(Supervisor::new());
    let stopper = Arc::clone(&supervisor);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => stopper.request_shutdown(),
            Err(error) => warn!(%error, "failed to listen for ctrl-c"),
        }
    });

    info!(
        %companion,
        start_round = settings.start_round,
        replay = settings.replay_rounds,
        "starting game"
    );
    match supervisor.run(&connector, companion, config).await? {
        Exit::GameOver => info!("game over"),
        Exit::ShutdownRequested => info!("stopped on request"),
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
