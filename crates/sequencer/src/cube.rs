use std::{sync::Arc, time::Duration};

use rand::Rng;
use robot_integration::RobotSession;
use shared::domain::{Color, CubeId, ALL_OFF, LIGHT_ZONES, RAINBOW_PALETTE};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::CubeError;

/// Time each light zone stays lit before the chaser moves on.
pub const CHASER_PERIOD: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaserEffect {
    /// The lit zone always shows the same color.
    Single(Color),
    /// The lit zone shows a random palette color on every step.
    Rainbow,
}

impl ChaserEffect {
    fn next_color(self) -> Color {
        match self {
            ChaserEffect::Single(color) => color,
            ChaserEffect::Rainbow => {
                RAINBOW_PALETTE[rand::rng().random_range(0..RAINBOW_PALETTE.len())]
            }
        }
    }
}

/// A light cube together with at most one lighting effect running on it.
///
/// The effect is a background task; dropping the controller cancels it.
pub struct CubeController {
    id: CubeId,
    robot: Arc<dyn RobotSession>,
    color: Color,
    period: Duration,
    chaser: Option<JoinHandle<()>>,
}

impl CubeController {
    pub fn new(id: CubeId, robot: Arc<dyn RobotSession>) -> Self {
        Self {
            id,
            robot,
            color: Color::OFF,
            period: CHASER_PERIOD,
            chaser: None,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn id(&self) -> CubeId {
        self.id
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) -> Result<(), CubeError> {
        self.color = color;
        self.render([color; LIGHT_ZONES])
    }

    pub fn start_chaser(&mut self, color: Color) -> Result<(), CubeError> {
        self.start_effect(ChaserEffect::Single(color))
    }

    pub fn start_rainbow(&mut self) -> Result<(), CubeError> {
        self.start_effect(ChaserEffect::Rainbow)
    }

    /// Starts `effect` unless one is already running, in which case the
    /// running effect is left alone.
    pub fn start_effect(&mut self, effect: ChaserEffect) -> Result<(), CubeError> {
        if self.is_chasing() {
            return Err(CubeError::ChaserAlreadyRunning { cube: self.id });
        }
        if let ChaserEffect::Single(color) = effect {
            self.color = color;
        }

        debug!(cube = %self.id, ?effect, "starting light chaser");
        self.chaser = Some(tokio::spawn(run_chaser(
            Arc::clone(&self.robot),
            self.id,
            effect,
            self.period,
        )));
        Ok(())
    }

    pub fn stop_chaser(&mut self) {
        if let Some(chaser) = self.chaser.take() {
            debug!(cube = %self.id, "stopping light chaser");
            chaser.abort();
        }
    }

    pub fn is_chasing(&self) -> bool {
        self.chaser
            .as_ref()
            .is_some_and(|chaser| !chaser.is_finished())
    }

    /// Blanks every zone. A running chaser keeps going and relights a zone on
    /// its next step.
    pub fn lights_off(&self) -> Result<(), CubeError> {
        self.render(ALL_OFF)
    }

    fn render(&self, lights: [Color; LIGHT_ZONES]) -> Result<(), CubeError> {
        self.robot
            .set_cube_lights(self.id, lights)
            .map_err(|source| CubeError::Lights {
                cube: self.id,
                source,
            })
    }
}

impl Drop for CubeController {
    fn drop(&mut self) {
        self.stop_chaser();
    }
}

async fn run_chaser(
    robot: Arc<dyn RobotSession>,
    cube: CubeId,
    effect: ChaserEffect,
    period: Duration,
) {
    loop {
        for zone in 0..LIGHT_ZONES {
            let mut lights = ALL_OFF;
            lights[zone] = effect.next_color();
            if let Err(error) = robot.set_cube_lights(cube, lights) {
                warn!(%cube, %error, "light chaser stopped");
                return;
            }
            tokio::time::sleep(period).await;
        }
    }
}

#[cfg(test)]
#[path = "tests/cube_tests.rs"]
mod tests;
