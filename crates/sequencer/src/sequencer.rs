use std::{future::Future, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use robot_integration::{BehaviorKind, RobotEvent, RobotSession};
use shared::domain::{Color, CubeId, LaunchCode, Round, FINAL_ROUND};
use tokio::{
    sync::broadcast::{self, error::RecvError, error::TryRecvError},
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::{
    animations::{self, pick},
    cube::{CubeController, CHASER_PERIOD},
    error::SequencerError,
    notifier::LaunchNotifier,
    state::{Phase, SelfTapWindow, Step, TapState},
};

const BOB_HEAD_ANGLE: f32 = 20.5;
const LEVEL_HEAD_ANGLE: f32 = 0.0;
const LOOK_UP_HEAD_ANGLE: f32 = 44.5;
const CUBE_STANDOFF_MM: f32 = 30.0;
const LIFT_DOWN: f32 = 0.0;
const LIFT_UP: f32 = 1.0;
const LIFT_RAISE_DURATION: Duration = Duration::from_millis(500);
const LIFT_LOWER_DURATION: Duration = Duration::from_millis(300);
const BACK_OFF_MM: f32 = -50.0;
const BACK_OFF_SPEED_MMPS: f32 = 80.0;
const CELEBRATE_BACK_OFF_MM: f32 = -30.0;
const CELEBRATE_BACK_OFF_SPEED_MMPS: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub cube_search_timeout: Duration,
    /// Delay between starting the tap animation and opening the self-tap window.
    pub tap_window_delay: Duration,
    pub tap_window_length: Duration,
    pub celebrate_pause: Duration,
    pub finale_pause: Duration,
    pub chaser_period: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            cube_search_timeout: Duration::from_secs(10),
            tap_window_delay: Duration::from_millis(500),
            tap_window_length: Duration::from_secs(2),
            celebrate_pause: Duration::from_secs(1),
            finale_pause: Duration::from_millis(500),
            chaser_period: CHASER_PERIOD,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SequencerConfig {
    pub start_round: Round,
    /// Start over from the first round after the finale instead of stopping.
    pub replay_rounds: bool,
    pub warm_up: bool,
    pub timings: Timings,
}

/// Plays the three-round fireworks game against one robot.
///
/// All round state is owned here and only changed by `step`. Robot events are
/// drained while each robot action is awaited, so a tap is handled in order
/// with the actions around it.
pub struct Sequencer {
    robot: Arc<dyn RobotSession>,
    notifier: Arc<dyn LaunchNotifier>,
    events: broadcast::Receiver<RobotEvent>,
    events_closed: bool,
    config: SequencerConfig,
    round: Round,
    phase: Phase,
    tap: TapState,
    cube: Option<CubeController>,
}

impl Sequencer {
    pub fn new(
        robot: Arc<dyn RobotSession>,
        notifier: Arc<dyn LaunchNotifier>,
        config: SequencerConfig,
    ) -> Self {
        let events = robot.subscribe_events();
        Self {
            robot,
            notifier,
            events,
            events_closed: false,
            round: config.start_round,
            config,
            phase: Phase::FindingCube,
            tap: TapState::Idle,
            cube: None,
        }
    }

    pub fn round(&self) -> Round {
        self.round
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tap_state(&self) -> TapState {
        self.tap
    }

    pub fn cube(&self) -> Option<&CubeController> {
        self.cube.as_ref()
    }

    /// Gets the robot ready to play: lift down, wake up, look around.
    pub async fn warm_up(&mut self) -> Result<()> {
        info!("warming up");
        self.set_lift(LIFT_DOWN, LIFT_RAISE_DURATION).await?;
        for name in animations::WAKE_UP {
            self.play(name).await?;
        }
        self.set_head(LEVEL_HEAD_ANGLE).await
    }

    pub async fn run(&mut self) -> Result<()> {
        info!(round = %self.round, replay = self.config.replay_rounds, "game started");
        while self.phase != Phase::Done {
            self.step().await?;
        }
        info!("game over");
        Ok(())
    }

    /// Runs the current phase to completion and moves to the next one.
    pub async fn step(&mut self) -> Result<Phase> {
        let step = match self.phase {
            Phase::FindingCube => self.find_cube().await?,
            Phase::Approaching => self.approach().await?,
            Phase::WaitingForTap => self.attempt_tap().await?,
            Phase::Resolving => self.resolve().await?,
            Phase::Done => return Ok(Phase::Done),
        };
        let next = self.phase.next(step)?;
        debug!(round = %self.round, from = ?self.phase, to = ?next, ?step, "phase transition");
        self.phase = next;
        Ok(next)
    }

    /// Stops any lighting effect and blanks the active cube.
    pub fn release_cube(&mut self) {
        if let Some(cube) = self.cube.as_mut() {
            cube.stop_chaser();
            if let Err(error) = cube.lights_off() {
                warn!(%error, "failed to blank cube lights");
            }
        }
    }

    async fn find_cube(&mut self) -> Result<Step> {
        info!(round = %self.round, "looking for a cube");
        if let Some(cube) = self.cube.as_mut() {
            cube.stop_chaser();
            cube.lights_off()?;
        }

        let look_around = self
            .perform(|robot| async move {
                robot
                    .start_behavior(BehaviorKind::LookAroundInPlace)
                    .await
            })
            .await
            .context("starting look-around")?;
        let timeout = self.config.timings.cube_search_timeout;
        let found = self
            .perform(|robot| async move { robot.wait_for_cube(timeout).await })
            .await
            .context("waiting for a cube")?;
        self.perform(|robot| async move { robot.stop_behavior(look_around).await })
            .await
            .context("stopping look-around")?;

        let Some(cube_id) = found else {
            warn!(round = %self.round, ?timeout, "didn't find a cube");
            return Ok(Step::CubeSearchTimedOut);
        };
        info!(round = %self.round, cube = %cube_id, "cube found");
        self.cube = Some(
            CubeController::new(cube_id, Arc::clone(&self.robot))
                .with_period(self.config.timings.chaser_period),
        );

        if self.round.is_early() {
            self.play(pick(&animations::CUBE_REACTIONS)).await?;
        }
        if self.round.index() > FINAL_ROUND {
            return Ok(Step::RoundOutOfRange);
        }
        Ok(Step::CubeFound)
    }

    async fn approach(&mut self) -> Result<Step> {
        let cube_id = {
            let cube = self.active_cube()?;
            cube.start_chaser(Color::GREEN)?;
            cube.id()
        };

        self.set_head(BOB_HEAD_ANGLE).await?;
        self.set_head(LEVEL_HEAD_ANGLE).await?;
        self.set_lift(LIFT_UP, LIFT_RAISE_DURATION).await?;
        self.go_to(cube_id).await?;
        Ok(Step::ArrivedAtCube)
    }

    async fn attempt_tap(&mut self) -> Result<Step> {
        let timings = self.config.timings;
        self.tap.arm(SelfTapWindow::new(
            Instant::now(),
            timings.tap_window_delay,
            timings.tap_window_length,
        ));
        debug!(round = %self.round, "waiting for tap");

        self.play(pick(&animations::TAPS)).await?;
        if !self.round.is_final() {
            self.drive(BACK_OFF_MM, BACK_OFF_SPEED_MMPS).await?;
            self.set_lift(LIFT_DOWN, LIFT_LOWER_DURATION).await?;
        }
        Ok(Step::TapAttemptFinished)
    }

    async fn resolve(&mut self) -> Result<Step> {
        self.drain_events()?;
        let detected = self.tap.is_detected();
        self.tap.reset();

        if !detected {
            info!(
                round = %self.round,
                "cube tap not detected, either the tap missed or the cube has no power"
            );
            self.play(animations::MISS).await?;
            return Ok(Step::TapMissed);
        }

        let code = self.round.launch_code();
        match self.round.index() {
            0 => {
                self.announce(code);
                self.set_head(LOOK_UP_HEAD_ANGLE).await?;
                self.pause(self.config.timings.celebrate_pause).await?;
                self.play(animations::SINGLE_CELEBRATION).await?;
                self.drive(CELEBRATE_BACK_OFF_MM, CELEBRATE_BACK_OFF_SPEED_MMPS)
                    .await?;
            }
            1 => {
                self.announce(code);
                self.play(animations::DUD_REACTION).await?;
            }
            _ => self.grand_finale(code).await?,
        }
        Ok(self.finish_cycle())
    }

    async fn grand_finale(&mut self, code: LaunchCode) -> Result<()> {
        info!(round = %self.round, "grand finale");
        let pause = self.config.timings.finale_pause;
        for name in animations::FINALE_BUILDUP {
            self.pause(pause).await?;
            self.play(name).await?;
        }

        // The fuse code always precedes the finale code here; both go out
        // whenever the finale runs.
        self.announce(LaunchCode::Fuse);
        self.announce(code);

        for name in animations::FINALE_AFTERGLOW {
            self.play(name).await?;
        }
        self.return_to_idle().await
    }

    async fn return_to_idle(&mut self) -> Result<()> {
        if let Some(cube) = self.cube.as_mut() {
            cube.stop_chaser();
            cube.lights_off()?;
        }
        for name in animations::BACK_TO_IDLE {
            self.play(name).await?;
        }
        Ok(())
    }

    fn finish_cycle(&mut self) -> Step {
        match self.round.advance(self.config.replay_rounds) {
            Some(next) => {
                info!(finished = %self.round, next = %next, "round finished");
                self.round = next;
                Step::CycleFinished { game_over: false }
            }
            None => {
                info!(finished = %self.round, "final round finished");
                Step::CycleFinished { game_over: true }
            }
        }
    }

    fn announce(&self, code: LaunchCode) {
        info!(round = %self.round, %code, "announcing launch");
        if let Err(error) = self.notifier.notify(code) {
            warn!(%code, %error, "launch code dropped");
        }
    }

    fn active_cube(&mut self) -> Result<&mut CubeController, SequencerError> {
        let phase = self.phase;
        self.cube
            .as_mut()
            .ok_or(SequencerError::NoActiveCube { phase })
    }

    /// Awaits a robot action while handling robot events as they arrive.
    async fn perform<T, F, Fut>(&mut self, action: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn RobotSession>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let action = action(Arc::clone(&self.robot));
        tokio::pin!(action);
        loop {
            tokio::select! {
                result = &mut action => return result,
                event = self.events.recv(), if !self.events_closed => self.on_event(event)?,
            }
        }
    }

    fn drain_events(&mut self) -> Result<()> {
        while !self.events_closed {
            match self.events.try_recv() {
                Ok(event) => self.on_event(Ok(event))?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => self.on_event(Err(RecvError::Lagged(skipped)))?,
                Err(TryRecvError::Closed) => self.on_event(Err(RecvError::Closed))?,
            }
        }
        Ok(())
    }

    fn on_event(&mut self, event: Result<RobotEvent, RecvError>) -> Result<()> {
        match event {
            Ok(RobotEvent::ObjectTapped { object, tap_count }) => {
                self.on_object_tapped(object, tap_count)
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "missed robot events");
                Ok(())
            }
            Err(RecvError::Closed) => {
                warn!("robot event bus closed");
                self.events_closed = true;
                Ok(())
            }
        }
    }

    fn on_object_tapped(&mut self, object: CubeId, tap_count: u32) -> Result<()> {
        if !self.tap.register_tap(Instant::now()) {
            debug!(cube = %object, tap_count, tap = ?self.tap, "tap ignored");
            return Ok(());
        }

        info!(round = %self.round, cube = %object, tap_count, "tap detected");
        if let Some(cube) = self.cube.as_mut() {
            cube.stop_chaser();
            cube.lights_off()?;
            cube.start_rainbow()?;
        }
        Ok(())
    }

    async fn play(&mut self, name: &str) -> Result<()> {
        debug!(animation = name, "playing animation");
        self.perform(|robot| async move { robot.play_animation(name).await })
            .await
            .with_context(|| format!("playing animation {name}"))
    }

    async fn set_head(&mut self, degrees: f32) -> Result<()> {
        self.perform(|robot| async move { robot.set_head_angle(degrees).await })
            .await
            .with_context(|| format!("setting head angle to {degrees}"))
    }

    async fn set_lift(&mut self, height: f32, duration: Duration) -> Result<()> {
        self.perform(|robot| async move { robot.set_lift_height(height, duration).await })
            .await
            .with_context(|| format!("setting lift height to {height}"))
    }

    async fn drive(&mut self, distance_mm: f32, speed_mmps: f32) -> Result<()> {
        self.perform(|robot| async move { robot.drive_straight(distance_mm, speed_mmps).await })
            .await
            .with_context(|| format!("driving {distance_mm} mm"))
    }

    async fn go_to(&mut self, cube: CubeId) -> Result<()> {
        self.perform(|robot| async move { robot.go_to_object(cube, CUBE_STANDOFF_MM).await })
            .await
            .with_context(|| format!("driving to cube {cube}"))
    }

    async fn pause(&mut self, duration: Duration) -> Result<()> {
        self.perform(|_| async move {
            tokio::time::sleep(duration).await;
            anyhow::Ok(())
        })
        .await
    }
}

#[cfg(test)]
#[path = "tests/sequencer_tests.rs"]
mod tests;
