//! In-process robot used by the server when no hardware link is configured and
//! by every sequencer test. It records each call, answers cube searches from a
//! script and can answer tap animations with a tap event after a delay.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use shared::domain::{BehaviorId, CubeId, CubeLights};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{BehaviorKind, RobotConnector, RobotEvent, RobotSession};

const DEFAULT_ACTION_DURATION: Duration = Duration::from_secs(1);
const TAP_ANIMATION_PREFIX: &str = "anim_speedtap_tap";
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum RobotAction {
    PlayAnimation(String),
    SetHeadAngle(f32),
    SetLiftHeight(f32),
    DriveStraight { distance_mm: f32, speed_mmps: f32 },
    GoToObject { cube: CubeId, standoff_mm: f32 },
    StartBehavior(BehaviorKind),
    StopBehavior(BehaviorId),
    WaitForCube { found: Option<CubeId> },
    SetCubeLights { cube: CubeId, lights: CubeLights },
}

pub struct SimulatedRobot {
    action_duration: Duration,
    sightings: Mutex<VecDeque<Option<CubeId>>>,
    default_sighting: Option<CubeId>,
    tap_responses: Mutex<VecDeque<Option<Duration>>>,
    default_tap_response: Option<Duration>,
    failing_animation: Option<String>,
    visible_cube: Mutex<Option<CubeId>>,
    actions: Mutex<Vec<RobotAction>>,
    lights: Mutex<HashMap<CubeId, CubeLights>>,
    next_behavior: AtomicU32,
    tap_count: Arc<AtomicU32>,
    events: broadcast::Sender<RobotEvent>,
}

impl Default for SimulatedRobot {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRobot {
    /// A robot that always sees cube 1 and never gets tapped.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            action_duration: DEFAULT_ACTION_DURATION,
            sightings: Mutex::new(VecDeque::new()),
            default_sighting: Some(CubeId(1)),
            tap_responses: Mutex::new(VecDeque::new()),
            default_tap_response: None,
            failing_animation: None,
            visible_cube: Mutex::new(None),
            actions: Mutex::new(Vec::new()),
            lights: Mutex::new(HashMap::new()),
            next_behavior: AtomicU32::new(1),
            tap_count: Arc::new(AtomicU32::new(0)),
            events,
        }
    }

    pub fn with_action_duration(mut self, duration: Duration) -> Self {
        self.action_duration = duration;
        self
    }

    pub fn without_cube(mut self) -> Self {
        self.default_sighting = None;
        self
    }

    /// Answers for the next cube searches, in order; `None` is a timeout.
    /// Once the script runs out the default sighting applies again.
    pub fn with_sightings(self, sightings: impl IntoIterator<Item = Option<CubeId>>) -> Self {
        lock(&self.sightings).extend(sightings);
        self
    }

    /// Every tap animation gets answered by a tap event after `delay`.
    pub fn with_tap_after(mut self, delay: Duration) -> Self {
        self.default_tap_response = Some(delay);
        self
    }

    /// Answers for the next tap animations, in order; `None` means the tap
    /// misses. Once the script runs out the default response applies again.
    pub fn with_tap_responses(
        self,
        responses: impl IntoIterator<Item = Option<Duration>>,
    ) -> Self {
        lock(&self.tap_responses).extend(responses);
        self
    }

    pub fn with_failing_animation(mut self, name: impl Into<String>) -> Self {
        self.failing_animation = Some(name.into());
        self
    }

    /// Emits a tap on `cube` right away, as if someone touched it.
    pub fn tap(&self, cube: CubeId) {
        emit_tap(&self.events, &self.tap_count, cube);
    }

    pub fn actions(&self) -> Vec<RobotAction> {
        lock(&self.actions).clone()
    }

    pub fn animations(&self) -> Vec<String> {
        lock(&self.actions)
            .iter()
            .filter_map(|action| match action {
                RobotAction::PlayAnimation(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Colors currently shown on `cube`, if it was ever lit.
    pub fn cube_lights(&self, cube: CubeId) -> Option<CubeLights> {
        lock(&self.lights).get(&cube).copied()
    }

    pub fn clear_actions(&self) {
        lock(&self.actions).clear();
    }

    fn record(&self, action: RobotAction) {
        lock(&self.actions).push(action);
    }

    async fn settle(&self) {
        tokio::time::sleep(self.action_duration).await;
    }

    fn answer_tap_animation(&self) {
        let response = lock(&self.tap_responses)
            .pop_front()
            .unwrap_or(self.default_tap_response);
        let Some(delay) = response else {
            debug!("simulated tap animation misses the cube");
            return;
        };
        let Some(cube) = *lock(&self.visible_cube) else {
            debug!("simulated tap animation with no cube in view");
            return;
        };

        let events = self.events.clone();
        let tap_count = Arc::clone(&self.tap_count);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            emit_tap(&events, &tap_count, cube);
        });
    }
}

#[async_trait]
impl RobotSession for SimulatedRobot {
    async fn play_animation(&self, name: &str) -> anyhow::Result<()> {
        self.record(RobotAction::PlayAnimation(name.to_string()));
        if self.failing_animation.as_deref() == Some(name) {
            bail!("animation {name} failed to play");
        }
        if name.starts_with(TAP_ANIMATION_PREFIX) {
            self.answer_tap_animation();
        }
        self.settle().await;
        Ok(())
    }

    async fn set_head_angle(&self, degrees: f32) -> anyhow::Result<()> {
        self.record(RobotAction::SetHeadAngle(degrees));
        self.settle().await;
        Ok(())
    }

    async fn set_lift_height(&self, height: f32, duration: Duration) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&height) {
            return Err(anyhow!("lift height {height} outside 0.0..=1.0"));
        }
        self.record(RobotAction::SetLiftHeight(height));
        tokio::time::sleep(duration).await;
        Ok(())
    }

    async fn drive_straight(&self, distance_mm: f32, speed_mmps: f32) -> anyhow::Result<()> {
        self.record(RobotAction::DriveStraight {
            distance_mm,
            speed_mmps,
        });
        self.settle().await;
        Ok(())
    }

    async fn go_to_object(&self, cube: CubeId, standoff_mm: f32) -> anyhow::Result<()> {
        self.record(RobotAction::GoToObject { cube, standoff_mm });
        self.settle().await;
        Ok(())
    }

    async fn start_behavior(&self, kind: BehaviorKind) -> anyhow::Result<BehaviorId> {
        self.record(RobotAction::StartBehavior(kind));
        Ok(BehaviorId(self.next_behavior.fetch_add(1, Ordering::Relaxed)))
    }

    async fn stop_behavior(&self, behavior: BehaviorId) -> anyhow::Result<()> {
        self.record(RobotAction::StopBehavior(behavior));
        Ok(())
    }

    async fn wait_for_cube(&self, timeout: Duration) -> anyhow::Result<Option<CubeId>> {
        let sighting = lock(&self.sightings)
            .pop_front()
            .unwrap_or(self.default_sighting);
        if sighting.is_some() {
            self.settle().await;
            *lock(&self.visible_cube) = sighting;
        } else {
            tokio::time::sleep(timeout).await;
        }
        self.record(RobotAction::WaitForCube { found: sighting });
        Ok(sighting)
    }

    fn set_cube_lights(&self, cube: CubeId, lights: CubeLights) -> anyhow::Result<()> {
        lock(&self.lights).insert(cube, lights);
        self.record(RobotAction::SetCubeLights { cube, lights });
        Ok(())
    }

    fn subscribe_events(&self) -> broadcast::Receiver<RobotEvent> {
        self.events.subscribe()
    }
}

fn emit_tap(events: &broadcast::Sender<RobotEvent>, tap_count: &AtomicU32, cube: CubeId) {
    let tap_count = tap_count.fetch_add(1, Ordering::Relaxed) + 1;
    if events
        .send(RobotEvent::ObjectTapped {
            object: cube,
            tap_count,
        })
        .is_err()
    {
        debug!(%cube, "tap event dropped, nobody is listening");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Hands out one shared simulated robot, or fails like an unreachable robot.
pub struct SimulatedConnector {
    robot: Arc<SimulatedRobot>,
    refuse_with: Option<String>,
}

impl SimulatedConnector {
    pub fn new(robot: Arc<SimulatedRobot>) -> Self {
        Self {
            robot,
            refuse_with: None,
        }
    }

    pub fn refusing(reason: impl Into<String>) -> Self {
        Self {
            robot: Arc::new(SimulatedRobot::new()),
            refuse_with: Some(reason.into()),
        }
    }
}

#[async_trait]
impl RobotConnector for SimulatedConnector {
    async fn connect(&self) -> anyhow::Result<Arc<dyn RobotSession>> {
        if let Some(reason) = &self.refuse_with {
            bail!("robot unreachable: {reason}");
        }
        info!("connected to simulated robot");
        let session: Arc<dyn RobotSession> = self.robot.clone();
        Ok(session)
    }
}

#[cfg(test)]
#[path = "tests/sim_tests.rs"]
mod tests;
