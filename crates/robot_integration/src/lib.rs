//! Seam between the fireworks sequencer and the robot it drives.
//!
//! Motion, animation, object recognition and lighting all live in the vendor
//! SDK; this crate only names the calls the sequencer needs and the events it
//! listens to.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::domain::{BehaviorId, CubeId, CubeLights};
use tokio::sync::broadcast;

pub mod sim;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorKind {
    LookAroundInPlace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotEvent {
    ObjectTapped { object: CubeId, tap_count: u32 },
}

#[async_trait]
pub trait RobotSession: Send + Sync {
    async fn play_animation(&self, name: &str) -> anyhow::Result<()>;
    async fn set_head_angle(&self, degrees: f32) -> anyhow::Result<()>;
    /// `height` is a ratio, 0.0 fully lowered to 1.0 fully raised.
    async fn set_lift_height(&self, height: f32, duration: Duration) -> anyhow::Result<()>;
    async fn drive_straight(&self, distance_mm: f32, speed_mmps: f32) -> anyhow::Result<()>;
    async fn go_to_object(&self, cube: CubeId, standoff_mm: f32) -> anyhow::Result<()>;
    async fn start_behavior(&self, kind: BehaviorKind) -> anyhow::Result<BehaviorId>;
    async fn stop_behavior(&self, behavior: BehaviorId) -> anyhow::Result<()>;
    /// Waits until a light cube is in view. Resolves to `Ok(None)` when the
    /// timeout elapses first.
    async fn wait_for_cube(&self, timeout: Duration) -> anyhow::Result<Option<CubeId>>;
    fn set_cube_lights(&self, cube: CubeId, lights: CubeLights) -> anyhow::Result<()>;
    fn subscribe_events(&self) -> broadcast::Receiver<RobotEvent>;
}

#[async_trait]
pub trait RobotConnector: Send + Sync {
    async fn connect(&self) -> anyhow::Result<Arc<dyn RobotSession>>;
}
