use super::*;
use robot_integration::sim::{RobotAction, SimulatedRobot};
use shared::domain::CubeLights;

fn cube_on(robot: &Arc<SimulatedRobot>) -> CubeController {
    let session: Arc<dyn RobotSession> = robot.clone();
    CubeController::new(CubeId(3), session)
}

fn light_frames(robot: &SimulatedRobot) -> Vec<CubeLights> {
    robot
        .actions()
        .into_iter()
        .filter_map(|action| match action {
            RobotAction::SetCubeLights { lights, .. } => Some(lights),
            _ => None,
        })
        .collect()
}

fn lit_zone(frame: &CubeLights) -> Option<usize> {
    let lit: Vec<usize> = (0..LIGHT_ZONES).filter(|&i| !frame[i].is_off()).collect();
    assert!(lit.len() <= 1, "more than one zone lit: {frame:?}");
    lit.first().copied()
}

#[tokio::test]
async fn set_color_lights_every_zone() {
    let robot = Arc::new(SimulatedRobot::new());
    let mut cube = cube_on(&robot);

    cube.set_color(Color::BLUE).expect("set color");

    assert_eq!(cube.color(), Color::BLUE);
    assert_eq!(robot.cube_lights(CubeId(3)), Some([Color::BLUE; LIGHT_ZONES]));
}

#[tokio::test(start_paused = true)]
async fn chaser_moves_one_lit_zone_per_period() {
    let robot = Arc::new(SimulatedRobot::new());
    let mut cube = cube_on(&robot);

    cube.start_chaser(Color::GREEN).expect("start chaser");
    tokio::time::sleep(CHASER_PERIOD * 4 - CHASER_PERIOD / 2).await;

    let frames = light_frames(&robot);
    assert!(frames.len() >= 4, "expected four frames, got {frames:?}");
    let zones: Vec<Option<usize>> = frames.iter().take(4).map(lit_zone).collect();
    assert_eq!(zones, vec![Some(0), Some(1), Some(2), Some(3)]);
    assert!(frames
        .iter()
        .all(|frame| frame.iter().all(|c| *c == Color::GREEN || c.is_off())));
    assert_eq!(cube.color(), Color::GREEN);
}

#[tokio::test(start_paused = true)]
async fn second_chaser_is_rejected_and_first_keeps_running() {
    let robot = Arc::new(SimulatedRobot::new());
    let mut cube = cube_on(&robot);
    cube.start_chaser(Color::GREEN).expect("start chaser");

    let err = cube
        .start_chaser(Color::RED)
        .expect_err("second chaser must fail");
    assert!(matches!(err, CubeError::ChaserAlreadyRunning { cube } if cube == CubeId(3)));
    assert!(matches!(
        cube.start_rainbow(),
        Err(CubeError::ChaserAlreadyRunning { .. })
    ));

    tokio::time::sleep(CHASER_PERIOD * 3).await;
    assert!(cube.is_chasing());
    assert_eq!(cube.color(), Color::GREEN);
    assert!(light_frames(&robot)
        .iter()
        .flatten()
        .all(|c| *c == Color::GREEN || c.is_off()));
}

#[tokio::test(start_paused = true)]
async fn stop_chaser_is_idempotent_and_stops_frames() {
    let robot = Arc::new(SimulatedRobot::new());
    let mut cube = cube_on(&robot);

    cube.stop_chaser();
    cube.start_chaser(Color::GREEN).expect("start chaser");
    tokio::time::sleep(CHASER_PERIOD * 2).await;
    cube.stop_chaser();
    cube.stop_chaser();
    assert!(!cube.is_chasing());

    let frames_at_stop = light_frames(&robot).len();
    tokio::time::sleep(CHASER_PERIOD * 5).await;
    assert_eq!(light_frames(&robot).len(), frames_at_stop);

    cube.start_chaser(Color::RED).expect("restart after stop");
    assert!(cube.is_chasing());
}

#[tokio::test(start_paused = true)]
async fn lights_off_without_chaser_stays_dark() {
    let robot = Arc::new(SimulatedRobot::new());
    let mut cube = cube_on(&robot);
    cube.start_chaser(Color::GREEN).expect("start chaser");
    tokio::time::sleep(CHASER_PERIOD).await;

    cube.stop_chaser();
    cube.lights_off().expect("lights off");
    tokio::time::sleep(CHASER_PERIOD * 3).await;

    assert_eq!(robot.cube_lights(CubeId(3)), Some(ALL_OFF));
}

#[tokio::test(start_paused = true)]
async fn lights_off_with_chaser_is_relit_on_next_step() {
    let robot = Arc::new(SimulatedRobot::new());
    let mut cube = cube_on(&robot);
    cube.start_chaser(Color::GREEN).expect("start chaser");
    tokio::time::sleep(CHASER_PERIOD / 2).await;

    cube.lights_off().expect("lights off");
    assert_eq!(robot.cube_lights(CubeId(3)), Some(ALL_OFF));

    tokio::time::sleep(CHASER_PERIOD).await;
    let lights = robot.cube_lights(CubeId(3)).expect("lights");
    assert!(lit_zone(&lights).is_some(), "chaser should relight: {lights:?}");
    assert!(cube.is_chasing());
}

#[tokio::test(start_paused = true)]
async fn rainbow_only_uses_palette_colors() {
    let robot = Arc::new(SimulatedRobot::new());
    let mut cube = cube_on(&robot);

    cube.start_rainbow().expect("start rainbow");
    tokio::time::sleep(CHASER_PERIOD * 20).await;

    let frames = light_frames(&robot);
    assert!(frames.len() >= 20);
    for frame in &frames {
        let zone = lit_zone(frame).expect("one zone lit");
        assert!(RAINBOW_PALETTE.contains(&frame[zone]));
    }
}

#[tokio::test(start_paused = true)]
async fn dropping_controller_cancels_chaser() {
    let robot = Arc::new(SimulatedRobot::new());
    let mut cube = cube_on(&robot);
    cube.start_chaser(Color::GREEN).expect("start chaser");
    tokio::time::sleep(CHASER_PERIOD).await;

    drop(cube);
    tokio::task::yield_now().await;
    let frames = light_frames(&robot).len();
    tokio::time::sleep(CHASER_PERIOD * 5).await;

    assert_eq!(light_frames(&robot).len(), frames);
}
