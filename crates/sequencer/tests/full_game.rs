use std::{net::SocketAddr, sync::Arc, time::Duration};

use robot_integration::sim::{SimulatedConnector, SimulatedRobot};
use sequencer::{animations, Exit, SequencerConfig, Supervisor, Timings};
use shared::{domain::LaunchCode, protocol};
use tokio::{net::UdpSocket, time::timeout};

fn fast_timings() -> Timings {
    Timings {
        cube_search_timeout: Duration::from_millis(50),
        tap_window_delay: Duration::from_millis(10),
        tap_window_length: Duration::from_millis(500),
        celebrate_pause: Duration::from_millis(5),
        finale_pause: Duration::from_millis(5),
        chaser_period: Duration::from_millis(10),
    }
}

async fn companion() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind companion");
    let addr = socket.local_addr().expect("companion addr");
    (socket, addr)
}

async fn received_codes(socket: &UdpSocket, count: usize) -> Vec<LaunchCode> {
    let mut codes = Vec::with_capacity(count);
    let mut buf = [0u8; 16];
    for _ in 0..count {
        let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
            .await
            .expect("datagram in time")
            .expect("recv");
        codes.push(protocol::decode(&buf[..len]).expect("launch code"));
    }
    codes
}

#[tokio::test]
async fn three_round_game_launches_single_dud_and_finale() {
    let (socket, addr) = companion().await;
    let robot = Arc::new(
        SimulatedRobot::new()
            .with_action_duration(Duration::from_millis(40))
            .with_tap_after(Duration::from_millis(20))
            .with_sightings([None])
            .with_tap_responses([None]),
    );
    let connector = SimulatedConnector::new(Arc::clone(&robot));
    let config = SequencerConfig {
        timings: fast_timings(),
        ..SequencerConfig::default()
    };

    let exit = Supervisor::new()
        .run(&connector, addr, config)
        .await
        .expect("game");

    assert_eq!(exit, Exit::GameOver);
    assert_eq!(
        received_codes(&socket, 4).await,
        vec![
            LaunchCode::Single,
            LaunchCode::Dud,
            LaunchCode::Fuse,
            LaunchCode::Finale
        ]
    );

    let played = robot.animations();
    assert_eq!(
        played
            .iter()
            .filter(|name| name.as_str() == animations::MISS)
            .count(),
        1
    );
    assert_eq!(played[played.len() - 3..], animations::BACK_TO_IDLE);
}
