use super::*;
use std::time::Duration;
use tokio::time::timeout;

async fn companion() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind companion");
    let addr = socket.local_addr().expect("companion addr");
    (socket, addr)
}

async fn receive(socket: &UdpSocket) -> Vec<u8> {
    let mut buf = [0u8; 64];
    let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
        .await
        .expect("datagram in time")
        .expect("recv");
    buf[..len].to_vec()
}

#[tokio::test]
async fn each_code_is_one_ascii_datagram_in_order() {
    let (socket, addr) = companion().await;
    let (notifier, _delivery) = UdpNotifier::start(addr).await.expect("notifier");
    assert_eq!(notifier.target(), addr);

    notifier.notify(LaunchCode::Fuse).expect("notify");
    notifier.notify(LaunchCode::Finale).expect("notify");

    assert_eq!(receive(&socket).await, b"4");
    assert_eq!(receive(&socket).await, b"3");
}

#[tokio::test]
async fn delivery_flushes_queue_then_ends_when_notifiers_drop() {
    let (socket, addr) = companion().await;
    let (notifier, delivery) = UdpNotifier::start(addr).await.expect("notifier");
    let clone = notifier.clone();

    notifier.notify(LaunchCode::Single).expect("notify");
    clone.notify(LaunchCode::Dud).expect("notify");
    drop(notifier);
    drop(clone);

    timeout(Duration::from_secs(2), delivery)
        .await
        .expect("delivery ends")
        .expect("delivery task");
    assert_eq!(receive(&socket).await, b"1");
    assert_eq!(receive(&socket).await, b"2");
}

#[tokio::test]
async fn notify_fails_once_delivery_is_gone() {
    let (_socket, addr) = companion().await;
    let (notifier, delivery) = UdpNotifier::start(addr).await.expect("notifier");

    delivery.abort();
    let _ = delivery.await;

    assert_eq!(notifier.notify(LaunchCode::Single), Err(NotifyError::Closed));
}
