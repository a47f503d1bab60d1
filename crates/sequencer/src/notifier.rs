use std::{io, net::SocketAddr};

use shared::{domain::LaunchCode, protocol};
use tokio::{net::UdpSocket, sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::error::NotifyError;

/// Tells the AR companion which firework to launch.
///
/// `notify` never waits on the network: delivery happens elsewhere and is
/// best effort.
pub trait LaunchNotifier: Send + Sync {
    fn notify(&self, code: LaunchCode) -> Result<(), NotifyError>;
}

/// Sends each code as one UDP datagram from a task that owns the socket.
///
/// The socket task ends once every clone of the notifier is dropped and the
/// queued codes have gone out.
#[derive(Clone)]
pub struct UdpNotifier {
    outbox: mpsc::UnboundedSender<LaunchCode>,
    target: SocketAddr,
}

impl UdpNotifier {
    pub async fn start(target: SocketAddr) -> io::Result<(Self, JoinHandle<()>)> {
        let bind_addr: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        debug!(local = ?socket.local_addr().ok(), %target, "notifier socket bound");

        let (outbox, inbox) = mpsc::unbounded_channel();
        let task = tokio::spawn(deliver(socket, target, inbox));
        Ok((Self { outbox, target }, task))
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl LaunchNotifier for UdpNotifier {
    fn notify(&self, code: LaunchCode) -> Result<(), NotifyError> {
        self.outbox.send(code).map_err(|_| NotifyError::Closed)
    }
}

async fn deliver(
    socket: UdpSocket,
    target: SocketAddr,
    mut inbox: mpsc::UnboundedReceiver<LaunchCode>,
) {
    while let Some(code) = inbox.recv().await {
        let payload = protocol::encode(code);
        match socket.send_to(&payload, target).await {
            Ok(_) => info!(%code, %target, "launch code sent"),
            Err(error) => warn!(%code, %target, %error, "launch code not sent"),
        }
    }
    debug!(%target, "notifier outbox closed");
}

#[cfg(test)]
#[path = "tests/notifier_tests.rs"]
mod tests;
