use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use shared::{domain::LaunchCode, protocol};
use tokio::net::UdpSocket;
use tracing::{info, warn};

#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stand in for the companion app: print every launch code received.
    Listen {
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
        /// Print one JSON object per datagram instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Send a single launch code, as the robot side would.
    Send {
        #[arg(long, default_value = "127.0.0.1:8000")]
        target: SocketAddr,
        code: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();

    match cli.command {
        Command::Listen { bind, json } => listen(bind, json).await,
        Command::Send { target, code } => {
            let code = LaunchCode::from_code(code)
                .ok_or_else(|| anyhow!("unknown launch code {code}, expected 1 to 4"))?;
            send(target, code).await
        }
    }
}

async fn listen(bind: SocketAddr, json: bool) -> Result<()> {
    let socket = UdpSocket::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(%bind, "listening for launch codes");

    let mut buf = [0u8; 64];
    loop {
        let (len, from) = socket.recv_from(&mut buf).await?;
        match protocol::decode(&buf[..len]) {
            Ok(code) => println!("{}", describe(code, from, json)),
            Err(error) => warn!(%from, %error, "ignoring datagram"),
        }
    }
}

fn describe(code: LaunchCode, from: SocketAddr, json: bool) -> String {
    if json {
        serde_json::json!({ "from": from.to_string(), "code": code.code(), "kind": code })
            .to_string()
    } else {
        format!("{from} -> {code} ({code:?})")
    }
}

async fn send(target: SocketAddr, code: LaunchCode) -> Result<()> {
    let bind: SocketAddr = if target.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(bind).await?;
    socket
        .send_to(&protocol::encode(code), target)
        .await
        .with_context(|| format!("sending code {code} to {target}"))?;
    println!("sent {code} to {target}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_line_names_the_firework() {
        let from: SocketAddr = "127.0.0.1:5555".parse().expect("addr");
        let line = describe(LaunchCode::Fuse, from, true);
        let value: serde_json::Value = serde_json::from_str(&line).expect("json");
        assert_eq!(value["code"], 4);
        assert_eq!(value["kind"], "fuse");
        assert_eq!(value["from"], "127.0.0.1:5555");
    }

    #[test]
    fn plain_line_shows_code_and_name() {
        let from: SocketAddr = "127.0.0.1:5555".parse().expect("addr");
        assert_eq!(
            describe(LaunchCode::Finale, from, false),
            "127.0.0.1:5555 -> 3 (Finale)"
        );
    }

    #[test]
    fn send_requires_a_code() {
        assert!(Cli::try_parse_from(["tools", "send"]).is_err());
        let cli = Cli::try_parse_from(["tools", "send", "--target", "10.0.0.2:8000", "2"])
            .expect("cli");
        assert!(matches!(cli.command, Command::Send { code: 2, .. }));
    }
}
