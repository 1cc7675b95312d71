use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sketchboard_shared::LineReader;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::hub::Hub;
use crate::sessions::Session;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Accepts line-protocol clients until the listener fails.
pub async fn serve(listener: TcpListener, hub: Arc<Hub>) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "sketch server accepting line clients");
    }
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                warn!(%error, "accept failed");
                continue;
            }
        };
        let hub = hub.clone();
        tokio::spawn(async move {
            if let Err(error) = handle_connection(stream, addr, hub).await {
                debug!(%addr, %error, "connection ended");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    hub: Arc<Hub>,
) -> Result<(), ServerError> {
    let (reader, mut writer) = stream.into_split();
    let (mut session, mut outbound) = Session::open(hub, addr.to_string()).await;

    let send_task = tokio::spawn(async move {
        while let Some(line) = outbound.recv().await {
            let mut framed = String::with_capacity(line.len() + 1);
            framed.push_str(&line);
            framed.push('\n');
            if writer.write_all(framed.as_bytes()).await.is_err() {
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    let mut lines = LineReader::new(BufReader::new(reader));
    let result = loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(Ok(line))) => {
                    session.handle_line(&line).await;
                }
                Ok(Some(Err(error))) => {
                    warn!(session = %session.id(), %error, "dropping oversized line");
                }
                Ok(None) => break Ok(()),
                Err(error) => break Err(ServerError::Connection(error)),
            },
            _ = session.kicked() => break Err(ServerError::Capacity(session.id())),
        }
    };

    session.close().await;
    // Deregistering drops the hub's sender, so the writer drains and exits.
    let abort = send_task.abort_handle();
    if tokio::time::timeout(DRAIN_TIMEOUT, send_task).await.is_err() {
        abort.abort();
    }
    result
}
