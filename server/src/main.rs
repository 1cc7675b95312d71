use std::net::SocketAddr;

use clap::Parser;
use sketchboard_server::state::DEFAULT_OUTBOUND_CAPACITY;
use sketchboard_server::{router, tcp, AppState, ServerError};
use sketchboard_shared::DEFAULT_PORT;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Address for line-protocol clients.
    #[arg(long, env = "SKETCH_TCP_ADDR", default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))]
    tcp_addr: SocketAddr,
    /// Port for the HTTP endpoints (`/ping`, `/sketch`, `/ws`).
    #[arg(long, env = "PORT", default_value_t = 3000)]
    http_port: u16,
    /// Lines a session may have queued before it is disconnected.
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_CAPACITY)]
    outbound_capacity: usize,
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let state = AppState::new(args.outbound_capacity);

    let line_listener = bind(args.tcp_addr).await?;
    let http_addr = SocketAddr::from(([0, 0, 0, 0], args.http_port));
    let http_listener = bind(http_addr).await?;
    info!(%http_addr, "http endpoints ready");

    let app = router(state.clone()).into_make_service_with_connect_info::<SocketAddr>();
    tokio::select! {
        result = tcp::serve(line_listener, state.hub.clone()) => result,
        result = axum::serve(http_listener, app) => result.map_err(ServerError::Connection),
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}
