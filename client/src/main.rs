use std::process::ExitCode;

use clap::Parser;
use sketchboard_client::{ClientError, Connection};
use sketchboard_shared::{Command, DEFAULT_PORT};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Sketch server to join.
    #[arg(long, env = "SKETCH_SERVER", default_value_t = format!("127.0.0.1:{DEFAULT_PORT}"))]
    server: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let connection = match Connection::connect(&args.server).await {
        Ok(connection) => connection,
        Err(error) => {
            error!(%error, "connect failed");
            return ExitCode::FAILURE;
        }
    };

    match run(connection).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "disconnected");
            ExitCode::FAILURE
        }
    }
}

/// Forwards stdin lines to the server and prints the mirror after every
/// server line until the connection ends.
async fn run(connection: Connection) -> Result<(), ClientError> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut revisions = connection.revisions();

    loop {
        tokio::select! {
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => forward(&connection, &line)?,
                Ok(None) => {
                    info!("stdin closed, still following the sketch");
                    stdin_open = false;
                }
                Err(error) => return Err(ClientError::Connection(error)),
            },
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = connection.with_reconciler(|client| client.mirror().snapshot());
                println!("{snapshot}");
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }

    Err(connection.closed().await)
}

fn forward(connection: &Connection, line: &str) -> Result<(), ClientError> {
    if line.trim().is_empty() {
        return Ok(());
    }
    match Command::decode(line) {
        Ok(Command::Sketch(_)) => warn!("snapshots are sent by the server only"),
        Ok(command) => connection.send(&command)?,
        Err(error) => warn!(%error, "not sent"),
    }
    Ok(())
}
