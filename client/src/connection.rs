use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sketchboard_shared::framing::MAX_SNAPSHOT_LEN;
use sketchboard_shared::{Command, LineReader};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::reconciler::Reconciler;

/// Live link to the sketch server.
///
/// A reader task applies every server line to the shared [`Reconciler`] and
/// bumps a revision counter; a writer task drains outbound commands.
pub struct Connection {
    outbound: mpsc::UnboundedSender<String>,
    reconciler: Arc<Mutex<Reconciler>>,
    revision: watch::Receiver<u64>,
    reader: JoinHandle<ClientError>,
    writer: JoinHandle<()>,
}

impl Connection {
    pub async fn connect(addr: &str) -> Result<Connection, ClientError> {
        info!(%addr, "connecting");
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        let (reader, mut writer) = stream.into_split();
        info!(%addr, "connected");

        let reconciler = Arc::new(Mutex::new(Reconciler::new()));
        let (revision_tx, revision) = watch::channel(0u64);
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();

        let writer = tokio::spawn(async move {
            while let Some(mut line) = outbound_rx.recv().await {
                line.push('\n');
                if let Err(error) = writer.write_all(line.as_bytes()).await {
                    debug!(%error, "send failed");
                    break;
                }
            }
        });

        let shared = reconciler.clone();
        let reader = tokio::spawn(async move {
            let mut lines = LineReader::with_max_length(BufReader::new(reader), MAX_SNAPSHOT_LEN);
            loop {
                match lines.next_line().await {
                    Ok(Some(Ok(line))) => {
                        debug!(line = %line.trim_end(), "received");
                        lock(&shared).on_server_command(&line);
                        revision_tx.send_modify(|revision| *revision += 1);
                    }
                    Ok(Some(Err(error))) => warn!(%error, "dropping server line"),
                    Ok(None) => return ClientError::Closed,
                    Err(error) => return ClientError::Connection(error),
                }
            }
        });

        Ok(Connection {
            outbound,
            reconciler,
            revision,
            reader,
            writer,
        })
    }

    pub fn send(&self, command: &Command) -> Result<(), ClientError> {
        self.outbound
            .send(command.encode())
            .map_err(|_| ClientError::Closed)
    }

    /// Runs `f` against the local sketch state.
    pub fn with_reconciler<R>(&self, f: impl FnOnce(&mut Reconciler) -> R) -> R {
        f(&mut lock(&self.reconciler))
    }

    /// Commits the current draw gesture and sends its `add`. Returns whether
    /// there was a gesture to commit.
    pub fn commit_gesture(&self) -> Result<bool, ClientError> {
        let command = self.with_reconciler(Reconciler::on_local_gesture_commit);
        match command {
            Some(command) => self.send(&command).map(|()| true),
            None => Ok(false),
        }
    }

    /// Revision counter bumped after every server line; a UI redraws when it
    /// changes.
    pub fn revisions(&self) -> watch::Receiver<u64> {
        self.revision.clone()
    }

    /// Waits until `ready` holds for the local state, re-checking after each
    /// server line.
    pub async fn wait_until(
        &self,
        mut ready: impl FnMut(&Reconciler) -> bool,
    ) -> Result<(), ClientError> {
        let mut revisions = self.revisions();
        loop {
            let done = ready(&*lock(&self.reconciler));
            if done {
                return Ok(());
            }
            if revisions.changed().await.is_err() {
                return Err(ClientError::Closed);
            }
        }
    }

    /// Resolves with whatever ended the connection.
    pub async fn closed(self) -> ClientError {
        let Connection { reader, writer, .. } = self;
        let error = reader.await.unwrap_or(ClientError::Closed);
        writer.abort();
        error
    }
}

fn lock(reconciler: &Mutex<Reconciler>) -> MutexGuard<'_, Reconciler> {
    reconciler.lock().unwrap_or_else(PoisonError::into_inner)
}
