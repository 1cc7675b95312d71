use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("connection lost: {0}")]
    Connection(#[from] io::Error),
    #[error("session {0} could not keep up with broadcasts")]
    Capacity(Uuid),
}
