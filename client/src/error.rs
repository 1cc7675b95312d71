use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot reach sketch server at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("connection to sketch server lost: {0}")]
    Connection(#[from] io::Error),
    #[error("sketch server closed the connection")]
    Closed,
}
