//! Native client for the shared sketch server: a local mirror of the sketch
//! that only follows the server's broadcasts, plus the connection that feeds it.

mod connection;
mod error;
mod reconciler;

pub use connection::Connection;
pub use error::ClientError;
pub use reconciler::{Gesture, Reconciler};
