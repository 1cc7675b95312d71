use axum::routing::get;
use axum::Router;

pub mod error;
pub mod handlers;
pub mod hub;
pub mod logic;
pub mod sessions;
pub mod state;
pub mod tcp;

pub use error::ServerError;
pub use hub::Hub;
pub use sessions::{Session, SessionState};
pub use state::AppState;

use crate::handlers::{ping_handler, sketch_handler, ws_handler};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping_handler))
        .route("/sketch", get(sketch_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}
