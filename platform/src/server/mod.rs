//! Control-plane HTTP API

pub mod error;
pub mod handlers;
pub mod serve;
pub mod state;

pub use serve::{build_router, serve};
pub use state::ServerState;
