//! Wire types shared by the control plane, the host agent and the build worker.

pub mod models;

pub use models::*;
