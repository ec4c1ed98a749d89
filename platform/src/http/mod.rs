//! Control-plane HTTP client

pub mod client;
pub mod control_plane;

pub use client::HttpClient;
pub use control_plane::ControlPlaneExt;
