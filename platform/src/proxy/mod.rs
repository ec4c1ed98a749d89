//! Reverse proxy configuration

pub mod traefik;

pub use traefik::{render_traefik_config, DEFAULT_CERT_RESOLVER};
