//! Multi-domain deployment platform
//!
//! A control plane holding the desired state of projects, services and build
//! jobs, a host agent converging local containers and the reverse-proxy
//! configuration toward it, and a build worker turning source commits into
//! deployable images.

pub mod app;
pub mod build;
pub mod cli;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod proxy;
pub mod reconcile;
pub mod runtime;
pub mod server;
pub mod store;
pub mod utils;
pub mod webhook;
pub mod workers;
