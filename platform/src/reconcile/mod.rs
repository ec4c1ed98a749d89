//! Host agent convergence: containers toward desired state, proxy config toward
//! the rendered document

pub mod proxy_config;
pub mod reconciler;

pub use proxy_config::ProxyConfigWriter;
pub use reconciler::{ReconcileReport, Reconciler};
