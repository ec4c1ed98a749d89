//! Server state

use std::sync::Arc;

use crate::store::StateStore;

/// Server state shared across handlers
pub struct ServerState {
    pub store: Arc<StateStore>,
    /// ACME resolver named in rendered proxy routers
    pub cert_resolver: String,
}

impl ServerState {
    pub fn new(store: Arc<StateStore>, cert_resolver: impl Into<String>) -> Self {
        Self {
            store,
            cert_resolver: cert_resolver.into(),
        }
    }
}
